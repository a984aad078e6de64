//! Forum facade: cached reads and invalidating mutations.
//!
//! Reads go through the query cache; mutations validate their form, call the
//! API and, only once the server accepted them, invalidate the keys they
//! affect.

use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::api::{CategoryId, Comment, CommentId, MutationResponse, Post, PostId, UserId};
use crate::cache::{Mutation, QueryCache, QueryKey};
use crate::client::{ClientError, ClientOptions, ForumClient};
use crate::config::Config;
use crate::session::SessionStore;
use crate::views::forms::{CommentForm, LoginForm, PostForm, SignupForm, ValidationErrors};

/// What a cache entry holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Posts(Vec<Post>),
    Post(Post),
    Comments(Vec<Comment>),
}

#[derive(Debug, Error)]
pub enum ForumError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The cache held a different resource kind under the key.
    #[error("unexpected cached resource for {0}")]
    UnexpectedResource(QueryKey),
}

impl ForumError {
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            ForumError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForumError>;

/// Client-side forum state: session, API client and query cache.
#[derive(Debug, Clone)]
pub struct Forum {
    client: ForumClient,
    cache: QueryCache<Resource, ClientError>,
    session: SessionStore,
}

impl Forum {
    /// Build on an existing client; the client's session store is shared.
    pub fn new(client: ForumClient, cache: QueryCache<Resource, ClientError>) -> Self {
        let session = client.session().clone();
        Self {
            client,
            cache,
            session,
        }
    }

    /// Build everything from configuration.
    ///
    /// `api_url` overrides `api.base_url`.
    pub fn from_config(
        config: &Config,
        config_path: &Path,
        api_url: Option<&str>,
    ) -> std::result::Result<Self, ClientError> {
        let session = SessionStore::open(config.session_path(config_path));
        let options = ClientOptions {
            timeout: config.api.timeout(),
            logout_on_unauthorized: config.session.logout_on_unauthorized,
        };
        let base_url = api_url.unwrap_or(&config.api.base_url);
        let client = ForumClient::with_options(base_url, session, options)?;
        let cache = QueryCache::new().with_max_age(config.cache.max_age());
        Ok(Self::new(client, cache))
    }

    pub fn client(&self) -> &ForumClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache<Resource, ClientError> {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn posts(&self) -> Result<Vec<Post>> {
        let key = QueryKey::posts();
        let client = self.client.clone();
        let resource = self
            .cache
            .read(&key, || async move { client.list_posts().await.map(Resource::Posts) })
            .await?;
        expect_posts(key, resource)
    }

    pub async fn posts_by_user(&self, user_id: UserId) -> Result<Vec<Post>> {
        let key = QueryKey::posts_by_user(user_id);
        let client = self.client.clone();
        let resource = self
            .cache
            .read(&key, || async move {
                client.list_posts_by_user(user_id).await.map(Resource::Posts)
            })
            .await?;
        expect_posts(key, resource)
    }

    pub async fn posts_by_category(&self, category_id: CategoryId) -> Result<Vec<Post>> {
        let key = QueryKey::posts_by_category(category_id);
        let client = self.client.clone();
        let resource = self
            .cache
            .read(&key, || async move {
                client
                    .list_posts_by_category(category_id)
                    .await
                    .map(Resource::Posts)
            })
            .await?;
        expect_posts(key, resource)
    }

    pub async fn post(&self, post_id: PostId) -> Result<Post> {
        let key = QueryKey::post(post_id);
        let client = self.client.clone();
        let resource = self
            .cache
            .read(&key, || async move { client.get_post(post_id).await.map(Resource::Post) })
            .await?;
        match resource {
            Resource::Post(post) => Ok(post),
            _ => Err(ForumError::UnexpectedResource(key)),
        }
    }

    pub async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let key = QueryKey::post_comments(post_id);
        let client = self.client.clone();
        let resource = self
            .cache
            .read(&key, || async move {
                client.list_comments(post_id).await.map(Resource::Comments)
            })
            .await?;
        match resource {
            Resource::Comments(comments) => Ok(comments),
            _ => Err(ForumError::UnexpectedResource(key)),
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub async fn create_post(&self, form: &PostForm) -> Result<MutationResponse> {
        form.validate()?;
        let response = self.client.create_post(&form.to_create_request()).await?;
        self.cache.apply(Mutation::CreatePost).await;
        Ok(response)
    }

    pub async fn update_post(&self, post_id: PostId, form: &PostForm) -> Result<MutationResponse> {
        form.validate()?;
        let response = self
            .client
            .update_post(&form.to_update_request(post_id))
            .await?;
        self.cache.apply(Mutation::UpdatePost { post_id }).await;
        Ok(response)
    }

    /// Edit a post's title and content, keeping its category and notes.
    ///
    /// The current post is read (through the cache) first; if that fails,
    /// nothing is sent.
    pub async fn edit_post(
        &self,
        post_id: PostId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<MutationResponse> {
        let mut form = PostForm::new(title, content);
        form.validate()?;
        let current = self.post(post_id).await?;
        form.category_id = current.category_id;
        form.additional_notes = current.additional_notes;
        self.update_post(post_id, &form).await
    }

    pub async fn delete_post(&self, post_id: PostId) -> Result<MutationResponse> {
        let response = self.client.delete_post(post_id).await?;
        self.cache.apply(Mutation::DeletePost { post_id }).await;
        Ok(response)
    }

    pub async fn create_comment(
        &self,
        post_id: PostId,
        form: &CommentForm,
    ) -> Result<MutationResponse> {
        form.validate()?;
        let response = self.client.create_comment(post_id, &form.content).await?;
        self.cache.apply(Mutation::CreateComment { post_id }).await;
        Ok(response)
    }

    /// Edit a comment. `post_id` names the comment list to refresh.
    pub async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        form: &CommentForm,
    ) -> Result<MutationResponse> {
        form.validate()?;
        let response = self.client.update_comment(comment_id, &form.content).await?;
        self.cache.apply(Mutation::UpdateComment { post_id }).await;
        Ok(response)
    }

    pub async fn delete_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<MutationResponse> {
        let response = self.client.delete_comment(comment_id).await?;
        self.cache.apply(Mutation::DeleteComment { post_id }).await;
        Ok(response)
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Log in and store the session. Returns the user id.
    pub async fn log_in(&self, form: &LoginForm) -> Result<UserId> {
        form.validate()?;
        let response = self.client.login(&form.to_request()).await?;
        self.session.log_in(response.session_id, response.user_id);
        self.cache.apply(Mutation::LogIn).await;
        Ok(response.user_id)
    }

    /// Log out. The local session is always cleared; a failed server call is
    /// only logged.
    pub async fn log_out(&self) {
        if self.session.is_logged_in()
            && let Err(e) = self.client.logout().await
        {
            warn!(error = %e, "Server logout failed; clearing local session anyway");
        }
        self.session.log_out();
        self.cache.apply(Mutation::LogOut).await;
    }

    pub async fn sign_up(&self, form: &SignupForm) -> Result<MutationResponse> {
        form.validate()?;
        let response = self.client.signup(&form.to_request()).await?;
        self.cache.apply(Mutation::SignUp).await;
        Ok(response)
    }
}

fn expect_posts(key: QueryKey, resource: Resource) -> Result<Vec<Post>> {
    match resource {
        Resource::Posts(posts) => Ok(posts),
        _ => Err(ForumError::UnexpectedResource(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_forum() -> Forum {
        // Discard port: any request that is actually sent fails with Network.
        let client =
            ForumClient::new("http://127.0.0.1:9/api", SessionStore::in_memory()).unwrap();
        Forum::new(client, QueryCache::new())
    }

    #[tokio::test]
    async fn invalid_post_form_fails_before_sending() {
        let forum = offline_forum();

        let err = forum.create_post(&PostForm::new("Title", "  ")).await.unwrap_err();

        let errors = err.validation().expect("validation error");
        assert_eq!(errors.to_string(), "Content cannot be empty");
    }

    #[tokio::test]
    async fn invalid_login_form_leaves_session_untouched() {
        let forum = offline_forum();

        let err = forum.log_in(&LoginForm::new("", "pw")).await.unwrap_err();

        assert!(err.validation().is_some());
        assert!(!forum.session().is_logged_in());
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let forum = offline_forum();
        let key = QueryKey::post_comments(7);
        forum
            .cache()
            .read(&key, || async { Ok::<_, ClientError>(Resource::Comments(Vec::new())) })
            .await
            .unwrap();

        let err = forum.delete_comment(7, 1).await.unwrap_err();

        assert!(matches!(err, ForumError::Client(ClientError::Network(_))));
        assert_eq!(
            forum.cache().freshness(&key).await,
            crate::cache::Freshness::Fresh
        );
    }

    #[tokio::test]
    async fn log_out_clears_session_when_server_unreachable() {
        let forum = offline_forum();
        forum.session().log_in("abc123", 42);

        forum.log_out().await;

        assert!(!forum.session().is_logged_in());
    }

    #[tokio::test]
    async fn mismatched_cache_entry_is_reported() {
        let forum = offline_forum();
        let key = QueryKey::posts();
        forum
            .cache()
            .read(&key, || async { Ok::<_, ClientError>(Resource::Comments(Vec::new())) })
            .await
            .unwrap();

        let err = forum.posts().await.unwrap_err();

        assert!(matches!(err, ForumError::UnexpectedResource(k) if k == key));
    }
}
