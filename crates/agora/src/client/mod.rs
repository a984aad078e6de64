//! HTTP client for the forum API.
//!
//! `ForumClient` is the single egress point to the server. Every request is
//! decorated with the current session credential when it is sent, so a login
//! that happens after the client was built is picked up by the next call.

mod error;

pub use error::{ClientError, Result};

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{
    CategoryId, Comment, CommentId, CreateCommentRequest, CreatePostRequest, ErrorBody,
    LoginRequest, LoginResponse, MutationResponse, Post, PostId, SESSION_HEADER, SignupRequest,
    UpdateCommentRequest, UpdatePostRequest, UserId,
};
use crate::session::SessionStore;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Upper bound for a whole request, connect to last body byte.
    pub timeout: Duration,
    /// Log out locally when the server answers 401 to a request that
    /// carried the current credential.
    pub logout_on_unauthorized: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            logout_on_unauthorized: true,
        }
    }
}

/// HTTP client for the forum API.
#[derive(Debug, Clone)]
pub struct ForumClient {
    base_url: String,
    http: Client,
    session: SessionStore,
    options: ClientOptions,
}

impl ForumClient {
    /// Create a client with default options.
    ///
    /// Example: `ForumClient::new("http://localhost:8080/api", session)`
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self> {
        Self::with_options(base_url, session, ClientOptions::default())
    }

    /// Create a client with explicit transport options.
    pub fn with_options(
        base_url: &str,
        session: SessionStore,
        options: ClientOptions,
    ) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("agora/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Check that the API is reachable. Calls GET /ping.
    pub async fn ping(&self) -> Result<String> {
        let response = self.send(self.http.get(self.url("/ping"))).await?;
        Ok(response.text().await?)
    }

    // ----------------------------------------------------------------------------
    // Posts
    // ----------------------------------------------------------------------------

    /// List all posts.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.get_json("/posts").await
    }

    /// List posts written by one user.
    pub async fn list_posts_by_user(&self, user_id: UserId) -> Result<Vec<Post>> {
        self.get_json(&format!("/posts/user/{}", user_id)).await
    }

    /// List posts in one category.
    pub async fn list_posts_by_category(&self, category_id: CategoryId) -> Result<Vec<Post>> {
        self.get_json(&format!("/posts/category/{}", category_id)).await
    }

    /// Get a single post.
    pub async fn get_post(&self, post_id: PostId) -> Result<Post> {
        self.get_json(&format!("/posts/{}", post_id)).await
    }

    /// Create a post. Requires a session.
    pub async fn create_post(&self, body: &CreatePostRequest) -> Result<MutationResponse> {
        let request = self.http.post(self.url("/posts")).json(body);
        acknowledgement(self.send(request).await?).await
    }

    /// Update a post. Requires a session owning the post.
    pub async fn update_post(&self, body: &UpdatePostRequest) -> Result<MutationResponse> {
        let request = self.http.put(self.url("/posts")).json(body);
        acknowledgement(self.send(request).await?).await
    }

    /// Delete a post. Requires a session owning the post.
    pub async fn delete_post(&self, post_id: PostId) -> Result<MutationResponse> {
        let request = self.http.delete(self.url(&format!("/posts/{}", post_id)));
        acknowledgement(self.send(request).await?).await
    }

    // ----------------------------------------------------------------------------
    // Comments
    // ----------------------------------------------------------------------------

    /// List the comments of a post.
    pub async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        self.get_json(&format!("/comments/post/{}", post_id)).await
    }

    /// Add a comment to a post. Requires a session.
    pub async fn create_comment(
        &self,
        post_id: PostId,
        content: &str,
    ) -> Result<MutationResponse> {
        let body = CreateCommentRequest {
            content: content.to_string(),
            post_id,
            user_id: self.session.user_id(),
        };
        let request = self.http.post(self.url("/comments")).json(&body);
        acknowledgement(self.send(request).await?).await
    }

    /// Edit a comment. Requires a session owning the comment.
    pub async fn update_comment(
        &self,
        comment_id: CommentId,
        content: &str,
    ) -> Result<MutationResponse> {
        let body = UpdateCommentRequest {
            comment_id,
            content: content.to_string(),
        };
        let request = self.http.put(self.url("/comments")).json(&body);
        acknowledgement(self.send(request).await?).await
    }

    /// Delete a comment. Requires a session owning the comment.
    pub async fn delete_comment(&self, comment_id: CommentId) -> Result<MutationResponse> {
        let request = self
            .http
            .delete(self.url(&format!("/comments/{}", comment_id)));
        acknowledgement(self.send(request).await?).await
    }

    // ----------------------------------------------------------------------------
    // Authentication
    // ----------------------------------------------------------------------------

    /// Exchange credentials for a server session.
    ///
    /// Only calls the API; storing the session is up to the caller.
    pub async fn login(&self, body: &LoginRequest) -> Result<LoginResponse> {
        let request = self.http.post(self.url("/login")).json(body);
        let response = self.send_anonymous(request).await?;
        Ok(response.json().await?)
    }

    /// Invalidate the server-side session.
    pub async fn logout(&self) -> Result<MutationResponse> {
        let request = self.http.post(self.url("/logout"));
        acknowledgement(self.send(request).await?).await
    }

    /// Create a user account.
    pub async fn signup(&self, body: &SignupRequest) -> Result<MutationResponse> {
        let request = self.http.post(self.url("/users")).json(body);
        acknowledgement(self.send_anonymous(request).await?).await
    }

    // ----------------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(response.json().await?)
    }

    /// Attach the session credential as it stands right now.
    ///
    /// Returns the id that was attached so a 401 can be matched against it.
    fn authorize(&self, request: RequestBuilder) -> Result<(RequestBuilder, Option<String>)> {
        let Some(session_id) = self.session.session_id() else {
            return Ok((request, None));
        };
        let value = HeaderValue::from_str(&session_id).map_err(|e| {
            ClientError::RequestSetup(format!("session id is not a valid header value: {}", e))
        })?;
        Ok((request.header(SESSION_HEADER, value), Some(session_id)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let (request, credential) = self.authorize(request)?;
        self.dispatch(request, credential.as_deref()).await
    }

    /// Send without the session credential.
    ///
    /// Used for login and signup: their 401 means bad input, not a rejected
    /// session, so it never logs out.
    async fn send_anonymous(&self, request: RequestBuilder) -> Result<Response> {
        self.dispatch(request, None).await
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        credential: Option<&str>,
    ) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(
            status = status.as_u16(),
            url = %response.url(),
            authenticated = credential.is_some(),
            "API response"
        );

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(credential);
        }
        Err(self.parse_error(response).await)
    }

    fn handle_unauthorized(&self, sent: Option<&str>) {
        let Some(sent) = sent else {
            return;
        };
        if !self.options.logout_on_unauthorized {
            return;
        }
        // A newer login may have replaced the rejected credential meanwhile.
        if self.session.session_id().as_deref() == Some(sent) {
            warn!("Server rejected the session credential; logging out locally");
            self.session.log_out();
        }
    }

    /// Parse an error response into a ClientError.
    async fn parse_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        ClientError::ServerRejection { status, message }
    }
}

/// Read a mutation acknowledgement. Empty and non-JSON bodies are accepted.
async fn acknowledgement(response: Response) -> Result<MutationResponse> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(MutationResponse::default());
    }
    Ok(serde_json::from_str(&text).unwrap_or_else(|_| MutationResponse {
        message: Some(text),
    }))
}
