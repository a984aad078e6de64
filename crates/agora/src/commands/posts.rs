//! Post commands.

use anyhow::Result;

use agora::api::{CategoryId, PostId, UserId};
use agora::forum::Forum;
use agora::views::forms::PostForm;
use agora::views::{QueryState, render};

use super::report;

const LOGIN_HINT: &str = "Please check that you are logged in";

/// `agora posts`
pub async fn list(
    forum: &Forum,
    user: Option<UserId>,
    category: Option<CategoryId>,
) -> Result<()> {
    let result = match (user, category) {
        (Some(user_id), _) => forum.posts_by_user(user_id).await,
        (None, Some(category_id)) => forum.posts_by_category(category_id).await,
        (None, None) => forum.posts().await,
    };
    let failed = result.is_err();
    let state = QueryState::from_result(result);

    println!("{}", render::nav_bar(&forum.session().current()));
    println!();
    println!("{}", render::post_list(&state, &forum.session().current()));

    if failed {
        anyhow::bail!("failed to load posts");
    }
    Ok(())
}

/// `agora post show <id>`
pub async fn show(forum: &Forum, post_id: PostId) -> Result<()> {
    let (post, comments) = tokio::join!(forum.post(post_id), forum.comments(post_id));
    let failed = post.is_err();
    let session = forum.session().current();

    println!("{}", render::post_detail(&QueryState::from_result(post), &session));
    if !failed {
        println!();
        println!("Comments");
        println!("--------");
        println!(
            "{}",
            render::comment_list(&QueryState::from_result(comments), &session)
        );
    }

    if failed {
        anyhow::bail!("failed to load post {}", post_id);
    }
    Ok(())
}

/// `agora post create`
pub async fn create(
    forum: &Forum,
    title: String,
    content: String,
    category_id: Option<CategoryId>,
    additional_notes: Option<String>,
) -> Result<()> {
    let form = PostForm {
        title,
        content,
        category_id,
        additional_notes,
    };
    let response = forum
        .create_post(&form)
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Post created"));
    Ok(())
}

/// `agora post edit <id>`
pub async fn edit(forum: &Forum, post_id: PostId, title: String, content: String) -> Result<()> {
    let response = forum
        .edit_post(post_id, title, content)
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Post updated"));
    Ok(())
}

/// `agora post delete <id>`
pub async fn delete(forum: &Forum, post_id: PostId) -> Result<()> {
    let response = forum
        .delete_post(post_id)
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Post deleted"));
    Ok(())
}
