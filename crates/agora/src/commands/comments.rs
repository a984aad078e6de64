//! Comment commands.

use anyhow::Result;

use agora::api::{CommentId, PostId};
use agora::forum::Forum;
use agora::views::forms::CommentForm;

use super::report;

const LOGIN_HINT: &str = "Please check that you are logged in";

/// `agora comment add <post-id>`
pub async fn add(forum: &Forum, post_id: PostId, content: String) -> Result<()> {
    let response = forum
        .create_comment(post_id, &CommentForm::new(content))
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Comment added"));
    Ok(())
}

/// `agora comment edit <post-id> <comment-id>`
pub async fn edit(
    forum: &Forum,
    post_id: PostId,
    comment_id: CommentId,
    content: String,
) -> Result<()> {
    let response = forum
        .update_comment(post_id, comment_id, &CommentForm::new(content))
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Comment updated"));
    Ok(())
}

/// `agora comment delete <post-id> <comment-id>`
pub async fn delete(forum: &Forum, post_id: PostId, comment_id: CommentId) -> Result<()> {
    let response = forum
        .delete_comment(post_id, comment_id)
        .await
        .map_err(|e| report(e, Some(LOGIN_HINT)))?;
    println!("{}", response.message.as_deref().unwrap_or("Comment deleted"));
    Ok(())
}
