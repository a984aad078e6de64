//! Plain-text rendering of forum views.

use std::fmt::Display;

use super::access::{can_create, can_modify};
use super::forms::ValidationErrors;
use super::{EMPTY_MESSAGE, QueryState};
use crate::api::{Comment, Post};
use crate::session::Session;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOADING_MESSAGE: &str = "Loading...";

/// Navigation header.
pub fn nav_bar(session: &Session) -> String {
    let right = match session.user_id() {
        Some(user_id) => format!("User {}  |  Logout", user_id),
        None => "Login  |  Signup".to_string(),
    };
    format!("Agora  |  Posts  |  {}", right)
}

/// Post list with a create hint for logged-in users.
pub fn post_list(state: &QueryState<Vec<Post>>, session: &Session) -> String {
    let posts = match state {
        QueryState::Ready(posts) => posts,
        other => return placeholder(other),
    };
    if posts.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    let mut lines: Vec<String> = posts.iter().map(|post| post_line(post, session)).collect();
    if can_create(session) {
        lines.push(String::new());
        lines.push("New post: agora post create --title <TITLE> --content <CONTENT>".to_string());
    }
    lines.join("\n")
}

/// A single post with its metadata.
pub fn post_detail(state: &QueryState<Post>, session: &Session) -> String {
    let post = match state {
        QueryState::Ready(post) => post,
        other => return placeholder(other),
    };

    let mut lines = vec![post.title.clone(), "=".repeat(post.title.chars().count().max(1))];
    lines.push(format!(
        "by {} on {}{}",
        author(post.author_username.as_deref(), post.author_user_id),
        post.creation_date.format(DATE_FORMAT),
        flags(post),
    ));
    lines.push(String::new());
    lines.push(post.content.clone());
    if let Some(notes) = post.additional_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(String::new());
        lines.push(format!("Notes: {}", notes));
    }
    if can_modify(session, post.author_user_id) {
        lines.push(String::new());
        lines.push("[edit] [delete]".to_string());
    }
    lines.join("\n")
}

/// Comments under a post.
pub fn comment_list(state: &QueryState<Vec<Comment>>, session: &Session) -> String {
    let comments = match state {
        QueryState::Ready(comments) => comments,
        other => return placeholder(other),
    };
    if comments.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    let mut lines = Vec::with_capacity(comments.len() * 2);
    for comment in comments {
        let mut header = format!(
            "#{} {} on {}",
            comment.id,
            author(comment.author_username.as_deref(), comment.author_user_id),
            comment.creation_date.format(DATE_FORMAT),
        );
        if can_modify(session, comment.author_user_id) {
            header.push_str(" [edit] [delete]");
        }
        lines.push(header);
        lines.push(format!("  {}", comment.content));
    }
    lines.join("\n")
}

/// One line for a network or server failure.
pub fn error_line(error: &impl Display) -> String {
    format!("Error: {}", error)
}

/// One line per invalid field.
pub fn validation_errors(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn placeholder<T>(state: &QueryState<T>) -> String {
    match state {
        QueryState::Loading => LOADING_MESSAGE.to_string(),
        QueryState::Failed(message) => error_line(message),
        QueryState::Ready(_) => String::new(),
    }
}

fn post_line(post: &Post, session: &Session) -> String {
    let mut line = format!(
        "[{}] {}  ({}, {}){}",
        post.id,
        post.title,
        author(post.author_username.as_deref(), post.author_user_id),
        post.creation_date.format(DATE_FORMAT),
        flags(post),
    );
    if can_modify(session, post.author_user_id) {
        line.push_str(" [delete]");
    }
    line
}

fn author(username: Option<&str>, user_id: Option<i64>) -> String {
    match (username, user_id) {
        (Some(name), _) if !name.is_empty() => name.to_string(),
        (_, Some(id)) => format!("user {}", id),
        _ => "unknown".to_string(),
    }
}

fn flags(post: &Post) -> &'static str {
    match (post.is_sticky, post.is_locked) {
        (true, true) => " [sticky, locked]",
        (true, false) => " [sticky]",
        (false, true) => " [locked]",
        (false, false) => "",
    }
}
