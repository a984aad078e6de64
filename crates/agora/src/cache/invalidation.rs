//! Mutation → invalidation map.
//!
//! Every mutating call the client makes is named here together with the key
//! prefixes it makes stale. Keeping the table in one place lets it be checked
//! without any view in the loop.

use std::fmt::Display;

use super::{QueryCache, QueryKey};
use crate::api::PostId;

/// A server-side change made through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreatePost,
    UpdatePost { post_id: PostId },
    DeletePost { post_id: PostId },
    CreateComment { post_id: PostId },
    UpdateComment { post_id: PostId },
    DeleteComment { post_id: PostId },
    LogIn,
    LogOut,
    SignUp,
}

impl Mutation {
    /// Key prefixes made stale by this mutation.
    ///
    /// Deleting a post also drops its detail entry and, through the prefix,
    /// its comments.
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match *self {
            Mutation::CreatePost => vec![QueryKey::posts()],
            Mutation::UpdatePost { post_id } | Mutation::DeletePost { post_id } => {
                vec![QueryKey::posts(), QueryKey::post(post_id)]
            }
            Mutation::CreateComment { post_id }
            | Mutation::UpdateComment { post_id }
            | Mutation::DeleteComment { post_id } => vec![QueryKey::post_comments(post_id)],
            Mutation::LogIn | Mutation::LogOut | Mutation::SignUp => Vec::new(),
        }
    }
}

impl<V: Clone, E: Clone + Display> QueryCache<V, E> {
    /// Invalidate everything `mutation` affects. Returns the number of
    /// entries marked stale.
    pub async fn apply(&self, mutation: Mutation) -> usize {
        let mut count = 0;
        for prefix in mutation.invalidates() {
            count += self.invalidate(&prefix).await;
        }
        count
    }
}
