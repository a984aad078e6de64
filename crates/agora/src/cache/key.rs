//! Cache key scheme.

use std::fmt;

use crate::api::{CategoryId, PostId, UserId};

/// One element of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    Name(String),
    Id(i64),
}

impl From<&str> for KeySegment {
    fn from(name: &str) -> Self {
        KeySegment::Name(name.to_string())
    }
}

impl From<i64> for KeySegment {
    fn from(id: i64) -> Self {
        KeySegment::Id(id)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Name(name) => f.write_str(name),
            KeySegment::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Ordered tuple identifying one logical server resource.
///
/// | Resource           | Key                             |
/// |--------------------|---------------------------------|
/// | all posts          | `["posts"]`                     |
/// | single post        | `["post", id]`                  |
/// | comments of a post | `["post", id, "comments"]`      |
/// | posts by user      | `["posts", "user", id]`         |
/// | posts by category  | `["posts", "category", id]`     |
///
/// Invalidation matches by prefix, so `["post", id]` also covers that
/// post's comments and `["posts"]` covers the filtered post lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: impl IntoIterator<Item = KeySegment>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn posts() -> Self {
        Self(vec!["posts".into()])
    }

    pub fn post(post_id: PostId) -> Self {
        Self(vec!["post".into(), post_id.into()])
    }

    pub fn post_comments(post_id: PostId) -> Self {
        Self(vec!["post".into(), post_id.into(), "comments".into()])
    }

    pub fn posts_by_user(user_id: UserId) -> Self {
        Self(vec!["posts".into(), "user".into(), user_id.into()])
    }

    pub fn posts_by_category(category_id: CategoryId) -> Self {
        Self(vec!["posts".into(), "category".into(), category_id.into()])
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// True if `prefix` is a leading run of this key's segments.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match segment {
                KeySegment::Name(name) => write!(f, "{name:?}")?,
                KeySegment::Id(id) => write!(f, "{id}")?,
            }
        }
        f.write_str("]")
    }
}
