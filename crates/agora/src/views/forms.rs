//! Input forms and client-side validation.
//!
//! Validation runs before anything is sent; a form that fails it never
//! reaches the network.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::api::{
    CategoryId, CreatePostRequest, LoginRequest, PostId, SignupRequest, UpdatePostRequest,
};

// ============================================================================
// Validation Errors
// ============================================================================

/// Form field an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
    Username,
    Email,
    Password,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Content => "content",
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
        };
        f.write_str(name)
    }
}

/// Per-field validation messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(Field, String)>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (_, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Forms
// ============================================================================

/// Create/edit post form.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub category_id: Option<CategoryId>,
    pub additional_notes: Option<String>,
}

impl PostForm {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Content is checked before the title and only the first problem is
    /// reported.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.content.trim().is_empty() {
            errors.add(Field::Content, "Content cannot be empty");
        } else if self.title.trim().is_empty() {
            errors.add(Field::Title, "Title cannot be empty");
        }
        errors.into_result()
    }

    pub(crate) fn to_create_request(&self) -> CreatePostRequest {
        CreatePostRequest {
            title: self.title.clone(),
            content: self.content.clone(),
            category_id: self.category_id,
            additional_notes: self.additional_notes.clone(),
        }
    }

    pub(crate) fn to_update_request(&self, post_id: PostId) -> UpdatePostRequest {
        UpdatePostRequest {
            post_id,
            title: self.title.clone(),
            content: self.content.clone(),
            category_id: self.category_id,
            additional_notes: self.additional_notes.clone(),
        }
    }
}

/// Create/edit comment form.
#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub content: String,
}

impl CommentForm {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.content.trim().is_empty() {
            errors.add(Field::Content, "Content cannot be empty");
        }
        errors.into_result()
    }
}

/// Login form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.username.trim().is_empty() {
            errors.add(Field::Username, "Username is required");
        }
        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required");
        }
        errors.into_result()
    }

    pub(crate) fn to_request(&self) -> LoginRequest {
        LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Signup form. Every invalid field is reported.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.username.is_empty() {
            errors.add(Field::Username, "Username is required");
        }
        if self.email.is_empty() {
            errors.add(Field::Email, "Email is required");
        } else if !looks_like_email(&self.email) {
            errors.add(Field::Email, "Invalid email");
        }
        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required");
        }
        errors.into_result()
    }

    pub(crate) fn to_request(&self) -> SignupRequest {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        SignupRequest {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            profile_picture: non_empty(&self.profile_picture),
            biography: non_empty(&self.biography),
        }
    }
}

/// Loose email shape: non-space text, `@`, non-space text, `.`, non-space
/// text, anywhere in the input.
pub fn looks_like_email(input: &str) -> bool {
    static EMAIL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));
    EMAIL.is_match(input)
}
