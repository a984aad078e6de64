//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};

use agora::config::Config;
use agora::forum::{Forum, ForumError};
use agora::views::render;

pub mod auth;
pub mod comments;
pub mod posts;

/// Load configuration and build the forum handle.
pub async fn connect(config_path: &str, api_url: Option<&str>) -> Result<Forum> {
    let config = Config::load(config_path)
        .await
        .with_context(|| format!("Failed to load config '{}'", config_path))?;
    Forum::from_config(&config, Path::new(config_path), api_url)
        .context("Failed to set up the API client")
}

/// Print a mutation failure the way the forms show it.
///
/// Validation problems are listed per field; anything else is one line.
/// `hint` is appended to server-side failures.
pub fn report(error: ForumError, hint: Option<&str>) -> anyhow::Error {
    match &error {
        ForumError::Validation(errors) => {
            eprintln!("{}", render::validation_errors(errors));
            anyhow::anyhow!("invalid input")
        }
        _ => {
            let line = render::error_line(&error);
            match hint {
                Some(hint) => anyhow::anyhow!("{} - {}", line, hint),
                None => anyhow::anyhow!(line),
            }
        }
    }
}
