//! Login, logout, signup and status commands.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use agora::forum::Forum;
use agora::views::forms::{LoginForm, SignupForm};
use agora::views::render;

/// `agora login`
pub async fn login(forum: &Forum, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password")?,
    };
    let user_id = forum
        .log_in(&LoginForm::new(username, password))
        .await
        .map_err(|e| super::report(e, None))?;
    println!("Logged in as user {}", user_id);
    Ok(())
}

/// `agora logout`
pub async fn logout(forum: &Forum) -> Result<()> {
    forum.log_out().await;
    println!("Logged out");
    Ok(())
}

/// `agora signup`
pub async fn signup(
    forum: &Forum,
    username: String,
    email: String,
    password: String,
    profile_picture: Option<String>,
    biography: Option<String>,
) -> Result<()> {
    let form = SignupForm {
        username,
        email,
        password,
        profile_picture,
        biography,
    };
    let response = forum
        .sign_up(&form)
        .await
        .map_err(|e| super::report(e, None))?;
    println!(
        "{}",
        response
            .message
            .as_deref()
            .unwrap_or("Account created, you can now log in")
    );
    Ok(())
}

/// `agora status`
pub async fn status(forum: &Forum) -> Result<()> {
    println!("{}", render::nav_bar(&forum.session().current()));
    println!();
    println!("API:     {}", forum.client().base_url());
    if let Some(path) = forum.session().path() {
        println!("Session: {}", path.display());
    }

    forum
        .client()
        .ping()
        .await
        .with_context(|| format!("API at {} is not reachable", forum.client().base_url()))?;
    println!("Status:  reachable");
    Ok(())
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
