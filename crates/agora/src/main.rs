mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use agora::api::{CategoryId, CommentId, PostId, UserId};
use agora::config::DEFAULT_CONFIG_FILE;

// ============================================================================
// CLI Types
// ============================================================================

/// Agora - command-line client for a discussion forum
#[derive(Parser, Debug)]
#[command(version = agora::build_info::VERSION, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: String,

    /// Forum API base URL (overrides config file)
    #[arg(long, env = "AGORA_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List posts
    Posts {
        /// Only posts written by this user
        #[arg(long, conflicts_with = "category")]
        user: Option<UserId>,

        /// Only posts in this category
        #[arg(long)]
        category: Option<CategoryId>,
    },

    /// Show, create, edit or delete a post
    Post {
        #[command(subcommand)]
        action: PostAction,
    },

    /// Add, edit or delete a comment
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear the stored session
    Logout,

    /// Create an account
    Signup {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Profile picture URL
        #[arg(long)]
        picture: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },

    /// Show login state and check the API is reachable
    Status,
}

#[derive(Subcommand, Debug)]
enum PostAction {
    /// Show a post and its comments
    Show { id: PostId },

    /// Create a post
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        category: Option<CategoryId>,

        /// Additional notes shown under the post
        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit one of your posts
    Edit {
        id: PostId,

        #[arg(short, long)]
        title: String,

        #[arg(long)]
        content: String,
    },

    /// Delete one of your posts
    Delete { id: PostId },
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    /// Comment on a post
    Add {
        post_id: PostId,

        #[arg(long)]
        content: String,
    },

    /// Edit one of your comments
    Edit {
        post_id: PostId,
        comment_id: CommentId,

        #[arg(long)]
        content: String,
    },

    /// Delete one of your comments
    Delete {
        post_id: PostId,
        comment_id: CommentId,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let forum = commands::connect(&cli.config, cli.api_url.as_deref()).await?;

    match cli.command {
        Commands::Posts { user, category } => commands::posts::list(&forum, user, category).await,
        Commands::Post { action } => match action {
            PostAction::Show { id } => commands::posts::show(&forum, id).await,
            PostAction::Create {
                title,
                content,
                category,
                notes,
            } => commands::posts::create(&forum, title, content, category, notes).await,
            PostAction::Edit { id, title, content } => {
                commands::posts::edit(&forum, id, title, content).await
            }
            PostAction::Delete { id } => commands::posts::delete(&forum, id).await,
        },
        Commands::Comment { action } => match action {
            CommentAction::Add { post_id, content } => {
                commands::comments::add(&forum, post_id, content).await
            }
            CommentAction::Edit {
                post_id,
                comment_id,
                content,
            } => commands::comments::edit(&forum, post_id, comment_id, content).await,
            CommentAction::Delete {
                post_id,
                comment_id,
            } => commands::comments::delete(&forum, post_id, comment_id).await,
        },
        Commands::Login { username, password } => {
            commands::auth::login(&forum, username, password).await
        }
        Commands::Logout => commands::auth::logout(&forum).await,
        Commands::Signup {
            username,
            email,
            password,
            picture,
            bio,
        } => commands::auth::signup(&forum, username, email, password, picture, bio).await,
        Commands::Status => commands::auth::status(&forum).await,
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
