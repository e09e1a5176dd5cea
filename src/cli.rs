use clap::{Parser, Subcommand};
use std::path::PathBuf;

use techfeed::types::SortKey;

/// Terminal client for a TechFeed backend
#[derive(Parser)]
#[command(name = "techfeed")]
#[command(about = "Browse, search and curate TechFeed content from the terminal", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and print the tokens to export
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Trade a refresh token for a new access token
    Refresh {
        /// Defaults to TECHFEED_REFRESH_TOKEN
        token: Option<String>,
    },
    /// Show the home feed
    Feed {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, default_value = "recent")]
        sort: SortKey,
        /// Also fetch the next N pages
        #[arg(long, default_value_t = 0)]
        more: u32,
    },
    /// Search and filter the catalogue
    Explore {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        difficulty: Option<String>,
        /// Keep items carrying any of these tags
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Show one article and related items
    Article { id: u64 },
    /// Toggle like on an article
    Like { id: u64 },
    /// Toggle favorite on an article
    Save { id: u64 },
    /// Reading history and liked items
    History {
        #[arg(long, value_parser = ["all", "views", "likes", "favorites"], default_value = "all")]
        show: String,
        /// Also fetch the next N pages of history
        #[arg(long, default_value_t = 0)]
        more: u32,
    },
    /// Show or edit the signed-in profile
    Profile {
        #[arg(long)]
        rename: Option<String>,
        /// Replace preferred categories (comma separated)
        #[arg(long, value_delimiter = ',')]
        preferences: Option<Vec<String>>,
    },
    /// Administration
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Dashboard counters
    Stats,
    /// List contents
    Contents {
        #[arg(long, value_parser = ["published", "draft", "featured"])]
        status: Option<String>,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List users
    Users {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Toggle the published flag of a content
    Publish { id: u64 },
    /// Toggle the featured flag of a content
    Feature { id: u64 },
    /// Toggle whether a user account is active
    Activate { id: u64 },
    /// Delete a content
    Delete {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
