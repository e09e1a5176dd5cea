mod cli;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{AdminCommands, Cli, Commands};
use techfeed::prelude::*;
use techfeed::types::ContentStatus;

/// Asks on the terminal before destructive actions.
struct Prompt;

#[async_trait]
impl Confirm for Prompt {
    async fn confirm(&self, message: &str) -> bool {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            eprint!("{message} [y/N] ");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).is_ok() && matches!(line.trim(), "y" | "Y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

fn print_items(items: &[ContentItem]) {
    if items.is_empty() {
        println!("(nothing to show)");
    }
    for c in items {
        let level = c.difficulty_level.as_ref().map(|d| d.to_string()).unwrap_or_default();
        println!("#{:<5} {:<10} {:<12} ♥{:<4} {}", c.id, c.category, level, c.like_count, c.title);
    }
}

async fn read_password() -> Result<String> {
    tokio::task::spawn_blocking(|| -> Result<String> {
        eprint!("password: ");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    })
    .await?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("techfeed=info")))
        .with_writer(std::io::stderr)
        .init();

    // backend failures are shown with the backend's own wording
    run(cli).await.map_err(|e| match e.downcast_ref::<ClientError>().map(ClientError::display_message) {
        Some(message) => anyhow::anyhow!(message),
        None => e,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let app = TechFeed::connect(cli.config.as_deref(), Arc::new(EnvToken)).await?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password().await?,
            };
            let session = app.client().login(&email, &password).await?;
            eprintln!("signed in as {} <{}>", session.user.name, session.user.email.as_deref().unwrap_or("-"));
            println!("export TECHFEED_TOKEN={}", session.access_token);
            println!("export TECHFEED_REFRESH_TOKEN={}", session.refresh_token);
        }
        Commands::Refresh { token } => {
            let token = token
                .or_else(|| std::env::var("TECHFEED_REFRESH_TOKEN").ok())
                .context("no refresh token given and TECHFEED_REFRESH_TOKEN is unset")?;
            println!("export TECHFEED_TOKEN={}", app.client().refresh(&token).await?);
        }
        Commands::Feed { category, sort, more } => {
            let feed = app.feed_for_viewer().await;
            {
                let mut s = techfeed::store::lock(feed.store());
                s.filters.category = category.map(Category::from);
                s.filters.sort = sort;
            }
            feed.load().await?;
            for _ in 0..more {
                if feed.load_more().await? == 0 { break; }
            }
            print_items(&feed.visible());
            let cats = feed.categories();
            if !cats.is_empty() {
                let line: Vec<String> = cats.iter().map(|c| format!("{} ({})", c.name, c.count)).collect();
                println!("-- categories: {}", line.join(", "));
            }
        }
        Commands::Explore { search, category, difficulty, tag } => {
            let page = app.explore();
            {
                let mut s = techfeed::store::lock(page.store());
                s.filters.search = search.unwrap_or_default();
                s.filters.category = category.map(Category::from);
                s.filters.difficulty = difficulty.map(Difficulty::from);
            }
            page.open().await?;
            for t in &tag { page.toggle_tag(t); }
            print_items(&page.visible());
            println!("-- tags: {}", page.available_tags().join(", "));
        }
        Commands::Article { id } => {
            let page = app.article();
            let article = page.open(id).await?;
            println!("{}\n{}", article.title, "=".repeat(article.title.chars().count()));
            if let Some(author) = &article.author { println!("by {author}"); }
            println!("{} · {} views · {} likes{}", article.category, article.view_count, article.like_count, if page.is_liked() { " (liked)" } else { "" });
            if let Some(body) = article.body.as_deref().or(article.excerpt.as_deref()) { println!("\n{body}\n"); }
            let related = page.related();
            if !related.is_empty() {
                println!("Related:");
                print_items(&related);
            }
        }
        Commands::Like { id } => {
            let page = app.article();
            page.open(id).await?;
            let now = page.toggle_like().await?;
            let count = page.article().map(|a| a.like_count).unwrap_or_default();
            println!("#{id} liked: {now} ({count} likes)");
        }
        Commands::Save { id } => {
            let page = app.article();
            page.open(id).await?;
            println!("#{id} saved: {}", page.toggle_save().await?);
        }
        Commands::History { show, more } => {
            let page = app.history();
            page.load().await?;
            for _ in 0..more {
                if page.load_more().await? == 0 { break; }
            }
            let filter = match show.as_str() {
                "views" => HistoryFilter::Views,
                "likes" => HistoryFilter::Likes,
                "favorites" => HistoryFilter::Favorites,
                _ => HistoryFilter::All,
            };
            print_items(&page.view(filter));
            let st = page.stats();
            println!("-- {} viewed · {} liked · {} favorites", st.views, st.likes, st.favorites);
        }
        Commands::Profile { rename, preferences } => {
            let page = app.profile();
            let mut user = page.load().await?;
            if let Some(name) = rename { user = page.rename(&name).await?; }
            if let Some(prefs) = preferences {
                for c in page.draft_preferences() { page.toggle_preference(c); }
                for p in prefs { page.toggle_preference(Category::from(p)); }
                user = page.update_preferences().await?;
            }
            println!("{} <{}>{}", user.name, user.email.as_deref().unwrap_or("-"), if user.is_admin { " [admin]" } else { "" });
            let prefs: Vec<String> = user.preferences.iter().map(|c| c.to_string()).collect();
            println!("preferences: {}", prefs.join(", "));
            println!("recently liked:");
            print_items(&page.liked_preview());
        }
        Commands::Admin { command } => admin(&app, command).await?,
    }
    Ok(())
}

fn parse_status(status: Option<&str>) -> Option<ContentStatus> {
    status.map(|s| match s {
        "published" => ContentStatus::Published,
        "draft" => ContentStatus::Draft,
        _ => ContentStatus::Featured,
    })
}

async fn admin(app: &TechFeed, command: AdminCommands) -> Result<()> {
    let page = app.admin();
    match &command {
        AdminCommands::Contents { status, search } => page.set_content_filter(parse_status(status.as_deref()), search.as_deref().unwrap_or("")),
        AdminCommands::Users { search: Some(term) } => page.set_user_search(term),
        _ => {}
    }
    page.open().await.context("opening admin dashboard")?;
    match command {
        AdminCommands::Stats => {
            let s = page.stats().context("statistics unavailable")?;
            println!("users      {} ({} active, {} admins)", s.users.total, s.users.active, s.users.admins);
            println!("contents   {} ({} published, {} featured)", s.contents.total, s.contents.published, s.contents.featured);
            println!("interactions {} ({} likes, {} views)", s.interactions.total, s.interactions.likes, s.interactions.views);
            for c in &s.categories {
                println!("  {:<12} {:>4} items {:>7} views", c.name, c.content_count, c.total_views);
            }
        }
        AdminCommands::Contents { .. } => {
            let s = techfeed::store::lock(page.contents());
            for c in s.items() {
                let published = match c.is_published {
                    Some(true) => "P",
                    Some(false) => "-",
                    None => "?",
                };
                println!("#{:<5} {}{} {:<10} {}", c.id, published, if c.is_featured { "F" } else { "-" }, c.category, c.title);
            }
        }
        AdminCommands::Users { .. } => {
            let s = techfeed::store::lock(page.users());
            for u in s.items() {
                let role = if u.is_admin { "admin" } else { "user" };
                let state = if u.is_active { "active" } else { "disabled" };
                println!("#{:<5} {:<6} {:<8} {} <{}>", u.id, role, state, u.name, u.email.as_deref().unwrap_or("-"));
            }
        }
        AdminCommands::Publish { id } => {
            let c = page.toggle_publish(id).await?;
            println!("#{id} published: {}", c.published());
        }
        AdminCommands::Feature { id } => {
            let c = page.toggle_feature(id).await?;
            println!("#{id} featured: {}", c.is_featured);
        }
        AdminCommands::Activate { id } => {
            let u = page.toggle_user_active(id).await?;
            println!("user #{id} active: {}", u.is_active);
        }
        AdminCommands::Delete { id, yes } => {
            let deleted = if yes { page.delete_content(id, &AutoConfirm(true)).await? } else { page.delete_content(id, &Prompt).await? };
            println!("{}", if deleted { format!("#{id} deleted") } else { "cancelled".to_string() });
        }
    }
    Ok(())
}
