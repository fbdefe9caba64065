//! Development smoke tool: open the store, optionally seed it, sign in as a
//! demo user and log what the UI would show. Not a UI.

use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_app::{App, AppConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agora_store=debug,agora_app=debug")),
        )
        .init();

    info!("Starting agora demo v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    info!(?config, "Loaded configuration");

    let mut app = App::open_with(&config)?;

    if config.seed_demo {
        let stats = app.seed_demo_data()?;
        info!(?stats, "Seed pass finished");
    }

    // Sign in as the first known user, or create a scratch account.
    let users = app.store().list_users()?;
    let username = users
        .last()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "demo".to_string());
    let me = app.login(&username)?;
    info!(username = %me.username, user = %me.id, "Signed in");

    let communities = app.store().list_communities_for_user(me.id)?;
    info!(count = communities.len(), "Communities joined");

    let feed = app.home_feed()?;
    info!(posts = feed.len(), "Home feed loaded");
    if let Some(item) = feed.first() {
        info!(
            author = %item.author.display_name,
            community = %item.community.name,
            likes = item.post.like_count,
            comments = item.post.comment_count,
            "Latest post"
        );
    }

    let previews = app.conversation_previews()?;
    let unread: i64 = previews.iter().map(|p| p.unread_count).sum();
    info!(
        conversations = previews.len(),
        unread, "Inbox loaded"
    );
    for preview in &previews {
        let with = preview
            .others
            .iter()
            .map(|u| u.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let line = preview
            .last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("(no messages)");
        info!(with = %with, last = %line, unread = preview.unread_count, "Conversation");
    }

    Ok(())
}
