//! # agora-app
//!
//! Application shell over `agora-store`: session handling (username login,
//! restore, logout), profile updates, feed and conversation hydration for a
//! UI, demo-data seeding, and environment configuration.

pub mod app;
pub mod auth;
pub mod config;
pub mod feed;
pub mod messaging;
pub mod seed;

mod error;

pub use app::App;
pub use config::AppConfig;
pub use error::AppError;
pub use feed::FeedItem;
pub use messaging::ConversationPreview;
pub use seed::{populate_demo_data, SeedStats};
