pub mod client;
pub mod config;

pub use client::GitHubClient;
pub use config::GitHubConfig;
