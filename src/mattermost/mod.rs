//! All Mattermost-specific functionality

pub mod client;

pub use client::MattermostClient;
