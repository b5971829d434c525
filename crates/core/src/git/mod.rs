//! Git operations for gitnotes.

pub mod client;
pub mod credentials;

pub use client::GitClient;
pub use credentials::SshCredentials;
