pub mod github_api;

pub use github_api::{CachingMetadataStore, GitHubClient};
