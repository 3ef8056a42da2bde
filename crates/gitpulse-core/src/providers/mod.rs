// Source implementations backed by the real API clients
pub mod github;

pub use github::GitHubActivityProvider;
