use thiserror::Error;

/// All the ways a fetch request can go wrong
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    /// Input never made it past validation; no network work was started.
    /// Carries one human-readable message per problem, in input order.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("API request failed: {0}")]
    Api(#[from] gitpulse_api::GitHubError),

    #[error("storage operation failed: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
