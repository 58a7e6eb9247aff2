//! Error taxonomy shared by geometry generation, scene construction and rendering.

/// Errors surfaced by the viewer core.
///
/// Every failure is reported to the immediate caller; nothing in the crate retries.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// A generator or constructor was handed a tessellation or dimension it cannot work with.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The scene graph contains a cycle or a node owned by more than one parent.
    #[error("invalid scene graph: {0}")]
    InvalidGraph(String),

    /// A GPU buffer, vertex array or texture could not be allocated.
    #[error("GPU resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A texture asset could not be found or decoded.
    #[error("asset missing: {0}")]
    AssetMissing(String),

    /// The viewer configuration file could not be read.
    #[error("failed to read config: {0}")]
    ConfigRead(#[source] std::io::Error),

    /// The viewer configuration is not valid RON.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
