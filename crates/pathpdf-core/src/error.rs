use thiserror::Error;

/// Failures at the tree input boundary. Minor malformation is repaired in
/// place and never surfaces here.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Roadmap response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid roadmap data structure: {0}")]
    InvalidStructure(String),
}
