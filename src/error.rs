use thiserror::Error;

/// Failures raised while turning visualization input into a drawable diagram.
///
/// Malformed legacy lines are deliberately absent: the text parser drops them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VizError {
    #[error("invalid visualization format: {0}")]
    InvalidFormat(String),
    #[error("edge {edge} references undefined node `{id}`")]
    UnknownNode { edge: usize, id: String },
    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),
    #[error("draw failed: {0}")]
    Draw(String),
}

pub type VizResult<T> = std::result::Result<T, VizError>;
