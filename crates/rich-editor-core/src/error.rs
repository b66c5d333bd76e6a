use crate::selection::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors reported by a [`ContentConverter`](crate::ContentConverter).
pub enum ConverterError {
    #[error("node {0:?} does not belong to the conversion root")]
    /// The converter was handed a node it cannot resolve.
    UnknownNode(NodeId),

    #[error("unsupported content: {0}")]
    /// The model or surface holds content the converter cannot express.
    Unsupported(String),

    #[error("{0}")]
    /// Any other collaborator failure.
    Other(String),
}

#[derive(Debug, Error)]
/// Errors produced by the synchronization core.
pub enum EditorError {
    #[error("content conversion failed: {0}")]
    /// A structural converter failed. Propagated unmodified.
    Converter(#[from] ConverterError),

    #[error("invalid editor options: {0}")]
    /// Editor options could not be parsed.
    Options(#[from] serde_json::Error),
}
