use std::num::ParseIntError;
use thiserror::Error;

/// Errors surfaced by the encoder and its collaborators.
#[derive(Error, Debug)]
pub enum VdkError {
    /// The sink could not be opened, written or flushed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A sequence parameter set failed to decode.
    #[error("parameter set error: {0}")]
    ParameterSet(String),

    /// Annex-B packing or DTS extraction failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The container muxer rejected a packet.
    #[error("mux error: {0}")]
    Mux(String),

    /// The caller violated an input precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The encoder was used after `close`.
    #[error("encoder is closed")]
    Closed,

    /// Malformed bitstream or transport stream data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    #[allow(missing_docs)]
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VdkError>;
