//! CLI-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Writer count must be between 1 and {max}, got {writers}")]
    InvalidWriterCount { writers: usize, max: usize },

    #[error("Chunk size must be non-zero")]
    ZeroChunk,

    #[error("Span {span} corrupted at byte {offset}: expected {expected:#04x}, found {found:#04x}")]
    TornSpan {
        span: usize,
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("Interrupted")]
    Interrupted,
}
