use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot does not start with the '{expected}' tag")]
    MissingTag { expected: &'static str },

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unterminated varint starting at byte {offset}")]
    UnterminatedVarint { offset: usize },

    #[error("Varint starting at byte {offset} does not fit in 32 bits")]
    VarintOverflow { offset: usize },

    #[error("Invalid dictionary code {code} at position {position} (next code is {next})")]
    InvalidCode { code: u32, position: usize, next: u32 },

    #[error("Invalid snapshot payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
