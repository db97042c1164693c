use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("Invalid hex identifier: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid identifier length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid key bytes")]
    InvalidKeyBytes,

    #[error("Event id does not match its contents")]
    IdMismatch,

    #[error("Invalid event signature")]
    BadSignature,
}
