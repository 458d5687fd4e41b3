use thiserror::Error;

/// Failures raised by the attack itself, independent of the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("block size must be between 1 and 255, got {0}")]
    InvalidBlockSize(usize),

    #[error(
        "ciphertext of {length} bytes is not a whole number of blocks of {block_size} bytes \
         spanning at least two blocks"
    )]
    InvalidCiphertextLength { length: usize, block_size: usize },

    /// `block` counts from the end of the ciphertext, starting at 1.
    #[error("no valid padding found for block {block} at padding length {length}")]
    NoValidPadding { block: usize, length: usize },

    /// The oracle accepted a sequence of queries that decodes to a final block
    /// without valid padding, so it contradicted itself.
    #[error("decrypted block {block} does not carry valid padding")]
    DecodedPaddingInvalid { block: usize },
}

/// The error type returned by the attack drivers, generic over the oracle's
/// own error.
#[derive(Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("padding oracle failed")]
    Oracle(#[source] E),
}

impl<E> Error<E> {
    /// Whether a different reading of the final padding byte might succeed.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Decode(DecodeError::NoValidPadding { .. }))
    }
}
