use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while decoding a BitKnit2 payload.
///
/// The first three variants are input-shape errors detected up front or at
/// stream boundaries; the rest signal that the compressed words are malformed
/// or were mismatched to the expected output length. None of them are
/// recoverable: the decoder stops at the failure point and the content of the
/// output buffer up to it is unspecified.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The stream does not start with the BitKnit2 magic word.
    #[error("bad magic word: expected 0x75b1, found {found:#06x}")]
    BadMagic { found: u16 },

    /// The stream ran out of words before the output was filled.
    #[error("compressed stream ended before the output was filled")]
    Truncated,

    /// A rANS state did not land on its normalization interval lower bound
    /// at the end of a quantum.
    #[error("rANS stream corrupted: state mismatch at quantum end")]
    StreamCorrupt,

    /// A back-reference pointed before the start of the output, or its
    /// length overran the end of the output.
    #[error("invalid copy: offset {offset}, length {length} at output position {position}")]
    InvalidCopy {
        offset: usize,
        length: usize,
        position: usize,
    },

    /// A push was attempted on a full bitstream.
    #[error("bitstream overflow")]
    BufferOverflow,

    /// A pop was attempted on an exhausted bitstream.
    #[error("unexpected end of bitstream")]
    BufferUnderflow,

    /// Reserved for stream features the decoder does not implement, such as
    /// big-endian source words.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
}
