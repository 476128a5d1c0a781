//! Decoder for **BitKnit2**, the entropy-coded LZ compression format used by
//! granny-style binary asset containers.
//!
//! BitKnit2 interleaves two rANS coder states over a single stream of 16-bit
//! words and layers an LZ77 back-reference scheme on top: literals are coded
//! as deltas against the byte one match offset back, copy offsets run through
//! an 8-entry register-packed LRU cache, and all symbols are driven by
//! position-keyed adaptive probability models. The decoder here reproduces
//! that pipeline bit-exactly; a mirror-image reference encoder closes the
//! round trip for testing.
//!
//! The whole crate is pure in-memory transformation: the caller hands in the
//! compressed words and the known uncompressed length, and gets the bytes
//! back.
//!
//! ```
//! let compressed = [0x75B1, 0x0000, 0xADDE, 0xEFBE];
//! let payload = bitknit2::decode(&compressed, 4)?;
//! assert_eq!(payload, [0xDE, 0xAD, 0xBE, 0xEF]);
//! # Ok::<(), bitknit2::Error>(())
//! ```
//!
//! References:
//! Jarek Duda, "Asymmetric numeral systems", <https://arxiv.org/abs/1311.2540>;
//! Fabian Giesen, "Interleaved entropy coders", <https://arxiv.org/abs/1402.3392>
//! and <https://fgiesen.wordpress.com/2023/05/06/a-very-brief-bitknit-retrospective/>.

pub mod bitknit;
pub mod errors;
pub mod rans;
pub mod traits;

pub use bitknit::{decode, encode, BitKnit2Decoder, BitKnit2Encoder};
pub use errors::{Error, Result};

/// The type frequencies and cumulated frequencies are stored as. Frequency
/// tables are bounded to 15 frequency bits so that a symbol's frequency and
/// its prefix sum always fit 16-bit unsigned entries.
pub type Freq = u16;
