//! The BitKnit2 format layer: the per-quantum decode driver, the
//! register-packed offset cache, and the mirror-image reference encoder.

pub mod decoder;
pub mod encoder;
pub mod offset_cache;

use crate::rans::DeferredAdaptiveModel;

pub use decoder::{decode, BitKnit2Decoder};
pub use encoder::{encode, BitKnit2Encoder};
pub use offset_cache::OffsetCache;

/// Every BitKnit2 stream starts with this word.
pub const MAGIC: u16 = 0x75B1;

/// Output window across which the rANS state pair is reset. Models, offset
/// cache and delta offset persist across quanta.
pub const QUANTUM_SIZE: usize = 1 << 16;

/// Command-word model: 256 delta literals, 32 direct copy lengths and 12
/// extended-length bit counts, the last 36 symbols pinned at minimum mass.
/// One per output-position residue class.
pub type CommandModel = DeferredAdaptiveModel<1024, 300, 36, 15, 10>;

/// Cache-reference model: 8 cache ranks plus 32 low-offset residuals.
/// One per output-position residue class.
pub type CacheRefModel = DeferredAdaptiveModel<1024, 40, 0, 15, 10>;

/// Bit-count model for copy offsets coded outside the cache.
pub type OffsetLenModel = DeferredAdaptiveModel<1024, 21, 0, 15, 10>;
