//! The rANS building blocks: a LIFO word stream, quantized frequency tables,
//! deferred adaptive models, and the coder state itself.

pub mod bitstream;
pub mod freq_table;
pub mod model;
pub mod state;

pub use bitstream::RansBitstream;
pub use freq_table::FrequencyTable;
pub use model::DeferredAdaptiveModel;
pub use state::RansState;
