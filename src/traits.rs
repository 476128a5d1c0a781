use std::fmt::Debug;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Rem, Shl, Shr, Sub};

/// A trait for the unsigned integers a [`RansState`](crate::rans::RansState)
/// can be built on.
///
/// The state is an arbitrary-precision natural number whose top digits are
/// cached in a machine word; everything below is offloaded to a bitstream of
/// half-width words. This trait ties a state width to its stream word type
/// and to the normalization threshold `1 << REFILL_SHIFT` that both the
/// offload and the refill paths pivot on.
pub trait StateWord:
    Copy
    + Ord
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
{
    /// The word type offloaded to and refilled from the bitstream. Always
    /// half the width of `Self`.
    type Stream: Copy + Eq + Debug;

    /// Half the width of `Self` in bits. The state is kept `>= 1 << REFILL_SHIFT`
    /// between operations.
    const REFILL_SHIFT: usize;

    const ZERO: Self;
    const ONE: Self;

    /// Widens a stream word into a state word.
    fn from_stream(word: Self::Stream) -> Self;

    /// Truncates the state to its low half, the part offloaded to the stream.
    fn to_stream(self) -> Self::Stream;

    fn from_usize(value: usize) -> Self;

    fn to_usize(self) -> usize;
}

impl StateWord for u32 {
    type Stream = u16;
    const REFILL_SHIFT: usize = 16;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    #[inline(always)]
    fn from_stream(word: u16) -> Self {
        word as u32
    }

    #[inline(always)]
    fn to_stream(self) -> u16 {
        self as u16
    }

    #[inline(always)]
    fn from_usize(value: usize) -> Self {
        value as u32
    }

    #[inline(always)]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl StateWord for u64 {
    type Stream = u32;
    const REFILL_SHIFT: usize = 32;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    #[inline(always)]
    fn from_stream(word: u32) -> Self {
        word as u64
    }

    #[inline(always)]
    fn to_stream(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    fn from_usize(value: usize) -> Self {
        value as u64
    }

    #[inline(always)]
    fn to_usize(self) -> usize {
        self as usize
    }
}
