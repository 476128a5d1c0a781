use std::ops::{Deref, DerefMut};

use crate::errors::Result;
use crate::rans::bitstream::RansBitstream;
use crate::rans::freq_table::FrequencyTable;
use crate::traits::StateWord;
use crate::Freq;

/// One rANS coder state.
///
/// Abstractly this is an arbitrary-precision natural number that is always at
/// least `2^(B/2)`: information is pushed onto it like a stack, by uniform
/// bits or by symbols under a quantized distribution, and popped back off in
/// reverse order. The top digits live in a `B`-bit machine word; whenever a
/// push would overflow, the bottom half-word is offloaded to a
/// [`RansBitstream`], and whenever a pop drops the word below the threshold
/// it is refilled from the same stream.
///
/// Every operation restores the invariant `x >= 2^(B/2)` before returning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RansState<B: StateWord> {
    x: B,
}

impl<B: StateWord> RansState<B> {
    /// A fresh state sitting exactly on the normalization threshold.
    pub fn new() -> Self {
        Self {
            x: B::ONE << B::REFILL_SHIFT,
        }
    }

    /// Wraps an already-valid state value, e.g. one reconstructed from
    /// stream words.
    pub fn from_raw(x: B) -> Self {
        Self { x }
    }

    /// The raw state value.
    #[inline(always)]
    pub fn raw(&self) -> B {
        self.x
    }

    #[inline(always)]
    fn threshold() -> B {
        B::ONE << B::REFILL_SHIFT
    }

    /// Pushes the low `nbits` of `sym` onto the state.
    #[inline(always)]
    pub fn push_bits<S>(
        &mut self,
        stream: &mut RansBitstream<S>,
        sym: B,
        nbits: usize,
    ) -> Result<()>
    where
        S: DerefMut<Target = [B::Stream]>,
    {
        let occupied = !(!B::ZERO >> nbits);
        if self.x & occupied != B::ZERO {
            self.offload(stream)?;
        }
        self.x = (self.x << nbits) | (sym & ((B::ONE << nbits) - B::ONE));
        Ok(())
    }

    /// Pops `nbits` uniform bits off the state. `nbits` must be smaller than
    /// the half-state width so a single refill word can restore the invariant.
    #[inline(always)]
    pub fn pop_bits<S>(&mut self, stream: &mut RansBitstream<S>, nbits: usize) -> Result<B>
    where
        S: Deref<Target = [B::Stream]>,
    {
        debug_assert!(nbits < B::REFILL_SHIFT);
        let sym = self.x & ((B::ONE << nbits) - B::ONE);
        self.x = self.x >> nbits;
        self.maybe_refill(stream)?;
        Ok(sym)
    }

    /// Pushes `symbol` onto the state under the distribution `cdf`.
    #[inline(always)]
    pub fn push_cdf<S, const VOCAB: usize, const F_BITS: usize, const L_BITS: usize>(
        &mut self,
        stream: &mut RansBitstream<S>,
        symbol: usize,
        cdf: &FrequencyTable<VOCAB, F_BITS, L_BITS>,
    ) -> Result<()>
    where
        S: DerefMut<Target = [B::Stream]>,
    {
        self.push_range(stream, cdf.frequency(symbol), cdf.sum_below(symbol), F_BITS)
    }

    /// The primitive behind [`push_cdf`](Self::push_cdf): pushes a symbol
    /// described only by its frequency and cumulated frequency under an
    /// `f_bits`-wide distribution. Lets an encoder code against a snapshot of
    /// an adaptive distribution that has since moved on.
    #[inline(always)]
    pub fn push_range<S>(
        &mut self,
        stream: &mut RansBitstream<S>,
        freq: Freq,
        start: Freq,
        f_bits: usize,
    ) -> Result<()>
    where
        S: DerefMut<Target = [B::Stream]>,
    {
        let freq = B::from_usize(freq as usize);
        let occupied = !(!B::ZERO >> f_bits);
        if (self.x / freq) & occupied != B::ZERO {
            self.offload(stream)?;
        }
        self.x = ((self.x / freq) << f_bits) + (self.x % freq) + B::from_usize(start as usize);
        Ok(())
    }

    /// Pops one symbol off the state under the distribution `cdf`. The
    /// distribution's `F_BITS` must be smaller than the half-state width.
    #[inline(always)]
    pub fn pop_cdf<S, const VOCAB: usize, const F_BITS: usize, const L_BITS: usize>(
        &mut self,
        stream: &mut RansBitstream<S>,
        cdf: &FrequencyTable<VOCAB, F_BITS, L_BITS>,
    ) -> Result<usize>
    where
        S: Deref<Target = [B::Stream]>,
    {
        debug_assert!(F_BITS < B::REFILL_SHIFT);
        let code = (self.x & ((B::ONE << F_BITS) - B::ONE)).to_usize();
        let symbol = cdf.find_symbol(code);
        let freq = B::from_usize(cdf.frequency(symbol) as usize);
        // code >= sum_below(symbol) by construction of find_symbol; taking
        // the difference first keeps the sum inside the state width.
        let within_range = B::from_usize(code - cdf.sum_below(symbol) as usize);
        self.x = (self.x >> F_BITS) * freq + within_range;
        self.maybe_refill(stream)?;
        Ok(symbol)
    }

    /// Refills the state from the stream until it is back above the
    /// normalization threshold.
    #[inline(always)]
    pub fn maybe_refill<S>(&mut self, stream: &mut RansBitstream<S>) -> Result<()>
    where
        S: Deref<Target = [B::Stream]>,
    {
        while self.x < Self::threshold() {
            self.x = (self.x << B::REFILL_SHIFT) | B::from_stream(stream.pop()?);
        }
        Ok(())
    }

    /// Streams out the bottom half-word of the state.
    #[inline(always)]
    pub fn offload<S>(&mut self, stream: &mut RansBitstream<S>) -> Result<()>
    where
        S: DerefMut<Target = [B::Stream]>,
    {
        stream.push((self.x & (Self::threshold() - B::ONE)).to_stream())?;
        self.x = self.x >> B::REFILL_SHIFT;
        Ok(())
    }
}

impl<B: StateWord> Default for RansState<B> {
    fn default() -> Self {
        Self::new()
    }
}
