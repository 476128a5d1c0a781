use log::{debug, trace};

use crate::bitknit::offset_cache::OffsetCache;
use crate::bitknit::{CacheRefModel, CommandModel, OffsetLenModel, MAGIC, QUANTUM_SIZE};
use crate::errors::{Error, Result};
use crate::rans::{DeferredAdaptiveModel, RansBitstream, RansState};

/// The word stream a decoder reads from.
type Src<'a> = RansBitstream<&'a [u16]>;

/// The two interleaved rANS states driving one quantum.
///
/// Every pop swaps which state is current, so consecutive symbols alternate
/// between the two and their refills interleave in the word stream. The pair
/// is held as an array plus a toggling index; the swap happens after the
/// model observation so each observation is attributed while the state that
/// produced it is still current.
struct StatePair {
    states: [RansState<u32>; 2],
    current: usize,
}

impl StatePair {
    /// Rebuilds the pair from its jointly-packed initial words.
    ///
    /// The packing saves two bytes per quantum by "tying the knot": the two
    /// init words form a merged state whose low 4 bits give the bit position
    /// at which the second state's value was spliced above the first one's.
    /// See <https://fgiesen.wordpress.com/2015/12/21/rans-in-practice/>.
    fn reconstruct(stream: &mut Src<'_>) -> Result<Self> {
        let init_0 = stream.pop()? as u32;
        let init_1 = stream.pop()? as u32;
        let mut merged = RansState::<u32>::from_raw((init_0 << 16) | init_1);
        // The index of the highest set bit of the second state's value.
        let split = merged.pop_bits(stream, 4)? as usize;
        let mut first = RansState::from_raw(merged.raw() >> split);
        first.maybe_refill(stream)?;
        // High bits from the merged state, low bits from the stream; the bits
        // that went to the first state are masked off and the marker bit that
        // keeps the value on its normalization interval is put back.
        let second = RansState::from_raw(
            (((merged.raw() << 16) | stream.pop()? as u32) & ((1 << (16 + split)) - 1))
                | (1 << (16 + split)),
        );
        Ok(Self {
            states: [first, second],
            current: 0,
        })
    }

    #[inline(always)]
    fn current(&mut self) -> &mut RansState<u32> {
        &mut self.states[self.current]
    }

    #[inline(always)]
    fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Both states, regardless of which is current.
    #[inline(always)]
    fn raw(&self) -> (u32, u32) {
        (self.states[0].raw(), self.states[1].raw())
    }
}

/// Decoder for one BitKnit2 payload.
///
/// Owns the nine adaptive models, the offset cache and the delta offset,
/// all of which persist across quanta; the rANS state pair is rebuilt per
/// quantum. A decoder instance decodes exactly one payload — the models it
/// has adapted are not valid for another stream.
pub struct BitKnit2Decoder {
    command_models: [CommandModel; 4],
    cache_ref_models: [CacheRefModel; 4],
    offset_len_model: OffsetLenModel,
    offset_cache: OffsetCache,
    delta_offset: usize,
}

impl BitKnit2Decoder {
    pub fn new() -> Self {
        Self {
            command_models: std::array::from_fn(|_| CommandModel::new()),
            cache_ref_models: std::array::from_fn(|_| CacheRefModel::new()),
            offset_len_model: OffsetLenModel::new(),
            offset_cache: OffsetCache::new(),
            delta_offset: 1,
        }
    }

    /// Decodes `src` into the whole of `dst`.
    ///
    /// The caller knows the uncompressed length from the enclosing container
    /// and must size `dst` to exactly that length. On error the contents of
    /// `dst` are unspecified up to the failure point.
    pub fn decode_into(mut self, dst: &mut [u8], src: &[u16]) -> Result<()> {
        let mut stream = Src::reader(src);
        if stream.remaining() > 0 {
            let magic = stream.pop()?;
            if magic != MAGIC {
                return Err(Error::BadMagic { found: magic });
            }
        }
        debug!(
            "decoding {} bytes from {} compressed words",
            dst.len(),
            src.len()
        );
        let mut pos = 0;
        while pos < dst.len() {
            if stream.remaining() == 0 {
                return Err(Error::Truncated);
            }
            pos = self.decode_quantum(dst, pos, &mut stream)?;
        }
        Ok(())
    }

    /// Decodes one quantum starting at output position `pos`, returning the
    /// position reached (the quantum boundary, or a little past it when the
    /// last copy overran, or the end of the output).
    fn decode_quantum(&mut self, dst: &mut [u8], mut pos: usize, stream: &mut Src<'_>) -> Result<usize> {
        let boundary = dst.len().min((pos & !(QUANTUM_SIZE - 1)) + QUANTUM_SIZE);
        // A NUL word at the start of a quantum means the bytes were stored
        // uncompressed.
        if stream.peek() == Some(0) {
            stream.advance(1);
            let copy_len = (stream.remaining() * 2).min(boundary - pos);
            trace!("raw quantum at {pos}: {copy_len} bytes");
            let words = stream.remaining_slice();
            for i in 0..copy_len {
                dst[pos + i] = (words[i / 2] >> ((i % 2) * 8)) as u8;
            }
            stream.advance(copy_len / 2);
            return Ok(pos + copy_len);
        }
        trace!("coded quantum at {pos}, boundary {boundary}");
        let mut pair = StatePair::reconstruct(stream)?;
        if pos == 0 {
            // Nothing exists yet for a delta literal to predict from, so the
            // very first byte of the output is coded raw.
            dst[0] = Self::pop_bits(&mut pair, stream, 8)? as u8;
            pos = 1;
        }
        while pos < boundary {
            let command =
                Self::pop_model(&mut pair, stream, &mut self.command_models[pos % 4])?;
            if command < 256 {
                dst[pos] = (command as u8).wrapping_add(dst[pos - self.delta_offset]);
                pos += 1;
            } else {
                pos = self.decode_copy(command, dst, pos, &mut pair, stream)?;
            }
        }
        if pair.raw() != (1 << 16, 1 << 16) {
            return Err(Error::StreamCorrupt);
        }
        Ok(pos)
    }

    /// Decodes the length and offset of one back-reference command and
    /// performs the copy.
    fn decode_copy(
        &mut self,
        command: usize,
        dst: &mut [u8],
        pos: usize,
        pair: &mut StatePair,
        stream: &mut Src<'_>,
    ) -> Result<usize> {
        let model_index = pos % 4;
        let copy_length = if command < 288 {
            // The minimum copy length is 2, so this variant spans 2..=33.
            command - 254
        } else {
            // The command carries the bit count of the extension; lengths
            // start at 34 = (1 << 1) + 0 + 32.
            let nbits = command - 287;
            let extra = Self::pop_bits(pair, stream, nbits)? as usize;
            (1 << nbits) + extra + 32
        };
        let cache_ref = Self::pop_model(pair, stream, &mut self.cache_ref_models[model_index])?;
        let copy_offset = if cache_ref < 8 {
            self.offset_cache.hit(cache_ref) as usize
        } else {
            let nbits = Self::pop_model(pair, stream, &mut self.offset_len_model)?;
            let mut bits = Self::pop_bits(pair, stream, nbits % 16)?;
            if nbits >= 16 {
                // Offsets too wide for the state pair spill a whole word
                // straight from the stream.
                bits = (bits << 16) | stream.pop()? as u32;
            }
            // Reduced by 32 because 32 << 0 == 32: this way a cache_ref of 8
            // with a zero bit count yields a copy offset of 1, and offsets
            // below 32 stay encodable.
            let offset = (32u32 << nbits) + (bits << 5) - 32 + (cache_ref as u32 - 7);
            self.offset_cache.insert(offset);
            offset as usize
        };
        if copy_offset > pos || copy_length > dst.len() - pos {
            return Err(Error::InvalidCopy {
                offset: copy_offset,
                length: copy_length,
                position: pos,
            });
        }
        self.delta_offset = copy_offset;
        // Overlapping copies are legal and load-bearing: a copy may reference
        // bytes it is itself producing, so this must stay a forward byte copy.
        for i in pos..pos + copy_length {
            dst[i] = dst[i - copy_offset];
        }
        Ok(pos + copy_length)
    }

    /// Pops `nbits` uniform bits from the current state and swaps the pair.
    #[inline(always)]
    fn pop_bits(pair: &mut StatePair, stream: &mut Src<'_>, nbits: usize) -> Result<u32> {
        let bits = pair.current().pop_bits(stream, nbits)?;
        pair.swap();
        Ok(bits)
    }

    /// Pops one symbol under `model` from the current state, lets the model
    /// observe it, and swaps the pair.
    #[inline(always)]
    fn pop_model<const VOCAB: usize, const MIN_PROBABLE: usize>(
        pair: &mut StatePair,
        stream: &mut Src<'_>,
        model: &mut DeferredAdaptiveModel<1024, VOCAB, MIN_PROBABLE, 15, 10>,
    ) -> Result<usize> {
        let symbol = pair.current().pop_cdf(stream, model.cdf())?;
        model.observe(symbol);
        pair.swap();
        Ok(symbol)
    }
}

impl Default for BitKnit2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a BitKnit2 payload of known uncompressed length.
///
/// The first word of `compressed` must be the magic word `0x75B1`; the rest
/// is one or more quanta. Words beyond the last quantum are ignored.
pub fn decode(compressed: &[u16], uncompressed_len: usize) -> Result<Vec<u8>> {
    let mut output = vec![0u8; uncompressed_len];
    BitKnit2Decoder::new().decode_into(&mut output, compressed)?;
    Ok(output)
}
