use std::collections::HashMap;

use log::{debug, trace};

use crate::bitknit::offset_cache::OffsetCache;
use crate::bitknit::{CacheRefModel, CommandModel, OffsetLenModel, MAGIC, QUANTUM_SIZE};
use crate::errors::Result;
use crate::rans::{DeferredAdaptiveModel, RansBitstream, RansState};
use crate::Freq;

/// Longest copy the command vocabulary can express: `(1 << 13) - 1 + 32`.
const MAX_COPY_LENGTH: usize = 8223;

/// Largest offset the 21-symbol bit-count model can express.
const MAX_COPY_OFFSET: usize = (64 << 20) - 32;

/// A new-offset match shorter than this is cheaper as literals.
const MIN_FRESH_MATCH: usize = 4;

/// One thing the decoder will pop, recorded during the forward pass.
///
/// Model-coded symbols are remembered by their range under the distribution
/// the decoder will hold at that point, because the model itself has moved on
/// by the time the backward pass runs.
enum Op {
    Range { freq: Freq, start: Freq },
    Bits { value: u32, nbits: usize },
    Word(u16),
}

/// Reference encoder producing streams for [`decode`](crate::decode).
///
/// It mirrors the decoder exactly — same models, same observation order, same
/// interleaved state pair — but is tuned for clarity over ratio: the parse is
/// a greedy longest-match search over a rolling 4-byte index, the cached
/// offsets and the current delta offset. It exists to close the round trip
/// for testing and is not expected to match the producer's output word for
/// word.
pub struct BitKnit2Encoder {
    command_models: [CommandModel; 4],
    cache_ref_models: [CacheRefModel; 4],
    offset_len_model: OffsetLenModel,
    offset_cache: OffsetCache,
    delta_offset: usize,
    /// Most recent position of every 4-byte window seen so far.
    match_index: HashMap<[u8; 4], usize>,
}

impl BitKnit2Encoder {
    pub fn new() -> Self {
        Self {
            command_models: std::array::from_fn(|_| CommandModel::new()),
            cache_ref_models: std::array::from_fn(|_| CacheRefModel::new()),
            offset_len_model: OffsetLenModel::new(),
            offset_cache: OffsetCache::new(),
            delta_offset: 1,
            match_index: HashMap::new(),
        }
    }

    /// Encodes `payload` into a word stream that decodes back to it.
    pub fn encode(mut self, payload: &[u8]) -> Result<Vec<u16>> {
        let mut out = vec![MAGIC];
        let mut pos = 0;
        while pos < payload.len() {
            let boundary = payload
                .len()
                .min((pos & !(QUANTUM_SIZE - 1)) + QUANTUM_SIZE);
            pos = self.encode_quantum(payload, pos, boundary, &mut out)?;
        }
        debug!(
            "encoded {} bytes into {} compressed words",
            payload.len(),
            out.len()
        );
        Ok(out)
    }

    /// Encodes the bytes `[pos, boundary)` as one quantum, appending its
    /// words to `out`, and returns `boundary`.
    ///
    /// The quantum is first coded through the models; if that comes out
    /// larger than storing the bytes raw, the model, cache and delta state
    /// mutated by the trial are rolled back and a raw quantum is emitted
    /// instead, so the encoder keeps tracking what the decoder will see.
    fn encode_quantum(
        &mut self,
        payload: &[u8],
        pos: usize,
        boundary: usize,
        out: &mut Vec<u16>,
    ) -> Result<usize> {
        let chunk = boundary - pos;
        let rollback = (
            self.command_models.clone(),
            self.cache_ref_models.clone(),
            self.offset_len_model.clone(),
            self.offset_cache.clone(),
            self.delta_offset,
        );

        let ops = self.parse_quantum(payload, pos, boundary);
        let words = Self::code_ops(&ops, chunk)?;

        // A stored quantum costs one marker word plus the packed bytes.
        if words.len() > chunk.div_ceil(2) + 1 {
            trace!(
                "raw quantum at {pos}: coded form took {} words for {chunk} bytes",
                words.len()
            );
            (
                self.command_models,
                self.cache_ref_models,
                self.offset_len_model,
                self.offset_cache,
                self.delta_offset,
            ) = rollback;
            out.push(0);
            for bytes in payload[pos..boundary].chunks(2) {
                let high = bytes.get(1).copied().unwrap_or(0);
                out.push(u16::from_le_bytes([bytes[0], high]));
            }
        } else {
            trace!("coded quantum at {pos}: {} words for {chunk} bytes", words.len());
            out.extend_from_slice(&words);
        }
        Ok(boundary)
    }

    /// The forward pass: parses `[pos, boundary)` into the command stream the
    /// decoder will pop, evolving models, cache and delta offset exactly as
    /// the decoder will.
    fn parse_quantum(&mut self, payload: &[u8], mut pos: usize, boundary: usize) -> Vec<Op> {
        let mut ops = Vec::new();
        if pos == 0 {
            // The first output byte has no history to predict from and is
            // coded raw.
            ops.push(Op::Bits {
                value: payload[0] as u32,
                nbits: 8,
            });
            self.index_window(payload, 0);
            pos = 1;
        }
        while pos < boundary {
            match self.find_match(payload, pos, boundary) {
                Some((offset, length)) => {
                    self.record_copy(payload, pos, offset, length, &mut ops);
                    for i in pos..pos + length {
                        self.index_window(payload, i);
                    }
                    pos += length;
                }
                None => {
                    let delta = payload[pos].wrapping_sub(payload[pos - self.delta_offset]);
                    record_model(&mut self.command_models[pos % 4], delta as usize, &mut ops);
                    self.index_window(payload, pos);
                    pos += 1;
                }
            }
        }
        ops
    }

    /// Greedy longest-match search at `pos`. Returns `(offset, length)`.
    ///
    /// Candidates are the eight cached offsets, the current delta offset and
    /// the most recent occurrence of the 4-byte window at `pos`. Cached
    /// offsets are worth taking from length 2; a fresh offset has to pay for
    /// its own coding and only wins from [`MIN_FRESH_MATCH`].
    fn find_match(&self, payload: &[u8], pos: usize, boundary: usize) -> Option<(usize, usize)> {
        let limit = (boundary - pos).min(MAX_COPY_LENGTH);
        let mut best: Option<(usize, usize)> = None;

        let mut consider = |offset: usize, min_length: usize| {
            if offset == 0 || offset > pos || offset > MAX_COPY_OFFSET {
                return;
            }
            let length = match_length(payload, pos, offset, limit);
            if length >= min_length && length > best.map_or(1, |(_, len)| len) {
                best = Some((offset, length));
            }
        };

        for rank in 0..8 {
            consider(self.offset_cache.entry(rank) as usize, 2);
        }
        consider(self.delta_offset, 2);
        if pos + 4 <= payload.len() {
            if let Some(&found) = self.match_index.get(&window(payload, pos)) {
                consider(pos - found, MIN_FRESH_MATCH);
            }
        }
        best
    }

    /// Records one back-reference command, mirroring the decoder's pops.
    fn record_copy(
        &mut self,
        payload: &[u8],
        pos: usize,
        offset: usize,
        length: usize,
        ops: &mut Vec<Op>,
    ) {
        debug_assert!((2..=MAX_COPY_LENGTH).contains(&length));
        debug_assert!(payload[pos..pos + length]
            .iter()
            .zip(pos - offset..)
            .all(|(&byte, from)| byte == payload[from]));

        let model_index = pos % 4;
        if length <= 33 {
            record_model(&mut self.command_models[model_index], length + 254, ops);
        } else {
            let nbits = (length - 32).ilog2() as usize;
            record_model(&mut self.command_models[model_index], 287 + nbits, ops);
            ops.push(Op::Bits {
                value: (length - 32 - (1 << nbits)) as u32,
                nbits,
            });
        }

        match (0..8).find(|&rank| self.offset_cache.entry(rank) as usize == offset) {
            Some(rank) => {
                record_model(&mut self.cache_ref_models[model_index], rank, ops);
                self.offset_cache.hit(rank);
            }
            None => {
                // Invert offset = (32 << nbits) + (bits << 5) - 32 + (r - 7).
                let nbits = ((offset + 31) >> 5).ilog2() as usize;
                let residual = offset + 32 - (32 << nbits);
                let bits = ((residual - 1) >> 5) as u32;
                let cache_ref = residual - ((bits as usize) << 5) + 7;
                record_model(&mut self.cache_ref_models[model_index], cache_ref, ops);
                record_model(&mut self.offset_len_model, nbits, ops);
                if nbits >= 16 {
                    ops.push(Op::Bits {
                        value: bits >> 16,
                        nbits: nbits % 16,
                    });
                    ops.push(Op::Word(bits as u16));
                } else {
                    ops.push(Op::Bits { value: bits, nbits });
                }
                self.offset_cache.insert(offset as u32);
            }
        }
        self.delta_offset = offset;
    }

    /// The backward pass: pushes the recorded ops in reverse onto a fresh
    /// state pair and packs the pair's final value as the quantum's init
    /// words. Returns the quantum's words in decoder pop order.
    fn code_ops(ops: &[Op], chunk: usize) -> Result<Vec<u16>> {
        // Worst case is one offloaded word per op plus the init packing.
        let mut buf = vec![0u16; 3 * chunk + 16];
        let mut stream = RansBitstream::writer(&mut buf[..]);
        let mut states = [RansState::<u32>::new(), RansState::<u32>::new()];

        let mut parity = ops
            .iter()
            .filter(|op| !matches!(op, Op::Word(_)))
            .count();
        for op in ops.iter().rev() {
            match *op {
                Op::Word(word) => stream.push(word)?,
                Op::Range { freq, start } => {
                    parity -= 1;
                    states[parity % 2].push_range(&mut stream, freq, start, 15)?;
                }
                Op::Bits { value, nbits } => {
                    parity -= 1;
                    states[parity % 2].push_bits(&mut stream, value, nbits)?;
                }
            }
        }
        Self::pack_initial_states(states, &mut stream)?;

        let words = stream.remaining_slice().to_vec();
        Ok(words)
    }

    /// The inverse of the decoder's initial-state reconstruction: splices the
    /// second state's value above the first one's and emits the merged state
    /// as two init words, with the 4-bit split point pushed in between.
    pub fn pack_initial_states(
        states: [RansState<u32>; 2],
        stream: &mut RansBitstream<&mut [u16]>,
    ) -> Result<()> {
        let (first, second) = (states[0].raw(), states[1].raw());
        // The decoder pops the second state's low word last of all the init
        // words, so it goes in first.
        stream.push(second as u16)?;
        let high = second >> 16;
        let split = high.ilog2() as usize;
        let spliced = high - (1 << split);
        let mut merged_low = first;
        if split > 0 && (merged_low >> (32 - split)) != 0 {
            // The first state cannot take the split shift; its low word goes
            // out and the decoder will refill it.
            stream.push(merged_low as u16)?;
            merged_low >>= 16;
        }
        let mut merged = RansState::<u32>::from_raw((merged_low << split) | spliced);
        merged.push_bits(stream, split as u32, 4)?;
        stream.push(merged.raw() as u16)?;
        stream.push((merged.raw() >> 16) as u16)?;
        Ok(())
    }

    fn index_window(&mut self, payload: &[u8], pos: usize) {
        if pos + 4 <= payload.len() {
            self.match_index.insert(window(payload, pos), pos);
        }
    }
}

impl Default for BitKnit2Encoder {
    fn default() -> Self {
        Self::new()
    }
}

fn window(payload: &[u8], pos: usize) -> [u8; 4] {
    [
        payload[pos],
        payload[pos + 1],
        payload[pos + 2],
        payload[pos + 3],
    ]
}

/// How many bytes starting at `pos` repeat the bytes `offset` back, up to
/// `limit`. Self-overlapping runs compare byte by byte, the same way the
/// decoder will copy them.
fn match_length(payload: &[u8], pos: usize, offset: usize, limit: usize) -> usize {
    let mut length = 0;
    while length < limit && payload[pos + length] == payload[pos + length - offset] {
        length += 1;
    }
    length
}

/// Records `symbol`'s range under the model's current distribution and then
/// lets the model observe it — the same order the decoder decodes in.
fn record_model<const VOCAB: usize, const MIN_PROBABLE: usize>(
    model: &mut DeferredAdaptiveModel<1024, VOCAB, MIN_PROBABLE, 15, 10>,
    symbol: usize,
    ops: &mut Vec<Op>,
) {
    let cdf = model.cdf();
    ops.push(Op::Range {
        freq: cdf.frequency(symbol),
        start: cdf.sum_below(symbol),
    });
    model.observe(symbol);
}

/// Encodes `payload` with a fresh [`BitKnit2Encoder`].
pub fn encode(payload: &[u8]) -> Result<Vec<u16>> {
    BitKnit2Encoder::new().encode(payload)
}
