/*
 * Utility functions and consts used by the tests.
 *
 */
#![allow(dead_code)]

use rand::prelude::{Rng, SmallRng};
use rand::SeedableRng;
use rand_distr::{Distribution, Zipf};

use bitknit2::bitknit::{CacheRefModel, CommandModel, OffsetLenModel, MAGIC};
use bitknit2::rans::{DeferredAdaptiveModel, RansBitstream, RansState};
use bitknit2::BitKnit2Encoder;

/// A payload with LZ-friendly structure: repeated record-like chunks with
/// occasional noise, the kind of bytes a geometry container holds.
pub fn structured_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let zipf = Zipf::new(255, 1.2).unwrap();
    let mut record = vec![0u8; 24];
    rng.fill(record.as_mut_slice());

    let mut payload = Vec::with_capacity(len);
    while payload.len() < len {
        match rng.gen_range(0..10) {
            0 => {
                // fresh record
                rng.fill(record.as_mut_slice());
                payload.extend_from_slice(&record);
            }
            1..=6 => payload.extend_from_slice(&record),
            7 => {
                // a run, exercising overlapping copies
                let byte = zipf.sample(&mut rng) as u8;
                let run = rng.gen_range(2..200);
                payload.extend(std::iter::repeat(byte).take(run));
            }
            _ => {
                let noise = rng.gen_range(1..40);
                payload.extend((0..noise).map(|_| zipf.sample(&mut rng) as u8));
            }
        }
    }
    payload.truncate(len);
    payload
}

/// Uniform random bytes: incompressible, so the encoder falls back to raw
/// quanta.
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut payload = vec![0u8; len];
    rng.fill(payload.as_mut_slice());
    payload
}

/// One thing a handcrafted stream makes the decoder pop, in decode order.
pub enum Pop {
    /// Uniform bits through the state pair.
    Bits(u32, usize),
    /// A symbol under the command model of the given residue class.
    Command(usize, usize),
    /// A symbol under the cache-reference model of the given residue class.
    CacheRef(usize, usize),
    /// A symbol under the copy-offset bit-count model.
    OffsetLen(usize),
    /// A word read straight from the stream, bypassing the states.
    Word(u16),
}

/// Builds a single-quantum stream that makes a fresh decoder pop exactly
/// `pops`, in order. Used to craft streams the reference encoder would never
/// emit, e.g. out-of-range copies.
pub fn build_stream(pops: &[Pop]) -> Vec<u16> {
    let mut command_models: [CommandModel; 4] = std::array::from_fn(|_| CommandModel::new());
    let mut cache_ref_models: [CacheRefModel; 4] = std::array::from_fn(|_| CacheRefModel::new());
    let mut offset_len_model = OffsetLenModel::new();

    // Forward pass: snapshot each symbol's range under the model state the
    // decoder will hold when it pops it.
    enum Op {
        Range { freq: u16, start: u16 },
        Bits { value: u32, nbits: usize },
        Word(u16),
    }
    fn range<const V: usize, const M: usize>(
        model: &mut DeferredAdaptiveModel<1024, V, M, 15, 10>,
        symbol: usize,
    ) -> Op {
        let op = Op::Range {
            freq: model.cdf().frequency(symbol),
            start: model.cdf().sum_below(symbol),
        };
        model.observe(symbol);
        op
    }
    let ops: Vec<Op> = pops
        .iter()
        .map(|pop| match *pop {
            Pop::Bits(value, nbits) => Op::Bits { value, nbits },
            Pop::Command(symbol, m) => range(&mut command_models[m], symbol),
            Pop::CacheRef(symbol, m) => range(&mut cache_ref_models[m], symbol),
            Pop::OffsetLen(symbol) => range(&mut offset_len_model, symbol),
            Pop::Word(word) => Op::Word(word),
        })
        .collect();

    // Backward pass, mirroring the decoder's swap-after-every-pop pairing.
    let mut buf = vec![0u16; 4 * pops.len() + 16];
    let mut stream = RansBitstream::writer(&mut buf[..]);
    let mut states = [RansState::<u32>::new(), RansState::<u32>::new()];
    let mut parity = ops.iter().filter(|op| !matches!(op, Op::Word(_))).count();
    for op in ops.iter().rev() {
        match *op {
            Op::Word(word) => stream.push(word).unwrap(),
            Op::Range { freq, start } => {
                parity -= 1;
                states[parity % 2]
                    .push_range(&mut stream, freq, start, 15)
                    .unwrap();
            }
            Op::Bits { value, nbits } => {
                parity -= 1;
                states[parity % 2]
                    .push_bits(&mut stream, value, nbits)
                    .unwrap();
            }
        }
    }
    BitKnit2Encoder::pack_initial_states(states, &mut stream).unwrap();

    let mut words = vec![MAGIC];
    words.extend_from_slice(stream.remaining_slice());
    words
}
