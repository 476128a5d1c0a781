pub mod codec;

use rand::prelude::{Rng, SmallRng};
use rand::SeedableRng;

/// Size of the payload used by the benchmarks.
pub const PAYLOAD_LEN: usize = 1 << 20;

/// A compressible payload: repeated records with a sprinkle of noise, close
/// to what asset containers actually hold.
pub fn get_payload() -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(0xBE7C);
    let mut record = vec![0u8; 32];
    rng.fill(record.as_mut_slice());

    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    while payload.len() < PAYLOAD_LEN {
        if rng.gen_range(0..8) == 0 {
            rng.fill(record.as_mut_slice());
        }
        payload.extend_from_slice(&record);
        if rng.gen_range(0..4) == 0 {
            payload.push(rng.gen());
        }
    }
    payload.truncate(PAYLOAD_LEN);
    payload
}
