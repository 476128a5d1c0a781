use rand::prelude::{Rng, SmallRng};
use rand::SeedableRng;

use bitknit2::rans::{DeferredAdaptiveModel, FrequencyTable};

type CommandModel = DeferredAdaptiveModel<1024, 300, 36, 15, 10>;

fn assert_is_valid_cdf<const V: usize, const F: usize, const L: usize>(
    table: &FrequencyTable<V, F, L>,
) {
    let sums = table.sums();
    assert_eq!(sums[0], 0);
    assert_eq!(sums[V] as usize, 1 << F);
    for symbol in 0..V {
        assert!(
            table.frequency(symbol) >= 1,
            "symbol {symbol} starved to zero frequency"
        );
    }
}

#[test]
fn model_keeps_total_and_minimum_mass_while_converging() {
    let mut model = CommandModel::new();
    assert_eq!(*model.cdf().sums().last().unwrap() as usize, CommandModel::TOTAL);
    for _ in 0..15 * 1024 {
        model.observe(299);
    }
    assert_eq!(CommandModel::FREQ_INCR, 31);
    assert_eq!(CommandModel::LAST_FREQ_INCR, 725);
    assert_is_valid_cdf(model.cdf());
    // A symbol never seen stays at the minimum mass.
    assert_eq!(model.cdf().frequency(264), 1);
    // The dominant symbol converges onto one interval's worth of mass; the
    // +1 on both sides is due to the way the update rounds.
    assert_eq!(
        model.cdf().frequency(299) as usize + 1,
        CommandModel::LAST_FREQ_INCR as usize + 1 + CommandModel::FREQ_INCR as usize * 1024
    );
}

#[test]
fn model_stays_valid_under_random_observations() {
    let mut rng = SmallRng::seed_from_u64(0xADA);
    let mut model = CommandModel::new();
    for round in 0..64 {
        // Alternate between skewed and uniform phases to push the
        // distribution around.
        for _ in 0..1024 {
            let symbol = if round % 2 == 0 {
                rng.gen_range(0..4)
            } else {
                rng.gen_range(0..300)
            };
            model.observe(symbol);
        }
        assert_is_valid_cdf(model.cdf());
    }
}

#[test]
fn observe_reports_renormalization_every_interval() {
    let mut model = DeferredAdaptiveModel::<16, 40, 0, 15, 10>::new();
    for i in 1..=64usize {
        let renormalized = model.observe(i % 40);
        assert_eq!(renormalized, i % 16 == 0);
    }
}

#[test]
fn find_symbol_agrees_with_sums_for_every_code() {
    let mut rng = SmallRng::seed_from_u64(0xF1D);
    let mut model = DeferredAdaptiveModel::<1024, 40, 0, 15, 10>::new();
    for _ in 0..3 * 1024 {
        model.observe(rng.gen_range(0..40));
    }
    let table = model.cdf();
    let sums = table.sums();
    for code in 0..1 << 15 {
        let symbol = table.find_symbol(code);
        assert!(
            sums[symbol] as usize <= code && code < sums[symbol + 1] as usize,
            "code {code} resolved to symbol {symbol} outside its range"
        );
    }
}

#[test]
fn lookup_accelerated_and_binary_search_lookups_agree() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let mut model = DeferredAdaptiveModel::<1024, 300, 36, 15, 10>::new();
    for _ in 0..5 * 1024 {
        model.observe(rng.gen_range(0..300));
    }
    let accelerated = model.cdf();
    let plain = FrequencyTable::<300, 15, 0>::from_sums(accelerated.sums()).unwrap();
    for code in 0..1 << 15 {
        assert_eq!(accelerated.find_symbol(code), plain.find_symbol(code));
    }
}

#[test]
fn initial_distribution_splits_equiprobable_and_minimum_mass() {
    let model = CommandModel::new();
    let table = model.cdf();
    // 264 near-equiprobable symbols...
    for symbol in 0..264 {
        let freq = table.frequency(symbol) as usize;
        assert!((123..=124).contains(&freq), "symbol {symbol} got {freq}");
    }
    // ...and 36 trailing symbols at minimum mass.
    for symbol in 264..300 {
        assert_eq!(table.frequency(symbol), 1);
    }
    assert_is_valid_cdf(table);
}
