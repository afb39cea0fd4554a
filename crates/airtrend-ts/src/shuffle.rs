use airtrend_core::AirtrendResult;
use polars::datatypes::IdxSize;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Build the shuffle RNG: seeded runs are reproducible byte for byte.
pub fn partition_rng(seed: Option<u64>) -> StdRng {
    seed.map(StdRng::seed_from_u64)
        .unwrap_or_else(StdRng::from_entropy)
}

/// Row-permuted copy of a partition. The input frame is left untouched.
///
/// Only train partitions are shuffled; valid/test keep date order.
pub fn shuffle_partition(df: &DataFrame, rng: &mut StdRng) -> AirtrendResult<DataFrame> {
    let mut idx: Vec<IdxSize> = (0..df.height() as IdxSize).collect();
    idx.shuffle(rng);
    let idx_ca = IdxCa::new("row_idx", idx.as_slice());
    Ok(df.take(&idx_ca)?)
}
