use crate::balances::WeightedPool;
use crate::error::RaffleError;
use alloy_primitives::{Address, U256};
use rand::RngCore;

/// Index of the entry owning the probability mass at `p`: the smallest `i`
/// with `cumulative[i] > p`. A draw landing exactly on a boundary `C[i]`
/// belongs to entry `i + 1` (upper-bound search, ties break rightward).
pub fn pick_index(cumulative: &[U256], p: U256) -> usize {
    cumulative.partition_point(|&c| c <= p)
}

/// Unbiased uniform draw from `[0, bound)`. Rejection-samples full 256-bit
/// values: draws from the incomplete final copy of `[0, bound)` inside the
/// 2^256 value space would over-weight small residues, so they are thrown
/// away and redrawn.
pub fn uniform_below<R: RngCore + ?Sized>(rng: &mut R, bound: U256) -> U256 {
    assert!(bound > U256::ZERO, "bound must be positive");

    // 2^256 mod bound, i.e. the size of the incomplete final copy.
    let overhang = (U256::MAX % bound).wrapping_add(U256::from(1u64)) % bound;
    let limit = U256::MAX - overhang;

    loop {
        let mut buf = [0u8; 32];
        rng.fill_bytes(&mut buf);
        let x = U256::from_be_bytes(buf);
        if overhang == U256::ZERO || x <= limit {
            return x % bound;
        }
    }
}

/// Draws one address from the pool with probability proportional to its
/// weight. The zero-total check is performed here even though the
/// aggregator never emits zero weights; the sampler does not get to assume
/// where its pool came from.
pub fn draw_winner<R: RngCore + ?Sized>(
    pool: &WeightedPool,
    rng: &mut R,
) -> Result<(Address, U256), RaffleError> {
    if pool.is_empty() {
        return Err(RaffleError::EmptyPool);
    }

    let mut cumulative = Vec::with_capacity(pool.len());
    let mut total = U256::ZERO;
    for weight in &pool.weights {
        total = total.saturating_add(*weight);
        cumulative.push(total);
    }

    if total == U256::ZERO {
        return Err(RaffleError::ZeroTotalWeight);
    }

    let p = uniform_below(rng, total);
    let index = pick_index(&cumulative, p);
    Ok((pool.addresses[index], pool.weights[index]))
}
