use crate::rpc::RpcClient;
use alloy_primitives::{Address, U256};
use std::collections::HashSet;
use tracing::{info, warn};

const PROGRESS_INTERVAL: usize = 50;

/// Aligned address/weight columns feeding the sampler. Only holders with a
/// strictly positive aggregate balance are present; the relative order of
/// entries is consistent between the two columns but carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct WeightedPool {
    pub addresses: Vec<Address>,
    pub weights: Vec<U256>,
}

impl WeightedPool {
    /// Records a holder's aggregate weight. Zero-weight holders are
    /// dropped here rather than stored with an empty probability mass.
    pub fn push(&mut self, address: Address, weight: U256) {
        if weight > U256::ZERO {
            self.addresses.push(address);
            self.weights.push(weight);
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn total_weight(&self) -> U256 {
        sum_weights(self.weights.iter().copied())
    }
}

fn sum_weights(balances: impl IntoIterator<Item = U256>) -> U256 {
    balances
        .into_iter()
        .fold(U256::ZERO, |acc, b| acc.saturating_add(b))
}

/// Queries every tracked token balance of every holder and sums them into
/// one weight per holder, `|holders| * |tokens|` sequential calls. A failed
/// query counts as zero for that (holder, token) pair only; the holder
/// stays in the pool if any other token balance is positive.
pub async fn aggregate_balances(
    client: &RpcClient,
    holders: &HashSet<Address>,
    tokens: &[(String, Address)],
) -> WeightedPool {
    let mut pool = WeightedPool::default();

    for (processed, holder) in holders.iter().enumerate() {
        let mut balances = Vec::with_capacity(tokens.len());
        for (name, token) in tokens {
            match client.get_balance_of(*token, *holder).await {
                Ok(balance) => balances.push(balance),
                Err(e) => {
                    warn!(
                        "balanceOf({}) on {} failed, counting as zero: {}",
                        holder, name, e
                    );
                    balances.push(U256::ZERO);
                }
            }
        }
        pool.push(*holder, sum_weights(balances));

        if (processed + 1) % PROGRESS_INTERVAL == 0 {
            info!("Aggregated balances for {}/{} holders", processed + 1, holders.len());
        }
    }

    pool
}
