use crate::events::Transfer;
use alloy_primitives::Address;
use std::collections::HashSet;

/// Distinct participants of a token's transfer history: both sender and
/// recipient of every event.
pub fn participants(events: &[Transfer]) -> HashSet<Address> {
    let mut holders = HashSet::new();
    for event in events {
        holders.insert(event.from);
        holders.insert(event.to);
    }
    holders
}

/// Strips the zero address (mint/burn counterparty) and every configured
/// exclusion from a holder set. Idempotent and order-independent.
pub fn filter_eligible(
    mut holders: HashSet<Address>,
    exclusions: &HashSet<Address>,
) -> HashSet<Address> {
    holders.remove(&Address::ZERO);
    for excluded in exclusions {
        holders.remove(excluded);
    }
    holders
}
