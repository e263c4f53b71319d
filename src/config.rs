use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LOOKBACK_BLOCKS: u64 = 100_000;
const DEFAULT_CHUNK_SIZE: u64 = 2_000;
const DEFAULT_CHUNK_RETRY_DELAY_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    /// Ordered symbolic name -> contract address pairs. Order fixes the
    /// per-holder balance query sequence.
    pub tracked_tokens: Vec<(String, Address)>,
    /// Addresses never eligible to win (pool and protocol contracts).
    pub excluded_addresses: HashSet<Address>,
    pub lookback_blocks: u64,
    pub chunk_size: u64,
    pub chunk_retry_delay: Duration,
    /// When set, a failed chunk is re-issued once after the delay instead
    /// of being skipped outright.
    pub retry_failed_chunks: bool,
    /// Fixed seed for the draw; unset means entropy-seeded.
    pub random_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let urls_str =
            std::env::var("JSON_RPC_URLS").context("JSON_RPC_URLS must be set in .env")?;
        let json_rpc_urls = parse_rpc_urls(&urls_str)?;

        let tokens_str =
            std::env::var("TRACKED_TOKENS").context("TRACKED_TOKENS must be set in .env")?;
        let tracked_tokens = parse_token_list(&tokens_str)?;

        let excluded_addresses = match std::env::var("EXCLUDED_ADDRESSES") {
            Ok(s) => parse_address_set(&s)?,
            Err(_) => HashSet::new(),
        };

        let lookback_blocks = env_or("LOOKBACK_BLOCKS", DEFAULT_LOOKBACK_BLOCKS)?;

        let chunk_size: u64 = env_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            anyhow::bail!("CHUNK_SIZE must be greater than zero");
        }

        let delay_secs = env_or("CHUNK_RETRY_DELAY_SECS", DEFAULT_CHUNK_RETRY_DELAY_SECS)?;

        let retry_failed_chunks = env_or("RETRY_FAILED_CHUNKS", false)?;

        let random_seed = match std::env::var("RANDOM_SEED") {
            Ok(s) => Some(s.parse().context("Invalid RANDOM_SEED, expected a u64")?),
            Err(_) => None,
        };

        Ok(Config {
            json_rpc_urls,
            tracked_tokens,
            excluded_addresses,
            lookback_blocks,
            chunk_size,
            chunk_retry_delay: Duration::from_secs(delay_secs),
            retry_failed_chunks,
            random_seed,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(s) => s
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", key, s)),
        Err(_) => Ok(default),
    }
}

pub fn parse_rpc_urls(s: &str) -> Result<Vec<String>> {
    let urls: Vec<String> = s
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        anyhow::bail!("JSON_RPC_URLS must contain at least one endpoint");
    }
    Ok(urls)
}

/// Parses `NAME:0xaddr,NAME:0xaddr`, preserving order.
pub fn parse_token_list(s: &str) -> Result<Vec<(String, Address)>> {
    let mut tokens = Vec::new();

    for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, addr_str) = entry
            .split_once(':')
            .with_context(|| format!("Expected NAME:ADDRESS, got '{entry}'"))?;
        let address = Address::from_str(addr_str.trim())
            .with_context(|| format!("Invalid contract address for token '{name}'"))?;
        tokens.push((name.trim().to_string(), address));
    }

    if tokens.is_empty() {
        anyhow::bail!("TRACKED_TOKENS must name at least one token contract");
    }
    Ok(tokens)
}

pub fn parse_address_set(s: &str) -> Result<HashSet<Address>> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| Address::from_str(a).with_context(|| format!("Invalid excluded address '{a}'")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_token_list() {
        let tokens = parse_token_list(
            "GM:0x0000000000000000000000000000000000000001, \
             GMUSD:0x0000000000000000000000000000000000000002",
        )
        .unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].0, "GM");
        assert_eq!(tokens[0].1, Address::with_last_byte(1));
        assert_eq!(tokens[1].0, "GMUSD");
        assert_eq!(tokens[1].1, Address::with_last_byte(2));
    }

    #[test]
    fn rejects_empty_token_list() {
        assert!(parse_token_list("").is_err());
        assert!(parse_token_list(" , ").is_err());
    }

    #[test]
    fn rejects_malformed_token_entry() {
        assert!(parse_token_list("GM=0x0000000000000000000000000000000000000001").is_err());
        assert!(parse_token_list("GM:not-an-address").is_err());
    }

    #[test]
    fn parses_exclusion_set_any_case() {
        let set = parse_address_set(
            "0x00000000000000000000000000000000000000AA,\
             0x00000000000000000000000000000000000000aa,\
             0x00000000000000000000000000000000000000bb",
        )
        .unwrap();

        // Case-insensitive parse canonicalizes to the same 20 bytes.
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Address::with_last_byte(0xaa)));
        assert!(set.contains(&Address::with_last_byte(0xbb)));
    }

    #[test]
    fn rejects_empty_rpc_url_list() {
        assert!(parse_rpc_urls(",").is_err());
    }
}
