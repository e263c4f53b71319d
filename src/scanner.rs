use crate::config::Config;
use crate::events::{Transfer, decode_transfer_event};
use crate::rpc::RpcClient;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, B256};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Partitions the closed window `[start, end]` into consecutive ranges of
/// at most `chunk_size` blocks. Contiguous, non-overlapping, and together
/// covering the window exactly; the final range may be shorter.
pub fn block_ranges(start: u64, end: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    assert!(chunk_size > 0, "chunk_size must be positive");

    let mut ranges = Vec::new();
    let mut from = start;
    while from <= end {
        let to = from.saturating_add(chunk_size - 1).min(end);
        ranges.push((from, to));
        if to == end {
            break;
        }
        from = to + 1;
    }
    ranges
}

pub struct Scanner {
    client: RpcClient,
    transfer_topic: B256,
    chunk_size: u64,
    chunk_retry_delay: Duration,
    retry_failed_chunks: bool,
}

impl Scanner {
    pub fn new(client: RpcClient, config: &Config) -> Self {
        Scanner {
            client,
            transfer_topic: Transfer::SIGNATURE_HASH,
            chunk_size: config.chunk_size,
            chunk_retry_delay: config.chunk_retry_delay,
            retry_failed_chunks: config.retry_failed_chunks,
        }
    }

    /// Collects every Transfer event a token emitted inside the window,
    /// one chunk at a time in increasing block order.
    ///
    /// A chunk whose query still fails after the client's own retries is
    /// dropped: the scanner waits `chunk_retry_delay` and moves on to the
    /// next chunk boundary without re-issuing the query. The result can
    /// therefore under-count events after provider outages. With
    /// `retry_failed_chunks` the chunk gets one delayed re-issue before
    /// being dropped.
    pub async fn scan_token(&self, token: Address, start_block: u64, end_block: u64) -> Vec<Transfer> {
        let ranges = block_ranges(start_block, end_block, self.chunk_size);
        info!(
            "Scanning blocks {} to {} for {} in {} chunk(s)",
            start_block,
            end_block,
            token,
            ranges.len()
        );

        let mut events = Vec::new();
        for (from, to) in ranges {
            match self.fetch_chunk(token, from, to).await {
                Ok(mut chunk_events) => events.append(&mut chunk_events),
                Err(e) => {
                    warn!("Chunk {}-{} failed: {}", from, to, e);
                    sleep(self.chunk_retry_delay).await;

                    if !self.retry_failed_chunks {
                        continue;
                    }
                    match self.fetch_chunk(token, from, to).await {
                        Ok(mut chunk_events) => events.append(&mut chunk_events),
                        Err(e) => {
                            warn!("Chunk {}-{} failed again, dropping it: {}", from, to, e);
                        }
                    }
                }
            }
        }

        info!("Found {} transfer event(s) for {}", events.len(), token);
        events
    }

    async fn fetch_chunk(&self, token: Address, from: u64, to: u64) -> anyhow::Result<Vec<Transfer>> {
        let logs = self
            .client
            .get_logs(token, self.transfer_topic, from, to)
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match decode_transfer_event(&log) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!("Failed to decode transfer event: {}", e);
                }
            }
        }
        Ok(events)
    }
}
