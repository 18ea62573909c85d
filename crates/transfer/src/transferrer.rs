//! The streaming loop: acquires a connection, issues aligned `GetFile`
//! calls, trims and emits bytes, and retries once on a rate limit
//! (`spec.md` §4.B).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use senders::remote::{GetFileRequest, SenderError};
use senders::SenderPool;
use tracing::{debug, instrument};

use crate::chunking::ChunkPlan;

/// Per-client façade over the five per-DC connection managers.
///
/// Tracks `users` (in-flight chunk generators) and `active_clients` (HTTP
/// requests currently routed to this client) so the dispatcher (`spec.md`
/// §4.D) can make a least-loaded selection. Both counters are atomic and
/// are decremented by the same code path that incremented them, on every
/// exit from [`Self::download`]'s returned stream — including the consumer
/// dropping it early.
pub struct ParallelTransferrer {
    pool: Arc<SenderPool>,
    users: AtomicI64,
    active_clients: AtomicI64,
}

impl ParallelTransferrer {
    /// Wraps `pool` as a transferrer with zeroed counters.
    #[must_use]
    pub fn new(pool: Arc<SenderPool>) -> Self {
        Self { pool, users: AtomicI64::new(0), active_clients: AtomicI64::new(0) }
    }

    /// Current number of in-flight chunk generators.
    #[must_use]
    pub fn users(&self) -> i64 {
        self.users.load(Ordering::Acquire)
    }

    /// Current number of HTTP requests routed to this client.
    #[must_use]
    pub fn active_clients(&self) -> i64 {
        self.active_clients.load(Ordering::Acquire)
    }

    /// Increments `active_clients`. Called by the dispatcher under its
    /// selection lock (`spec.md` §4.D), atomically with the min-load pick.
    pub fn mark_selected(&self) {
        self.active_clients.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements `active_clients` without having started a stream —
    /// the 404 path in `spec.md` §4.E step 3, which selects a client before
    /// discovering the file does not exist.
    pub fn release_without_stream(&self) {
        self.active_clients.fetch_sub(1, Ordering::AcqRel);
    }

    /// Builds a lazy, chunk-aligned byte stream for `[offset, limit]`
    /// (both inclusive) against `location` on `dc_id`.
    ///
    /// Increments `users` when the stream starts running and decrements
    /// both `users` and `active_clients` on every exit path: end of file,
    /// a terminal protocol error, or the consumer dropping the stream.
    #[instrument(skip(self, location), fields(dc_id, offset, limit))]
    pub fn download(
        self: &Arc<Self>,
        location: gwcore::file_info::InputLocation,
        dc_id: u8,
        file_size: u64,
        offset: u64,
        limit: u64,
        part_size: u32,
    ) -> impl Stream<Item = Result<Bytes, SenderError>> {
        let this = self.clone();
        let plan = ChunkPlan::new(offset, limit, file_size, part_size);
        debug!(
            first_part = plan.first_part,
            last_part = plan.last_part,
            part_count = plan.part_count,
            "starting parallel download"
        );

        async_stream::try_stream! {
            this.users.fetch_add(1, Ordering::AcqRel);
            let _guard = CounterGuard { transferrer: this.clone() };

            let manager = this.pool.manager(dc_id);
            let handle = manager.get_connection().await?;

            let mut request = GetFileRequest {
                location,
                offset: plan.initial_request_offset(),
                limit: i32::try_from(part_size).expect("part size fits in i32"),
            };

            let mut part = plan.first_part;
            while part <= plan.last_part {
                let chunk = fetch_with_retry(&handle, &request).await?;
                if chunk.bytes.is_empty() {
                    debug!(part, "remote returned empty chunk, ending stream early");
                    break;
                }

                request.offset += i64::from(part_size);
                yield plan.trim(part, &chunk.bytes);

                debug!(part, last_part = plan.last_part, "chunk emitted");
                part += 1;
            }
            debug!("parallel download finished");
        }
    }
}

/// Sends `request`, retrying exactly once if the remote asks for a rate-limit
/// wait (`spec.md` §4.B "Flow control"). Any other error, or a second rate
/// limit, terminates the stream.
async fn fetch_with_retry(
    handle: &senders::pool::ConnectionHandle,
    request: &GetFileRequest,
) -> Result<senders::remote::GetFileChunk, SenderError> {
    match handle.sender().await.get_file(request).await {
        Err(SenderError::RateLimited { wait }) => {
            debug!(?wait, "rate limited, sleeping and retrying once");
            tokio::time::sleep(wait).await;
            handle.sender().await.get_file(request).await
        }
        other => other,
    }
}

/// Decrements both counters when dropped, regardless of how the enclosing
/// stream ended — success, a propagated error, or the consumer dropping the
/// stream before it finished (`spec.md` §5 "Cancellation & timeouts").
struct CounterGuard {
    transferrer: Arc<ParallelTransferrer>,
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.transferrer.users.fetch_sub(1, Ordering::AcqRel);
        self.transferrer.active_clients.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use senders::test_support::{FakeMainClient, FakeRemote};
    use senders::remote::MainClient;

    fn sample_location(id: i64) -> gwcore::file_info::InputLocation {
        gwcore::file_info::InputLocation::Document {
            id,
            access_hash: 1,
            file_reference: vec![],
            thumb_size: String::new(),
        }
    }

    async fn make_pool(remote: Arc<FakeRemote>) -> Arc<SenderPool> {
        let main_client: Arc<dyn MainClient> = Arc::new(FakeMainClient::new(remote));
        let pool = Arc::new(SenderPool::new(main_client, 20));
        pool.publish_home_auth_key().await;
        pool
    }

    #[tokio::test]
    async fn streams_exact_requested_range_across_a_boundary() {
        let remote = FakeRemote::new(1);
        let part_size = 8u32;
        let data = Bytes::from((0u8..24).collect::<Vec<_>>());
        remote.put_file(42, data.clone()).await;
        let pool = make_pool(remote).await;
        let transferrer = Arc::new(ParallelTransferrer::new(pool));

        let stream = transferrer.download(sample_location(42), 1, 24, 7, 9, part_size);
        let chunks: Vec<Bytes> = stream.filter_map(|c| async { c.ok() }).collect().await;
        let body: Vec<u8> = chunks.into_iter().flat_map(|b| b.to_vec()).collect();

        assert_eq!(body, data[7..=9].to_vec());
        assert_eq!(transferrer.users(), 0);
    }

    #[tokio::test]
    async fn counters_balance_after_stream_completes() {
        let remote = FakeRemote::new(1);
        let data = Bytes::from(vec![0u8; 16]);
        remote.put_file(7, data).await;
        let pool = make_pool(remote).await;
        let transferrer = Arc::new(ParallelTransferrer::new(pool));

        transferrer.mark_selected();
        let stream = transferrer.download(sample_location(7), 1, 16, 0, 15, 8);
        let _: Vec<_> = stream.collect().await;

        assert_eq!(transferrer.users(), 0);
        assert_eq!(transferrer.active_clients(), 0);
    }

    #[tokio::test]
    async fn dropping_the_stream_early_still_decrements_counters() {
        let remote = FakeRemote::new(1);
        let data = Bytes::from(vec![0u8; 64]);
        remote.put_file(9, data).await;
        let pool = make_pool(remote).await;
        let transferrer = Arc::new(ParallelTransferrer::new(pool));

        transferrer.mark_selected();
        {
            let stream = transferrer.download(sample_location(9), 1, 64, 0, 63, 8);
            futures::pin_mut!(stream);
            let _ = stream.next().await;
        }

        assert_eq!(transferrer.users(), 0);
        assert_eq!(transferrer.active_clients(), 0);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_once_then_succeeds() {
        let remote = FakeRemote::new(1);
        let data = Bytes::from(vec![5u8; 8]);
        remote.put_file(3, data.clone()).await;
        remote.inject_rate_limit_once();
        let pool = make_pool(remote).await;
        let transferrer = Arc::new(ParallelTransferrer::new(pool));

        let stream = transferrer.download(sample_location(3), 1, 8, 0, 7, 8);
        let chunks: Vec<Bytes> = stream.filter_map(|c| async { c.ok() }).collect().await;
        let body: Vec<u8> = chunks.into_iter().flat_map(|b| b.to_vec()).collect();
        assert_eq!(body, data.to_vec());
    }
}
