//! Request coalescing queue
//!
//! Accumulates independent prompts for a short window, then runs each item
//! sequentially through the normal `generate` pipeline. Every item resolves
//! its own oneshot channel, so one item's failure never fails its siblings.

use crate::client::{GenerateOptions, InferenceClient};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

struct PendingRequest {
    prompt: String,
    options: GenerateOptions,
    reply: oneshot::Sender<Result<String>>,
}

/// Handle to a spawned batching worker
pub struct BatchQueue {
    tx: mpsc::UnboundedSender<PendingRequest>,
}

impl BatchQueue {
    /// Spawn a batch worker over the client, using the client's configured
    /// batch window and capacity
    #[must_use]
    pub fn for_client(client: Arc<InferenceClient>) -> Self {
        let delay = client.config().batch_delay;
        let max_size = client.config().batch_max_size;
        Self::spawn(client, delay, max_size)
    }

    /// Spawn a batch worker with an explicit window and capacity
    #[must_use]
    pub fn spawn(client: Arc<InferenceClient>, delay: Duration, max_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(client, rx, delay, max_size));
        Self { tx }
    }

    /// Queue a prompt and wait for its individual result
    pub async fn enqueue(&self, prompt: impl Into<String>, options: GenerateOptions) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                prompt: prompt.into(),
                options,
                reply,
            })
            .map_err(|_| Error::Internal("batch worker stopped".into()))?;
        rx.await
            .map_err(|_| Error::Internal("batch worker dropped request".into()))?
    }
}

async fn run_worker(
    client: Arc<InferenceClient>,
    mut rx: mpsc::UnboundedReceiver<PendingRequest>,
    delay: Duration,
    max_size: usize,
) {
    // Each iteration: wait for one item, collect more until the window
    // closes or the batch fills, then drain sequentially.
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        let window = tokio::time::sleep(delay);
        tokio::pin!(window);

        while batch.len() < max_size {
            tokio::select! {
                () = &mut window => break,
                item = rx.recv() => match item {
                    Some(item) => batch.push(item),
                    None => break,
                },
            }
        }

        info!(items = batch.len(), "Processing batch");
        for item in batch {
            let result = client.generate(&item.prompt, &item.options).await;
            if item.reply.send(result).is_err() {
                debug!("Batch caller went away before its result arrived");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::provider::MockProvider;
    use crate::storage::MemoryStorage;

    fn client(provider: Arc<MockProvider>) -> Arc<InferenceClient> {
        let config = ClientConfig::new().with_retry(3, Duration::from_millis(1));
        Arc::new(InferenceClient::new(config, provider, Arc::new(MemoryStorage::new())).unwrap())
    }

    #[tokio::test]
    async fn test_batched_items_resolve_individually() {
        let provider = Arc::new(MockProvider::new());
        provider.push_text("alpha");
        provider.push_text("beta");
        let queue = BatchQueue::spawn(client(provider), Duration::from_millis(20), 10);

        let (a, b) = tokio::join!(
            queue.enqueue("prompt a", GenerateOptions::default()),
            queue.enqueue("prompt b", GenerateOptions::default()),
        );
        assert_eq!(a.unwrap(), "alpha");
        assert_eq!(b.unwrap(), "beta");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_fail_siblings() {
        let provider = Arc::new(MockProvider::new());
        provider.push_text("ok");
        provider.push(Err(Error::Api {
            status: Some(400),
            message: "bad request".into(),
        }));
        let queue = BatchQueue::spawn(client(provider), Duration::from_millis(20), 10);

        let (a, b) = tokio::join!(
            queue.enqueue("first", GenerateOptions::default()),
            queue.enqueue("second", GenerateOptions::default()),
        );
        assert_eq!(a.unwrap(), "ok");
        assert!(matches!(b, Err(Error::Api { status: Some(400), .. })));
    }

    #[tokio::test]
    async fn test_full_batch_flushes_before_window() {
        let provider = Arc::new(MockProvider::new());
        provider.push_text("one");
        provider.push_text("two");
        // Window far longer than the test; capacity forces the flush.
        let queue = BatchQueue::spawn(client(provider), Duration::from_secs(60), 2);

        let started = std::time::Instant::now();
        let (a, b) = tokio::join!(
            queue.enqueue("x", GenerateOptions::default()),
            queue.enqueue("y", GenerateOptions::default()),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
