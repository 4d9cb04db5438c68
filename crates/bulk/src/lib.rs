use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

/// Runs one job per item with at most `concurrency` jobs in flight and
/// returns the outputs in input order.
///
/// Jobs are infallible from the executor's point of view: callers fold their
/// own failures into `R`, so one bad item never cancels the others.
#[derive(Clone, Debug)]
pub struct BulkExecutor {
    concurrency: usize,
}

impl BulkExecutor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn execute_ordered<T, R, Fut, F>(&self, items: Vec<T>, job: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        if items.is_empty() {
            debug!("No items to process");
            return Vec::new();
        }

        let total = items.len();
        info!(
            total,
            concurrency = self.concurrency,
            "Starting bulk execution"
        );

        let job = &job;
        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

        let mut completed = stream::iter(items.into_iter().enumerate().map(|(idx, item)| async move {
            debug!(index = idx, "Processing item");
            (idx, job(item).await)
        }))
        .buffer_unordered(self.concurrency);

        while let Some((idx, output)) = completed.next().await {
            slots[idx] = Some(output);
        }

        debug!(total, "Bulk execution completed");

        // Every index in 0..total is yielded exactly once by the stream.
        slots.into_iter().flatten().collect()
    }
}
