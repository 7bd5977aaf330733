// Serialized job runner. Platform media indices dislike concurrent
// access, so every gallery operation funnels through one queue with a
// single job in flight.
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct GalleryWorker {
    sender: mpsc::Sender<Job>,
}

impl GalleryWorker {
    /// Starts the worker loop. Jobs run strictly in submission order,
    /// one at a time; the loop exits when the last handle is dropped.
    pub fn start(queue_depth: usize) -> GalleryWorker {
        let (sender, mut receiver) = mpsc::channel::<Job>(queue_depth);
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
            }
            debug!("gallery worker stopped");
        });
        GalleryWorker { sender }
    }

    /// Queues one job and hands back the receiver for its result. A
    /// dropped receiver cancels nothing; the job still runs in order.
    pub async fn submit<T, F>(&self, job: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            let _ = tx.send(job.await);
        });
        if self.sender.send(wrapped).await.is_err() {
            error!("gallery worker is gone, dropping job");
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn jobs_run_one_at_a_time_in_submission_order() {
        let worker = GalleryWorker::start(8);
        let sequence = Arc::new(AtomicUsize::new(0));

        // The first job sleeps; if jobs overlapped, the second would
        // claim slot 0.
        let slow = Arc::clone(&sequence);
        let first = worker
            .submit(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                slow.fetch_add(1, Ordering::SeqCst)
            })
            .await;

        let fast = Arc::clone(&sequence);
        let second = worker.submit(async move { fast.fetch_add(1, Ordering::SeqCst) }).await;

        assert_eq!(first.await.unwrap(), 0);
        assert_eq!(second.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn results_reach_their_own_receivers() {
        let worker = GalleryWorker::start(8);
        let a = worker.submit(async { "a" }).await;
        let b = worker.submit(async { "b" }).await;
        assert_eq!(b.await.unwrap(), "b");
        assert_eq!(a.await.unwrap(), "a");
    }
}
