//! Task queue and detection worker pool.

use matcher::{PlagiarismDetector, Request, Response, Status};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::protocol::write_response;
use crate::telemetry::{DETECTION_SECONDS, QUEUE_DEPTH, REQUESTS_TOTAL, SEND_ERRORS_TOTAL};

/// A parsed request waiting for a worker, together with the connection its
/// response goes back on.
#[derive(Debug)]
pub struct Task {
    pub request: Request,
    pub stream: TcpStream,
    pub conn_id: Uuid,
    pub enqueued_at: Instant,
}

/// Producer side of the task queue.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: UnboundedSender<Task>,
}

impl TaskQueue {
    /// Enqueue `task`. Returns it back if every worker has exited.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        gauge!(QUEUE_DEPTH).increment(1.0);
        self.tx.send(task).map_err(|mpsc::error::SendError(task)| {
            gauge!(QUEUE_DEPTH).decrement(1.0);
            task
        })
    }
}

/// Fixed set of workers pulling from one FIFO queue.
///
/// The queue closes when every [`TaskQueue`] handle is dropped; workers then
/// finish what is queued and exit.
pub struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Spawn `size` workers and return the pool with its queue handle.
    pub fn spawn(size: usize, detector: Arc<PlagiarismDetector>) -> (Self, TaskQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..size {
            let rx = Arc::clone(&rx);
            let detector = Arc::clone(&detector);
            workers.spawn(
                worker_loop(rx, detector).instrument(info_span!("worker", id = worker_id)),
            );
        }

        (Self { workers }, TaskQueue { tx })
    }

    /// Number of workers still running.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(&mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(err) = result {
                if err.is_panic() {
                    error!(error = %err, "worker panicked");
                }
            }
        }
    }

    /// Abort every worker. Connections held by in-flight tasks are dropped
    /// without a response.
    pub async fn abort(&mut self) {
        self.workers.shutdown().await;
    }
}

async fn worker_loop(rx: Arc<Mutex<UnboundedReceiver<Task>>>, detector: Arc<PlagiarismDetector>) {
    loop {
        // Hold the lock only while waiting; FIFO order comes from the channel.
        let next = rx.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        gauge!(QUEUE_DEPTH).decrement(1.0);
        process(task, &detector).await;
    }
    debug!("queue closed, worker exiting");
}

async fn process(task: Task, detector: &Arc<PlagiarismDetector>) {
    let Task {
        request,
        mut stream,
        conn_id,
        enqueued_at,
    } = task;
    let span = info_span!("task", %conn_id);

    async move {
        let queued_ms = enqueued_at.elapsed().as_millis() as u64;
        let request_id = request.request_id.clone();
        let started = Instant::now();

        let detector = Arc::clone(detector);
        let response = match tokio::task::spawn_blocking(move || detector.handle(&request)).await
        {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "detection task failed");
                Response::error(request_id, format!("Internal error: {err}"))
            }
        };

        let elapsed = started.elapsed();
        histogram!(DETECTION_SECONDS).record(elapsed.as_secs_f64());
        let status = match response.status {
            Status::Success => "success",
            Status::Error => "error",
        };
        counter!(REQUESTS_TOTAL, "status" => status).increment(1);
        debug!(
            status,
            queued_ms,
            detect_ms = elapsed.as_millis() as u64,
            matches = response.matches.as_ref().map_or(0, Vec::len),
            "request processed"
        );

        if let Err(err) = write_response(&mut stream, &response).await {
            counter!(SEND_ERRORS_TOTAL).increment(1);
            warn!(error = %err, "failed to send response");
        }
        // Dropping the stream closes the connection.
    }
    .instrument(span)
    .await
}
