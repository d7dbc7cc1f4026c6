//! Command Executor
//!
//! Turns one logical map operation into one exchange with the store and hands
//! the reply back through a [`Deferred`].
//!
//! ## Dispatch Lanes
//! ```text
//!   map "a" ─┐                 ┌─> lane 0 ─┐
//!   map "b" ─┼─ hash(name) % n ┼─> lane 1 ─┼─> Transport ─> store
//!   map "c" ─┘                 └─> lane 2 ─┘
//! ```
//!
//! Each lane is one thread draining a FIFO channel, and a map always lands on
//! the same lane, so operations issued one after another on a map reach the
//! store in issuance order. Different maps have no ordering relative to each
//! other. There is no retry at this layer.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::deferred::Deferred;
use crate::error::{MapError, Result};
use crate::protocol::{Reply, Request};
use crate::transport::Transport;

/// One queued exchange
struct Job {
    request: Request,
    reply_to: Sender<Result<Reply>>,
}

/// Issues requests against a transport on a fixed set of dispatch lanes
pub struct CommandExecutor {
    lanes: Vec<Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CommandExecutor {
    /// Start `lane_count` dispatch lanes over `transport`
    pub fn new(transport: Arc<dyn Transport>, lane_count: usize) -> Result<Self> {
        let lane_count = lane_count.max(1);
        let mut lanes = Vec::with_capacity(lane_count);
        let mut workers = Vec::with_capacity(lane_count);

        for lane in 0..lane_count {
            let (sender, receiver) = unbounded::<Job>();
            let transport = Arc::clone(&transport);
            let worker = thread::Builder::new()
                .name(format!("distmap-lane-{}", lane))
                .spawn(move || run_lane(lane, transport, receiver))
                .map_err(|e| MapError::Config(format!("failed to spawn dispatch lane: {}", e)))?;

            lanes.push(sender);
            workers.push(worker);
        }

        tracing::debug!("Command executor started with {} lanes", lane_count);

        Ok(Self {
            lanes,
            workers: Mutex::new(workers),
        })
    }

    /// Queue `request` for `map_name` and return the raw reply.
    ///
    /// Error replies from the store arrive as `MapError::Remote`.
    pub fn execute(&self, map_name: &[u8], request: Request) -> Deferred<Reply> {
        self.execute_with(map_name, request, Ok)
    }

    /// Queue `request` for `map_name`; `then` turns the reply into the
    /// operation's result on the waiting thread.
    pub fn execute_with<T>(
        &self,
        map_name: &[u8],
        request: Request,
        then: impl FnOnce(Reply) -> Result<T> + Send + 'static,
    ) -> Deferred<T> {
        let (reply_to, receiver) = bounded(1);
        let lane = &self.lanes[self.lane_for(map_name)];

        if lane.send(Job { request, reply_to }).is_err() {
            return Deferred::failed(MapError::Transport(
                "dispatch lane is not running".to_string(),
            ));
        }

        Deferred::pending(receiver, then)
    }

    /// Number of dispatch lanes
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    fn lane_for(&self, map_name: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        map_name.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        // Closing the channels lets each lane drain its queue and exit
        self.lanes.clear();
        for worker in self.workers.lock().drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Dispatch lane panicked");
            }
        }
    }
}

fn run_lane(lane: usize, transport: Arc<dyn Transport>, jobs: Receiver<Job>) {
    tracing::debug!("Dispatch lane {} running", lane);

    for job in jobs.iter() {
        let name = job.request.name();
        let result = transport
            .send(&job.request)
            .and_then(Reply::into_result);

        if let Err(ref e) = result {
            tracing::debug!(lane, request = name, "request failed: {}", e);
        }

        if job.reply_to.send(result).is_err() {
            tracing::trace!(lane, request = name, "reply discarded by caller");
        }
    }

    tracing::debug!("Dispatch lane {} stopped", lane);
}
