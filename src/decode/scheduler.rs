//! Single-worker region decode queue.
//!
//! - One background thread decodes regions from a `RegionSource`
//! - Requests are coalesced latest-only; superseded ones are never decoded
//! - A decode in flight is not interrupted, but its result is dropped if a
//!   newer request was submitted meanwhile
//! - Results travel back over a flume channel; the owner drains them on its
//!   own thread with `poll_results`

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::request::{DecodeRequest, DecodedPatch};
use super::source::RegionSource;
use crate::error::Result;

/// Token value that matches no request.
const NO_TOKEN: u64 = 0;

/// Result of one decode, tagged with the request token.
#[derive(Debug)]
pub struct DecodeOutcome {
    pub token: u64,
    pub result: Result<DecodedPatch>,
}

/// Called from the worker thread after a result is queued. Hosts use it to
/// schedule a redraw on their own thread.
pub type PatchReadyCallback = Box<dyn Fn(u64) + Send + Sync>;

type CallbackSlot = Arc<Mutex<Option<PatchReadyCallback>>>;

pub struct RegionDecodeScheduler {
    request_tx: Option<Sender<DecodeRequest>>,
    result_rx: Receiver<DecodeOutcome>,
    /// Token of the request the owner still wants.
    latest_token: Arc<AtomicU64>,
    /// Cleared when the owner goes away; the worker stops delivering.
    alive: Arc<AtomicBool>,
    on_ready: CallbackSlot,
    worker: Option<JoinHandle<()>>,
}

impl RegionDecodeScheduler {
    /// Starts the worker thread for `source`.
    pub fn new(source: Arc<dyn RegionSource>, poll_interval: Duration) -> std::io::Result<Self> {
        let (request_tx, request_rx) = flume::unbounded();
        let (result_tx, result_rx) = flume::unbounded();
        let latest_token = Arc::new(AtomicU64::new(NO_TOKEN));
        let alive = Arc::new(AtomicBool::new(true));
        let on_ready: CallbackSlot = Arc::new(Mutex::new(None));

        let worker = {
            let latest = Arc::clone(&latest_token);
            let alive = Arc::clone(&alive);
            let on_ready = Arc::clone(&on_ready);
            thread::Builder::new()
                .name("region-decoder".to_string())
                .spawn(move || {
                    worker_loop(
                        request_rx,
                        result_tx,
                        source,
                        latest,
                        alive,
                        on_ready,
                        poll_interval,
                    );
                })?
        };

        debug!("Started region decode worker");

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            latest_token,
            alive,
            on_ready,
            worker: Some(worker),
        })
    }

    /// Queues `request`, superseding everything submitted before it.
    pub fn submit(&self, request: DecodeRequest) {
        self.latest_token.store(request.token, Ordering::Release);
        let Some(tx) = self.request_tx.as_ref() else {
            warn!(token = request.token, "Region decoder already shut down");
            return;
        };
        trace!(
            token = request.token,
            rect = ?request.source_rect,
            subsample = request.subsample,
            "Submitting region decode"
        );
        if tx.send(request).is_err() {
            error!("Region decode queue disconnected");
        }
    }

    /// Marks every submitted request stale.
    pub fn cancel_pending(&self) {
        self.latest_token.store(NO_TOKEN, Ordering::Release);
    }

    /// Drains finished decodes (non-blocking).
    pub fn poll_results(&self) -> Vec<DecodeOutcome> {
        self.result_rx.try_iter().collect()
    }

    /// Sets the callback run on the worker thread after each delivery,
    /// replacing any earlier one.
    pub fn on_patch_ready<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        *self.on_ready.lock() = Some(Box::new(callback));
    }

    /// Stops the worker without waiting for it. A decode in progress keeps
    /// the thread alive until it returns; nothing from it is delivered.
    pub fn detach(mut self) {
        self.stop();
        if self.worker.take().is_some() {
            debug!("Detached region decoder");
        }
    }

    fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.cancel_pending();
        self.request_tx.take();
    }

    /// Stops the worker and waits for it. A decode in progress runs to
    /// completion first; its result is dropped.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() {
            return;
        }
        debug!("Shutting down region decoder");
        self.stop();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Region decode worker panicked");
            }
        }
        debug!("Region decoder shutdown complete");
    }
}

impl Drop for RegionDecodeScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    rx: Receiver<DecodeRequest>,
    tx: Sender<DecodeOutcome>,
    source: Arc<dyn RegionSource>,
    latest: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    on_ready: CallbackSlot,
    poll_interval: Duration,
) {
    debug!("Region decode worker started");

    loop {
        if !alive.load(Ordering::Acquire) {
            break;
        }

        let mut request = match rx.recv_timeout(poll_interval) {
            Ok(request) => request,
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        };

        // Latest wins: skip anything queued behind a newer request.
        while let Ok(next) = rx.try_recv() {
            trace!(superseded = request.token, by = next.token, "Coalescing region requests");
            request = next;
        }

        if request.token != latest.load(Ordering::Acquire) {
            trace!(token = request.token, "Skipping stale region request");
            continue;
        }

        let result = source
            .decode_region(request.source_rect, request.subsample)
            .map(|bitmap| DecodedPatch {
                token: request.token,
                bitmap,
                dest: request.dest,
                source_rect: request.source_rect,
            });

        if !alive.load(Ordering::Acquire) {
            break;
        }
        if request.token != latest.load(Ordering::Acquire) {
            debug!(token = request.token, "Discarding stale decoded patch");
            continue;
        }

        if tx
            .send(DecodeOutcome {
                token: request.token,
                result,
            })
            .is_err()
        {
            break;
        }

        if let Some(callback) = on_ready.lock().as_ref() {
            callback(request.token);
        }
    }

    debug!("Region decode worker stopped");
}
