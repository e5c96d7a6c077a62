//! Transport pump: the two background loops of a connection.
//!
//! The sender periodically writes a get-status request; the poller drains
//! input reports and feeds them to the decoder. Both take the device lock
//! with `try_lock` only, so a caller's command never waits behind a loop for
//! more than one read or write. Each loop owns a cancellation channel and is
//! joined on stop.

use crate::error::{FocuserError, FocuserResult};
use crate::state::StateStore;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use oasis_focuser_protocol::{Command, REPORT_LEN, Response};
use oasis_hid_common::HidHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Device handle shared by the pump loops and the controller.
pub type SharedDevice = Arc<Mutex<Box<dyn HidHandle>>>;

/// Loop periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpTiming {
    pub status_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for PumpTiming {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(1),
        }
    }
}

struct Worker {
    name: &'static str,
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

impl Worker {
    fn spawn(
        name: &'static str,
        body: impl FnOnce(Receiver<()>) + Send + 'static,
    ) -> FocuserResult<Self> {
        let (cancel, cancel_rx) = channel::bounded(1);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(cancel_rx))
            .map_err(|source| FocuserError::Spawn { name, source })?;
        Ok(Self {
            name,
            cancel,
            thread,
        })
    }

    fn signal(&self) {
        // A full or disconnected channel means the loop is already leaving.
        if self.cancel.try_send(()).is_err() {
            trace!(thread = self.name, "cancellation already pending");
        }
    }

    fn join(self) {
        match self.thread.join() {
            Ok(()) => debug!(thread = self.name, "stopped cleanly"),
            Err(_) => error!(thread = self.name, "thread panicked"),
        }
    }
}

/// `true` once the loop should exit. Doubles as the loop's tick.
fn wait_tick(cancel: &Receiver<()>, interval: Duration) -> bool {
    match cancel.recv_timeout(interval) {
        Err(RecvTimeoutError::Timeout) => false,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
    }
}

fn sender_loop(cancel: Receiver<()>, device: SharedDevice, interval: Duration) {
    let report = Command::GetStatus.encode();
    while !wait_tick(&cancel, interval) {
        let Some(mut handle) = device.try_lock() else {
            thread::yield_now();
            continue;
        };
        if let Err(e) = handle.write_report(&report) {
            // Absorbed: the next tick tries again.
            drop(handle);
            trace!(error = %e, "status request write failed");
            thread::yield_now();
        }
    }
}

fn poller_loop(cancel: Receiver<()>, device: SharedDevice, state: StateStore, interval: Duration) {
    let mut buf = [0u8; REPORT_LEN];
    while !wait_tick(&cancel, interval) {
        let read = match device.try_lock() {
            Some(mut handle) => handle.read_report(&mut buf),
            None => {
                thread::yield_now();
                continue;
            }
        };
        match read {
            Ok(0) => thread::yield_now(),
            Ok(len) => {
                let Some(frame) = buf.get(..len) else {
                    continue;
                };
                trace!(report = %hex(frame), "received report");
                match Response::decode(frame) {
                    Ok(Some(response)) => state.apply(&response),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "dropping malformed report"),
                }
            }
            Err(e) => {
                trace!(error = %e, "report read failed");
                thread::yield_now();
            }
        }
    }
}

/// Hex dump for trace logging.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The running sender and poller loops of one connection.
pub struct TransportPump {
    sender: Option<Worker>,
    poller: Option<Worker>,
}

impl TransportPump {
    /// Spawn both loops.
    ///
    /// # Errors
    ///
    /// Returns [`FocuserError::Spawn`] if a thread cannot be created; any
    /// loop already started is stopped again.
    pub fn start(device: SharedDevice, state: StateStore, timing: PumpTiming) -> FocuserResult<Self> {
        let mut pump = Self {
            sender: None,
            poller: None,
        };

        let poller_device = Arc::clone(&device);
        pump.poller = Some(Worker::spawn("oasis-poller", move |cancel| {
            poller_loop(cancel, poller_device, state, timing.poll_interval);
        })?);

        pump.sender = Some(Worker::spawn("oasis-sender", move |cancel| {
            sender_loop(cancel, device, timing.status_interval);
        })?);

        info!(
            status_interval_ms = timing.status_interval.as_millis(),
            poll_interval_ms = timing.poll_interval.as_millis(),
            "transport pump started"
        );
        Ok(pump)
    }

    pub fn is_running(&self) -> bool {
        self.sender.is_some() || self.poller.is_some()
    }

    /// Signal both loops and wait for them to exit. Idempotent.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        let workers = [self.sender.take(), self.poller.take()];
        for worker in workers.iter().flatten() {
            worker.signal();
        }
        for worker in workers.into_iter().flatten() {
            worker.join();
        }
        info!("transport pump stopped");
    }
}

impl Drop for TransportPump {
    fn drop(&mut self) {
        self.stop();
    }
}
