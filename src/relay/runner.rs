use tokio_util::sync::CancellationToken;

use super::error::RelayError;
use super::pace::Pacer;
use super::reconnect::ReconnectSupervisor;
use super::{FrameSink, FrameSource, Geometry};

/// Drives the read → push → pace cycle until cancellation or a fatal
/// failure. Capture faults go through the reconnect supervisor; push
/// faults terminate the relay. On any exit the sink is closed before the
/// source.
pub struct RelayLoop<S: FrameSource, K: FrameSink> {
    source: S,
    sink: K,
    geometry: Geometry,
    pacer: Pacer,
    supervisor: ReconnectSupervisor,
    cancel: CancellationToken,
}

impl<S: FrameSource, K: FrameSink> RelayLoop<S, K> {
    pub fn new(
        source: S,
        sink: K,
        geometry: Geometry,
        pacer: Pacer,
        supervisor: ReconnectSupervisor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            sink,
            geometry,
            pacer,
            supervisor,
            cancel,
        }
    }

    /// Runs until the stop signal, a failed reconnect, or a push failure.
    /// Returns `Ok` only for a requested stop.
    pub fn run(mut self) -> Result<(), RelayError> {
        let result = self.drive();
        self.sink.close();
        self.source.close();
        match &result {
            Ok(()) => log::info!("relay stopped"),
            Err(e) => log::error!("relay failed: {}", e),
        }
        result
    }

    fn drive(&mut self) -> Result<(), RelayError> {
        let mut frames_pushed: u64 = 0;
        loop {
            // Cooperative cancellation: checked once per iteration, not
            // mid-operation. Shutdown latency is bounded by the transport
            // timeouts, not by this check.
            if self.cancel.is_cancelled() {
                log::info!("stop requested");
                return Ok(());
            }

            match self.step(&mut frames_pushed) {
                Ok(()) => {}
                Err(StepError::Read(e)) => {
                    log::warn!("read frame failed: {}, reconnecting", e);
                    self.supervisor.recover(&mut self.source, self.geometry)?;
                }
                Err(StepError::Push(e)) => return Err(RelayError::Push(e)),
            }
        }
    }

    /// One relay iteration: pull, push, pace. Kept separate so the frame
    /// borrow stays contained and the caller can reopen the source on
    /// read failures.
    fn step(&mut self, frames_pushed: &mut u64) -> Result<(), StepError> {
        let frame = self.source.read_frame().map_err(StepError::Read)?;
        self.sink.push_frame(frame).map_err(StepError::Push)?;
        *frames_pushed += 1;
        self.pacer.wait_for_next_slot(*frames_pushed);
        Ok(())
    }
}

enum StepError {
    Read(super::ReadError),
    Push(super::PushError),
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
