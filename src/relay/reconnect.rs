use std::time::Duration;

use super::error::RelayError;
use super::retry::{self, Attempt, RetryError};
use super::{FrameSource, Geometry};

/// Recovers the capture side after a read failure: tear down, back off,
/// reopen, and re-validate the negotiated geometry against the sink's
/// fixed geometry. The push side is never touched.
pub struct ReconnectSupervisor {
    backoff: Duration,
    max_attempts: u32,
}

impl Default for ReconnectSupervisor {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(2),
            max_attempts: 1,
        }
    }
}

impl ReconnectSupervisor {
    pub fn new(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
        }
    }

    pub fn recover<S: FrameSource>(
        &self,
        source: &mut S,
        expected: Geometry,
    ) -> Result<(), RelayError> {
        source.close();

        let mut last_reason = String::new();
        let reopened = retry::bounded::<Geometry, std::convert::Infallible>(self.max_attempts, || {
            std::thread::sleep(self.backoff);
            match source.open() {
                Ok(geometry) => Attempt::Ready(geometry),
                Err(e) => {
                    log::warn!("reopen failed: {}", e);
                    last_reason = e.reason;
                    Attempt::Transient
                }
            }
        });

        match reopened {
            Ok(geometry) if geometry == expected => {
                log::info!("source reconnected ({})", geometry);
                Ok(())
            }
            Ok(geometry) => {
                // The sink cannot be reconfigured mid-run.
                source.close();
                Err(RelayError::GeometryChanged {
                    expected,
                    actual: geometry,
                })
            }
            Err(RetryError::Exhausted { attempts }) => Err(RelayError::ReconnectFailed {
                attempts,
                reason: last_reason,
            }),
            Err(RetryError::Fatal(never)) => match never {},
        }
    }
}
