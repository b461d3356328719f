//! Health-check scheduler.
//!
//! Sends a `Tick` into the session mailbox on a fixed period. The scheduler
//! only holds a weak handle to the mailbox: it never keeps a session alive
//! and stops on its own once the session is gone.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::messages::SessionMessage;

pub(crate) struct HealthCheckScheduler {
    period: Duration,
    mailbox: mpsc::WeakSender<SessionMessage>,
    cancellation_token: CancellationToken,
}

impl HealthCheckScheduler {
    pub(crate) fn new(
        period: Duration,
        mailbox: mpsc::WeakSender<SessionMessage>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            period,
            mailbox,
            cancellation_token,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        // First check one period after start, like the following ones.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        // Late ticks are delivered back to back rather than skipped.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => break,

                _ = ticker.tick() => {
                    let Some(mailbox) = self.mailbox.upgrade() else {
                        break;
                    };
                    trace!("Health check tick");
                    // A full mailbox delays the tick instead of dropping it.
                    tokio::select! {
                        biased;
                        _ = self.cancellation_token.cancelled() => break,
                        sent = mailbox.send(SessionMessage::Tick) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        debug!("Health check scheduler stopped");
    }
}
