// src/scan/runner.rs - Drives the raster planner over the command/ack channels
//
// Per iteration: sample, plan, push the command, wait for "ok", then sleep for
// the command's estimated duration. Cancellation races every wait.

use num::rational::BigRational;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::communication::channel::{is_ack, PlannerLink};
use crate::motion::MotionCommand;
use crate::scan::config::AxisPair;
use crate::scan::planner::{PlannerError, RasterScanPlanner, ScanPhase};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
    #[error("No acknowledgment for '{command}' within {timeout:?}")]
    AckTimeout { command: String, timeout: Duration },
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Upper bound on a single acknowledgment wait; `None` waits forever
    pub ack_timeout: Option<Duration>,
}

/// Outcome of a scan run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub phase: ScanPhase,
    pub samples: u64,
    pub commands_sent: u64,
    pub last_position: AxisPair<BigRational>,
}

/// Cloneable handle that cancels a running scan from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }
}

enum Settled {
    Done,
    Cancelled,
}

pub struct ScanRunner {
    planner: RasterScanPlanner,
    link: PlannerLink,
    options: RunOptions,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    commands_sent: u64,
}

impl ScanRunner {
    pub fn new(planner: RasterScanPlanner, link: PlannerLink, options: RunOptions) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            planner,
            link,
            options,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            commands_sent: 0,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { signal: self.cancel_tx.clone() }
    }

    pub fn planner(&self) -> &RasterScanPlanner {
        &self.planner
    }

    /// Run until the raster completes, is cancelled, or a channel fault occurs.
    ///
    /// An idle planner is activated first. A fault aborts the scan: the planner
    /// ends `Cancelled` with its state frozen at the last planned position, and
    /// only [`ScanRunner::restart`] makes it usable again.
    pub async fn run(&mut self) -> Result<ScanReport, ScanError> {
        if self.planner.phase() == ScanPhase::Idle {
            self.planner.activate()?;
        }

        // Command sent but not yet acknowledged and paced
        let mut pending: Option<MotionCommand> = None;
        loop {
            if let Some(command) = pending.take() {
                match self.settle(&command).await {
                    Ok(Settled::Done) => {}
                    Ok(Settled::Cancelled) => {
                        self.planner.cancel();
                        break;
                    }
                    Err(e) => return Err(self.abort(e)),
                }
            }

            if self.cancel_requested() {
                self.planner.cancel();
                break;
            }
            if !self.planner.is_scanning() {
                break;
            }

            self.planner.sample();
            let Some(command) = self.planner.next_command() else {
                break;
            };
            if let Err(e) = self.dispatch(&command) {
                return Err(self.abort(e));
            }
            if self.planner.phase() == ScanPhase::Complete {
                // The return-to-origin move is not paced.
                break;
            }
            pending = Some(command);
        }

        let report = self.report();
        tracing::info!(
            "Scan finished in {:?}: {} samples, {} commands",
            report.phase,
            report.samples,
            report.commands_sent
        );
        Ok(report)
    }

    /// Make a finished, cancelled or aborted scan runnable again from the origin.
    ///
    /// Replies still queued from the previous scan are discarded, so the first
    /// move of the new scan waits for its own acknowledgment.
    pub fn restart(&mut self) -> Result<(), ScanError> {
        self.planner.restart()?;
        while let Ok(reply) = self.link.acks.try_recv() {
            tracing::warn!("Discarding stale device reply '{}' on restart", reply);
        }
        self.cancel_tx.send_replace(false);
        self.commands_sent = 0;
        Ok(())
    }

    pub fn report(&self) -> ScanReport {
        let state = self.planner.state();
        ScanReport {
            phase: self.planner.phase(),
            samples: state.sample_count,
            commands_sent: self.commands_sent,
            last_position: state.position.clone(),
        }
    }

    fn abort(&mut self, error: ScanError) -> ScanError {
        tracing::error!("Scan aborted: {}", error);
        self.planner.cancel();
        error
    }

    fn cancel_requested(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    fn dispatch(&mut self, command: &MotionCommand) -> Result<(), ScanError> {
        let line = command.encode();
        tracing::debug!("put: ({})", line);
        self.link
            .commands
            .send(line)
            .map_err(|_| ScanError::ChannelClosed("command"))?;
        self.commands_sent += 1;
        Ok(())
    }

    /// Wait for the acknowledgment, then for the estimated move time.
    async fn settle(&mut self, command: &MotionCommand) -> Result<Settled, ScanError> {
        let ack_timeout = self.options.ack_timeout;
        let acks = &mut self.link.acks;
        let cancel = &mut self.cancel_rx;

        let ack = next_ack(acks);
        let bounded = async {
            match ack_timeout {
                Some(limit) => tokio::time::timeout(limit, ack).await.map_err(|_| {
                    tracing::error!("Timed out after {:?} waiting for ok", limit);
                    ScanError::AckTimeout { command: command.encode(), timeout: limit }
                })?,
                None => ack.await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled(cancel) => return Ok(Settled::Cancelled),
            result = bounded => result?,
        }

        if let Some(pause) = command.pause() {
            tracing::debug!("Pausing {:?} for the move to finish", pause);
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Ok(Settled::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }
        Ok(Settled::Done)
    }
}

/// Block until the device answers `ok`, discarding any other reply.
async fn next_ack(acks: &mut mpsc::UnboundedReceiver<String>) -> Result<(), ScanError> {
    loop {
        match acks.recv().await {
            Some(reply) if is_ack(&reply) => return Ok(()),
            Some(reply) => tracing::warn!("Discarding device reply '{}' while waiting for ok", reply),
            None => return Err(ScanError::ChannelClosed("acknowledgment")),
        }
    }
}

/// Resolves once cancellation is requested.
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    let closed = signal.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        // The runner owns a sender, so the signal cannot close while it waits.
        std::future::pending::<()>().await;
    }
}
