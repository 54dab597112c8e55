use std::future::Future;

use chrono::{NaiveDateTime, SubsecRound, Utc};
use log::{debug, error, info, warn};

use crate::catalog::{self, CaptureTarget};
use crate::configuration::RunConfig;
use crate::data_capture::{capture_frame, CapturePath, FrameEncoder};
use crate::error_handling::types::*;
use crate::run_lock::{self, LockAttempt};
use crate::storage::{CapturedFrame, FrameStore};

/// Tally of a completed capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Capture instant shared by every frame of the run
    pub captured_at: NaiveDateTime,
    /// Targets processed, after the per-run cap
    pub attempted: usize,
    /// Frames captured and stored
    pub succeeded: usize,
    /// Targets for which no frame could be captured
    pub capture_failures: usize,
    /// Frames captured but not stored
    pub write_failures: usize,
}

/// How a run ended without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run holds the lock, nothing was touched
    Skipped,
    /// The catalog yielded no targets
    NothingToDo,
    Completed(RunSummary),
}

/// Drives one capture run: lock, catalog, capture, persist, report.
///
/// Targets are handled one at a time in catalog order. A target whose
/// capture or write fails is logged and skipped; only configuration,
/// lock, catalog and database setup errors abort the run.
pub struct Controller<E> {
    config: RunConfig,
    encoder: E,
}

impl<E: FrameEncoder> Controller<E> {
    pub fn new(config: RunConfig, encoder: E) -> Self {
        Self { config, encoder }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs with the current time, truncated to whole seconds, as the
    /// shared capture instant.
    ///
    /// `connect` is only called once there is something to capture.
    pub async fn run<S, F, Fut>(&self, connect: F) -> Result<RunOutcome, ControllerError>
    where
        S: FrameStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, StorageError>>,
    {
        self.execute(connect, None).await
    }

    /// Same as [`Controller::run`] with a fixed capture instant, e.g. to
    /// redo a run that stored broken frames.
    pub async fn run_at<S, F, Fut>(
        &self,
        connect: F,
        captured_at: NaiveDateTime,
    ) -> Result<RunOutcome, ControllerError>
    where
        S: FrameStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, StorageError>>,
    {
        self.execute(connect, Some(captured_at)).await
    }

    async fn execute<S, F, Fut>(
        &self,
        connect: F,
        fixed_instant: Option<NaiveDateTime>,
    ) -> Result<RunOutcome, ControllerError>
    where
        S: FrameStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, StorageError>>,
    {
        // Held until this function returns, whichever way it does
        let _lock = match run_lock::acquire(&self.config.lock_file)? {
            LockAttempt::Acquired(lock) => lock,
            LockAttempt::Busy => {
                info!("Previous run is still in progress; exiting.");
                return Ok(RunOutcome::Skipped);
            }
        };

        let targets = catalog::load_targets(&self.config.streams_file)?;
        let targets = catalog::truncate_targets(targets, self.config.max_streams);
        if targets.is_empty() {
            info!("No streams to capture; exiting.");
            return Ok(RunOutcome::NothingToDo);
        }

        let store = connect().await?;
        store.ensure_schema().await?;

        let captured_at = fixed_instant.unwrap_or_else(capture_instant);
        let mut summary = RunSummary {
            captured_at,
            attempted: targets.len(),
            succeeded: 0,
            capture_failures: 0,
            write_failures: 0,
        };

        for target in &targets {
            match self.process_target(&store, target, captured_at).await {
                TargetOutcome::Stored => summary.succeeded += 1,
                TargetOutcome::CaptureFailed => summary.capture_failures += 1,
                TargetOutcome::WriteFailed => summary.write_failures += 1,
            }
        }

        if let Err(e) = store.close().await {
            warn!("Closing the database connection failed: {}", e);
        }

        info!(
            "Done. Captured {}/{} streams at {} UTC",
            summary.succeeded,
            summary.attempted,
            summary.captured_at.format("%Y-%m-%dT%H:%M:%S")
        );
        Ok(RunOutcome::Completed(summary))
    }

    async fn process_target<S: FrameStore>(
        &self,
        store: &S,
        target: &CaptureTarget,
        captured_at: NaiveDateTime,
    ) -> TargetOutcome {
        debug!(
            "Capturing {} ({}) from {}",
            target.resort_name, target.slope_name, target.stream_url
        );
        let image = match capture_frame(&self.encoder, &target.stream_url, &self.config.capture)
            .await
        {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    "Skipping {} ({}) due to capture failure: {}",
                    target.resort_name, target.slope_name, e
                );
                return TargetOutcome::CaptureFailed;
            }
        };
        let path = image.path;

        let frame = CapturedFrame::new(target, captured_at, image);
        match store.save_frame(&frame).await {
            Ok(()) => {
                info!(
                    "Stored {} ({}){}",
                    target.resort_name,
                    target.slope_name,
                    if path == CapturePath::Reencoded {
                        " via PNG fallback"
                    } else {
                        ""
                    }
                );
                TargetOutcome::Stored
            }
            Err(e) => {
                error!(
                    "Failed to store {} ({}) from {}: {}",
                    target.resort_name, target.slope_name, target.stream_url, e
                );
                TargetOutcome::WriteFailed
            }
        }
    }
}

enum TargetOutcome {
    Stored,
    CaptureFailed,
    WriteFailed,
}

/// Current UTC time without sub-second precision.
pub fn capture_instant() -> NaiveDateTime {
    Utc::now().trunc_subsecs(0).naive_utc()
}
