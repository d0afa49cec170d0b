// src/scan/planner.rs - Boustrophedon raster planner
//
// The planner owns the scan state and turns it into one MotionCommand per
// iteration. It never touches a channel or a clock; ScanRunner drives it.

use num::rational::BigRational;
use num::Zero;
use thiserror::Error;

use crate::config::ConfigError;
use crate::motion::MotionCommand;
use crate::scan::config::{Axis, ScanConfig, ScanGeometry};
use crate::scan::state::{Direction, ScanState};

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    /// Reserved for a homing routine; passed through during activation
    Homing,
    /// Reserved for a start-position routine; passed through during activation
    BeginRoutine,
    Scanning,
    Complete,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid planner transition: {0}")]
    InvalidTransition(String),
}

#[derive(Debug, Clone)]
pub struct RasterScanPlanner {
    config: ScanConfig,
    geometry: ScanGeometry,
    state: ScanState,
    phase: ScanPhase,
    last_command: Option<MotionCommand>,
}

impl RasterScanPlanner {
    /// Validate `config` and build an idle planner. Nothing is emitted until
    /// [`activate`](Self::activate) is called.
    pub fn configure(config: ScanConfig) -> Result<Self, ConfigError> {
        let geometry = ScanGeometry::new(&config)?;
        tracing::info!(
            "Configured raster scan: ratio {}:{}, quality {}",
            config.ratio.0,
            config.ratio.1,
            config.quality
        );
        geometry.log_summary();
        Ok(Self {
            config,
            geometry,
            state: ScanState::new(),
            phase: ScanPhase::Idle,
            last_command: None,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn geometry(&self) -> &ScanGeometry {
        &self.geometry
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    pub fn last_command(&self) -> Option<&MotionCommand> {
        self.last_command.as_ref()
    }

    /// `Idle -> Homing -> BeginRoutine -> Scanning`.
    pub fn activate(&mut self) -> Result<(), PlannerError> {
        if self.phase != ScanPhase::Idle {
            return Err(PlannerError::InvalidTransition(format!(
                "cannot activate a scan in {:?}",
                self.phase
            )));
        }
        self.phase = ScanPhase::Homing;
        self.home_routine();
        self.phase = ScanPhase::BeginRoutine;
        self.begin_routine();
        self.phase = ScanPhase::Scanning;
        tracing::info!("Raster scan active");
        Ok(())
    }

    /// Stop emitting commands. Valid from every phase; the state stays frozen
    /// at the last planned position.
    pub fn cancel(&mut self) {
        if self.phase != ScanPhase::Cancelled {
            tracing::warn!("Raster scan cancelled in {:?}", self.phase);
            self.phase = ScanPhase::Cancelled;
        }
    }

    /// Back to `Idle` with state recomputed from the configuration.
    pub fn restart(&mut self) -> Result<(), PlannerError> {
        match self.phase {
            ScanPhase::Complete | ScanPhase::Cancelled => {
                self.state = ScanState::new();
                self.last_command = None;
                self.phase = ScanPhase::Idle;
                Ok(())
            }
            phase => Err(PlannerError::InvalidTransition(format!(
                "cannot restart a scan in {:?}",
                phase
            ))),
        }
    }

    fn home_routine(&mut self) {
        tracing::debug!("No homing routine, assuming the stage rests at the origin");
    }

    fn begin_routine(&mut self) {
        tracing::debug!("No start routine, raster begins at the origin");
    }

    /// Sampling hook, called once per iteration at the current position.
    /// Data capture is not implemented; the point is only counted and logged.
    pub fn sample(&mut self) {
        if !self.is_scanning() {
            return;
        }
        self.state.sample_count += 1;
        tracing::debug!(
            "Sampling #{} at X{} Y{}",
            self.state.sample_count,
            self.state.position.x,
            self.state.position.y
        );
    }

    /// Advance one iteration and return the move to send, or `None` when the
    /// planner is not scanning. Reaching the end yields the return-to-origin
    /// move once and leaves the planner `Complete`.
    pub fn next_command(&mut self) -> Option<MotionCommand> {
        if !self.is_scanning() {
            return None;
        }
        let primary = self.geometry.axis_order.primary();
        let secondary = self.geometry.axis_order.secondary();

        let mut turnover = false;
        if !self.state.is_first_iteration {
            if self.at_range_max(secondary) && self.at_travel_bound(primary) {
                return Some(self.finish());
            }
            if self.at_travel_bound(primary) {
                let direction = &mut self.state.direction[primary];
                *direction = direction.flipped();
                turnover = true;
            }
        }
        self.state.is_first_iteration = false;

        let moving = if turnover { secondary } else { primary };
        let delta = self.state.direction[moving].apply(&self.geometry.step_size[moving]);
        self.state.position[moving] += delta;

        let command = MotionCommand::to(
            self.state.position.x.clone(),
            self.state.position.y.clone(),
            self.geometry.sweep_feed.clone(),
        );
        self.last_command = Some(command.clone());
        Some(command)
    }

    /// Plan the whole raster without a device, sampling at every point.
    pub fn dry_run(&mut self) -> Vec<MotionCommand> {
        let mut commands = Vec::new();
        while self.is_scanning() {
            self.sample();
            match self.next_command() {
                Some(command) => commands.push(command),
                None => break,
            }
        }
        commands
    }

    fn finish(&mut self) -> MotionCommand {
        self.state.completed = true;
        self.phase = ScanPhase::Complete;
        tracing::info!("Complete! Sampled {} points", self.state.sample_count);
        let command = MotionCommand::to(
            BigRational::zero(),
            BigRational::zero(),
            self.geometry.return_feed.clone(),
        );
        self.last_command = Some(command.clone());
        command
    }

    fn at_range_max(&self, axis: Axis) -> bool {
        self.state.position[axis] == self.geometry.range_max[axis]
    }

    /// The axis has reached the bound it is heading towards.
    fn at_travel_bound(&self, axis: Axis) -> bool {
        match self.state.direction[axis] {
            Direction::Forward => self.at_range_max(axis),
            Direction::Reverse => self.state.position[axis].is_zero(),
        }
    }
}
