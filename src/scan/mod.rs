// src/scan/mod.rs - Raster scan planning and execution

pub mod config;
pub mod planner;
pub mod runner;
pub mod state;

pub use config::{Axis, AxisOrder, AxisPair, ScanConfig, ScanGeometry};
pub use planner::{PlannerError, RasterScanPlanner, ScanPhase};
pub use runner::{CancelHandle, RunOptions, ScanError, ScanReport, ScanRunner};
pub use state::{Direction, ScanState};
