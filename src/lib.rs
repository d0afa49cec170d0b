// stage-scan: raster-scan host for a 2-axis positioning stage

pub mod communication;
pub mod config;
pub mod hardware;
pub mod motion;
pub mod rational;
pub mod scan;

pub use communication::channel::{link, DeviceLink, PlannerLink, ACK_TOKEN};
pub use config::{load_config, AppConfig, ConfigError};
pub use hardware::{DeviceWorker, HardwareError};
pub use motion::{calc_pause, MotionCommand, TrapezoidProfile};
pub use scan::{
    Axis, AxisOrder, AxisPair, CancelHandle, RasterScanPlanner, RunOptions, ScanConfig, ScanError,
    ScanPhase, ScanReport, ScanRunner,
};
