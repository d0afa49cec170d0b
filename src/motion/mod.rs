// src/motion/mod.rs - Move commands and the timing model behind them

pub mod command;
pub mod timing;

pub use command::{MotionCommand, LINEAR_MOVE};
pub use timing::{calc_pause, TrapezoidProfile, FIRMWARE_ACCELERATION};
