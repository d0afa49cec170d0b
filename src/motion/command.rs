// src/motion/command.rs - Absolute stage move and its wire encoding
use num::rational::BigRational;
use num::{Signed, Zero};
use std::fmt;
use std::time::Duration;

use crate::motion::timing::{pause_duration, TrapezoidProfile, FIRMWARE_ACCELERATION};
use crate::rational::{format_fixed, int};

/// G-code word for a controlled linear move.
pub const LINEAR_MOVE: &str = "G1";

/// Fractional digits used for every number on the wire.
pub const WIRE_DIGITS: usize = 4;

/// One absolute move of the stage.
///
/// Targets stay exact; rounding only happens in [`MotionCommand::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct MotionCommand {
    target_x: Option<BigRational>,
    target_y: Option<BigRational>,
    feed_rate: BigRational,
    acceleration: BigRational,
}

impl MotionCommand {
    /// Move with optional axis targets. `feed_rate` is in distance/min.
    ///
    /// `feed_rate` must be positive: the timing model divides by it. Scan
    /// configuration rejects non-positive feeds before any command is built.
    pub fn linear(target_x: Option<BigRational>, target_y: Option<BigRational>, feed_rate: BigRational) -> Self {
        debug_assert!(feed_rate.is_positive(), "feed rate must be positive, got {}", feed_rate);
        Self {
            target_x,
            target_y,
            feed_rate,
            acceleration: int(FIRMWARE_ACCELERATION),
        }
    }

    /// Move both axes to `(x, y)`.
    pub fn to(x: BigRational, y: BigRational, feed_rate: BigRational) -> Self {
        Self::linear(Some(x), Some(y), feed_rate)
    }

    pub fn target_x(&self) -> Option<&BigRational> {
        self.target_x.as_ref()
    }

    pub fn target_y(&self) -> Option<&BigRational> {
        self.target_y.as_ref()
    }

    pub fn feed_rate(&self) -> &BigRational {
        &self.feed_rate
    }

    pub fn acceleration(&self) -> &BigRational {
        &self.acceleration
    }

    /// `G1 X<v> Y<v> F<v>` with unset axes omitted.
    pub fn encode(&self) -> String {
        let mut words = vec![LINEAR_MOVE.to_string()];
        if let Some(x) = &self.target_x {
            words.push(format!("X{}", format_fixed(x, WIRE_DIGITS)));
        }
        if let Some(y) = &self.target_y {
            words.push(format!("Y{}", format_fixed(y, WIRE_DIGITS)));
        }
        words.push(format!("F{}", format_fixed(&self.feed_rate, WIRE_DIGITS)));
        words.join(" ")
    }

    pub fn profile(&self) -> TrapezoidProfile {
        TrapezoidProfile::new(&self.feed_rate, &self.acceleration)
    }

    /// Estimated seconds until the controller finishes this move.
    ///
    /// Each set axis is timed over the distance from the origin to its target and
    /// the slowest axis wins. A command without axis targets takes no time.
    pub fn duration(&self) -> BigRational {
        let profile = self.profile();
        let estimate = [&self.target_x, &self.target_y]
            .into_iter()
            .flatten()
            .map(|target| profile.total_time(target))
            .max();
        if let Some(seconds) = &estimate {
            tracing::debug!(
                accel_time = %profile.accel_time,
                accel_dist = %profile.accel_dist,
                total_accel_dist = %profile.total_accel_dist,
                seconds = %seconds,
                "Pause estimate for {}",
                self.encode()
            );
        }
        estimate.unwrap_or_else(BigRational::zero)
    }

    /// How long to wait after the acknowledgment; `None` when the estimate is not positive.
    pub fn pause(&self) -> Option<Duration> {
        pause_duration(&self.duration())
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
