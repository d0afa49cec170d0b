// src/motion/timing.rs - Trapezoidal pause model for absolute stage moves
//
// Each axis is treated as travelling alone at the feed-derived speed with one
// shared acceleration phase. This is not a coordinated-motion solution for
// diagonal moves, and the controller pacing relies on this exact estimate.

use num::rational::BigRational;
use num::Signed;
use std::time::Duration;

use crate::rational::{int, to_f64};

/// Controller acceleration in distance/s² (firmware setting, not user configurable).
pub const FIRMWARE_ACCELERATION: i64 = 200;

/// Intermediate quantities of the trapezoidal velocity profile for one feed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapezoidProfile {
    /// Feed rate in distance/min
    pub feed_rate: BigRational,
    /// Acceleration in distance/s²
    pub acceleration: BigRational,
    /// Time spent reaching cruise speed (s)
    pub accel_time: BigRational,
    /// Distance covered while accelerating
    pub accel_dist: BigRational,
    /// Distance covered accelerating plus decelerating
    pub total_accel_dist: BigRational,
}

impl TrapezoidProfile {
    /// `feed_rate` and `acceleration` must both be positive.
    pub fn new(feed_rate: &BigRational, acceleration: &BigRational) -> Self {
        let speed = feed_rate / int(60);
        let accel_time = &speed / acceleration;
        let accel_dist = BigRational::new(1.into(), 2.into()) * acceleration * &accel_time * &accel_time;
        let total_accel_dist = &accel_dist * int(2);
        Self {
            feed_rate: feed_rate.clone(),
            acceleration: acceleration.clone(),
            accel_time,
            accel_dist,
            total_accel_dist,
        }
    }

    /// Cruise speed in distance/s.
    pub fn cruise_speed(&self) -> BigRational {
        &self.feed_rate / int(60)
    }

    /// Negative when the move is too short to reach cruise speed.
    pub fn cruise_dist(&self, distance: &BigRational) -> BigRational {
        distance.abs() - &self.total_accel_dist
    }

    pub fn cruise_time(&self, distance: &BigRational) -> BigRational {
        self.cruise_dist(distance) / self.cruise_speed()
    }

    /// Cruise time plus both ramps; a negative cruise time is kept as is.
    pub fn total_time(&self, distance: &BigRational) -> BigRational {
        self.cruise_time(distance) + &self.accel_time * int(2)
    }
}

/// Estimated seconds for a single-axis move of `distance` at `feed_rate` (distance/min)
/// under `acceleration` (distance/s²).
///
/// Pure: identical inputs always produce the identical exact result.
///
/// # Panics
///
/// Panics if `feed_rate` or `acceleration` is zero.
pub fn calc_pause(distance: &BigRational, feed_rate: &BigRational, acceleration: &BigRational) -> BigRational {
    TrapezoidProfile::new(feed_rate, acceleration).total_time(distance)
}

/// Timer value for an estimated pause; `None` means no wait at all.
pub fn pause_duration(seconds: &BigRational) -> Option<Duration> {
    if !seconds.is_positive() {
        return None;
    }
    Duration::try_from_secs_f64(to_f64(seconds)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::bigint::BigInt;

    fn half() -> BigRational {
        BigRational::new(BigInt::from(1), BigInt::from(2))
    }

    #[test]
    fn profile_for_default_sweep_feed() {
        let profile = TrapezoidProfile::new(&int(6000), &int(FIRMWARE_ACCELERATION));
        assert_eq!(profile.cruise_speed(), int(100));
        assert_eq!(profile.accel_time, half());
        assert_eq!(profile.accel_dist, int(25));
        assert_eq!(profile.total_accel_dist, int(50));
        assert_eq!(profile.cruise_dist(&int(100)), int(50));
        assert_eq!(profile.cruise_time(&int(100)), half());
        assert_eq!(profile.total_time(&int(100)), BigRational::new(BigInt::from(3), BigInt::from(2)));
    }

    #[test]
    fn short_moves_are_not_clamped() {
        let profile = TrapezoidProfile::new(&int(6000), &int(FIRMWARE_ACCELERATION));
        assert_eq!(profile.cruise_dist(&int(10)), int(-40));
        assert_eq!(profile.cruise_time(&int(10)), BigRational::new(BigInt::from(-2), BigInt::from(5)));
        assert_eq!(profile.total_time(&int(10)), BigRational::new(BigInt::from(3), BigInt::from(5)));
    }

    #[test]
    fn distance_sign_is_ignored() {
        let a = calc_pause(&int(-100), &int(6000), &int(200));
        let b = calc_pause(&int(100), &int(6000), &int(200));
        assert_eq!(a, b);
    }

    #[test]
    fn non_positive_pause_means_no_wait() {
        assert_eq!(pause_duration(&int(0)), None);
        assert_eq!(pause_duration(&int(-1)), None);
        assert_eq!(pause_duration(&half()), Some(Duration::from_millis(500)));
    }
}
