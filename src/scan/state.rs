// src/scan/state.rs - Mutable raster state owned by the planner
use num::rational::BigRational;
use num::Zero;

use crate::scan::config::AxisPair;

/// Travel direction of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// `step` signed by this direction.
    pub fn apply(self, step: &BigRational) -> BigRational {
        match self {
            Direction::Forward => step.clone(),
            Direction::Reverse => -step.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    pub position: AxisPair<BigRational>,
    pub direction: AxisPair<Direction>,
    pub completed: bool,
    pub is_first_iteration: bool,
    pub sample_count: u64,
}

impl ScanState {
    /// Fresh state at the origin, both axes heading forward.
    pub fn new() -> Self {
        Self {
            position: AxisPair::new(BigRational::zero(), BigRational::zero()),
            direction: AxisPair::default(),
            completed: false,
            is_first_iteration: true,
            sample_count: 0,
        }
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}
