// Raster planner behaviour: geometry, traversal order, completion and lifecycle

use num::bigint::BigInt;
use num::rational::BigRational;
use num::{Signed, Zero};
use stage_scan::rational::{int, parse_rational};
use stage_scan::scan::{Axis, AxisOrder, RasterScanPlanner, ScanConfig, ScanGeometry, ScanPhase};
use stage_scan::{ConfigError, MotionCommand};
use std::collections::HashSet;

fn ratio(numer: i64, denom: i64) -> BigRational {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

fn scan_config(x_range: BigRational, aspect: (u32, u32), quality: u32, order: AxisOrder) -> ScanConfig {
    ScanConfig {
        x_range,
        y_range: BigRational::zero(),
        ratio: aspect,
        quality,
        axis_order: order,
        ..ScanConfig::default()
    }
}

/// Activate and plan the whole raster; returns the visited points (origin first)
/// and the final return move.
fn plan(config: ScanConfig) -> (RasterScanPlanner, Vec<(BigRational, BigRational)>, MotionCommand) {
    let mut planner = RasterScanPlanner::configure(config).unwrap();
    planner.activate().unwrap();
    let mut commands = planner.dry_run();
    let back_home = commands.pop().expect("return move");
    let mut points = vec![(BigRational::zero(), BigRational::zero())];
    points.extend(
        commands
            .iter()
            .map(|c| (c.target_x().unwrap().clone(), c.target_y().unwrap().clone())),
    );
    (planner, points, back_home)
}

fn odd_sweep_configs() -> Vec<ScanConfig> {
    vec![
        scan_config(int(130), (4, 3), 4, AxisOrder(Axis::Y, Axis::X)),
        scan_config(int(130), (4, 3), 4, AxisOrder(Axis::X, Axis::Y)),
        scan_config(int(2), (1, 1), 2, AxisOrder(Axis::X, Axis::Y)),
        scan_config(int(9), (3, 2), 1, AxisOrder(Axis::X, Axis::Y)),
        scan_config(ratio(100, 3), (7, 5), 2, AxisOrder(Axis::Y, Axis::X)),
    ]
}

#[test]
fn test_geometry_for_four_by_three() {
    let config = scan_config(int(130), (4, 3), 4, AxisOrder::default());
    let geometry = ScanGeometry::new(&config).unwrap();
    assert_eq!(geometry.divisions.x, 16);
    assert_eq!(geometry.divisions.y, 12);
    assert_eq!(geometry.range_max.x, int(130));
    assert_eq!(geometry.range_max.y, parse_rational("97.5").unwrap());
    assert_eq!(geometry.step_size.x, parse_rational("8.125").unwrap());
    assert_eq!(geometry.step_size.y, parse_rational("8.125").unwrap());
    assert_eq!(geometry.point_count(), 17 * 13);
}

#[test]
fn test_x_range_derived_from_y_range() {
    let config = ScanConfig {
        x_range: BigRational::zero(),
        y_range: int(90),
        ..ScanConfig::default()
    };
    let geometry = ScanGeometry::new(&config).unwrap();
    assert_eq!(geometry.range_max.x, int(120));
    assert_eq!(geometry.range_max.y, int(90));
}

#[test]
fn test_both_ranges_given_are_kept() {
    let config = ScanConfig {
        x_range: int(40),
        y_range: int(10),
        ..ScanConfig::default()
    };
    let geometry = ScanGeometry::new(&config).unwrap();
    assert_eq!(geometry.range_max.x, int(40));
    assert_eq!(geometry.range_max.y, int(10));
    assert_eq!(geometry.step_size.y, ratio(5, 6));
}

#[test]
fn test_first_move_steps_the_primary_axis() {
    let mut planner = RasterScanPlanner::configure(ScanConfig::default()).unwrap();
    planner.activate().unwrap();
    planner.sample();
    let first = planner.next_command().unwrap();
    assert_eq!(first.encode(), "G1 X0.0000 Y8.1250 F6000.0000");
}

#[test]
fn test_every_grid_point_visited_once() {
    for config in odd_sweep_configs() {
        let geometry = ScanGeometry::new(&config).unwrap();
        let (planner, points, _) = plan(config);
        let distinct: HashSet<_> = points.iter().cloned().collect();
        assert_eq!(points.len() as u64, geometry.point_count());
        assert_eq!(distinct.len(), points.len());
        assert_eq!(planner.state().sample_count, geometry.point_count());
    }
}

#[test]
fn test_positions_are_exact_step_multiples_within_range() {
    for config in odd_sweep_configs() {
        let geometry = ScanGeometry::new(&config).unwrap();
        let (_, points, _) = plan(config);
        for (x, y) in &points {
            for (axis, value) in [(Axis::X, x), (Axis::Y, y)] {
                assert!(!value.is_negative());
                assert!(value <= &geometry.range_max[axis]);
                assert!((value / &geometry.step_size[axis]).is_integer());
            }
        }
    }
}

#[test]
fn test_boustrophedon_order() {
    let config = scan_config(int(130), (4, 3), 4, AxisOrder(Axis::Y, Axis::X));
    let geometry = ScanGeometry::new(&config).unwrap();
    let (_, points, _) = plan(config);
    for pair in points.windows(2) {
        let (x0, y0) = &pair[0];
        let (x1, y1) = &pair[1];
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        // Exactly one axis moves, by exactly one step.
        let x_step = dx == geometry.step_size.x && dy.is_zero();
        let y_step = dy == geometry.step_size.y && dx.is_zero();
        assert!(x_step ^ y_step, "bad move {:?} -> {:?}", pair[0], pair[1]);
        // The secondary axis never reverses.
        assert!(x1 >= x0);
    }
    // Sweeps alternate direction along the primary axis.
    let (_, row_end) = &points[12];
    assert_eq!(row_end, &geometry.range_max.y);
    let (_, next_row_start) = &points[13];
    assert_eq!(next_row_start, &geometry.range_max.y);
    let (_, second_row_end) = &points[25];
    assert!(second_row_end.is_zero());
}

#[test]
fn test_completes_at_both_maxima_and_returns_home() {
    for config in odd_sweep_configs() {
        let geometry = ScanGeometry::new(&config).unwrap();
        let (planner, points, back_home) = plan(config.clone());
        assert_eq!(planner.phase(), ScanPhase::Complete);
        assert!(planner.state().completed);
        let (x, y) = points.last().unwrap();
        assert_eq!(x, &geometry.range_max.x);
        assert_eq!(y, &geometry.range_max.y);
        assert_eq!(back_home, MotionCommand::to(int(0), int(0), config.return_feed.clone()));
        assert_eq!(back_home.encode(), "G1 X0.0000 Y0.0000 F4000.0000");
    }
}

#[test]
fn test_never_complete_before_the_corner() {
    let mut planner = RasterScanPlanner::configure(scan_config(int(2), (1, 1), 2, AxisOrder(Axis::X, Axis::Y))).unwrap();
    planner.activate().unwrap();
    let max = int(2);
    loop {
        planner.sample();
        let Some(_) = planner.next_command() else { break };
        let at_corner = planner.state().position.x == max && planner.state().position.y == max;
        if planner.phase() == ScanPhase::Complete {
            assert!(at_corner);
            break;
        }
    }
    assert_eq!(planner.phase(), ScanPhase::Complete);
    assert_eq!(planner.next_command(), None);
}

#[test]
fn test_even_sweep_count_still_covers_last_sweep() {
    // 1:1 at quality 1 gives two sweeps, so the last one ends back at the primary origin.
    let config = scan_config(int(1), (1, 1), 1, AxisOrder(Axis::X, Axis::Y));
    let (planner, points, _) = plan(config);
    assert_eq!(
        points,
        vec![(int(0), int(0)), (int(1), int(0)), (int(1), int(1)), (int(0), int(1))]
    );
    assert_eq!(planner.phase(), ScanPhase::Complete);
    assert_eq!(planner.state().sample_count, 4);
}

#[test]
fn test_invalid_configs_rejected_at_configure() {
    let empty = ScanConfig { x_range: int(0), y_range: int(0), ..ScanConfig::default() };
    assert!(matches!(RasterScanPlanner::configure(empty), Err(ConfigError::EmptyScanArea)));

    let negative = ScanConfig { x_range: int(-5), ..ScanConfig::default() };
    assert!(matches!(
        RasterScanPlanner::configure(negative),
        Err(ConfigError::NegativeRange { axis: Axis::X, .. })
    ));

    let flat = ScanConfig { ratio: (4, 0), ..ScanConfig::default() };
    assert!(matches!(RasterScanPlanner::configure(flat), Err(ConfigError::InvalidRatio(4, 0))));

    let no_quality = ScanConfig { quality: 0, ..ScanConfig::default() };
    assert!(matches!(RasterScanPlanner::configure(no_quality), Err(ConfigError::InvalidQuality(0))));

    let same_axis = ScanConfig { axis_order: AxisOrder(Axis::X, Axis::X), ..ScanConfig::default() };
    assert!(matches!(RasterScanPlanner::configure(same_axis), Err(ConfigError::DuplicateAxis(Axis::X))));

    let stalled = ScanConfig { sweep_feed: int(0), ..ScanConfig::default() };
    assert!(matches!(
        RasterScanPlanner::configure(stalled),
        Err(ConfigError::InvalidFeed { name: "sweep_feed", .. })
    ));
}

#[test]
fn test_lifecycle_transitions() {
    let mut planner = RasterScanPlanner::configure(ScanConfig::default()).unwrap();
    assert_eq!(planner.phase(), ScanPhase::Idle);
    assert_eq!(planner.next_command(), None);

    planner.activate().unwrap();
    assert_eq!(planner.phase(), ScanPhase::Scanning);
    assert!(planner.activate().is_err());
    assert!(planner.restart().is_err());

    planner.sample();
    planner.next_command().unwrap();
    planner.cancel();
    assert_eq!(planner.phase(), ScanPhase::Cancelled);
    assert_eq!(planner.next_command(), None);
    // State stays frozen where the scan stopped.
    assert_eq!(planner.state().position.y, parse_rational("8.125").unwrap());

    planner.restart().unwrap();
    assert_eq!(planner.phase(), ScanPhase::Idle);
    assert!(planner.state().position.y.is_zero());
    assert!(planner.state().is_first_iteration);
    assert_eq!(planner.state().sample_count, 0);
}

#[test]
fn test_cancel_from_idle() {
    let mut planner = RasterScanPlanner::configure(ScanConfig::default()).unwrap();
    planner.cancel();
    assert_eq!(planner.phase(), ScanPhase::Cancelled);
    assert!(planner.activate().is_err());
}

#[test]
fn test_sampling_only_counts_while_scanning() {
    let mut planner = RasterScanPlanner::configure(ScanConfig::default()).unwrap();
    planner.sample();
    assert_eq!(planner.state().sample_count, 0);
    planner.activate().unwrap();
    planner.sample();
    assert_eq!(planner.state().sample_count, 1);
}
