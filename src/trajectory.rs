//! Smooth trajectory generation from the behavior decision.
//!
//! Each cycle the generator fits a spline through a handful of anchor
//! points (the tail of the previously commanded path plus two points down
//! the centre of the target lane) and samples it at a spacing that matches
//! the current reference speed. Unconsumed points from the previous path
//! are kept verbatim so the command stream stays continuous.

use crate::map::WaypointMap;
use crate::math::{heading_vector, project_local, rot90, unproject_local, CubicSpline, Point2d};
use crate::perception::LANE_WIDTH;
use arrayvec::ArrayVec;

/// Number of points in every emitted path.
pub const HORIZON: usize = 50;

/// Time between consecutive path points in s.
pub const TIME_STEP: f64 = 0.02;

/// Spacing of the far spline anchors along the track, in m.
const ANCHOR_SPACING: f64 = 30.0;

/// Local-frame lookahead distance the point spacing is computed over, in m.
const TARGET_X: f64 = 30.0;

/// Conversion from the telemetry speed unit (mph) to m/s.
const SPEED_UNIT: f64 = 2.24;

/// The ego vehicle's pose as the trajectory generator sees it.
#[derive(Clone, Copy, Debug)]
pub struct EgoState {
    /// World-space position.
    pub pos: Point2d,
    /// Heading in radians.
    pub yaw: f64,
    /// Longitudinal progress to plan from; the end of the unconsumed path
    /// when one exists, otherwise the vehicle's current `s`.
    pub s: f64,
}

/// Generates the next path of exactly [`HORIZON`] points.
///
/// `history` is the unconsumed tail of the previously commanded path; it is
/// copied verbatim into the output prefix. If the anchor geometry degenerates
/// (which a well-formed map and history never produce), the previous path is
/// held rather than emitting a malformed one.
pub fn generate(
    map: &WaypointMap,
    ego: EgoState,
    lane: usize,
    ref_vel: f64,
    history: &[Point2d],
) -> Vec<Point2d> {
    // Plan from the end of the unconsumed path when enough of it remains;
    // the heading between its last two points is smoother than raw telemetry.
    let mut anchors = ArrayVec::<Point2d, 4>::new();
    let (ref_pos, ref_yaw) = if history.len() < 2 {
        anchors.push(ego.pos - heading_vector(ego.yaw));
        anchors.push(ego.pos);
        (ego.pos, ego.yaw)
    } else {
        let last = history[history.len() - 1];
        let prev = history[history.len() - 2];
        anchors.push(prev);
        anchors.push(last);
        (last, (last.y - prev.y).atan2(last.x - prev.x))
    };

    // Two far anchors down the centre of the target lane.
    let lane_centre = LANE_WIDTH / 2.0 + LANE_WIDTH * lane as f64;
    for i in 1..=2 {
        anchors.push(map.to_cartesian(ego.s + ANCHOR_SPACING * i as f64, lane_centre));
    }

    // Fit the spline in the vehicle's local frame, where the anchor x-values
    // increase monotonically and the curve is a function of one axis.
    let dir = heading_vector(ref_yaw);
    let perp = rot90(dir);
    let mut xs = ArrayVec::<f64, 4>::new();
    let mut ys = ArrayVec::<f64, 4>::new();
    for p in &anchors {
        let local = project_local(*p, ref_pos, dir, perp);
        xs.push(local.x);
        ys.push(local.y);
    }

    let mut path: Vec<Point2d> = history.to_vec();

    let step = ref_vel * TIME_STEP / SPEED_UNIT;
    let spline = match CubicSpline::fit(&xs, &ys) {
        Ok(spline) if step > f64::EPSILON => spline,
        _ => {
            // Hold the trailing point of the previous path instead of
            // emitting a malformed or empty command.
            let hold = history.last().copied().unwrap_or(ego.pos);
            path.resize(HORIZON, hold);
            return path;
        }
    };

    // Sample the spline at a spacing that covers the lookahead distance in
    // the number of ticks the reference speed allows.
    let target_y = spline.y(TARGET_X);
    let target_dist = (TARGET_X * TARGET_X + target_y * target_y).sqrt();
    let x_step = TARGET_X * step / target_dist;

    let mut x = 0.0;
    while path.len() < HORIZON {
        x += x_step;
        let local = Point2d::new(x, spline.y(x));
        path.push(unproject_local(local, ref_pos, dir, perp));
    }
    path.truncate(HORIZON);
    path
}
