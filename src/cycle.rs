//! One control cycle: telemetry in, planned path out.

use crate::behavior::BehaviorPlanner;
use crate::map::WaypointMap;
use crate::math::Point2d;
use crate::perception::{lane_snapshots, TrackedObject};
use crate::telemetry::{PathResponse, Telemetry};
use crate::trajectory::{self, EgoState, TIME_STEP};
use log::trace;

/// The motion-planning core for a single vehicle.
///
/// Owns the read-only track map and the only state that survives between
/// cycles, the behavior planner's lane and reference speed. Cycles run to
/// completion before the next snapshot is processed; there is no
/// intra-cycle concurrency.
pub struct Planner {
    map: WaypointMap,
    behavior: BehaviorPlanner,
}

impl Planner {
    /// Creates a planner over the given track map.
    pub fn new(map: WaypointMap) -> Self {
        Self {
            map,
            behavior: BehaviorPlanner::new(),
        }
    }

    /// The track map the planner was built over.
    pub fn map(&self) -> &WaypointMap {
        &self.map
    }

    /// The behavior planner's current lane and reference speed.
    pub fn behavior(&self) -> &BehaviorPlanner {
        &self.behavior
    }

    /// Runs one control cycle over the latest telemetry snapshot.
    pub fn run_cycle(&mut self, telemetry: &Telemetry) -> PathResponse {
        let unconsumed = telemetry.previous_path_x.len();

        // Plan from where the vehicle will be once it has consumed the
        // remainder of the previously commanded path.
        let car_s = if unconsumed > 0 {
            telemetry.end_path_s
        } else {
            telemetry.s
        };

        let objects: Vec<TrackedObject> = telemetry
            .sensor_fusion
            .iter()
            .map(|row| TrackedObject::from_sensor_row(*row))
            .collect();
        let lanes = lane_snapshots(car_s, &objects, unconsumed, TIME_STEP);

        self.behavior.plan(telemetry.speed, &lanes);
        trace!(
            "cycle: lane {} ref_vel {:.2} unconsumed {}",
            self.behavior.lane(),
            self.behavior.ref_vel(),
            unconsumed
        );

        let history: Vec<Point2d> = telemetry
            .previous_path_x
            .iter()
            .zip(&telemetry.previous_path_y)
            .map(|(x, y)| Point2d::new(*x, *y))
            .collect();
        let ego = EgoState {
            pos: Point2d::new(telemetry.x, telemetry.y),
            yaw: telemetry.yaw_rad(),
            s: car_s,
        };
        let path = trajectory::generate(
            &self.map,
            ego,
            self.behavior.lane(),
            self.behavior.ref_vel(),
            &history,
        );

        let (next_x, next_y) = path.iter().map(|p| (p.x, p.y)).unzip();
        PathResponse { next_x, next_y }
    }
}
