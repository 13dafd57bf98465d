//! Per-cycle reduction of tracked vehicles into per-lane occupancy statistics.

use crate::math::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Number of drivable lanes, indexed 0..3 from the centerline outward.
pub const LANE_COUNT: usize = 3;

/// Width of a single lane in m.
pub const LANE_WIDTH: f64 = 4.0;

/// Clearance reported for a lane with no vehicle within the sensor horizon.
pub const NO_VEHICLE_DISTANCE: f64 = 200.0;

/// Speed assumed for an absent leading vehicle; effectively the road's
/// speed limit, so empty lanes always look attractive.
pub const OPEN_LANE_SPEED: f64 = 50.0;

/// A vehicle reported by sensor fusion, valid for a single cycle.
#[derive(Clone, Copy, Debug)]
pub struct TrackedObject {
    pub id: u64,
    /// World-space position.
    pub pos: Point2d,
    /// World-space velocity in m/s.
    pub vel: Vector2d,
    /// Longitudinal track progress in m.
    pub s: f64,
    /// Signed lateral offset from the track centerline in m.
    pub d: f64,
}

impl TrackedObject {
    /// Builds a tracked object from a raw `[id, x, y, vx, vy, s, d]`
    /// sensor-fusion row.
    pub fn from_sensor_row(row: [f64; 7]) -> Self {
        Self {
            id: row[0] as u64,
            pos: Point2d::new(row[1], row[2]),
            vel: Vector2d::new(row[3], row[4]),
            s: row[5],
            d: row[6],
        }
    }

    /// The object's speed, the magnitude of its velocity.
    pub fn speed(&self) -> f64 {
        self.vel.magnitude()
    }

    /// The lane the object occupies, or `None` when it is off the road.
    pub fn lane(&self) -> Option<usize> {
        let lane = (self.d / LANE_WIDTH).floor();
        (lane >= 0.0 && lane < LANE_COUNT as f64).then(|| lane as usize)
    }
}

/// Nearest-vehicle statistics for one lane over one cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneSnapshot {
    /// Distance to the nearest vehicle ahead in m.
    pub front_dist: f64,
    /// Speed of the nearest vehicle ahead.
    pub front_speed: f64,
    /// Distance to the nearest vehicle behind in m.
    pub rear_dist: f64,
    /// Speed of the nearest vehicle behind.
    pub rear_speed: f64,
}

impl Default for LaneSnapshot {
    fn default() -> Self {
        Self {
            front_dist: NO_VEHICLE_DISTANCE,
            front_speed: OPEN_LANE_SPEED,
            rear_dist: NO_VEHICLE_DISTANCE,
            rear_speed: 0.0,
        }
    }
}

/// Reduces the tracked vehicles into per-lane nearest front/rear statistics.
///
/// Each object's `s` is extrapolated forward by the duration of the ego
/// vehicle's unconsumed path, so clearances are measured at the moment the
/// ego car starts executing the newly planned path. `car_s` must be the
/// ego's matching extrapolated progress. Objects off the road are ignored,
/// and an empty object list yields fully open lanes.
pub fn lane_snapshots(
    car_s: f64,
    objects: &[TrackedObject],
    unconsumed_len: usize,
    dt: f64,
) -> [LaneSnapshot; LANE_COUNT] {
    let mut lanes = [LaneSnapshot::default(); LANE_COUNT];

    for obj in objects {
        let Some(lane) = obj.lane() else { continue };
        let speed = obj.speed();
        let s = obj.s + unconsumed_len as f64 * dt * speed;

        let snap = &mut lanes[lane];
        if car_s > s {
            let dist = car_s - s;
            if dist < snap.rear_dist {
                snap.rear_dist = dist;
                snap.rear_speed = speed;
            }
        } else {
            let dist = s - car_s;
            if dist < snap.front_dist {
                snap.front_dist = dist;
                snap.front_speed = speed;
            }
        }
    }

    lanes
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn object(id: u64, s: f64, d: f64, speed: f64) -> TrackedObject {
        TrackedObject::from_sensor_row([id as f64, 0.0, 0.0, speed, 0.0, s, d])
    }

    #[test]
    fn lane_classification_at_lane_centres() {
        assert_eq!(object(1, 0.0, 2.0, 0.0).lane(), Some(0));
        assert_eq!(object(1, 0.0, 6.0, 0.0).lane(), Some(1));
        assert_eq!(object(1, 0.0, 10.0, 0.0).lane(), Some(2));

        // Lane boundaries fall into the lane they open.
        assert_eq!(object(1, 0.0, 0.0, 0.0).lane(), Some(0));
        assert_eq!(object(1, 0.0, 4.0, 0.0).lane(), Some(1));
        assert_eq!(object(1, 0.0, 8.0, 0.0).lane(), Some(2));
    }

    #[test]
    fn off_road_objects_are_ignored() {
        let objects = [object(1, 110.0, -0.1, 10.0), object(2, 110.0, 12.1, 10.0)];
        let lanes = lane_snapshots(100.0, &objects, 0, 0.02);
        assert_eq!(lanes, [LaneSnapshot::default(); LANE_COUNT]);
    }

    #[test]
    fn empty_world_gives_open_lanes() {
        let lanes = lane_snapshots(100.0, &[], 0, 0.02);
        for lane in &lanes {
            assert_eq!(lane.front_dist, NO_VEHICLE_DISTANCE);
            assert_eq!(lane.front_speed, OPEN_LANE_SPEED);
            assert_eq!(lane.rear_dist, NO_VEHICLE_DISTANCE);
            assert_eq!(lane.rear_speed, 0.0);
        }
    }

    #[test]
    fn keeps_nearest_vehicle_per_side() {
        let objects = [
            object(1, 150.0, 6.0, 20.0),
            object(2, 130.0, 6.0, 25.0),
            object(3, 80.0, 6.0, 15.0),
            object(4, 60.0, 6.0, 30.0),
        ];
        let lanes = lane_snapshots(100.0, &objects, 0, 0.02);

        assert_approx_eq!(lanes[1].front_dist, 30.0, 1e-9);
        assert_approx_eq!(lanes[1].front_speed, 25.0, 1e-9);
        assert_approx_eq!(lanes[1].rear_dist, 20.0, 1e-9);
        assert_approx_eq!(lanes[1].rear_speed, 15.0, 1e-9);

        // Other lanes stay open.
        assert_eq!(lanes[0], LaneSnapshot::default());
        assert_eq!(lanes[2], LaneSnapshot::default());
    }

    #[test]
    fn extrapolates_objects_over_unconsumed_path() {
        // 25 unconsumed points at 0.02s each is half a second of travel.
        let objects = [object(1, 110.0, 6.0, 20.0)];
        let lanes = lane_snapshots(100.0, &objects, 25, 0.02);
        assert_approx_eq!(lanes[1].front_dist, 20.0, 1e-9);
    }

    #[test]
    fn speed_is_velocity_magnitude() {
        let obj = TrackedObject::from_sensor_row([7.0, 0.0, 0.0, 3.0, 4.0, 50.0, 2.0]);
        assert_approx_eq!(obj.speed(), 5.0, 1e-9);
        assert_eq!(obj.id, 7);
    }
}
