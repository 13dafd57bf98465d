//! The per-cycle lane and reference-speed decision process.

use crate::perception::{LaneSnapshot, LANE_COUNT};
use log::debug;

/// Reference speed ceiling, held just under the road's 50-unit limit.
pub const SPEED_LIMIT: f64 = 49.5;

/// Front clearance below which the leading vehicle forces a slowdown, in m.
const DANGER_DISTANCE: f64 = 30.0;

/// Front clearance below which a lane change is worth evaluating, in m.
const EVALUATE_DISTANCE: f64 = 60.0;

/// Minimum rear clearance required in any target lane, in m.
const REAR_CLEARANCE: f64 = 20.0;

/// Front clearance required in an outer lane targeted from the centre, in m.
const OUTER_FRONT_CLEARANCE: f64 = 45.0;

/// Margin by which the ego car may be slower than a target lane's rear vehicle.
const REAR_SPEED_MARGIN: f64 = 5.0;

/// Front clearance beyond which a lane counts as effectively empty, in m.
const OPEN_DISTANCE: f64 = 180.0;

/// Centre-lane front clearance that triggers the return-to-centre bias, in m.
const CENTRE_BIAS_DISTANCE: f64 = 120.0;

/// Extra clearance an outer lane must offer over the opposite outer lane
/// to win the comparison on distance rather than speed, in m.
const DISTANCE_TIEBREAK: f64 = 60.0;

/// Speed adjustment per cycle, approximating a 5 m/s^2 acceleration limit
/// at the fixed cycle rate.
const SPEED_STEP: f64 = 0.224;

/// Gentler speed step used while boxed in behind a slower vehicle.
const HALF_SPEED_STEP: f64 = 0.112;

const CENTRE_LANE: usize = 1;

/// Chooses a target lane and reference speed once per control cycle.
///
/// The current lane and reference speed are the only planner state that
/// survives between cycles; everything else is recomputed from the latest
/// telemetry snapshot. One instance serves one vehicle and nothing else
/// may mutate its state.
#[derive(Clone, Debug)]
pub struct BehaviorPlanner {
    lane: usize,
    ref_vel: f64,
}

impl Default for BehaviorPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorPlanner {
    /// Creates a planner starting in the centre lane at rest.
    pub fn new() -> Self {
        Self {
            lane: CENTRE_LANE,
            ref_vel: 0.0,
        }
    }

    /// The lane currently targeted by the planner.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// The reference speed the trajectory should be sampled at.
    pub fn ref_vel(&self) -> f64 {
        self.ref_vel
    }

    /// Runs one decision step over the current lane statistics.
    ///
    /// `car_speed` is the ego vehicle's reported speed this cycle, used to
    /// judge whether merging in front of a target lane's rear vehicle is safe.
    pub fn plan(&mut self, car_speed: f64, lanes: &[LaneSnapshot; LANE_COUNT]) {
        let too_close = lanes[self.lane].front_dist < DANGER_DISTANCE;

        let mut target = self.lane;
        if lanes[self.lane].front_dist < EVALUATE_DISTANCE {
            target = if self.lane == CENTRE_LANE {
                self.evaluate_from_centre(car_speed, lanes)
            } else {
                self.evaluate_from_outer(car_speed, lanes)
            };
        }

        // Prefer the centre lane whenever it is clearly open, regardless of
        // what the evaluation above concluded.
        if lanes[CENTRE_LANE].front_dist > CENTRE_BIAS_DISTANCE
            && lanes[CENTRE_LANE].rear_dist > REAR_CLEARANCE
        {
            target = CENTRE_LANE;
        }

        if target != self.lane {
            debug!("lane change: {} -> {}", self.lane, target);
            self.lane = target;
        }

        // `too_close` was judged against the pre-switch lane; the speed is
        // matched against whatever lane was just committed to.
        if too_close {
            if self.ref_vel > lanes[self.lane].front_speed {
                self.ref_vel = f64::max(self.ref_vel - SPEED_STEP, 0.0);
            } else if self.ref_vel < SPEED_LIMIT {
                self.ref_vel = f64::min(self.ref_vel + HALF_SPEED_STEP, SPEED_LIMIT);
            }
        } else if self.ref_vel < SPEED_LIMIT {
            self.ref_vel = f64::min(self.ref_vel + SPEED_STEP, SPEED_LIMIT);
        }
    }

    /// From an outer lane the only candidate is the centre lane.
    fn evaluate_from_outer(&self, car_speed: f64, lanes: &[LaneSnapshot; LANE_COUNT]) -> usize {
        let current = &lanes[self.lane];
        let centre = &lanes[CENTRE_LANE];

        let mut target = self.lane;
        if centre.front_dist > DANGER_DISTANCE
            && centre.rear_dist > REAR_CLEARANCE
            && car_speed > centre.rear_speed - REAR_SPEED_MARGIN
        {
            // When boxed in, only move over if the centre lane is actually
            // moving faster; otherwise any legal merge is an improvement.
            if current.front_dist >= DANGER_DISTANCE || centre.front_speed > current.front_speed {
                target = CENTRE_LANE;
            }
        }
        if centre.front_dist > OPEN_DISTANCE && centre.rear_dist > REAR_CLEARANCE {
            target = CENTRE_LANE;
        }
        target
    }

    /// From the centre lane both outer lanes are candidates. Lane 2 is
    /// checked first so that on equal merits lane 0 wins, matching the
    /// evaluation order the thresholds were tuned with.
    fn evaluate_from_centre(&self, car_speed: f64, lanes: &[LaneSnapshot; LANE_COUNT]) -> usize {
        let current = &lanes[CENTRE_LANE];
        if current.front_dist >= DANGER_DISTANCE {
            return CENTRE_LANE;
        }

        let mut target = CENTRE_LANE;
        for (lane, twin) in [(2, 0), (0, 2)] {
            let candidate = &lanes[lane];
            let other = &lanes[twin];

            let feasible = candidate.front_dist > OUTER_FRONT_CLEARANCE
                && candidate.rear_dist > REAR_CLEARANCE
                && car_speed > candidate.rear_speed - REAR_SPEED_MARGIN
                && candidate.front_speed > current.front_speed;
            let preferred = candidate.front_speed > other.front_speed
                || candidate.front_dist > other.front_dist + DISTANCE_TIEBREAK;

            if feasible && preferred {
                target = lane;
            }
        }

        // An effectively empty outer lane always qualifies.
        for lane in [2, 0] {
            if lanes[lane].front_dist > OPEN_DISTANCE {
                target = lane;
            }
        }
        target
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn open() -> LaneSnapshot {
        LaneSnapshot::default()
    }

    fn lane(front_dist: f64, front_speed: f64, rear_dist: f64, rear_speed: f64) -> LaneSnapshot {
        LaneSnapshot {
            front_dist,
            front_speed,
            rear_dist,
            rear_speed,
        }
    }

    #[test]
    fn empty_world_ramps_to_speed_limit_in_centre_lane() {
        let mut planner = BehaviorPlanner::new();
        let lanes = [open(), open(), open()];

        planner.plan(0.0, &lanes);
        assert_eq!(planner.lane(), 1);
        assert_approx_eq!(planner.ref_vel(), SPEED_STEP, 1e-9);

        for _ in 0..300 {
            planner.plan(planner.ref_vel(), &lanes);
            assert_eq!(planner.lane(), 1);
            assert!(planner.ref_vel() <= SPEED_LIMIT);
        }
        assert_approx_eq!(planner.ref_vel(), SPEED_LIMIT, 1e-9);
    }

    #[test]
    fn speed_never_goes_negative() {
        let mut planner = BehaviorPlanner {
            lane: 1,
            ref_vel: 0.1,
        };
        // A stopped vehicle right ahead, with both outer lanes blocked.
        let blocked = lane(100.0, 10.0, 5.0, 10.0);
        let lanes = [blocked, lane(10.0, 0.0, 200.0, 0.0), blocked];

        for _ in 0..50 {
            planner.plan(0.0, &lanes);
            assert!(planner.ref_vel() >= 0.0);
        }
        // The planner dithers between a stop and a gentle creep forward,
        // but never below zero.
        assert!(planner.ref_vel() < SPEED_STEP);
    }

    #[test]
    fn slows_behind_a_slow_leader() {
        let mut planner = BehaviorPlanner {
            lane: 1,
            ref_vel: 40.0,
        };
        // Leader 10m ahead at speed 20; outer lanes occupied enough that no
        // change is legal (rear clearance too small, front not open).
        let blocked = lane(100.0, 10.0, 5.0, 10.0);
        let lanes = [blocked, lane(10.0, 20.0, 200.0, 0.0), blocked];

        let mut cycles = 0;
        while planner.ref_vel() > 20.0 {
            let before = planner.ref_vel();
            planner.plan(40.0, &lanes);
            assert_eq!(planner.lane(), 1);
            assert_approx_eq!(planner.ref_vel(), before - SPEED_STEP, 1e-9);
            cycles += 1;
        }
        assert_eq!(cycles, ((40.0 - 20.0) / SPEED_STEP).ceil() as i32);
    }

    #[test]
    fn switches_to_open_outer_lane() {
        let mut planner = BehaviorPlanner {
            lane: 1,
            ref_vel: 45.0,
        };
        // Lane 2 fully open, lane 0 partially occupied, leader at 20m.
        let lanes = [
            lane(100.0, 30.0, 200.0, 0.0),
            lane(20.0, 25.0, 200.0, 0.0),
            open(),
        ];

        planner.plan(45.0, &lanes);
        assert_eq!(planner.lane(), 2);
    }

    #[test]
    fn outer_lane_merges_back_when_centre_is_faster() {
        let mut planner = BehaviorPlanner {
            lane: 0,
            ref_vel: 45.0,
        };
        // Boxed in behind a 25-unit leader; centre has a faster leader and
        // room to merge, but is not open enough for the centre-bias override.
        let lanes = [
            lane(25.0, 25.0, 200.0, 0.0),
            lane(90.0, 40.0, 50.0, 30.0),
            lane(100.0, 30.0, 200.0, 0.0),
        ];

        planner.plan(45.0, &lanes);
        assert_eq!(planner.lane(), 1);
    }

    #[test]
    fn outer_lane_stays_when_centre_is_slower() {
        let mut planner = BehaviorPlanner {
            lane: 0,
            ref_vel: 45.0,
        };
        // Boxed in, but the centre lane's leader is even slower.
        let lanes = [
            lane(25.0, 25.0, 200.0, 0.0),
            lane(90.0, 20.0, 50.0, 30.0),
            lane(100.0, 30.0, 200.0, 0.0),
        ];

        planner.plan(45.0, &lanes);
        assert_eq!(planner.lane(), 0);
    }

    #[test]
    fn clearly_open_centre_lane_overrides() {
        let mut planner = BehaviorPlanner {
            lane: 2,
            ref_vel: 45.0,
        };
        let lanes = [open(), lane(150.0, 50.0, 100.0, 10.0), open()];

        planner.plan(45.0, &lanes);
        assert_eq!(planner.lane(), 1);
    }

    #[test]
    fn unsafe_rear_gap_blocks_lane_change() {
        let mut planner = BehaviorPlanner {
            lane: 0,
            ref_vel: 45.0,
        };
        // Centre lane is faster but a vehicle sits 10m behind the merge point.
        let lanes = [
            lane(25.0, 25.0, 200.0, 0.0),
            lane(90.0, 40.0, 10.0, 30.0),
            lane(100.0, 30.0, 200.0, 0.0),
        ];

        planner.plan(45.0, &lanes);
        assert_eq!(planner.lane(), 0);
    }
}
