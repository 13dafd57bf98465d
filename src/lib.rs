pub use behavior::{BehaviorPlanner, SPEED_LIMIT};
pub use cgmath;
pub use cycle::Planner;
pub use map::{FrenetCoord, MapError, Waypoint, WaypointMap};
pub use perception::{
    lane_snapshots, LaneSnapshot, TrackedObject, LANE_COUNT, LANE_WIDTH, NO_VEHICLE_DISTANCE,
    OPEN_LANE_SPEED,
};
pub use telemetry::{PathResponse, Telemetry};
pub use trajectory::{HORIZON, TIME_STEP};

mod behavior;
mod cycle;
mod map;
pub mod math;
mod perception;
mod telemetry;
mod trajectory;
