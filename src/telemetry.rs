//! The per-cycle wire contract between the simulator channel and the planner.
//!
//! The channel itself (sockets, reconnects, framing) lives outside this
//! crate; it only needs to hand over one [`Telemetry`] snapshot per cycle
//! and forward the [`PathResponse`] back.

use serde::{Deserialize, Serialize};

/// One telemetry snapshot, as delivered by the simulator each cycle.
#[derive(Clone, Debug, Deserialize)]
pub struct Telemetry {
    /// Ego world-space x position.
    pub x: f64,
    /// Ego world-space y position.
    pub y: f64,
    /// Ego longitudinal track progress in m.
    pub s: f64,
    /// Ego signed lateral offset from the track centerline in m.
    pub d: f64,
    /// Ego heading in degrees, as the simulator reports it.
    pub yaw: f64,
    /// Ego speed in the telemetry speed unit (mph).
    pub speed: f64,
    /// X coordinates of the previously commanded path the vehicle has not
    /// yet consumed.
    pub previous_path_x: Vec<f64>,
    /// Y coordinates of the unconsumed path, parallel to `previous_path_x`.
    pub previous_path_y: Vec<f64>,
    /// Track progress at the end of the unconsumed path.
    pub end_path_s: f64,
    /// Lateral offset at the end of the unconsumed path.
    pub end_path_d: f64,
    /// Tracked vehicles as raw `[id, x, y, vx, vy, s, d]` rows.
    pub sensor_fusion: Vec<[f64; 7]>,
}

impl Telemetry {
    /// The ego heading in radians.
    pub fn yaw_rad(&self) -> f64 {
        self.yaw.to_radians()
    }

    /// Parses a telemetry snapshot from the channel's JSON payload.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The planned path returned to the simulator: parallel coordinate arrays
/// of exactly the planning horizon's length.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PathResponse {
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

impl PathResponse {
    /// Serializes the response for the channel's JSON payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
