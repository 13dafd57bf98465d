//! The static track map and its coordinate transforms.

use crate::math::{heading_vector, Point2d, Vector2d};
use cgmath::prelude::*;
use itertools::Itertools;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Reference point on the interior of the track, used to disambiguate the
/// sign of the lateral offset `d`. Tuned for the track geometry this
/// planner targets; see [`WaypointMap::to_frenet`].
const INTERIOR_REF: (f64, f64) = (1000.0, 2000.0);

/// A single waypoint on the track centerline.
#[derive(Clone, Copy, Debug)]
pub struct Waypoint {
    /// World-space position of the waypoint.
    pub pos: Point2d,
    /// Cumulative arc-length along the track in m.
    pub s: f64,
    /// Unit normal pointing away from the track centerline.
    pub normal: Vector2d,
}

/// Road-relative coordinates: longitudinal progress `s` along the track
/// centerline, and signed lateral offset `d` from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrenetCoord {
    pub s: f64,
    pub d: f64,
}

/// The reason a waypoint map could not be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapError {
    /// Fewer than two waypoints were supplied.
    TooFewWaypoints,
    /// Waypoint `s` values were not strictly increasing.
    NonMonotonicS,
}

/// The ordered, implicitly cyclic sequence of track waypoints.
///
/// The map is read-only once constructed and is shared by every transform
/// the planner performs.
#[derive(Clone, Debug)]
pub struct WaypointMap {
    waypoints: Vec<Waypoint>,
    /// Chord-length accumulation up to each waypoint, used for the Frenet `s`.
    chord_s: Vec<f64>,
    max_s: f64,
}

impl WaypointMap {
    /// Creates a map from waypoints ordered by increasing `s` around a
    /// closed loop of total length `max_s`.
    pub fn new(waypoints: Vec<Waypoint>, max_s: f64) -> Result<Self, MapError> {
        if waypoints.len() < 2 {
            return Err(MapError::TooFewWaypoints);
        }
        if waypoints.iter().tuple_windows().any(|(a, b)| b.s <= a.s) {
            return Err(MapError::NonMonotonicS);
        }

        let mut chord_s = Vec::with_capacity(waypoints.len());
        let mut acc = 0.0;
        chord_s.push(0.0);
        for (a, b) in waypoints.iter().tuple_windows() {
            acc += (b.pos - a.pos).magnitude();
            chord_s.push(acc);
        }

        Ok(Self {
            waypoints,
            chord_s,
            max_s,
        })
    }

    /// Total track length before `s` wraps back to zero.
    pub fn max_s(&self) -> f64 {
        self.max_s
    }

    /// The number of waypoints in the map.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index of the waypoint closest to `p`. Ties resolve to the lowest index.
    pub fn closest(&self, p: Point2d) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, wp) in self.waypoints.iter().enumerate() {
            let dist = (wp.pos - p).magnitude();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        best
    }

    /// Index of the next waypoint ahead of a vehicle at `p` travelling with
    /// the given heading, in radians.
    ///
    /// The closest waypoint is skipped when its bearing differs from the
    /// heading by more than 45 degrees, which biases selection to the
    /// waypoint in front of the vehicle rather than behind it.
    pub fn next(&self, p: Point2d, heading: f64) -> usize {
        let closest = self.closest(p);
        let to_wp = self.waypoints[closest].pos - p;
        let bearing = to_wp.y.atan2(to_wp.x);

        let angle = (heading - bearing).abs();
        let angle = f64::min(2.0 * PI - angle, angle);

        if angle > FRAC_PI_4 {
            (closest + 1) % self.waypoints.len()
        } else {
            closest
        }
    }

    /// Converts a world-space position into road-relative coordinates.
    ///
    /// The sign of `d` is resolved by checking which side of the centerline
    /// is closer to a fixed interior reference point: positions on the
    /// interior side get a negative offset. This heuristic is only valid
    /// for tracks that loop around the reference point.
    pub fn to_frenet(&self, p: Point2d, heading: f64) -> FrenetCoord {
        let next_wp = self.next(p, heading);
        let prev_wp = if next_wp == 0 {
            self.waypoints.len() - 1
        } else {
            next_wp - 1
        };

        let seg = self.waypoints[next_wp].pos - self.waypoints[prev_wp].pos;
        let rel = p - self.waypoints[prev_wp].pos;

        // A zero-length segment would make the projection divide by zero.
        let seg_len2 = seg.magnitude2();
        let proj = if seg_len2 > 0.0 {
            seg * (rel.dot(seg) / seg_len2)
        } else {
            Vector2d::new(0.0, 0.0)
        };

        let mut d = (rel - proj).magnitude();

        let interior = Point2d::new(INTERIOR_REF.0, INTERIOR_REF.1) - self.waypoints[prev_wp].pos;
        if (interior - rel).magnitude() <= (interior - proj).magnitude() {
            d = -d;
        }

        let s = self.chord_s[prev_wp] + proj.magnitude();
        FrenetCoord { s, d }
    }

    /// Converts road-relative coordinates back into world space.
    ///
    /// `s` is wrapped into `[0, max_s)` before the lookup, so callers may
    /// pass values past the end of the lap.
    pub fn to_cartesian(&self, s: f64, d: f64) -> Point2d {
        let s = s.rem_euclid(self.max_s);

        let mut prev_wp = 0;
        while prev_wp + 1 < self.waypoints.len() && s > self.waypoints[prev_wp + 1].s {
            prev_wp += 1;
        }
        let next_wp = (prev_wp + 1) % self.waypoints.len();

        let seg = self.waypoints[next_wp].pos - self.waypoints[prev_wp].pos;
        let heading = seg.y.atan2(seg.x);

        let seg_s = s - self.waypoints[prev_wp].s;
        let along = self.waypoints[prev_wp].pos + seg_s * heading_vector(heading);
        along + d * heading_vector(heading - FRAC_PI_2)
    }
}
