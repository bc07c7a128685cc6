//! Pedestrians walking the sidewalks and crossing the roads
//!
//! A pedestrian walks along one sidewalk, crosses the perpendicular road on
//! the crosswalk, and walks on to the far end. At the curb it decides
//! whether to step onto the roadway. Once on the crosswalk the light no
//! longer matters, but it still holds still for a tick whenever a moving
//! vehicle on the crossed road is too close.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;

use super::clock::Tick;
use super::config::{IntersectionGeometry, PedestrianConfig};
use super::traffic_light::LightView;
use super::types::{Axis, Heading, PedestrianId, Position, STOPPED_SPEED};
use super::vehicle::VehicleView;

/// How a pedestrian treats the crosswalk signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Personality {
    /// Crosses only when the light allows it
    Patient,
    /// Ignores the light
    Aggressive,
    /// Usually waits, sometimes goes anyway
    Impulsive,
}

impl Personality {
    pub const ALL: [Personality; 3] = [
        Personality::Patient,
        Personality::Aggressive,
        Personality::Impulsive,
    ];
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Personality::Patient => write!(f, "patient"),
            Personality::Aggressive => write!(f, "aggressive"),
            Personality::Impulsive => write!(f, "impulsive"),
        }
    }
}

/// A point on a pedestrian's route. Reaching a waypoint with `crosses` set
/// means walking over the road that carries that axis' traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub target: Position,
    pub crosses: Option<Axis>,
}

impl Waypoint {
    pub fn walk(target: Position) -> Self {
        Self {
            target,
            crosses: None,
        }
    }

    pub fn cross(target: Position, axis: Axis) -> Self {
        Self {
            target,
            crosses: Some(axis),
        }
    }
}

/// Result of a pedestrian update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedestrianUpdateResult {
    Continue,
    /// Held in place this tick
    Waiting,
    /// Stepped onto a crosswalk this tick
    StartedCrossing,
    /// The route is finished
    Arrived,
}

/// Everything a pedestrian reads while deciding to cross
#[derive(Debug, Clone, Copy)]
pub struct PedestrianContext<'a> {
    /// Lights after this tick's light phase
    pub lights: &'a [LightView],
    /// Vehicles as they were at the end of the previous tick
    pub vehicles: &'a [VehicleView],
    pub config: &'a PedestrianConfig,
}

impl PedestrianContext<'_> {
    /// The light governing traffic on `axis`, if any
    pub fn light_for(&self, axis: Axis) -> Option<&LightView> {
        self.lights.iter().find(|light| light.axis == axis)
    }

    /// Whether a moving vehicle on `axis` is within the safe distance of
    /// `position`
    pub fn vehicle_near(&self, axis: Axis, position: Position) -> bool {
        self.vehicles.iter().any(|vehicle| {
            vehicle.heading.axis() == axis
                && vehicle.speed > STOPPED_SPEED
                && vehicle.position.distance(&position) < self.config.safe_distance
        })
    }
}

#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: PedestrianId,
    pub personality: Personality,
    pub heading: Heading,
    pub position: Position,
    /// Units per second
    pub speed: f32,
    pub path: VecDeque<Waypoint>,
    /// True while held at the curb or on the crosswalk this tick
    pub waiting_to_cross: bool,
    /// Latched from stepping onto a crosswalk until reaching the far curb
    pub on_crosswalk: bool,
    /// Ticks spent waiting to cross
    pub wait_ticks: u32,
    /// An impulsive pedestrian's decision for the current approach
    pub impulse: Option<bool>,
    pub spawned_at: Tick,
}

impl Pedestrian {
    pub fn new(
        id: PedestrianId,
        personality: Personality,
        heading: Heading,
        position: Position,
        speed: f32,
        path: Vec<Waypoint>,
        spawned_at: Tick,
    ) -> Self {
        Self {
            id,
            personality,
            heading,
            position,
            speed,
            path: path.into(),
            waiting_to_cross: false,
            on_crosswalk: false,
            wait_ticks: 0,
            impulse: None,
            spawned_at,
        }
    }

    /// Start point and waypoints for a pedestrian walking `heading` on the
    /// sidewalk to the `right_side` (or left) of its road, crossing the
    /// perpendicular road once
    pub fn route(
        geometry: &IntersectionGeometry,
        heading: Heading,
        right_side: bool,
    ) -> (Position, Vec<Waypoint>) {
        let (dx, dz) = heading.unit();
        let (rx, rz) = heading.right();
        let lateral = if right_side {
            geometry.sidewalk_offset()
        } else {
            -geometry.sidewalk_offset()
        };
        let point = |along: f32| {
            Position::new(
                geometry.center.x + dx * along + rx * lateral,
                geometry.center.z + dz * along + rz * lateral,
            )
        };

        let curb = geometry.sidewalk_offset();
        let crossed = heading.axis().perpendicular();
        let start = point(-geometry.road_half_length);
        let path = vec![
            Waypoint::walk(point(-curb)),
            Waypoint::cross(point(curb), crossed),
            Waypoint::walk(point(geometry.road_half_length)),
        ];
        (start, path)
    }

    /// Decide whether to step onto the crosswalk over the `axis` road
    fn may_cross<R: Rng>(
        &mut self,
        axis: Axis,
        ctx: &PedestrianContext<'_>,
        rng: &mut R,
    ) -> bool {
        let light_allows = ctx
            .light_for(axis)
            .map_or(true, |light| light.is_pedestrian_safe());

        let willing = match self.personality {
            Personality::Patient => light_allows,
            Personality::Aggressive => true,
            Personality::Impulsive => {
                light_allows || {
                    let probability = ctx.config.impulsive_ignore_probability;
                    *self
                        .impulse
                        .get_or_insert_with(|| rng.random_bool(probability))
                }
            }
        };

        willing && !ctx.vehicle_near(axis, self.position)
    }

    /// Advance one tick of `dt` seconds
    pub fn step<R: Rng>(
        &mut self,
        ctx: &PedestrianContext<'_>,
        rng: &mut R,
        dt: f32,
    ) -> PedestrianUpdateResult {
        let Some(next) = self.path.front().copied() else {
            return PedestrianUpdateResult::Arrived;
        };

        let mut result = PedestrianUpdateResult::Continue;
        if let Some(axis) = next.crosses {
            if self.on_crosswalk {
                // Hold in place on the road while traffic is too close
                if ctx.vehicle_near(axis, self.position) {
                    self.waiting_to_cross = true;
                    self.wait_ticks = self.wait_ticks.saturating_add(1);
                    return PedestrianUpdateResult::Waiting;
                }
                self.waiting_to_cross = false;
            } else {
                if !self.may_cross(axis, ctx, rng) {
                    self.waiting_to_cross = true;
                    self.wait_ticks = self.wait_ticks.saturating_add(1);
                    return PedestrianUpdateResult::Waiting;
                }
                self.waiting_to_cross = false;
                self.on_crosswalk = true;
                self.impulse = None;
                result = PedestrianUpdateResult::StartedCrossing;
            }
        }

        let (position, reached) = self.position.step_toward(&next.target, self.speed * dt);
        self.position = position;
        if reached {
            self.path.pop_front();
            if next.crosses.is_some() {
                self.on_crosswalk = false;
            }
        }

        if self.path.is_empty() {
            PedestrianUpdateResult::Arrived
        } else {
            result
        }
    }
}
