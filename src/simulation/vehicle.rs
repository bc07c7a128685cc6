//! Vehicle movement logic for the intersection simulation
//!
//! A vehicle drives straight through the crossing along one lane. Each tick
//! it senses (leader, stop gates, box occupancy, pedestrians) against frozen
//! state, decides whether to brake, then integrates speed and position. It
//! only ever writes its own fields.

use std::collections::VecDeque;

use ordered_float::OrderedFloat;

use super::clock::Tick;
use super::config::{CommitPolicy, SensingConfig, VehicleClass, VehicleProfile};
use super::intersection::SimIntersection;
use super::stop_gate::StopGate;
use super::types::{Footprint, Heading, Position, Rect, VehicleId, STOPPED_SPEED};

/// Result of a vehicle update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue,
    /// The footprint entered the intersection box this tick
    EnteredIntersection,
    /// The final waypoint has been reached; the vehicle can be pruned
    Arrived,
}

/// Frozen copy of a vehicle, read by every other vehicle during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub heading: Heading,
    pub lane: u8,
    pub position: Position,
    pub speed: f32,
    pub footprint: Footprint,
    pub crossing_intersection: bool,
}

impl VehicleView {
    pub fn rect(&self) -> Rect {
        self.footprint.rect_at(self.position, self.heading)
    }

    /// Position of the rear bumper along the heading
    pub fn rear_along(&self) -> f32 {
        self.heading.along(self.position) - self.footprint.length / 2.0
    }

    /// Position of the front bumper along the heading
    pub fn front_along(&self) -> f32 {
        self.heading.along(self.position) + self.footprint.length / 2.0
    }
}

/// Everything a vehicle reads while deciding how to move
#[derive(Debug, Clone, Copy)]
pub struct VehicleContext<'a> {
    /// All vehicles as they were at the start of the vehicle phase
    pub vehicles: &'a [VehicleView],
    pub gates: &'a [StopGate],
    pub intersection: &'a SimIntersection,
    /// Pedestrian positions after this tick's pedestrian phase
    pub pedestrians: &'a [Position],
    pub sensing: &'a SensingConfig,
    pub commit_policy: CommitPolicy,
}

/// What a vehicle perceived this tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sensing {
    /// Bumper gap to the nearest leader in the sensor region
    pub gap_ahead: Option<f32>,
    pub following_blocked: bool,
    pub gate_blocked: bool,
    pub occupancy_blocked: bool,
    pub pedestrian_conflict: bool,
}

impl Sensing {
    pub fn should_stop(&self) -> bool {
        self.following_blocked
            || self.gate_blocked
            || self.occupancy_blocked
            || self.pedestrian_conflict
    }
}

/// A vehicle in the simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub profile: VehicleProfile,
    pub heading: Heading,
    pub lane: u8,
    /// Center of the body
    pub position: Position,
    pub speed: f32,
    /// Waypoints still to reach
    pub path: VecDeque<Position>,
    /// Latched while the footprint overlaps the intersection box
    pub crossing_intersection: bool,
    /// Set once the vehicle has left the box for good
    pub cleared_intersection: bool,
    /// Ticks spent stopped
    pub waiting_ticks: u32,
    pub spawned_at: Tick,
}

impl Vehicle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VehicleId,
        class: VehicleClass,
        profile: VehicleProfile,
        heading: Heading,
        lane: u8,
        position: Position,
        path: Vec<Position>,
        spawned_at: Tick,
    ) -> Self {
        Self {
            id,
            class,
            profile,
            heading,
            lane,
            position,
            speed: 0.0,
            path: path.into(),
            crossing_intersection: false,
            cleared_intersection: false,
            waiting_ticks: 0,
            spawned_at,
        }
    }

    pub fn view(&self) -> VehicleView {
        VehicleView {
            id: self.id,
            class: self.class,
            heading: self.heading,
            lane: self.lane,
            position: self.position,
            speed: self.speed,
            footprint: self.profile.footprint,
            crossing_intersection: self.crossing_intersection,
        }
    }

    pub fn rect(&self) -> Rect {
        self.profile.footprint.rect_at(self.position, self.heading)
    }

    pub fn front(&self) -> Position {
        self.position
            .offset(self.heading, self.profile.footprint.length / 2.0)
    }

    pub fn rear(&self) -> Position {
        self.position
            .offset(self.heading, -self.profile.footprint.length / 2.0)
    }

    pub fn is_stopped(&self) -> bool {
        self.speed <= STOPPED_SPEED
    }

    pub fn stopping_distance(&self) -> f32 {
        self.profile.stopping_distance(self.speed)
    }

    /// Gap to keep to the vehicle ahead at the current speed
    pub fn safe_following_distance(&self, sensing: &SensingConfig) -> f32 {
        sensing.min_gap + self.stopping_distance()
    }

    /// The footprint swept forward by the current stopping distance
    pub fn projected_rect(&self) -> Rect {
        let footprint = self.profile.footprint;
        Rect::ahead_of(
            self.rear(),
            self.heading,
            footprint.length + self.stopping_distance(),
            footprint.width,
        )
    }

    /// Nearest same-lane vehicle ahead inside the sensor region, as a bumper
    /// gap
    pub fn find_gap_ahead(&self, vehicles: &[VehicleView], sensor_range: f32) -> Option<f32> {
        let heading = self.heading;
        let own_along = heading.along(self.position);
        let front_along = own_along + self.profile.footprint.length / 2.0;
        let sensor = Rect::ahead_of(
            self.front(),
            heading,
            sensor_range,
            self.profile.footprint.width,
        );

        vehicles
            .iter()
            .filter(|other| {
                other.id != self.id && other.heading == heading && other.lane == self.lane
            })
            .filter(|other| heading.along(other.position) > own_along)
            .filter_map(|other| {
                let gap = other.rear_along() - front_along;
                (gap <= 0.0 || sensor.overlaps(&other.rect())).then_some(gap)
            })
            .min_by_key(|gap| OrderedFloat(*gap))
    }

    /// Sense the surroundings without moving
    pub fn sense(&self, ctx: &VehicleContext<'_>) -> Sensing {
        let sensing = ctx.sensing;
        let gap_ahead = self.find_gap_ahead(ctx.vehicles, sensing.sensor_range);
        let following_blocked =
            gap_ahead.is_some_and(|gap| gap < self.safe_following_distance(sensing));

        let approaching = !self.crossing_intersection && !self.cleared_intersection;
        let projected = self.projected_rect();

        let gate_blocked = approaching
            && ctx
                .gates
                .iter()
                .filter(|gate| gate.axis() == self.heading.axis())
                .any(|gate| gate.blocks(&projected));

        let occupancy_blocked = approaching
            && ctx.intersection.is_held_against(self.heading.axis())
            && ctx.intersection.touches(&projected);

        let ignore_pedestrians =
            self.crossing_intersection && ctx.commit_policy == CommitPolicy::IgnoreAll;
        // The zone covers the body as well as the road ahead
        let pedestrian_conflict = !ignore_pedestrians && {
            let footprint = self.profile.footprint;
            let zone = Rect::ahead_of(
                self.rear(),
                self.heading,
                footprint.length
                    + self.safe_following_distance(sensing)
                    + sensing.pedestrian_buffer,
                footprint.width + 2.0 * sensing.pedestrian_margin,
            );
            ctx.pedestrians.iter().any(|p| zone.contains(*p))
        };

        Sensing {
            gap_ahead,
            following_blocked,
            gate_blocked,
            occupancy_blocked,
            pedestrian_conflict,
        }
    }

    /// Advance one tick of `dt` seconds
    pub fn step(&mut self, ctx: &VehicleContext<'_>, dt: f32) -> VehicleUpdateResult {
        if self.path.is_empty() {
            return VehicleUpdateResult::Arrived;
        }

        let sensing = self.sense(ctx);

        if sensing.should_stop() {
            self.speed = (self.speed - self.profile.deceleration * dt).max(0.0);
        } else {
            self.speed = (self.speed + self.profile.acceleration * dt).min(self.profile.max_speed);
        }

        // Never move past the leader's frozen rear bumper
        let mut distance = self.speed * dt;
        if let Some(gap) = sensing.gap_ahead {
            let room = gap.max(0.0);
            if distance > room {
                distance = room;
                self.speed = room / dt;
            }
        }

        if let Some(target) = self.path.front().copied() {
            let (next, reached) = self.position.step_toward(&target, distance);
            self.position = next;
            if reached {
                self.path.pop_front();
            }
        }

        if self.is_stopped() {
            self.waiting_ticks = self.waiting_ticks.saturating_add(1);
        }

        let mut result = VehicleUpdateResult::Continue;
        let touching = ctx.intersection.touches(&self.rect());
        if touching && !self.crossing_intersection && !self.cleared_intersection {
            self.crossing_intersection = true;
            result = VehicleUpdateResult::EnteredIntersection;
        } else if !touching && self.crossing_intersection {
            self.crossing_intersection = false;
            self.cleared_intersection = true;
        }

        if self.path.is_empty() {
            VehicleUpdateResult::Arrived
        } else {
            result
        }
    }
}
