//! Vehicle and pedestrian spawning, updating and pruning
//!
//! This module contains the functions that manage the agent collections.
//! It separates population logic from the main simulation coordination.

use anyhow::{bail, Result};
use rand::Rng;
use std::collections::BTreeMap;

use super::clock::Tick;
use super::config::{
    IntersectionGeometry, PedestrianConfig, SensingConfig, VehicleClass, VehicleProfile,
};
use super::pedestrian::{Pedestrian, PedestrianContext, PedestrianUpdateResult, Personality};
use super::types::{Heading, PedestrianId, Position, VehicleId, STOPPED_SPEED};
use super::vehicle::{Vehicle, VehicleContext, VehicleUpdateResult};

/// Start position and waypoints for a vehicle of `length` driving `heading`
/// in `lane`, with its center `start_along` units past the intersection
/// center. Waypoints already behind the start are dropped.
///
/// The full route is: front bumper at the box edge, rear bumper clear of the
/// far box edge, then the far end of the road.
pub fn vehicle_route(
    geometry: &IntersectionGeometry,
    heading: Heading,
    lane: u8,
    length: f32,
    start_along: f32,
) -> (Position, Vec<Position>) {
    let half = length / 2.0;
    let waypoints = [
        -geometry.road_half_width - half,
        geometry.road_half_width + half,
        geometry.road_half_length,
    ];

    let start = geometry.lane_point(heading, lane, start_along);
    let path = waypoints
        .into_iter()
        .filter(|&along| along > start_along)
        .map(|along| geometry.lane_point(heading, lane, along))
        .collect();
    (start, path)
}

/// Along-road position at which a new vehicle of `length` enters the scene
pub fn entry_along(geometry: &IntersectionGeometry, length: f32) -> f32 {
    -geometry.road_half_length + length / 2.0
}

/// Create a vehicle at `start_along` on the given lane
///
/// Fails when the lane does not exist or the spot (plus the minimum gap) is
/// taken by another vehicle in the same lane.
#[allow(clippy::too_many_arguments)]
pub fn spawn_vehicle(
    vehicle_id: VehicleId,
    class: VehicleClass,
    profile: VehicleProfile,
    heading: Heading,
    lane: u8,
    start_along: f32,
    geometry: &IntersectionGeometry,
    sensing: &SensingConfig,
    vehicles: &BTreeMap<VehicleId, Vehicle>,
    now: Tick,
) -> Result<Vehicle> {
    if lane >= geometry.lanes_per_direction {
        bail!(
            "lane {} does not exist, the road has {} per direction",
            lane,
            geometry.lanes_per_direction
        );
    }

    let (start, path) = vehicle_route(geometry, heading, lane, profile.footprint.length, start_along);
    if path.is_empty() {
        bail!("start position {:.1} is past the end of the road", start_along);
    }

    let start_center = heading.along(start);
    let occupied = vehicles
        .values()
        .filter(|other| other.heading == heading && other.lane == lane)
        .any(|other| {
            let spacing = (profile.footprint.length + other.profile.footprint.length) / 2.0
                + sensing.min_gap;
            (heading.along(other.position) - start_center).abs() < spacing
        });
    if occupied {
        bail!("{:?} lane {} is occupied at {:.1}", heading, lane, start_along);
    }

    Ok(Vehicle::new(
        vehicle_id, class, profile, heading, lane, start, path, now,
    ))
}

/// Create a pedestrian `start_along` units past the crossing center on the
/// chosen sidewalk. Starting between the curbs puts it on the crosswalk.
#[allow(clippy::too_many_arguments)]
pub fn spawn_pedestrian(
    pedestrian_id: PedestrianId,
    personality: Personality,
    heading: Heading,
    right_side: bool,
    start_along: f32,
    geometry: &IntersectionGeometry,
    config: &PedestrianConfig,
    now: Tick,
) -> Result<Pedestrian> {
    let (entry, route) = Pedestrian::route(geometry, heading, right_side);
    let start = entry.offset(heading, start_along + geometry.road_half_length);
    let path: Vec<_> = route
        .into_iter()
        .filter(|waypoint| heading.along(waypoint.target) > heading.along(start))
        .collect();
    if path.is_empty() {
        bail!("start position {:.1} is past the end of the sidewalk", start_along);
    }

    let mut pedestrian = Pedestrian::new(
        pedestrian_id,
        personality,
        heading,
        start,
        config.walking_speed,
        path,
        now,
    );
    let curb = geometry.sidewalk_offset();
    pedestrian.on_crosswalk = start_along > -curb
        && pedestrian
            .path
            .front()
            .is_some_and(|waypoint| waypoint.crosses.is_some());
    Ok(pedestrian)
}

/// Count stopped vehicles waiting to enter the box, per axis
pub fn survey_queues(
    vehicles: &BTreeMap<VehicleId, Vehicle>,
    geometry: &IntersectionGeometry,
    sensing: &SensingConfig,
) -> [u32; 2] {
    let mut queued = [0; 2];
    for vehicle in vehicles.values() {
        if vehicle.crossing_intersection
            || vehicle.cleared_intersection
            || vehicle.speed >= STOPPED_SPEED
        {
            continue;
        }
        let heading = vehicle.heading;
        let front = heading.along(vehicle.position) - heading.along(geometry.center)
            + vehicle.profile.footprint.length / 2.0;
        let distance_to_box = -geometry.road_half_width - front;
        if distance_to_box <= sensing.queue_detection_range {
            queued[heading.axis().index()] += 1;
        }
    }
    queued
}

/// Update all pedestrians in the simulation
///
/// Returns a list of (pedestrian_id, result) tuples for pedestrians whose
/// state changed in a way the caller needs to see
pub fn update_pedestrians<R: Rng>(
    pedestrians: &mut BTreeMap<PedestrianId, Pedestrian>,
    ctx: &PedestrianContext<'_>,
    rng: &mut R,
    dt: f32,
) -> Vec<(PedestrianId, PedestrianUpdateResult)> {
    pedestrians
        .values_mut()
        .filter_map(|pedestrian| match pedestrian.step(ctx, rng, dt) {
            PedestrianUpdateResult::Continue | PedestrianUpdateResult::Waiting => None,
            result => Some((pedestrian.id, result)),
        })
        .collect()
}

/// Update all vehicles against the frozen views in `ctx`
///
/// Returns a list of (vehicle_id, result) tuples for vehicles that entered
/// the box or arrived
pub fn update_vehicles(
    vehicles: &mut BTreeMap<VehicleId, Vehicle>,
    ctx: &VehicleContext<'_>,
    dt: f32,
) -> Vec<(VehicleId, VehicleUpdateResult)> {
    vehicles
        .values_mut()
        .filter_map(|vehicle| match vehicle.step(ctx, dt) {
            VehicleUpdateResult::Continue => None,
            result => Some((vehicle.id, result)),
        })
        .collect()
}

/// Remove vehicles that have finished their route
pub fn prune_vehicles(vehicles: &mut BTreeMap<VehicleId, Vehicle>) -> Vec<Vehicle> {
    let finished: Vec<VehicleId> = vehicles
        .values()
        .filter(|vehicle| vehicle.path.is_empty())
        .map(|vehicle| vehicle.id)
        .collect();

    finished
        .into_iter()
        .filter_map(|id| vehicles.remove(&id))
        .collect()
}

/// Remove pedestrians that have finished their route
pub fn prune_pedestrians(pedestrians: &mut BTreeMap<PedestrianId, Pedestrian>) -> Vec<Pedestrian> {
    let finished: Vec<PedestrianId> = pedestrians
        .values()
        .filter(|pedestrian| pedestrian.path.is_empty())
        .map(|pedestrian| pedestrian.id)
        .collect();

    finished
        .into_iter()
        .filter_map(|id| pedestrians.remove(&id))
        .collect()
}
