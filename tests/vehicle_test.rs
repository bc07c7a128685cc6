use intersection_sim::simulation::{
    vehicle_route, Axis, CommitPolicy, GateId, Heading, IntersectionGeometry, LightId, Position,
    SensingConfig, SimConfig, SimId, SimIntersection, Simulation, StopGate, Tick, Vehicle,
    VehicleClass, VehicleContext, VehicleId, VehicleProfile, VehicleUpdateResult, VehicleView,
    POSITION_EPSILON,
};

const DT: f32 = 1.0 / 60.0;

fn sedan(id: usize, heading: Heading, lane: u8, along: f32, speed: f32) -> Vehicle {
    let geometry = IntersectionGeometry::default();
    let profile = VehicleProfile::for_class(VehicleClass::Sedan);
    let (start, path) = vehicle_route(&geometry, heading, lane, profile.footprint.length, along);
    let mut vehicle = Vehicle::new(
        VehicleId(SimId(id)),
        VehicleClass::Sedan,
        profile,
        heading,
        lane,
        start,
        path,
        Tick::ZERO,
    );
    vehicle.speed = speed;
    vehicle
}

fn east_gate() -> StopGate {
    let geometry = IntersectionGeometry::default();
    StopGate::new(
        GateId(0),
        geometry.gate_rect(Heading::East),
        Heading::East,
        LightId(1),
    )
}

fn quiet_simulation() -> Simulation {
    let mut config = SimConfig::default().with_seed(11);
    config.spawn.vehicle_probability = 0.0;
    config.spawn.pedestrian_probability = 0.0;
    Simulation::new(config).expect("default config is valid")
}

/// Bumper gaps between consecutive vehicles in every lane
fn lane_gaps(views: &[VehicleView]) -> Vec<f32> {
    let mut gaps = Vec::new();
    for heading in Heading::ALL {
        for lane in 0..2 {
            let mut lane_views: Vec<&VehicleView> = views
                .iter()
                .filter(|v| v.heading == heading && v.lane == lane)
                .collect();
            lane_views.sort_by(|a, b| a.front_along().total_cmp(&b.front_along()));
            for pair in lane_views.windows(2) {
                gaps.push(pair[1].rear_along() - pair[0].front_along());
            }
        }
    }
    gaps
}

#[test]
fn test_unblocked_vehicle_starts_moving() {
    let mut sim = quiet_simulation();
    let id = sim
        .spawn_vehicle(VehicleClass::Sedan, Heading::North, 0)
        .expect("entry is free");
    let start = sim.vehicles[&id].position;

    sim.step();

    let vehicle = &sim.vehicles[&id];
    assert!(vehicle.speed > 0.0);
    assert!(vehicle.position.z > start.z);
}

#[test]
fn test_speed_never_exceeds_profile_maximum() {
    let mut sim = quiet_simulation();
    let id = sim
        .spawn_vehicle(VehicleClass::Truck, Heading::South, 1)
        .expect("entry is free");
    let max_speed = VehicleProfile::for_class(VehicleClass::Truck).max_speed;

    for _ in 0..300 {
        sim.step();
        if let Some(vehicle) = sim.vehicles.get(&id) {
            assert!(vehicle.speed <= max_speed + 1e-4);
        }
    }
}

#[test]
fn test_vehicle_waits_at_red_then_crosses() {
    let mut sim = quiet_simulation();
    let id = sim
        .spawn_vehicle_at(VehicleClass::Sedan, Heading::East, 0, -60.0)
        .expect("spot is free");

    let mut crossed = false;
    for _ in 0..1_200 {
        sim.step();
        let ew_green = sim.light_for(Axis::EastWest).is_some_and(|l| l.is_green());
        match sim.vehicles.get(&id) {
            Some(vehicle) => {
                if vehicle.crossing_intersection {
                    crossed = true;
                }
                if !ew_green && !crossed {
                    assert!(
                        !sim.intersection().touches(&vehicle.rect()),
                        "vehicle entered the box on a stop light"
                    );
                }
            }
            None => break,
        }
    }

    assert!(crossed);
    assert!(sim.vehicles.is_empty());
    assert_eq!(sim.stats().total_vehicles_completed, 1);
    assert_eq!(sim.stats().intersection_entries[Axis::EastWest.index()], 1);
}

#[test]
fn test_stopped_vehicle_is_counted_in_the_queue() {
    let mut sim = quiet_simulation();
    sim.spawn_vehicle_at(VehicleClass::Sedan, Heading::West, 0, -40.0)
        .expect("spot is free");

    sim.run(150);

    let ew = sim.light_for(Axis::EastWest).expect("EW light exists");
    assert!(!ew.is_green());
    assert_eq!(ew.queue_estimate(), 1);
}

#[test]
fn test_crossing_vehicle_ignores_gates() {
    let mut sim = quiet_simulation();
    // EW starts red: only the commit latch lets this vehicle through
    let id = sim
        .spawn_vehicle_at(VehicleClass::Sedan, Heading::East, 0, 0.0)
        .expect("spot is free");

    let mut last_speed = 0.0;
    for _ in 0..240 {
        sim.step();
        let Some(vehicle) = sim.vehicles.get(&id) else {
            break;
        };
        if vehicle.cleared_intersection {
            break;
        }
        if !vehicle.crossing_intersection && !vehicle.cleared_intersection {
            panic!("vehicle inside the box did not latch");
        }
        assert!(vehicle.speed >= last_speed, "crossing vehicle slowed down");
        last_speed = vehicle.speed;
    }

    let vehicle = &sim.vehicles[&id];
    assert!(vehicle.cleared_intersection);
    assert!(!vehicle.crossing_intersection);
}

#[test]
fn test_gate_blocks_only_vehicles_not_yet_crossing() {
    let geometry = IntersectionGeometry::default();
    let gates = vec![east_gate()];
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();
    let ctx = VehicleContext {
        vehicles: &[],
        gates: &gates,
        intersection: &intersection,
        pedestrians: &[],
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    let mut vehicle = sedan(0, Heading::East, 0, -35.0, 0.0);
    assert!(vehicle.sense(&ctx).gate_blocked);

    vehicle.crossing_intersection = true;
    assert!(!vehicle.sense(&ctx).gate_blocked);
}

#[test]
fn test_gap_ahead_and_following_distance() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();

    let leader = sedan(1, Heading::East, 0, -40.0, 0.0);
    let other_lane = sedan(2, Heading::East, 1, -45.0, 0.0);
    let behind = sedan(3, Heading::East, 0, -90.0, 0.0);
    let views = vec![leader.view(), other_lane.view(), behind.view()];
    let ctx = VehicleContext {
        vehicles: &views,
        gates: &[],
        intersection: &intersection,
        pedestrians: &[],
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    let mut follower = sedan(0, Heading::East, 0, -60.0, 10.0);
    let sensed = follower.sense(&ctx);
    let gap = sensed.gap_ahead.expect("leader is in range");
    assert!((gap - 11.0).abs() < 1e-3);
    assert!(!sensed.following_blocked);

    // 3 + 30^2 / 80 exceeds the gap
    follower.speed = 30.0;
    assert!(follower.sense(&ctx).following_blocked);
}

#[test]
fn test_step_never_passes_the_leader() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();

    let leader = sedan(1, Heading::East, 0, -50.8, 0.0);
    let views = vec![leader.view()];
    let ctx = VehicleContext {
        vehicles: &views,
        gates: &[],
        intersection: &intersection,
        pedestrians: &[],
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    let mut follower = sedan(0, Heading::East, 0, -60.0, 30.0);
    assert_eq!(follower.step(&ctx, DT), VehicleUpdateResult::Continue);

    let gap = leader.view().rear_along() - follower.view().front_along();
    assert!(gap >= -POSITION_EPSILON, "gap went negative: {}", gap);
    assert!(follower.speed < 30.0);
}

#[test]
fn test_queued_vehicles_keep_their_distance() {
    let mut sim = quiet_simulation();
    let leader = sim
        .spawn_vehicle_at(VehicleClass::Sedan, Heading::East, 0, -40.0)
        .expect("spot is free");
    let follower = sim
        .spawn_vehicle_at(VehicleClass::Truck, Heading::East, 0, -100.0)
        .expect("spot is free");

    for _ in 0..2_400 {
        sim.step();
        let views = sim.snapshot().vehicles;
        for gap in lane_gaps(&views) {
            assert!(gap >= -POSITION_EPSILON, "bumper gap {} at {}", gap, sim.now());
        }
    }

    assert!(!sim.vehicles.contains_key(&leader));
    assert!(!sim.vehicles.contains_key(&follower));
    assert_eq!(sim.stats().total_vehicles_completed, 2);
}

#[test]
fn test_pedestrian_in_front_stops_vehicle() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();
    let vehicle = sedan(0, Heading::East, 0, -60.0, 0.0);

    let conflict = |pedestrians: &[Position]| {
        let ctx = VehicleContext {
            vehicles: &[],
            gates: &[],
            intersection: &intersection,
            pedestrians,
            sensing: &sensing,
            commit_policy: CommitPolicy::YieldToPedestrians,
        };
        vehicle.sense(&ctx).pedestrian_conflict
    };

    // Body spans -64.5..-55.5 along x at z = -5
    assert!(conflict(&[Position::new(-51.0, -5.0)]));
    assert!(conflict(&[Position::new(-58.0, -5.0)]));
    assert!(!conflict(&[Position::new(-40.0, -5.0)]));
    assert!(!conflict(&[Position::new(-66.0, -5.0)]));
    assert!(!conflict(&[Position::new(-51.0, 5.0)]));
    assert!(!conflict(&[]));
}

#[test]
fn test_vehicle_stopped_over_crosswalk_sees_pedestrian_under_its_body() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();
    // Stopped astride the west crosswalk at x = -22.5, front bumper at -21
    let vehicle = sedan(0, Heading::East, 0, -25.5, 0.0);
    let pedestrians = [Position::new(-22.5, -5.0)];
    let ctx = VehicleContext {
        vehicles: &[],
        gates: &[],
        intersection: &intersection,
        pedestrians: &pedestrians,
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    let sensed = vehicle.sense(&ctx);
    assert!(sensed.pedestrian_conflict);
    assert!(sensed.should_stop());
}

#[test]
fn test_commit_policy_for_pedestrians() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();
    let mut vehicle = sedan(0, Heading::East, 0, -10.0, 0.0);
    vehicle.crossing_intersection = true;
    let pedestrians = [Position::new(-2.0, -5.0)];

    let sense = |policy: CommitPolicy| {
        let ctx = VehicleContext {
            vehicles: &[],
            gates: &[],
            intersection: &intersection,
            pedestrians: &pedestrians,
            sensing: &sensing,
            commit_policy: policy,
        };
        vehicle.sense(&ctx)
    };

    assert!(sense(CommitPolicy::YieldToPedestrians).pedestrian_conflict);
    assert!(!sense(CommitPolicy::IgnoreAll).pedestrian_conflict);
}

#[test]
fn test_occupied_box_holds_perpendicular_traffic() {
    let geometry = IntersectionGeometry::default();
    let sensing = SensingConfig::default();

    let mut crossing = sedan(1, Heading::North, 0, 0.0, 10.0);
    crossing.crossing_intersection = true;
    let mut intersection = SimIntersection::new(geometry.intersection_box());
    intersection.record_occupants(&[crossing.view()]);
    assert_eq!(intersection.occupants(Axis::NorthSouth), 1);
    assert!(intersection.is_held_against(Axis::EastWest));
    assert!(!intersection.is_held_against(Axis::NorthSouth));

    let views = vec![crossing.view()];
    let ctx = VehicleContext {
        vehicles: &views,
        gates: &[],
        intersection: &intersection,
        pedestrians: &[],
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    // Projected front reaches -18.85, inside the box
    let approaching = sedan(0, Heading::East, 0, -24.6, 10.0);
    assert!(approaching.sense(&ctx).occupancy_blocked);

    let far = sedan(2, Heading::East, 0, -80.0, 10.0);
    assert!(!far.sense(&ctx).occupancy_blocked);

    let same_axis = sedan(3, Heading::South, 0, -24.6, 10.0);
    assert!(!same_axis.sense(&ctx).occupancy_blocked);
}

#[test]
fn test_vehicle_arrives_at_end_of_road() {
    let geometry = IntersectionGeometry::default();
    let intersection = SimIntersection::new(geometry.intersection_box());
    let sensing = SensingConfig::default();
    let ctx = VehicleContext {
        vehicles: &[],
        gates: &[],
        intersection: &intersection,
        pedestrians: &[],
        sensing: &sensing,
        commit_policy: CommitPolicy::YieldToPedestrians,
    };

    let mut vehicle = sedan(0, Heading::West, 0, 149.8, 30.0);
    assert_eq!(vehicle.path.len(), 1);
    assert_eq!(vehicle.step(&ctx, DT), VehicleUpdateResult::Arrived);
    assert!(vehicle.path.is_empty());
}

#[test]
fn test_spawn_rejects_occupied_entry_and_missing_lane() {
    let mut sim = quiet_simulation();
    sim.spawn_vehicle(VehicleClass::Sedan, Heading::South, 0)
        .expect("entry is free");

    assert!(sim.spawn_vehicle(VehicleClass::Suv, Heading::South, 0).is_err());
    assert!(sim.spawn_vehicle(VehicleClass::Suv, Heading::South, 1).is_ok());
    assert!(sim.spawn_vehicle(VehicleClass::Suv, Heading::North, 5).is_err());
    assert_eq!(sim.vehicles.len(), 2);
    assert_eq!(sim.stats().total_vehicles_spawned, 2);
}
