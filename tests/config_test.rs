use intersection_sim::simulation::{
    Axis, ConfigError, GateConfig, Heading, LightPhase, SimConfig, Simulation, VehicleClass,
    VehicleProfile,
};

#[test]
fn test_default_config_is_valid() {
    let config = SimConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.lights.len(), 2);
    assert_eq!(config.pairs, vec![(0, 1)]);
    assert_eq!(config.gates.len(), 4);
    assert!(config.seed.is_none());
}

#[test]
fn test_unpaired_config_is_valid() {
    let config = SimConfig::unpaired();
    assert_eq!(config.validate(), Ok(()));
    assert!(config.pairs.is_empty());
    assert_eq!(config.lights[1].initial_phase, LightPhase::Yellow);
}

#[test]
fn test_rejects_non_positive_tick_duration() {
    for tick in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let config = SimConfig {
            tick_duration: tick,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TickDuration(_))
        ));
    }
}

#[test]
fn test_rejects_pair_without_exactly_one_green() {
    let mut config = SimConfig::default();
    config.lights[1].initial_phase = LightPhase::Green;
    assert_eq!(
        config.validate(),
        Err(ConfigError::PairInitialPhase {
            a: 0,
            b: 1,
            greens: 2
        })
    );

    let mut config = SimConfig::default();
    config.lights[0].initial_phase = LightPhase::Red;
    assert_eq!(
        config.validate(),
        Err(ConfigError::PairInitialPhase {
            a: 0,
            b: 1,
            greens: 0
        })
    );
}

#[test]
fn test_rejects_pair_on_the_same_axis() {
    let mut config = SimConfig::default();
    config.lights[1].axis = Axis::NorthSouth;
    assert_eq!(
        config.validate(),
        Err(ConfigError::PairSameAxis {
            a: 0,
            b: 1,
            axis: Axis::NorthSouth
        })
    );
}

#[test]
fn test_rejects_light_in_two_pairs() {
    let mut config = SimConfig::default();
    config.pairs.push((1, 0));
    assert_eq!(config.validate(), Err(ConfigError::LightPairedTwice(1)));

    let mut config = SimConfig::default();
    config.pairs = vec![(0, 0)];
    assert_eq!(config.validate(), Err(ConfigError::LightPairedTwice(0)));
}

#[test]
fn test_rejects_unknown_light_index() {
    let mut config = SimConfig::default();
    config.pairs = vec![(0, 5)];
    assert_eq!(
        config.validate(),
        Err(ConfigError::UnknownLight { index: 5, count: 2 })
    );

    let mut config = SimConfig::default();
    config.gates.push(GateConfig {
        approach: Heading::North,
        light: 2,
    });
    assert_eq!(
        config.validate(),
        Err(ConfigError::UnknownLight { index: 2, count: 2 })
    );
}

#[test]
fn test_rejects_gate_on_the_wrong_axis() {
    let mut config = SimConfig::default();
    config.gates[2].light = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::GateAxisMismatch {
            gate: 2,
            gate_axis: Axis::EastWest,
            light: 0,
            light_axis: Axis::NorthSouth,
        })
    );
}

#[test]
fn test_rejects_bad_light_timing() {
    let mut config = SimConfig::default();
    config.lights[1].timing.min_duration = 700;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::LightTiming { light: 1, .. })
    ));

    let mut config = SimConfig::default();
    config.lights[0].timing.yield_ratio = 0.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::LightTiming { light: 0, .. })
    ));
}

#[test]
fn test_rejects_bad_vehicle_profile() {
    let mut config = SimConfig::default();
    config.vehicle_classes[2].profile.deceleration = 0.0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::VehicleProfile {
            class: "truck",
            field: "deceleration",
            value: 0.0
        })
    );

    let mut config = SimConfig::default();
    config.vehicle_classes[0].weight = -1.0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::VehicleProfile {
            class: "sedan",
            field: "spawn weight",
            value: -1.0
        })
    );
}

#[test]
fn test_rejects_probability_out_of_range() {
    let mut config = SimConfig::default();
    config.spawn.vehicle_probability = 1.5;
    assert_eq!(
        config.validate(),
        Err(ConfigError::Probability {
            name: "vehicle spawn probability",
            value: 1.5
        })
    );

    let mut config = SimConfig::default();
    config.pedestrians.impulsive_ignore_probability = -0.1;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Probability {
            name: "impulsive ignore probability",
            ..
        })
    ));
}

#[test]
fn test_rejects_geometry_that_does_not_fit() {
    let mut config = SimConfig::default();
    config.geometry.lanes_per_direction = 3;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));

    let mut config = SimConfig::default();
    config.geometry.road_half_length = 30.0;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));
}

#[test]
fn test_rejects_bad_pedestrian_settings() {
    let mut config = SimConfig::default();
    config.pedestrians.walking_speed = 0.0;
    assert!(matches!(config.validate(), Err(ConfigError::Pedestrian(_))));
}

#[test]
fn test_simulation_refuses_invalid_config() {
    let config = SimConfig {
        tick_duration: 0.0,
        ..SimConfig::default()
    };
    assert_eq!(
        Simulation::new(config).err(),
        Some(ConfigError::TickDuration(0.0))
    );
}

#[test]
fn test_heavier_vehicles_need_longer_to_stop() {
    let sedan = VehicleProfile::for_class(VehicleClass::Sedan);
    let truck = VehicleProfile::for_class(VehicleClass::Truck);

    assert_eq!(sedan.stopping_distance(0.0), 0.0);
    assert!(truck.stopping_distance(20.0) > sedan.stopping_distance(20.0));
    assert!(truck.footprint.length > sedan.footprint.length);
}

#[test]
fn test_error_messages_name_the_problem() {
    let err = ConfigError::GateAxisMismatch {
        gate: 2,
        gate_axis: Axis::EastWest,
        light: 0,
        light_axis: Axis::NorthSouth,
    };
    assert_eq!(
        err.to_string(),
        "gate 2 gates EW traffic but its light 0 controls NS"
    );
}
