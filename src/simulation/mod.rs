//! Standalone intersection simulation module
//!
//! This module contains the traffic light coordination, stop gates, vehicle
//! and pedestrian movement for a single four-way crossing. It runs headless
//! and can be driven tick by tick from tests or the console.

mod clock;
mod config;
mod error;
mod intersection;
mod pedestrian;
mod population;
mod snapshot;
mod stats;
mod stop_gate;
mod traffic_light;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
pub use clock::{Clock, Tick};
pub use config::{
    CommitPolicy, GateConfig, IntersectionGeometry, LightConfig, LightTiming, PedestrianConfig,
    SensingConfig, SimConfig, SpawnConfig, VehicleClass, VehicleClassConfig, VehicleProfile,
};
pub use error::{ConfigError, ConfigResult};
pub use intersection::SimIntersection;
pub use pedestrian::{
    Pedestrian, PedestrianContext, PedestrianUpdateResult, Personality, Waypoint,
};
pub use population::{entry_along, survey_queues, vehicle_route};
pub use snapshot::{GateSnapshot, PedestrianSnapshot, SimulationSnapshot};
pub use stats::SimulationStats;
pub use stop_gate::StopGate;
pub use traffic_light::{
    update_lights, LightPhase, LightView, PhaseChange, TrafficLightController,
};
pub use types::{
    Axis, Footprint, GateId, Heading, LightId, PedestrianId, Position, Rect, SimId, VehicleId,
    POSITION_EPSILON, STOPPED_SPEED,
};
pub use vehicle::{Sensing, Vehicle, VehicleContext, VehicleUpdateResult, VehicleView};
pub use world::Simulation;
