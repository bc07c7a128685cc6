//! Owned, read-only copies of the simulation state

use super::clock::Tick;
use super::pedestrian::Personality;
use super::traffic_light::{LightPhase, LightView};
use super::types::{Axis, GateId, Heading, PedestrianId, Position};
use super::vehicle::VehicleView;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSnapshot {
    pub id: GateId,
    pub axis: Axis,
    pub approach: Heading,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedestrianSnapshot {
    pub id: PedestrianId,
    pub personality: Personality,
    pub heading: Heading,
    pub position: Position,
    pub waiting_to_cross: bool,
    pub on_crosswalk: bool,
}

/// Everything observable about a simulation after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSnapshot {
    pub tick: Tick,
    pub elapsed_secs: f64,
    pub lights: Vec<LightView>,
    pub gates: Vec<GateSnapshot>,
    pub vehicles: Vec<VehicleView>,
    pub pedestrians: Vec<PedestrianSnapshot>,
}

impl SimulationSnapshot {
    /// Lights governing `axis`
    pub fn lights_on(&self, axis: Axis) -> impl Iterator<Item = &LightView> {
        self.lights.iter().filter(move |light| light.axis == axis)
    }

    /// Phase of the first light on `axis`
    pub fn phase(&self, axis: Axis) -> Option<LightPhase> {
        self.lights_on(axis).next().map(|light| light.phase)
    }

    pub fn green_count(&self) -> usize {
        self.lights.iter().filter(|light| light.is_green()).count()
    }

    pub fn crossing_vehicles(&self) -> impl Iterator<Item = &VehicleView> {
        self.vehicles
            .iter()
            .filter(|vehicle| vehicle.crossing_intersection)
    }
}
