//! Intersection box occupancy
//!
//! The box is the square where the two roads overlap. Vehicles of one axis
//! must not enter while vehicles of the other axis are inside it. Occupancy
//! is recorded from the frozen vehicle views at the start of the vehicle
//! phase, so every vehicle sees the same answer.

use super::types::{Axis, Rect};
use super::vehicle::VehicleView;

#[derive(Debug, Clone)]
pub struct SimIntersection {
    boundary: Rect,
    /// Vehicles latched inside the box, per axis
    occupants: [u32; 2],
}

impl SimIntersection {
    pub fn new(boundary: Rect) -> Self {
        Self {
            boundary,
            occupants: [0; 2],
        }
    }

    pub fn boundary(&self) -> &Rect {
        &self.boundary
    }

    /// Whether `footprint` reaches into the box
    pub fn touches(&self, footprint: &Rect) -> bool {
        self.boundary.overlaps(footprint)
    }

    /// Recount the vehicles currently crossing
    pub fn record_occupants(&mut self, vehicles: &[VehicleView]) {
        self.occupants = [0; 2];
        for vehicle in vehicles.iter().filter(|v| v.crossing_intersection) {
            self.occupants[vehicle.heading.axis().index()] += 1;
        }
    }

    pub fn occupants(&self, axis: Axis) -> u32 {
        self.occupants[axis.index()]
    }

    /// True when traffic on the perpendicular axis is inside the box
    pub fn is_held_against(&self, axis: Axis) -> bool {
        self.occupants(axis.perpendicular()) > 0
    }
}
