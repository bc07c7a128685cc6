//! Stop gates
//!
//! A gate is a rectangle across the approach lanes just before the
//! crosswalk. It mirrors its light: active exactly when the light requires
//! stopping, and it never changes state on its own.

use super::traffic_light::TrafficLightController;
use super::types::{Axis, GateId, Heading, LightId, Rect};

#[derive(Debug, Clone)]
pub struct StopGate {
    id: GateId,
    boundary: Rect,
    approach: Heading,
    light: LightId,
    active: bool,
}

impl StopGate {
    /// Create a gate for traffic travelling `approach`, bound to `light`.
    /// Gates start active until their first sync.
    pub fn new(id: GateId, boundary: Rect, approach: Heading, light: LightId) -> Self {
        Self {
            id,
            boundary,
            approach,
            light,
            active: true,
        }
    }

    pub fn id(&self) -> GateId {
        self.id
    }

    pub fn boundary(&self) -> &Rect {
        &self.boundary
    }

    pub fn axis(&self) -> Axis {
        self.approach.axis()
    }

    pub fn approach(&self) -> Heading {
        self.approach
    }

    /// The light this gate follows
    pub fn light(&self) -> LightId {
        self.light
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Copy the stop state of `controller`
    pub fn sync(&mut self, controller: &TrafficLightController) {
        self.active = controller.is_stop_required();
    }

    /// Whether a vehicle occupying `footprint` is held by this gate.
    ///
    /// Callers skip this for vehicles already crossing the intersection.
    pub fn blocks(&self, footprint: &Rect) -> bool {
        self.active && self.boundary.overlaps(footprint)
    }
}
