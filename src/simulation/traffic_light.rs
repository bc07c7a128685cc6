//! Traffic light controllers
//!
//! Each controller owns one light's phase machine:
//!
//! ```text
//! GREEN -> YELLOW -> SAFETY_DELAY -> RED -> GREEN
//! ```
//!
//! A coordinated controller knows its pair only by id. During the light phase
//! of a tick every controller is updated against a frozen [`LightView`] of
//! its pair, taken before any light changed. RED -> GREEN is decided by
//! [`LightView::wins_handoff`], which both members of a pair evaluate on the
//! same two frozen views; it is antisymmetric, so exactly one of them can
//! take GREEN. An unpaired controller runs a fixed cycle instead.

use std::cmp::Reverse;
use std::fmt;

use super::clock::Tick;
use super::config::LightTiming;
use super::types::{Axis, LightId};

/// Phase of a traffic light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightPhase {
    Green,
    Yellow,
    /// All-red interval right after YELLOW; part of RED for everyone outside
    /// the controller
    SafetyDelay,
    Red,
}

impl LightPhase {
    pub fn is_green(self) -> bool {
        matches!(self, LightPhase::Green)
    }

    /// Vehicles must stop on anything but GREEN
    pub fn is_stop_required(self) -> bool {
        match self {
            LightPhase::Green => false,
            LightPhase::Yellow | LightPhase::SafetyDelay | LightPhase::Red => true,
        }
    }

    /// Pedestrians may cross the governed road only while it is red
    pub fn is_pedestrian_safe(self) -> bool {
        match self {
            LightPhase::Red | LightPhase::SafetyDelay => true,
            LightPhase::Green | LightPhase::Yellow => false,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            LightPhase::Green => 'G',
            LightPhase::Yellow => 'Y',
            LightPhase::SafetyDelay => 'r',
            LightPhase::Red => 'R',
        }
    }
}

impl fmt::Display for LightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LightPhase::Green => "GREEN",
            LightPhase::Yellow => "YELLOW",
            LightPhase::SafetyDelay => "SAFETY_DELAY",
            LightPhase::Red => "RED",
        };
        f.write_str(name)
    }
}

/// Read-only copy of a controller's state, frozen at the start of the light
/// phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightView {
    pub id: LightId,
    pub axis: Axis,
    pub phase: LightPhase,
    pub phase_elapsed: u32,
    pub queue_estimate: u32,
    pub wait_ticks: u32,
    pub timing: LightTiming,
}

impl LightView {
    pub fn is_green(&self) -> bool {
        self.phase.is_green()
    }

    pub fn is_stop_required(&self) -> bool {
        self.phase.is_stop_required()
    }

    pub fn is_pedestrian_safe(&self) -> bool {
        self.phase.is_pedestrian_safe()
    }

    /// Whether this light should let `pair` have the next green.
    ///
    /// Comparisons are strict so that ties keep the current assignment.
    pub fn yields_to(&self, pair: &LightView) -> bool {
        if self.queue_estimate == 0 {
            return true;
        }
        if pair.queue_estimate > 0 && pair.wait_ticks >= self.timing.starvation_threshold {
            return true;
        }
        pair.queue_estimate as f32 > self.queue_estimate as f32 * self.timing.yield_ratio
    }

    /// Decide which of two RED lights takes GREEN.
    ///
    /// A light that claims green (does not yield) beats one that yields.
    /// Otherwise the light that has been red longer wins, then the lower id.
    /// `a.wins_handoff(&b) != b.wins_handoff(&a)` for distinct ids.
    pub fn wins_handoff(&self, pair: &LightView) -> bool {
        let claims = !self.yields_to(pair);
        let pair_claims = !pair.yields_to(self);
        if claims != pair_claims {
            return claims;
        }
        (self.phase_elapsed, Reverse(self.id)) > (pair.phase_elapsed, Reverse(pair.id))
    }
}

/// A phase transition, reported for logging and statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseChange {
    pub light: LightId,
    pub axis: Axis,
    pub from: LightPhase,
    pub to: LightPhase,
    pub at: Tick,
}

/// One traffic light with its adaptive timing policy
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    id: LightId,
    axis: Axis,
    phase: LightPhase,
    phase_elapsed: u32,
    timing: LightTiming,
    paired: Option<LightId>,
    queue_estimate: u32,
    throughput_estimate: u32,
    wait_ticks: u32,
    greens_started: u32,
}

impl TrafficLightController {
    pub fn new(id: LightId, axis: Axis, initial_phase: LightPhase, timing: LightTiming) -> Self {
        Self {
            id,
            axis,
            phase: initial_phase,
            phase_elapsed: 0,
            timing,
            paired: None,
            queue_estimate: 0,
            throughput_estimate: 0,
            wait_ticks: 0,
            greens_started: 0,
        }
    }

    /// Coordinate with the perpendicular controller `pair`
    pub fn pair_with(&mut self, pair: LightId) {
        self.paired = Some(pair);
    }

    pub fn id(&self) -> LightId {
        self.id
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn phase(&self) -> LightPhase {
        self.phase
    }

    pub fn phase_elapsed(&self) -> u32 {
        self.phase_elapsed
    }

    pub fn timing(&self) -> &LightTiming {
        &self.timing
    }

    pub fn paired(&self) -> Option<LightId> {
        self.paired
    }

    pub fn queue_estimate(&self) -> u32 {
        self.queue_estimate
    }

    pub fn throughput_estimate(&self) -> u32 {
        self.throughput_estimate
    }

    pub fn wait_ticks(&self) -> u32 {
        self.wait_ticks
    }

    /// Number of times this light has turned green
    pub fn greens_started(&self) -> u32 {
        self.greens_started
    }

    pub fn is_green(&self) -> bool {
        self.phase.is_green()
    }

    pub fn is_stop_required(&self) -> bool {
        self.phase.is_stop_required()
    }

    pub fn is_pedestrian_safe(&self) -> bool {
        self.phase.is_pedestrian_safe()
    }

    pub fn view(&self) -> LightView {
        LightView {
            id: self.id,
            axis: self.axis,
            phase: self.phase,
            phase_elapsed: self.phase_elapsed,
            queue_estimate: self.queue_estimate,
            wait_ticks: self.wait_ticks,
            timing: self.timing,
        }
    }

    /// Record the traffic surveyed for this light's axis: vehicles stopped
    /// before the box, and vehicles that entered it during the last tick
    pub fn observe_demand(&mut self, queued: u32, entered: u32) {
        self.queue_estimate = queued;
        if self.phase.is_green() {
            self.throughput_estimate = self.throughput_estimate.saturating_add(entered);
        }
    }

    /// Length of the current green in ticks.
    ///
    /// Base duration, stretched by our own queue and good flow, shortened by
    /// the pair's queue, clamped to `[min_duration, max_duration]`. Without a
    /// pair the light runs fixed timing and this is `base_duration`.
    pub fn green_duration(&self, pair: Option<&LightView>) -> u32 {
        let timing = &self.timing;
        let Some(pair) = pair else {
            return timing.base_duration;
        };

        let extension = i64::from(timing.extension_per_vehicle) * i64::from(self.queue_estimate);
        let reduction = i64::from(timing.reduction_per_vehicle) * i64::from(pair.queue_estimate);
        let flow_bonus = if self.is_flowing() {
            i64::from(timing.flow_bonus_ticks)
        } else {
            0
        };

        let duration = i64::from(timing.base_duration) + extension + flow_bonus - reduction;
        duration.clamp(
            i64::from(timing.min_duration),
            i64::from(timing.max_duration),
        ) as u32
    }

    fn is_flowing(&self) -> bool {
        self.phase.is_green()
            && self.phase_elapsed > 0
            && self.throughput_estimate > 0
            && self.throughput_estimate as f32 / self.phase_elapsed as f32
                >= self.timing.flow_rate_threshold
    }

    /// True when this light has no one waiting, its pair is starving, or the
    /// pair's queue is materially larger
    pub fn should_yield_to_pair(&self, pair: &LightView) -> bool {
        self.view().yields_to(pair)
    }

    /// Advance one tick. `pair` is the frozen view of the paired controller,
    /// or `None` for a light running fixed timing.
    pub fn update(&mut self, now: Tick, pair: Option<&LightView>) -> Option<PhaseChange> {
        let frozen = self.view();
        let pair = pair.filter(|_| self.paired.is_some());

        self.phase_elapsed = self.phase_elapsed.saturating_add(1);
        if !self.phase.is_green() && self.queue_estimate > 0 {
            self.wait_ticks = self.wait_ticks.saturating_add(1);
        }

        let timing = self.timing;
        let next = match self.phase {
            LightPhase::Green => {
                let expired = self.phase_elapsed >= self.green_duration(pair);
                let pair_starving = pair.is_some_and(|pair| {
                    pair.queue_estimate > 0
                        && pair.wait_ticks >= timing.starvation_threshold
                        && self.phase_elapsed >= timing.min_duration
                });
                (expired || pair_starving).then_some(LightPhase::Yellow)
            }
            LightPhase::Yellow => (self.phase_elapsed >= timing.yellow_duration).then(|| {
                if timing.safety_delay > 0 {
                    LightPhase::SafetyDelay
                } else {
                    Self::after_safety_delay(pair)
                }
            }),
            LightPhase::SafetyDelay => (self.phase_elapsed >= timing.safety_delay)
                .then(|| Self::after_safety_delay(pair)),
            LightPhase::Red => match pair {
                Some(pair) => (pair.phase == LightPhase::Red && frozen.wins_handoff(pair))
                    .then_some(LightPhase::Green),
                // An unpaired light left on red resumes its cycle
                None => (self.phase_elapsed >= timing.safety_delay).then_some(LightPhase::Green),
            },
        };

        next.map(|to| self.enter(to, now))
    }

    fn after_safety_delay(pair: Option<&LightView>) -> LightPhase {
        if pair.is_some() {
            LightPhase::Red
        } else {
            LightPhase::Green
        }
    }

    fn enter(&mut self, to: LightPhase, now: Tick) -> PhaseChange {
        let change = PhaseChange {
            light: self.id,
            axis: self.axis,
            from: self.phase,
            to,
            at: now,
        };

        self.phase = to;
        self.phase_elapsed = 0;
        if to.is_green() {
            self.wait_ticks = 0;
            self.throughput_estimate = 0;
            self.greens_started = self.greens_started.saturating_add(1);
        }

        change
    }
}

/// Update every light against frozen views of its pair.
///
/// Light ids are indices into `lights`.
pub fn update_lights(lights: &mut [TrafficLightController], now: Tick) -> Vec<PhaseChange> {
    let views: Vec<LightView> = lights.iter().map(TrafficLightController::view).collect();

    lights
        .iter_mut()
        .filter_map(|light| {
            let pair = light.paired().and_then(|id| views.get(id.0));
            light.update(now, pair)
        })
        .collect()
}
