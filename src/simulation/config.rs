//! Simulation configuration
//!
//! Everything here is plain constructor data. `SimConfig::default()` builds
//! the standard four-way crossing: two 40-unit roads, two lanes per
//! direction, a coordinated NS/EW light pair, and one stop gate per approach.
//! `validate()` is the only place configuration invariants are checked.

use super::error::{ConfigError, ConfigResult};
use super::traffic_light::LightPhase;
use super::types::{Axis, Footprint, Heading, Position, Rect};

/// What a vehicle already inside the intersection box still reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Ignore gates and box occupancy, but still brake for pedestrians
    #[default]
    YieldToPedestrians,
    /// Ignore everything except the vehicle ahead
    IgnoreAll,
}

/// Timing policy for one traffic light, in ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightTiming {
    pub min_duration: u32,
    pub max_duration: u32,
    pub base_duration: u32,
    pub yellow_duration: u32,
    /// Length of the all-red interval after YELLOW
    pub safety_delay: u32,
    /// Wait ticks after which the pair must hand over GREEN
    pub starvation_threshold: u32,
    /// Green ticks added per vehicle waiting on this axis
    pub extension_per_vehicle: u32,
    /// Green ticks removed per vehicle waiting on the crossing axis
    pub reduction_per_vehicle: u32,
    /// Green ticks added while the current green is moving traffic well
    pub flow_bonus_ticks: u32,
    /// Vehicles per tick through the box that count as good flow
    pub flow_rate_threshold: f32,
    /// Yield when the pair's queue exceeds ours by this factor
    pub yield_ratio: f32,
}

impl Default for LightTiming {
    fn default() -> Self {
        Self {
            min_duration: 90,
            max_duration: 600,
            base_duration: 120,
            yellow_duration: 60,
            safety_delay: 60,
            starvation_threshold: 300,
            extension_per_vehicle: 20,
            reduction_per_vehicle: 20,
            flow_bonus_ticks: 60,
            flow_rate_threshold: 1.0 / 60.0,
            yield_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightConfig {
    pub axis: Axis,
    pub initial_phase: LightPhase,
    pub timing: LightTiming,
}

/// A stop gate on one approach, bound to a light by index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
    /// Heading of the traffic this gate stops
    pub approach: Heading,
    pub light: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleClass {
    Sedan,
    Suv,
    Truck,
}

impl VehicleClass {
    pub fn name(self) -> &'static str {
        match self {
            VehicleClass::Sedan => "sedan",
            VehicleClass::Suv => "suv",
            VehicleClass::Truck => "truck",
        }
    }
}

/// Kinematic constants for one class of vehicle. Speeds are units per
/// second, accelerations units per second squared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleProfile {
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub footprint: Footprint,
}

impl VehicleProfile {
    pub fn for_class(class: VehicleClass) -> Self {
        match class {
            VehicleClass::Sedan => Self {
                max_speed: 30.0,
                acceleration: 12.0,
                deceleration: 40.0,
                footprint: Footprint::new(9.0, 4.0),
            },
            VehicleClass::Suv => Self {
                max_speed: 27.0,
                acceleration: 10.0,
                deceleration: 36.0,
                footprint: Footprint::new(10.0, 4.5),
            },
            VehicleClass::Truck => Self {
                max_speed: 22.0,
                acceleration: 6.0,
                deceleration: 28.0,
                footprint: Footprint::new(14.0, 5.0),
            },
        }
    }

    /// Distance covered while braking from `speed` to a standstill
    pub fn stopping_distance(&self, speed: f32) -> f32 {
        speed * speed / (2.0 * self.deceleration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleClassConfig {
    pub class: VehicleClass,
    pub profile: VehicleProfile,
    /// Relative spawn weight
    pub weight: f32,
}

impl VehicleClassConfig {
    pub fn new(class: VehicleClass, weight: f32) -> Self {
        Self {
            class,
            profile: VehicleProfile::for_class(class),
            weight,
        }
    }
}

/// Per-tick Bernoulli spawn probabilities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnConfig {
    pub vehicle_probability: f64,
    pub pedestrian_probability: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            vehicle_probability: 0.02,
            pedestrian_probability: 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedestrianConfig {
    /// Units per second
    pub walking_speed: f32,
    /// Moving vehicles closer than this keep a pedestrian on the curb
    pub safe_distance: f32,
    /// Chance an impulsive pedestrian crosses against the light
    pub impulsive_ignore_probability: f64,
}

impl Default for PedestrianConfig {
    fn default() -> Self {
        Self {
            walking_speed: 12.0,
            safe_distance: 30.0,
            impulsive_ignore_probability: 0.3,
        }
    }
}

/// Sensing distances shared by all vehicles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensingConfig {
    /// Bumper gap kept on top of the stopping distance
    pub min_gap: f32,
    /// How far ahead a vehicle looks for a leader
    pub sensor_range: f32,
    /// Extra length of the pedestrian safety rectangle
    pub pedestrian_buffer: f32,
    /// Extra width of the pedestrian safety rectangle
    pub pedestrian_margin: f32,
    /// Stopped vehicles this close to the box count as queued
    pub queue_detection_range: f32,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            min_gap: 3.0,
            sensor_range: 60.0,
            pedestrian_buffer: 4.0,
            pedestrian_margin: 2.0,
            queue_detection_range: 100.0,
        }
    }
}

/// Layout of a single four-way crossing of two straight roads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionGeometry {
    pub center: Position,
    /// Half the width of each road; the intersection box is twice this square
    pub road_half_width: f32,
    /// Distance from the center to the end of each road arm
    pub road_half_length: f32,
    pub lanes_per_direction: u8,
    pub lane_width: f32,
    /// Width of the sidewalks; crosswalks are this wide too
    pub sidewalk_width: f32,
    /// Depth of each stop gate, placed just outside the crosswalk
    pub gate_depth: f32,
}

impl Default for IntersectionGeometry {
    fn default() -> Self {
        Self {
            center: Position::new(0.0, 0.0),
            road_half_width: 20.0,
            road_half_length: 150.0,
            lanes_per_direction: 2,
            lane_width: 10.0,
            sidewalk_width: 5.0,
            gate_depth: 6.0,
        }
    }
}

impl IntersectionGeometry {
    /// The box both axes share
    pub fn intersection_box(&self) -> Rect {
        let size = self.road_half_width * 2.0;
        Rect::new(self.center, size, size)
    }

    /// Point on the center line of `lane` for traffic going `heading`,
    /// `along` units past the intersection center
    pub fn lane_point(&self, heading: Heading, lane: u8, along: f32) -> Position {
        let (dx, dz) = heading.unit();
        let (rx, rz) = heading.right();
        let lateral = self.lane_width * (f32::from(lane) + 0.5);
        Position::new(
            self.center.x + dx * along + rx * lateral,
            self.center.z + dz * along + rz * lateral,
        )
    }

    /// Distance from the center to the near edge of an approach's gate
    pub fn gate_inner_distance(&self) -> f32 {
        self.road_half_width + self.sidewalk_width
    }

    /// Stop-gate rectangle for traffic approaching with `heading`. It spans
    /// every lane of that direction.
    pub fn gate_rect(&self, approach: Heading) -> Rect {
        let near = self.gate_inner_distance();
        let far = near + self.gate_depth;
        let span = self.lane_width * f32::from(self.lanes_per_direction);
        let (dx, dz) = approach.unit();
        let (rx, rz) = approach.right();
        let corner = |along: f32, lateral: f32| {
            Position::new(
                self.center.x + dx * along + rx * lateral,
                self.center.z + dz * along + rz * lateral,
            )
        };
        let a = corner(-far, 0.0);
        let b = corner(-near, span);
        Rect::from_bounds(a.x.min(b.x), a.x.max(b.x), a.z.min(b.z), a.z.max(b.z))
    }

    /// Lateral distance from a road's center line to the middle of its sidewalk
    pub fn sidewalk_offset(&self) -> f32 {
        self.road_half_width + self.sidewalk_width / 2.0
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Seconds per tick
    pub tick_duration: f32,
    /// Seed for reproducible runs; `None` draws from the thread RNG
    pub seed: Option<u64>,
    pub geometry: IntersectionGeometry,
    pub lights: Vec<LightConfig>,
    /// Coordinated pairs, by index into `lights`
    pub pairs: Vec<(usize, usize)>,
    pub gates: Vec<GateConfig>,
    pub vehicle_classes: Vec<VehicleClassConfig>,
    pub spawn: SpawnConfig,
    pub pedestrians: PedestrianConfig,
    pub sensing: SensingConfig,
    pub commit_policy: CommitPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_duration: 1.0 / 60.0,
            seed: None,
            geometry: IntersectionGeometry::default(),
            lights: vec![
                LightConfig {
                    axis: Axis::NorthSouth,
                    initial_phase: LightPhase::Green,
                    timing: LightTiming::default(),
                },
                LightConfig {
                    axis: Axis::EastWest,
                    initial_phase: LightPhase::Red,
                    timing: LightTiming::default(),
                },
            ],
            pairs: vec![(0, 1)],
            gates: vec![
                GateConfig {
                    approach: Heading::North,
                    light: 0,
                },
                GateConfig {
                    approach: Heading::South,
                    light: 0,
                },
                GateConfig {
                    approach: Heading::East,
                    light: 1,
                },
                GateConfig {
                    approach: Heading::West,
                    light: 1,
                },
            ],
            vehicle_classes: vec![
                VehicleClassConfig::new(VehicleClass::Sedan, 6.0),
                VehicleClassConfig::new(VehicleClass::Suv, 3.0),
                VehicleClassConfig::new(VehicleClass::Truck, 1.0),
            ],
            spawn: SpawnConfig::default(),
            pedestrians: PedestrianConfig::default(),
            sensing: SensingConfig::default(),
            commit_policy: CommitPolicy::default(),
        }
    }
}

impl SimConfig {
    /// The default layout with the two lights running independent fixed
    /// cycles, offset by half a cycle
    pub fn unpaired() -> Self {
        let mut config = Self::default();
        config.pairs.clear();
        if let Some(ew) = config.lights.get_mut(1) {
            ew.initial_phase = LightPhase::Yellow;
        }
        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every construction-time invariant
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.tick_duration.is_finite() && self.tick_duration > 0.0) {
            return Err(ConfigError::TickDuration(self.tick_duration));
        }

        self.validate_geometry()?;

        for (index, light) in self.lights.iter().enumerate() {
            validate_timing(index, &light.timing)?;
        }

        self.validate_pairs()?;
        self.validate_gates()?;
        self.validate_vehicle_classes()?;

        check_probability("vehicle spawn probability", self.spawn.vehicle_probability)?;
        check_probability(
            "pedestrian spawn probability",
            self.spawn.pedestrian_probability,
        )?;
        check_probability(
            "impulsive ignore probability",
            self.pedestrians.impulsive_ignore_probability,
        )?;

        if !(self.pedestrians.walking_speed.is_finite() && self.pedestrians.walking_speed > 0.0) {
            return Err(ConfigError::Pedestrian(format!(
                "walking speed must be positive, got {}",
                self.pedestrians.walking_speed
            )));
        }
        if self.pedestrians.safe_distance < 0.0 {
            return Err(ConfigError::Pedestrian(format!(
                "safe distance must not be negative, got {}",
                self.pedestrians.safe_distance
            )));
        }

        Ok(())
    }

    fn validate_geometry(&self) -> ConfigResult<()> {
        let g = &self.geometry;
        if g.road_half_width <= 0.0 || g.lane_width <= 0.0 || g.gate_depth <= 0.0 {
            return Err(ConfigError::Geometry(
                "road width, lane width and gate depth must be positive".to_string(),
            ));
        }
        if g.lanes_per_direction == 0 {
            return Err(ConfigError::Geometry(
                "at least one lane per direction is required".to_string(),
            ));
        }
        if g.lane_width * f32::from(g.lanes_per_direction) > g.road_half_width + f32::EPSILON {
            return Err(ConfigError::Geometry(format!(
                "{} lanes of width {} do not fit in half a road of width {}",
                g.lanes_per_direction, g.lane_width, g.road_half_width
            )));
        }
        if g.sidewalk_width < 0.0 {
            return Err(ConfigError::Geometry(
                "sidewalk width must not be negative".to_string(),
            ));
        }
        if g.road_half_length <= g.gate_inner_distance() + g.gate_depth {
            return Err(ConfigError::Geometry(format!(
                "road arms of {} are too short to hold the stop gates",
                g.road_half_length
            )));
        }
        Ok(())
    }

    fn validate_pairs(&self) -> ConfigResult<()> {
        let count = self.lights.len();
        let mut paired = vec![false; count];
        for &(a, b) in &self.pairs {
            for index in [a, b] {
                if index >= count {
                    return Err(ConfigError::UnknownLight { index, count });
                }
            }
            for index in [a, b] {
                if paired[index] || a == b {
                    return Err(ConfigError::LightPairedTwice(index));
                }
                paired[index] = true;
            }

            let (first, second) = (&self.lights[a], &self.lights[b]);
            if first.axis == second.axis {
                return Err(ConfigError::PairSameAxis {
                    a,
                    b,
                    axis: first.axis,
                });
            }

            let greens = [first, second]
                .iter()
                .filter(|light| light.initial_phase == LightPhase::Green)
                .count();
            if greens != 1 {
                return Err(ConfigError::PairInitialPhase { a, b, greens });
            }
        }
        Ok(())
    }

    fn validate_gates(&self) -> ConfigResult<()> {
        let count = self.lights.len();
        for (gate, config) in self.gates.iter().enumerate() {
            let light = self
                .lights
                .get(config.light)
                .ok_or(ConfigError::UnknownLight {
                    index: config.light,
                    count,
                })?;
            if light.axis != config.approach.axis() {
                return Err(ConfigError::GateAxisMismatch {
                    gate,
                    gate_axis: config.approach.axis(),
                    light: config.light,
                    light_axis: light.axis,
                });
            }
        }
        Ok(())
    }

    fn validate_vehicle_classes(&self) -> ConfigResult<()> {
        for entry in &self.vehicle_classes {
            let class = entry.class.name();
            let profile = &entry.profile;
            let fields = [
                ("max_speed", profile.max_speed),
                ("acceleration", profile.acceleration),
                ("deceleration", profile.deceleration),
                ("footprint length", profile.footprint.length),
                ("footprint width", profile.footprint.width),
            ];
            for (field, value) in fields {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ConfigError::VehicleProfile {
                        class,
                        field,
                        value,
                    });
                }
            }
            if !(entry.weight.is_finite() && entry.weight >= 0.0) {
                return Err(ConfigError::VehicleProfile {
                    class,
                    field: "spawn weight",
                    value: entry.weight,
                });
            }
        }
        Ok(())
    }
}

fn validate_timing(light: usize, timing: &LightTiming) -> ConfigResult<()> {
    if timing.min_duration > timing.max_duration {
        return Err(ConfigError::LightTiming {
            light,
            reason: format!(
                "min_duration {} exceeds max_duration {}",
                timing.min_duration, timing.max_duration
            ),
        });
    }
    if timing.max_duration == 0 {
        return Err(ConfigError::LightTiming {
            light,
            reason: "max_duration must be at least one tick".to_string(),
        });
    }
    if !(timing.yield_ratio.is_finite() && timing.yield_ratio > 0.0) {
        return Err(ConfigError::LightTiming {
            light,
            reason: format!("yield_ratio must be positive, got {}", timing.yield_ratio),
        });
    }
    if !(timing.flow_rate_threshold.is_finite() && timing.flow_rate_threshold >= 0.0) {
        return Err(ConfigError::LightTiming {
            light,
            reason: format!(
                "flow_rate_threshold must not be negative, got {}",
                timing.flow_rate_threshold
            ),
        });
    }
    Ok(())
}

fn check_probability(name: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}
