//! Main simulation that ties everything together
//!
//! A tick runs in a fixed order, each phase reading state settled by the
//! previous one:
//!
//! 1. advance the clock
//! 2. survey queues and update the lights
//! 3. sync the stop gates to their lights
//! 4. spawn new agents
//! 5. move pedestrians
//! 6. move vehicles against a frozen view of every vehicle
//! 7. prune agents that finished their route
//! 8. update statistics

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::clock::{Clock, Tick};
use super::config::{SimConfig, VehicleClass, VehicleClassConfig, VehicleProfile};
use super::error::ConfigResult;
use super::intersection::SimIntersection;
use super::pedestrian::{Pedestrian, PedestrianContext, PedestrianUpdateResult, Personality};
use super::population;
use super::snapshot::{GateSnapshot, PedestrianSnapshot, SimulationSnapshot};
use super::stats::SimulationStats;
use super::stop_gate::StopGate;
use super::traffic_light::{update_lights, LightView, TrafficLightController};
use super::types::{Axis, GateId, Heading, LightId, PedestrianId, Position, SimId, VehicleId};
use super::vehicle::{Vehicle, VehicleContext, VehicleUpdateResult, VehicleView};

/// World units per character in [`Simulation::draw_map`]
const MAP_CELL_SIZE: f32 = 5.0;

/// The main simulation
pub struct Simulation {
    config: SimConfig,

    clock: Clock,

    /// All lights; a light's id is its index
    lights: Vec<TrafficLightController>,

    /// All stop gates; a gate's id is its index
    gates: Vec<StopGate>,

    intersection: SimIntersection,

    /// All vehicles, iterated in id order
    pub vehicles: BTreeMap<VehicleId, Vehicle>,

    /// All pedestrians, iterated in id order
    pub pedestrians: BTreeMap<PedestrianId, Pedestrian>,

    /// Box entries per axis during the last tick, fed to the lights
    entered_last_tick: [u32; 2],

    /// Next ID to assign
    next_id: usize,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    stats: SimulationStats,
}

impl Simulation {
    /// Build a simulation from a validated configuration
    pub fn new(config: SimConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut lights: Vec<TrafficLightController> = config
            .lights
            .iter()
            .enumerate()
            .map(|(index, light)| {
                TrafficLightController::new(
                    LightId(index),
                    light.axis,
                    light.initial_phase,
                    light.timing,
                )
            })
            .collect();
        for &(a, b) in &config.pairs {
            if let Some(light) = lights.get_mut(a) {
                light.pair_with(LightId(b));
            }
            if let Some(light) = lights.get_mut(b) {
                light.pair_with(LightId(a));
            }
        }

        let mut gates: Vec<StopGate> = config
            .gates
            .iter()
            .enumerate()
            .map(|(index, gate)| {
                StopGate::new(
                    GateId(index),
                    config.geometry.gate_rect(gate.approach),
                    gate.approach,
                    LightId(gate.light),
                )
            })
            .collect();
        for gate in &mut gates {
            if let Some(light) = lights.get(gate.light().0) {
                gate.sync(light);
            }
        }

        let intersection = SimIntersection::new(config.geometry.intersection_box());
        let rng = config.seed.map(StdRng::seed_from_u64);

        Ok(Self {
            config,
            clock: Clock::new(),
            lights,
            gates,
            intersection,
            vehicles: BTreeMap::new(),
            pedestrians: BTreeMap::new(),
            entered_last_tick: [0; 2],
            next_id: 0,
            rng,
            stats: SimulationStats::default(),
        })
    }

    /// Create a simulation with the default crossing and a fixed seed
    pub fn new_with_seed(seed: u64) -> ConfigResult<Self> {
        Self::new(SimConfig::default().with_seed(seed))
    }

    /// Get a random bool with probability `p`, using seeded RNG if available
    fn random_bool(&mut self, p: f64) -> bool {
        match &mut self.rng {
            Some(rng) => rng.random_bool(p),
            None => rand::rng().random_bool(p),
        }
    }

    /// Get a random index below `len`, using seeded RNG if available
    fn random_index(&mut self, len: usize) -> usize {
        match &mut self.rng {
            Some(rng) => rng.random_range(0..len),
            None => rand::rng().random_range(0..len),
        }
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    /// Choose a vehicle class by spawn weight
    fn choose_vehicle_class(&mut self) -> Option<VehicleClassConfig> {
        let classes = &self.config.vehicle_classes;
        let chosen = match &mut self.rng {
            Some(rng) => classes.choose_weighted(rng, |class| class.weight),
            None => classes.choose_weighted(&mut rand::rng(), |class| class.weight),
        };
        chosen.ok().copied()
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn lights(&self) -> &[TrafficLightController] {
        &self.lights
    }

    pub fn light(&self, id: LightId) -> Option<&TrafficLightController> {
        self.lights.get(id.0)
    }

    /// The first light governing `axis`
    pub fn light_for(&self, axis: Axis) -> Option<&TrafficLightController> {
        self.lights.iter().find(|light| light.axis() == axis)
    }

    pub fn gates(&self) -> &[StopGate] {
        &self.gates
    }

    pub fn intersection(&self) -> &SimIntersection {
        &self.intersection
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// True when no agent is left in the scene
    pub fn is_idle(&self) -> bool {
        self.vehicles.is_empty() && self.pedestrians.is_empty()
    }

    fn profile_for(&self, class: VehicleClass) -> VehicleProfile {
        self.config
            .vehicle_classes
            .iter()
            .find(|entry| entry.class == class)
            .map_or_else(|| VehicleProfile::for_class(class), |entry| entry.profile)
    }

    /// Spawn a vehicle at the start of its road
    pub fn spawn_vehicle(
        &mut self,
        class: VehicleClass,
        heading: Heading,
        lane: u8,
    ) -> Result<VehicleId> {
        let length = self.profile_for(class).footprint.length;
        let along = population::entry_along(&self.config.geometry, length);
        self.spawn_vehicle_at(class, heading, lane, along)
    }

    /// Spawn a vehicle with its center `along` units past the intersection
    /// center; negative values are before the box
    pub fn spawn_vehicle_at(
        &mut self,
        class: VehicleClass,
        heading: Heading,
        lane: u8,
        along: f32,
    ) -> Result<VehicleId> {
        let profile = self.profile_for(class);
        let vehicle_id = VehicleId(SimId(self.next_id));
        let vehicle = population::spawn_vehicle(
            vehicle_id,
            class,
            profile,
            heading,
            lane,
            along,
            &self.config.geometry,
            &self.config.sensing,
            &self.vehicles,
            self.clock.now(),
        )
        .with_context(|| format!("cannot place {} heading {:?}", class.name(), heading))?;

        self.next_sim_id();
        debug!(
            "{}: spawned {} {} heading {:?} in lane {}",
            self.clock.now(),
            class.name(),
            vehicle_id,
            heading,
            lane
        );
        self.vehicles.insert(vehicle_id, vehicle);
        self.stats.total_vehicles_spawned += 1;
        Ok(vehicle_id)
    }

    /// Spawn a pedestrian at the start of its sidewalk
    pub fn spawn_pedestrian(
        &mut self,
        personality: Personality,
        heading: Heading,
        right_side: bool,
    ) -> Result<PedestrianId> {
        let along = -self.config.geometry.road_half_length;
        self.spawn_pedestrian_at(personality, heading, right_side, along)
    }

    /// Spawn a pedestrian `along` units past the intersection center on the
    /// chosen sidewalk
    pub fn spawn_pedestrian_at(
        &mut self,
        personality: Personality,
        heading: Heading,
        right_side: bool,
        along: f32,
    ) -> Result<PedestrianId> {
        let pedestrian_id = PedestrianId(SimId(self.next_id));
        let pedestrian = population::spawn_pedestrian(
            pedestrian_id,
            personality,
            heading,
            right_side,
            along,
            &self.config.geometry,
            &self.config.pedestrians,
            self.clock.now(),
        )
        .with_context(|| format!("cannot place {} pedestrian", personality))?;

        self.next_sim_id();
        debug!(
            "{}: spawned {} pedestrian {} heading {:?}",
            self.clock.now(),
            personality,
            pedestrian_id,
            heading
        );
        self.pedestrians.insert(pedestrian_id, pedestrian);
        self.stats.total_pedestrians_spawned += 1;
        Ok(pedestrian_id)
    }

    /// One Bernoulli trial per agent kind
    fn maybe_spawn(&mut self) {
        if self.random_bool(self.config.spawn.vehicle_probability) {
            let heading = self.choose_random(&Heading::ALL).copied();
            let lanes = usize::from(self.config.geometry.lanes_per_direction);
            let lane = self.random_index(lanes) as u8;
            if let (Some(heading), Some(class)) = (heading, self.choose_vehicle_class()) {
                if let Err(err) = self.spawn_vehicle(class.class, heading, lane) {
                    debug!("{}: skipped vehicle spawn: {:#}", self.clock.now(), err);
                    self.stats.vehicle_spawns_skipped += 1;
                }
            }
        }

        if self.random_bool(self.config.spawn.pedestrian_probability) {
            let heading = self.choose_random(&Heading::ALL).copied();
            let personality = self.choose_random(&Personality::ALL).copied();
            let right_side = self.random_bool(0.5);
            if let (Some(heading), Some(personality)) = (heading, personality) {
                if let Err(err) = self.spawn_pedestrian(personality, heading, right_side) {
                    debug!("{}: skipped pedestrian spawn: {:#}", self.clock.now(), err);
                }
            }
        }
    }

    fn update_lights(&mut self) {
        let queued = population::survey_queues(
            &self.vehicles,
            &self.config.geometry,
            &self.config.sensing,
        );
        self.stats.record_queues(queued);
        for light in &mut self.lights {
            let axis = light.axis().index();
            light.observe_demand(queued[axis], self.entered_last_tick[axis]);
        }

        for change in update_lights(&mut self.lights, self.clock.now()) {
            debug!(
                "{}: light {} ({}) {} -> {}",
                change.at, change.light, change.axis, change.from, change.to
            );
            self.stats.record_phase_change(&change);
        }
    }

    fn sync_gates(&mut self) {
        for gate in &mut self.gates {
            if let Some(light) = self.lights.get(gate.light().0) {
                gate.sync(light);
            }
        }
    }

    fn update_pedestrians(&mut self, dt: f32, vehicle_views: &[VehicleView]) {
        let light_views: Vec<LightView> =
            self.lights.iter().map(TrafficLightController::view).collect();
        let ctx = PedestrianContext {
            lights: &light_views,
            vehicles: vehicle_views,
            config: &self.config.pedestrians,
        };

        let results = match &mut self.rng {
            Some(rng) => population::update_pedestrians(&mut self.pedestrians, &ctx, rng, dt),
            None => population::update_pedestrians(
                &mut self.pedestrians,
                &ctx,
                &mut rand::rng(),
                dt,
            ),
        };

        for (pedestrian_id, result) in results {
            if result != PedestrianUpdateResult::StartedCrossing {
                continue;
            }
            let crossed = self
                .pedestrians
                .get(&pedestrian_id)
                .map(|pedestrian| pedestrian.heading.axis().perpendicular());
            if let Some(axis) = crossed {
                debug!(
                    "{}: pedestrian {} crossing the {} road",
                    self.clock.now(),
                    pedestrian_id,
                    axis
                );
                self.stats.pedestrian_crossings[axis.index()] += 1;
            }
        }
    }

    fn update_vehicles(&mut self, dt: f32, vehicle_views: &[VehicleView]) {
        self.intersection.record_occupants(vehicle_views);

        let pedestrian_positions: Vec<Position> = self
            .pedestrians
            .values()
            .map(|pedestrian| pedestrian.position)
            .collect();
        let ctx = VehicleContext {
            vehicles: vehicle_views,
            gates: &self.gates,
            intersection: &self.intersection,
            pedestrians: &pedestrian_positions,
            sensing: &self.config.sensing,
            commit_policy: self.config.commit_policy,
        };

        let results = population::update_vehicles(&mut self.vehicles, &ctx, dt);

        let mut entered = [0; 2];
        for (vehicle_id, result) in results {
            if result != VehicleUpdateResult::EnteredIntersection {
                continue;
            }
            if let Some(vehicle) = self.vehicles.get(&vehicle_id) {
                let axis = vehicle.heading.axis();
                entered[axis.index()] += 1;
                self.stats.record_entry(axis);
            }
        }
        self.entered_last_tick = entered;
    }

    fn prune(&mut self) {
        for vehicle in population::prune_vehicles(&mut self.vehicles) {
            debug!(
                "{}: {} left the scene after {} stopped ticks",
                self.clock.now(),
                vehicle.id,
                vehicle.waiting_ticks
            );
            self.stats.record_vehicle_completed(&vehicle);
        }
        for pedestrian in population::prune_pedestrians(&mut self.pedestrians) {
            debug!(
                "{}: pedestrian {} left the scene",
                self.clock.now(),
                pedestrian.id
            );
            self.stats.record_pedestrian_completed(&pedestrian);
        }
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        if !(delta_secs.is_finite() && delta_secs > 0.0) {
            warn!("Ignoring tick with invalid delta {}", delta_secs);
            return;
        }

        self.clock.advance(delta_secs);

        self.update_lights();
        self.sync_gates();
        self.maybe_spawn();

        let vehicle_views: Vec<VehicleView> = self.vehicles.values().map(Vehicle::view).collect();
        self.update_pedestrians(delta_secs, &vehicle_views);
        self.update_vehicles(delta_secs, &vehicle_views);

        self.prune();
        self.stats.elapsed_secs = self.clock.elapsed_secs();
    }

    /// Advance one tick of the configured duration
    pub fn step(&mut self) {
        self.tick(self.config.tick_duration);
    }

    /// Advance `ticks` ticks of the configured duration
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Owned copy of the observable state
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            tick: self.clock.now(),
            elapsed_secs: self.clock.elapsed_secs(),
            lights: self.lights.iter().map(TrafficLightController::view).collect(),
            gates: self
                .gates
                .iter()
                .map(|gate| GateSnapshot {
                    id: gate.id(),
                    axis: gate.axis(),
                    approach: gate.approach(),
                    active: gate.is_active(),
                })
                .collect(),
            vehicles: self.vehicles.values().map(Vehicle::view).collect(),
            pedestrians: self
                .pedestrians
                .values()
                .map(|pedestrian| PedestrianSnapshot {
                    id: pedestrian.id,
                    personality: pedestrian.personality,
                    heading: pedestrian.heading,
                    position: pedestrian.position,
                    waiting_to_cross: pedestrian.waiting_to_cross,
                    on_crosswalk: pedestrian.on_crosswalk,
                })
                .collect(),
        }
    }

    /// Log a one-line progress report
    pub fn log_progress(&self) {
        let lights: Vec<String> = self
            .lights
            .iter()
            .map(|light| {
                format!(
                    "{} {} {} q={}",
                    light.id(),
                    light.axis(),
                    light.phase(),
                    light.queue_estimate()
                )
            })
            .collect();
        info!(
            "{}: {} | vehicles={} pedestrians={}",
            self.clock,
            lights.join(", "),
            self.vehicles.len(),
            self.pedestrians.len()
        );
    }

    /// Print a summary of the simulation state
    pub fn print_summary(&self) {
        println!("=== Intersection Simulation Summary ===");
        println!("Time: {}", self.clock);
        println!(
            "Vehicles: {}, Pedestrians: {}",
            self.vehicles.len(),
            self.pedestrians.len()
        );
        println!();

        println!("--- Lights ---");
        for light in &self.lights {
            println!(
                "  Light {} ({}): {} for {} ticks, queue={}, wait={}, paired={}",
                light.id(),
                light.axis(),
                light.phase(),
                light.phase_elapsed(),
                light.queue_estimate(),
                light.wait_ticks(),
                light
                    .paired()
                    .map_or_else(|| "none".to_string(), |id| id.to_string())
            );
        }

        println!("--- Gates ---");
        for gate in &self.gates {
            println!(
                "  Gate {:?} ({:?} approach): {}",
                gate.id().0,
                gate.approach(),
                if gate.is_active() { "closed" } else { "open" }
            );
        }

        if !self.vehicles.is_empty() {
            println!("--- Active Vehicles ---");
            for vehicle in self.vehicles.values() {
                println!(
                    "  {} {} {:?} lane {}: speed={:.1}, position=({:.1}, {:.1}), crossing={}",
                    vehicle.id,
                    vehicle.class.name(),
                    vehicle.heading,
                    vehicle.lane,
                    vehicle.speed,
                    vehicle.position.x,
                    vehicle.position.z,
                    vehicle.crossing_intersection
                );
            }
        }

        if !self.pedestrians.is_empty() {
            println!("--- Active Pedestrians ---");
            for pedestrian in self.pedestrians.values() {
                println!(
                    "  {} {} {:?}: position=({:.1}, {:.1}), waiting={}",
                    pedestrian.id,
                    pedestrian.personality,
                    pedestrian.heading,
                    pedestrian.position.x,
                    pedestrian.position.z,
                    pedestrian.waiting_to_cross
                );
            }
        }
    }

    /// Draw a visual map of the crossing in the terminal
    pub fn draw_map(&self) {
        let geometry = &self.config.geometry;
        let extent = geometry.road_half_length;
        let size = ((2.0 * extent) / MAP_CELL_SIZE).ceil().max(1.0) as usize;
        let min_x = geometry.center.x - extent;
        let max_z = geometry.center.z + extent;
        let road_edge = geometry.road_half_width;
        let sidewalk_edge = road_edge + geometry.sidewalk_width;

        let mut grid = vec![vec![' '; size]; size];

        // Draw the ground
        for (row, line) in grid.iter_mut().enumerate() {
            for (col, cell) in line.iter_mut().enumerate() {
                let point = Position::new(
                    min_x + (col as f32 + 0.5) * MAP_CELL_SIZE,
                    max_z - (row as f32 + 0.5) * MAP_CELL_SIZE,
                );
                let dx = (point.x - geometry.center.x).abs();
                let dz = (point.z - geometry.center.z).abs();

                *cell = if self.intersection.boundary().contains(point) {
                    '+'
                } else if let Some(gate) =
                    self.gates.iter().find(|gate| gate.boundary().contains(point))
                {
                    if gate.is_active() {
                        '='
                    } else {
                        '-'
                    }
                } else if dx < road_edge || dz < road_edge {
                    '.'
                } else if dx < sidewalk_edge || dz < sidewalk_edge {
                    ':'
                } else {
                    ' '
                };
            }
        }

        let to_grid = |position: Position| -> Option<(usize, usize)> {
            let col = ((position.x - min_x) / MAP_CELL_SIZE).floor();
            let row = ((max_z - position.z) / MAP_CELL_SIZE).floor();
            let in_bounds = col >= 0.0 && row >= 0.0 && (col as usize) < size && (row as usize) < size;
            in_bounds.then_some((row as usize, col as usize))
        };

        // Draw pedestrians
        for pedestrian in self.pedestrians.values() {
            if let Some((row, col)) = to_grid(pedestrian.position) {
                grid[row][col] = if pedestrian.waiting_to_cross { 'w' } else { 'p' };
            }
        }

        // Draw vehicles
        for vehicle in self.vehicles.values() {
            if let Some((row, col)) = to_grid(vehicle.position) {
                grid[row][col] = vehicle.heading.arrow();
            }
        }

        // Print the grid
        println!("\n=== Intersection Map ({}) ===", self.clock);
        println!(
            "Legend: +=Box, .=Road, :=Sidewalk, ==Closed gate, -=Open gate, ^v<>=Vehicle, p=Pedestrian, w=Waiting"
        );
        for light in &self.lights {
            println!(
                "  {} {} [{}] {}",
                light.id(),
                light.axis(),
                light.phase().symbol(),
                light.phase()
            );
        }
        println!();
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}
