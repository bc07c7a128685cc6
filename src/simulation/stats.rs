//! Running statistics for a simulation

use log::info;

use super::pedestrian::Pedestrian;
use super::traffic_light::PhaseChange;
use super::types::Axis;
use super::vehicle::Vehicle;

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub total_vehicles_spawned: u32,
    pub total_vehicles_completed: u32,
    /// Spawn attempts dropped because the entry was occupied
    pub vehicle_spawns_skipped: u32,
    pub total_pedestrians_spawned: u32,
    pub total_pedestrians_completed: u32,
    /// Crossings started by pedestrians, per crossed axis
    pub pedestrian_crossings: [u32; 2],
    /// Vehicles that entered the box, per axis
    pub intersection_entries: [u32; 2],
    /// Greens started, per axis
    pub greens: [u32; 2],
    pub phase_changes: u32,
    /// Longest queue seen, per axis
    pub max_queue: [u32; 2],
    /// Stopped ticks of every completed vehicle
    pub completed_vehicle_wait_ticks: u64,
    /// Curb ticks of every completed pedestrian
    pub completed_pedestrian_wait_ticks: u64,
    pub elapsed_secs: f64,
}

impl SimulationStats {
    pub fn record_phase_change(&mut self, change: &PhaseChange) {
        self.phase_changes += 1;
        if change.to.is_green() {
            self.greens[change.axis.index()] += 1;
        }
    }

    pub fn record_queues(&mut self, queued: [u32; 2]) {
        for (max, queue) in self.max_queue.iter_mut().zip(queued) {
            *max = (*max).max(queue);
        }
    }

    pub fn record_entry(&mut self, axis: Axis) {
        self.intersection_entries[axis.index()] += 1;
    }

    pub fn record_vehicle_completed(&mut self, vehicle: &Vehicle) {
        self.total_vehicles_completed += 1;
        self.completed_vehicle_wait_ticks += u64::from(vehicle.waiting_ticks);
    }

    pub fn record_pedestrian_completed(&mut self, pedestrian: &Pedestrian) {
        self.total_pedestrians_completed += 1;
        self.completed_pedestrian_wait_ticks += u64::from(pedestrian.wait_ticks);
    }

    /// Share of spawned vehicles that made it through, in percent
    pub fn completion_rate(&self) -> f32 {
        if self.total_vehicles_spawned > 0 {
            (self.total_vehicles_completed as f32 / self.total_vehicles_spawned as f32) * 100.0
        } else {
            0.0
        }
    }

    /// Mean stopped ticks per completed vehicle
    pub fn average_vehicle_wait(&self) -> f64 {
        if self.total_vehicles_completed > 0 {
            self.completed_vehicle_wait_ticks as f64 / f64::from(self.total_vehicles_completed)
        } else {
            0.0
        }
    }

    pub fn average_pedestrian_wait(&self) -> f64 {
        if self.total_pedestrians_completed > 0 {
            self.completed_pedestrian_wait_ticks as f64
                / f64::from(self.total_pedestrians_completed)
        } else {
            0.0
        }
    }

    /// Log the end-of-run summary
    pub fn log_summary(&self, active_vehicles: usize, active_pedestrians: usize) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed_secs);
        info!("Total vehicles spawned: {}", self.total_vehicles_spawned);
        info!("Total vehicles completed: {}", self.total_vehicles_completed);
        info!("Vehicle spawns skipped: {}", self.vehicle_spawns_skipped);
        info!("Active vehicles: {}", active_vehicles);
        info!("Total pedestrians spawned: {}", self.total_pedestrians_spawned);
        info!(
            "Total pedestrians completed: {}",
            self.total_pedestrians_completed
        );
        info!("Active pedestrians: {}", active_pedestrians);
        info!(
            "Intersection entries: NS {}, EW {}",
            self.intersection_entries[Axis::NorthSouth.index()],
            self.intersection_entries[Axis::EastWest.index()]
        );
        info!(
            "Greens started: NS {}, EW {}",
            self.greens[Axis::NorthSouth.index()],
            self.greens[Axis::EastWest.index()]
        );
        info!(
            "Max queue: NS {}, EW {}",
            self.max_queue[Axis::NorthSouth.index()],
            self.max_queue[Axis::EastWest.index()]
        );
        info!("Phase changes: {}", self.phase_changes);
        info!(
            "Average vehicle wait: {:.1} ticks",
            self.average_vehicle_wait()
        );
        info!(
            "Average pedestrian wait: {:.1} ticks",
            self.average_pedestrian_wait()
        );
        info!("Completion rate: {:.1}%", self.completion_rate());
    }
}
