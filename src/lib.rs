//! Intersection Simulation Library
//!
//! A traffic simulation of one four-way crossing: adaptive traffic lights
//! coordinated in pairs, stop gates, vehicles and pedestrians.

pub mod simulation;
