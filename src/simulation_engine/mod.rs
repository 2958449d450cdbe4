// simulation_engine/mod.rs
pub mod config;
pub mod directions;
pub mod intersection_sync;
pub mod simulation;
pub mod vehicles;
