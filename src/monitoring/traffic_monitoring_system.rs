use crate::shared_data::VehicleRecord;
use crate::simulation_engine::vehicles::Vehicle;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MonitorState {
    inside: HashMap<u64, Vehicle>,
    entered: usize,
    violations: usize,
    max_concurrent: usize,
}

/// Watches the intersection independently of the controller and counts every entry
/// that put vehicles from two different origins inside at the same time.
#[derive(Debug, Default)]
pub struct IntersectionMonitor {
    state: Mutex<MonitorState>,
}

impl IntersectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `vehicle` as inside, counting a violation if it conflicts with anyone already there.
    pub fn vehicle_entered(&self, vehicle: &Vehicle) {
        let mut state = self.state.lock().expect("monitor lock poisoned");
        let conflicting: Vec<u64> = state
            .inside
            .values()
            .filter(|other| other.origin != vehicle.origin)
            .map(|other| other.id)
            .collect();

        state.inside.insert(vehicle.id, *vehicle);
        state.entered += 1;
        state.max_concurrent = state.max_concurrent.max(state.inside.len());

        if conflicting.is_empty() {
            return;
        }
        state.violations += 1;
        warn!(
            "Vehicle {} ({} -> {}) entered while vehicles {:?} from another origin were inside",
            vehicle.id, vehicle.origin, vehicle.destination, conflicting
        );
    }

    pub fn vehicle_left(&self, vehicle: &Vehicle) {
        let mut state = self.state.lock().expect("monitor lock poisoned");
        if state.inside.remove(&vehicle.id).is_none() {
            warn!("Vehicle {} left without having entered", vehicle.id);
        }
    }

    pub fn entered(&self) -> usize {
        self.state.lock().expect("monitor lock poisoned").entered
    }

    pub fn violations(&self) -> usize {
        self.state.lock().expect("monitor lock poisoned").violations
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.lock().expect("monitor lock poisoned").max_concurrent
    }

    pub fn currently_inside(&self) -> usize {
        self.state.lock().expect("monitor lock poisoned").inside.len()
    }

    /// Checks that the run is over: `expected` vehicles went through and none is left inside.
    pub fn verify_drained(&self, expected: usize) -> Result<(), Box<dyn Error>> {
        let entered = self.entered();
        if entered != expected {
            return Err(format!("monitor saw {} entries, expected {}", entered, expected).into());
        }
        let inside = self.currently_inside();
        if inside > 0 {
            return Err(format!("{} vehicle(s) still inside after the run", inside).into());
        }
        Ok(())
    }
}

// Generic helper to write a batch of records to a CSV file, replacing any previous contents.
fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(file);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trip_log(path: &Path, records: &[VehicleRecord]) -> Result<(), Box<dyn Error>> {
    write_csv(path, records)
}

pub fn read_trip_log(path: &Path) -> Result<Vec<VehicleRecord>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: VehicleRecord = result?;
        records.push(record);
    }
    Ok(records)
}
