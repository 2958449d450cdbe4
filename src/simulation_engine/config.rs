use crate::global_variables::{
    DEFAULT_CROSSING_TIME_MS, DEFAULT_MAX_INTERARRIVAL_MS, DEFAULT_NUM_ACTORS,
    DEFAULT_VEHICLES_PER_ACTOR,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Tunables for a simulation run. Missing fields in a config file fall back to the defaults
/// in `global_variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_actors: usize,
    pub vehicles_per_actor: usize,
    /// Upper bound of the random pause before each vehicle arrives.
    pub max_interarrival_ms: u64,
    /// Time a vehicle spends inside the intersection.
    pub crossing_time_ms: u64,
    /// Seeds each actor's RNG with `seed + actor index` for reproducible runs.
    pub seed: Option<u64>,
    /// Where to write the per-vehicle trip log, if anywhere.
    pub trip_log: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_actors: DEFAULT_NUM_ACTORS,
            vehicles_per_actor: DEFAULT_VEHICLES_PER_ACTOR,
            max_interarrival_ms: DEFAULT_MAX_INTERARRIVAL_MS,
            crossing_time_ms: DEFAULT_CROSSING_TIME_MS,
            seed: None,
            trip_log: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path.as_ref())?;
        let config: SimulationConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.num_actors == 0 {
            return Err("num_actors must be at least 1".into());
        }
        if self.vehicles_per_actor == 0 {
            return Err("vehicles_per_actor must be at least 1".into());
        }
        Ok(())
    }

    pub fn total_vehicles(&self) -> usize {
        self.num_actors * self.vehicles_per_actor
    }
}
