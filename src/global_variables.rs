// Simulation defaults, overridable through a JSON config file.

// Number of concurrent vehicle actors
pub const DEFAULT_NUM_ACTORS: usize = 10;
// Vehicles each actor sends through the intersection, one after another
pub const DEFAULT_VEHICLES_PER_ACTOR: usize = 20;

// Timing (milliseconds)
pub const DEFAULT_MAX_INTERARRIVAL_MS: u64 = 10;
pub const DEFAULT_CROSSING_TIME_MS: u64 = 5;
