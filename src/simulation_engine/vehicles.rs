use crate::simulation_engine::directions::{Direction, Turn};
use rand::Rng;

/// A vehicle passing through the intersection once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    pub id: u64,
    pub origin: Direction,
    pub destination: Direction,
}

impl Vehicle {
    pub fn new(id: u64, origin: Direction, destination: Direction) -> Self {
        Self {
            id,
            origin,
            destination,
        }
    }

    /// Creates a vehicle with a random origin and a random destination distinct from it.
    pub fn random<R: Rng + ?Sized>(id: u64, rng: &mut R) -> Self {
        let origin = Direction::random(rng);
        let destination = origin.random_other(rng);
        Self::new(id, origin, destination)
    }

    /// Movement through the intersection. Vehicles built by `random` never U-turn,
    /// a hand-built one that does is reported as going straight.
    pub fn turn(&self) -> Turn {
        self.origin.turn_to(self.destination).unwrap_or(Turn::Straight)
    }
}
