use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compass direction a vehicle arrives from or heads toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Movement a vehicle makes through the intersection (vehicles drive on the right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    Straight,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Stable slot used for the per-direction tables in the controller.
    pub const fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    // Position when walking the compass clockwise from North.
    fn clockwise_position(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Picks a random direction other than `self`, so a vehicle never leaves the way it came.
    pub fn random_other<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let others: Vec<Direction> = Self::ALL.into_iter().filter(|d| *d != self).collect();
        others[rng.random_range(0..others.len())]
    }

    /// Classifies the movement from `self` (origin) to `destination`.
    /// Returns `None` for a U-turn.
    pub fn turn_to(self, destination: Direction) -> Option<Turn> {
        let offset = (destination.clockwise_position() + 4 - self.clockwise_position()) % 4;
        match offset {
            1 => Some(Turn::Left),
            2 => Some(Turn::Straight),
            3 => Some(Turn::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        };
        f.write_str(name)
    }
}
