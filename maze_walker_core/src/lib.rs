use std::{
    fmt,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

pub mod environment;
pub mod level;
pub mod map;
pub mod search;

/// Represents a 2D integer coordinate.
///
/// Coordinates carry no bounds of their own; whether one is valid depends on
/// the grid it is used with. Signed components allow direction vectors and
/// positions that fall off the grid edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the squared Euclidean distance to `other`.
    pub fn distance_squared(&self, other: &Coordinate) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// Returns the Euclidean distance to `other`.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// True if `other` is exactly one orthogonal step away.
    pub fn is_adjacent(&self, other: &Coordinate) -> bool {
        self.distance_squared(other) == 1
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Self::Output {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Self::Output {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Direction> for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Direction) -> Self::Output {
        self + rhs.offset()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four orthogonal movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions in the order the search tries them.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The unit vector for this direction. `y` grows downwards.
    pub const fn offset(self) -> Coordinate {
        match self {
            Direction::Up => Coordinate::new(0, -1),
            Direction::Down => Coordinate::new(0, 1),
            Direction::Left => Coordinate::new(-1, 0),
            Direction::Right => Coordinate::new(1, 0),
        }
    }

    /// Returns the direction whose unit vector equals `offset`, if any.
    pub fn from_offset(offset: Coordinate) -> Option<Direction> {
        Direction::ALL.into_iter().find(|dir| dir.offset() == offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(2, 1);
        let b = Coordinate::new(4, 3);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.distance_squared(&b), 8);
    }

    #[test]
    fn adding_the_difference_lands_on_the_other_point() {
        let a = Coordinate::new(-3, 7);
        let b = Coordinate::new(5, -2);
        assert_eq!(a + (b - a), b);
    }

    #[test]
    fn only_orthogonal_neighbours_are_adjacent() {
        let origin = Coordinate::new(0, 0);
        for dir in Direction::ALL {
            assert!(origin.is_adjacent(&(origin + dir)));
        }
        assert!(!origin.is_adjacent(&Coordinate::new(1, 1)));
        assert!(!origin.is_adjacent(&origin));
        assert!(!origin.is_adjacent(&Coordinate::new(2, 0)));
    }

    #[test]
    fn direction_offsets_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_offset(dir.offset()), Some(dir));
        }
        assert_eq!(Direction::from_offset(Coordinate::new(1, 1)), None);
    }
}
