use core::{
    cmp::Ordering,
    ops::{Add, AddAssign, Sub},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dive time, stored in minutes (every half-time and rate in the solvers is per-minute).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Time {
    min: f64,
}

impl Add for Time {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            min: self.min + rhs.min,
        }
    }
}

impl Sub for Time {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            min: self.min - rhs.min,
        }
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Self) {
        *self = Self {
            min: self.min + rhs.min,
        }
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.min.partial_cmp(&other.min)
    }
}

impl Time {
    pub fn zero() -> Self {
        Self { min: 0. }
    }

    pub fn from_minutes<T: Into<f64>>(val: T) -> Self {
        Self { min: val.into() }
    }

    pub fn from_seconds<T: Into<f64>>(val: T) -> Self {
        Self {
            min: val.into() / 60.,
        }
    }

    pub fn as_minutes(&self) -> f64 {
        self.min
    }

    pub fn as_seconds(&self) -> f64 {
        self.min * 60.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minutes() {
        let time = Time::from_minutes(2.0);
        assert_eq!(time.as_seconds(), 120.0);
    }

    #[test]
    fn test_from_seconds() {
        let time = Time::from_seconds(30.0);
        assert_eq!(time.as_minutes(), 0.5);
    }

    #[test]
    fn test_into_time() {
        assert_eq!(Time::from_minutes(1), Time::from_seconds(60.));
    }
}
