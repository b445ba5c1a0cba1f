use core::{
    cmp::Ordering,
    fmt,
    ops::{Add, AddAssign, Div, Mul, Sub, SubAssign},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type DepthType = f64;

const METERS_PER_FOOT: DepthType = 0.3048;

/// meters <-> feet with an exact factor pair so the conversions invert each other
pub fn feet_to_meters(ft: DepthType) -> DepthType {
    ft * METERS_PER_FOOT
}

pub fn meters_to_feet(m: DepthType) -> DepthType {
    m / METERS_PER_FOOT
}

#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Depth {
    m: DepthType,
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}m", self.as_meters())
    }
}

impl PartialEq<Self> for Depth {
    fn eq(&self, other: &Self) -> bool {
        self.m == other.m
    }
}

impl PartialOrd<Self> for Depth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.m.partial_cmp(&other.m)
    }
}

impl Add<Self> for Depth {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self { m: self.m + rhs.m }
    }
}

impl Sub<Self> for Depth {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self { m: self.m - rhs.m }
    }
}

impl Mul<DepthType> for Depth {
    type Output = Self;

    fn mul(self, rhs: DepthType) -> Self::Output {
        Self { m: self.m * rhs }
    }
}

impl Div<DepthType> for Depth {
    type Output = Self;

    fn div(self, rhs: DepthType) -> Self::Output {
        Self { m: self.m / rhs }
    }
}

impl Div<Self> for Depth {
    type Output = DepthType;

    fn div(self, rhs: Self) -> Self::Output {
        self.m / rhs.m
    }
}

impl AddAssign for Depth {
    fn add_assign(&mut self, rhs: Self) {
        *self = Self { m: self.m + rhs.m }
    }
}

impl SubAssign for Depth {
    fn sub_assign(&mut self, rhs: Self) {
        *self = Self { m: self.m - rhs.m }
    }
}

impl Depth {
    pub fn zero() -> Self {
        Self { m: 0. }
    }

    pub fn from_meters<T: Into<DepthType>>(val: T) -> Self {
        Self { m: val.into() }
    }

    pub fn from_feet<T: Into<DepthType>>(val: T) -> Self {
        Self {
            m: feet_to_meters(val.into()),
        }
    }

    pub fn as_meters(&self) -> DepthType {
        self.m
    }

    pub fn as_feet(&self) -> DepthType {
        meters_to_feet(self.m)
    }
}
