//! Math utilities for std/no-std compatibility

/// Absolute value for f64
#[inline]
pub fn abs(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.abs()
    }
    #[cfg(feature = "no-std")]
    {
        libm::fabs(val)
    }
}

/// Ceiling function for f64
#[inline]
pub fn ceil(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.ceil()
    }
    #[cfg(feature = "no-std")]
    {
        libm::ceil(val)
    }
}

/// Floor function for f64
#[inline]
pub fn floor(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.floor()
    }
    #[cfg(feature = "no-std")]
    {
        libm::floor(val)
    }
}

/// Round function for f64
#[inline]
pub fn round(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.round()
    }
    #[cfg(feature = "no-std")]
    {
        libm::round(val)
    }
}

/// Power function for f64
#[inline]
pub fn powf(base: f64, exp: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        base.powf(exp)
    }
    #[cfg(feature = "no-std")]
    {
        libm::pow(base, exp)
    }
}

/// Natural exponential for f64
#[inline]
pub fn exp(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.exp()
    }
    #[cfg(feature = "no-std")]
    {
        libm::exp(val)
    }
}

/// Natural logarithm for f64
#[inline]
pub fn ln(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.ln()
    }
    #[cfg(feature = "no-std")]
    {
        libm::log(val)
    }
}

/// Square root for f64
#[inline]
pub fn sqrt(val: f64) -> f64 {
    #[cfg(not(feature = "no-std"))]
    {
        val.sqrt()
    }
    #[cfg(feature = "no-std")]
    {
        libm::sqrt(val)
    }
}
