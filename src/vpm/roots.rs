use crate::common::math_utils;
use crate::common::NumericError;

pub(crate) const ROOT_FINDER_MAX_ITERATIONS: usize = 100;
const ROOT_FINDER_ACCURACY: f64 = 1e-12;

/// Fail-safe root finder for the bubble cubic `A*r^3 - B*r^2 - C = 0`,
/// combining bisection with Newton-Raphson so a wild Newton step can never
/// leave the bracket.
pub(crate) fn radius_root_finder(
    a: f64,
    b: f64,
    c: f64,
    low_bound: f64,
    high_bound: f64,
) -> Result<f64, NumericError> {
    let eval = |r: f64| a * r * r * r - b * r * r - c;
    let slope = |r: f64| 3. * a * r * r - 2. * b * r;

    let function_at_low_bound = eval(low_bound);
    let function_at_high_bound = eval(high_bound);
    if !(function_at_low_bound < 0. && function_at_high_bound > 0.) {
        return Err(NumericError::RootNotBracketed("radius root finder"));
    }

    let mut bracket_low = low_bound;
    let mut bracket_high = high_bound;
    let mut radius = 0.5 * (low_bound + high_bound);
    let mut last_diff = math_utils::abs(high_bound - low_bound);
    let mut diff = last_diff;
    let mut function = eval(radius);
    let mut derivative = slope(radius);

    for _ in 0..ROOT_FINDER_MAX_ITERATIONS {
        let newton_out_of_bracket = ((radius - bracket_high) * derivative - function)
            * ((radius - bracket_low) * derivative - function)
            >= 0.;
        let newton_too_slow = math_utils::abs(2. * function) > math_utils::abs(last_diff * derivative);
        if newton_out_of_bracket || newton_too_slow {
            last_diff = diff;
            diff = 0.5 * (bracket_high - bracket_low);
            radius = bracket_low + diff;
            if bracket_low == radius {
                return Ok(radius);
            }
        } else {
            last_diff = diff;
            diff = function / derivative;
            let previous = radius;
            radius -= diff;
            if previous == radius {
                return Ok(radius);
            }
        }
        if math_utils::abs(diff) < ROOT_FINDER_ACCURACY {
            return Ok(radius);
        }
        function = eval(radius);
        derivative = slope(radius);
        if function < 0. {
            bracket_low = radius;
        } else {
            bracket_high = radius;
        }
    }

    Err(NumericError::MaxIterationsExceeded("radius root finder"))
}
