use std::f64::consts::PI;

use nalgebra::Vector3;

pub fn factorial(n: i32) -> f64 {
    (2..=n).map(f64::from).product()
}

/// n!! with (-1)!! = 0!! = 1
pub fn double_factorial(n: i32) -> f64 {
    (1..=n).rev().step_by(2).map(f64::from).product()
}

pub fn binomial(n: i32, k: i32) -> f64 {
    if k < 0 || k > n {
        return 0.0;
    }
    factorial(n) / (factorial(k) * factorial(n - k))
}

/// Coefficient of x^s in (x + xpa)^ia * (x + xpb)^ib
pub fn binomial_prefactor(s: i32, ia: i32, ib: i32, xpa: f64, xpb: f64) -> f64 {
    (0..=s)
        .filter(|&t| s - ia <= t && t <= ib)
        .map(|t| {
            binomial(ia, s - t) * binomial(ib, t) * xpa.powi(ia - s + t) * xpb.powi(ib - t)
        })
        .sum()
}

/// Center of the product of two gaussians
#[inline(always)]
pub fn product_center(
    alpha: f64,
    a: &Vector3<f64>,
    beta: f64,
    b: &Vector3<f64>,
) -> Vector3<f64> {
    (alpha * a + beta * b) / (alpha + beta)
}

/// Beyond this argument erf(sqrt(t)) is 1 to double precision.
const ASYMPTOTIC_LIMIT: f64 = 30.0;

/// Boys function values F_0(t) ..= F_m_max(t).
///
/// Small arguments sum the power series for the highest order and fill the lower orders with
/// the downward recursion F_m = (2t F_{m+1} + e^-t) / (2m + 1). Large arguments start from the
/// asymptotic F_0 and recurse upwards, which is stable there.
pub fn boys_values(m_max: usize, t: f64) -> Vec<f64> {
    let mut values = vec![0.0; m_max + 1];

    if t < 1e-12 {
        for (m, value) in values.iter_mut().enumerate() {
            *value = 1.0 / (2 * m + 1) as f64;
        }
        return values;
    }

    let exp_t = (-t).exp();
    if t >= ASYMPTOTIC_LIMIT {
        values[0] = 0.5 * (PI / t).sqrt();
        for m in 0..m_max {
            values[m + 1] = ((2 * m + 1) as f64 * values[m] - exp_t) / (2.0 * t);
        }
        return values;
    }

    values[m_max] = boys_series(m_max, t, exp_t);
    for m in (0..m_max).rev() {
        values[m] = (2.0 * t * values[m + 1] + exp_t) / (2 * m + 1) as f64;
    }
    values
}

/// F_m(t) = e^-t sum_k (2t)^k / ((2m + 1)(2m + 3)...(2m + 2k + 1))
fn boys_series(m: usize, t: f64, exp_t: f64) -> f64 {
    let mut denominator = (2 * m + 1) as f64;
    let mut term = 1.0 / denominator;
    let mut sum = term;
    while term > sum * f64::EPSILON {
        denominator += 2.0;
        term *= 2.0 * t / denominator;
        sum += term;
    }
    exp_t * sum
}
