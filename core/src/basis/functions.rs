use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::integrals::{one_electron, utils::double_factorial};

/// Angular powers (l, m, n) of the cartesian polynomial x^l y^m z^n
pub type Angular = (i32, i32, i32);

/// Function of the form N*x^l*y^m*z^n*exp(-alpha*r^2), centered somewhere in space.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveGaussian {
    center: Vector3<f64>,
    angular: Angular,
    exponent: f64,
    /// Contraction coefficient, not including the normalization constant
    coefficient: f64,
    normalization: f64,
}

impl PrimitiveGaussian {
    pub fn new(center: Vector3<f64>, angular: Angular, exponent: f64, coefficient: f64) -> Self {
        Self {
            center,
            angular,
            exponent,
            coefficient,
            normalization: Self::norm(exponent, angular),
        }
    }

    /// Normalization constant of a primitive cartesian gaussian
    pub fn norm(exponent: f64, (l, m, n): Angular) -> f64 {
        let total = (l + m + n) as f64;
        f64::sqrt(
            2f64.powf(2.0 * total + 1.5) * exponent.powf(total + 1.5)
                / (double_factorial(2 * l - 1)
                    * double_factorial(2 * m - 1)
                    * double_factorial(2 * n - 1)
                    * std::f64::consts::PI.powf(1.5)),
        )
    }

    /// The same primitive with different angular powers. The normalization constant of
    /// the original powers is kept, which is what derivative integrals need.
    pub fn with_angular(&self, angular: Angular) -> Self {
        Self { angular, ..*self }
    }

    pub fn center(&self) -> &Vector3<f64> {
        &self.center
    }

    pub fn angular(&self) -> Angular {
        self.angular
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn normalization(&self) -> f64 {
        self.normalization
    }

    /// Normalized value at a point, excluding the contraction coefficient
    pub fn amplitude(&self, point: &Vector3<f64>) -> f64 {
        let r = point - self.center;
        let (l, m, n) = self.angular;
        self.normalization
            * power(r.x, l)
            * power(r.y, m)
            * power(r.z, n)
            * (-self.exponent * r.norm_squared()).exp()
    }

    pub fn gradient(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let r = point - self.center;
        let (l, m, n) = self.angular;
        let alpha = self.exponent;
        let radial = self.normalization * (-alpha * r.norm_squared()).exp();

        let derivative =
            |x: f64, i: i32| i as f64 * power(x, i - 1) - 2.0 * alpha * power(x, i + 1);

        Vector3::new(
            radial * derivative(r.x, l) * power(r.y, m) * power(r.z, n),
            radial * power(r.x, l) * derivative(r.y, m) * power(r.z, n),
            radial * power(r.x, l) * power(r.y, m) * derivative(r.z, n),
        )
    }

    pub fn laplacian(&self, point: &Vector3<f64>) -> f64 {
        let r = point - self.center;
        let (l, m, n) = self.angular;
        let alpha = self.exponent;
        let radial = self.normalization * (-alpha * r.norm_squared()).exp();

        let second = |x: f64, i: i32| {
            (i * (i - 1)) as f64 * power(x, i - 2) - 2.0 * alpha * (2 * i + 1) as f64 * power(x, i)
                + 4.0 * alpha * alpha * power(x, i + 2)
        };

        radial
            * (second(r.x, l) * power(r.y, m) * power(r.z, n)
                + power(r.x, l) * second(r.y, m) * power(r.z, n)
                + power(r.x, l) * power(r.y, m) * second(r.z, n))
    }
}

/// x^n that vanishes for negative n, so derivative terms of s functions drop out
#[inline(always)]
fn power(x: f64, n: i32) -> f64 {
    if n < 0 {
        0.0
    } else {
        x.powi(n)
    }
}

/// Linear combination of [`PrimitiveGaussian`]s sharing a center and angular powers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractedGaussian {
    center: Vector3<f64>,
    angular: Angular,
    primitives: SmallVec<[PrimitiveGaussian; 6]>,
    normalization: f64,
    /// position of this function in the molecular basis
    index: usize,
}

impl ContractedGaussian {
    pub fn new(center: Vector3<f64>, angular: Angular, index: usize) -> Self {
        Self {
            center,
            angular,
            primitives: SmallVec::new(),
            normalization: 1.0,
            index,
        }
    }

    /// Adds a primitive. Call [`normalize`](Self::normalize) once all primitives are added.
    pub fn add_primitive(&mut self, exponent: f64, coefficient: f64) {
        self.primitives.push(PrimitiveGaussian::new(
            self.center,
            self.angular,
            exponent,
            coefficient,
        ));
    }

    /// Scales the contraction so that its self overlap is one.
    pub fn normalize(&mut self) {
        self.normalization = 1.0;
        let self_overlap = one_electron::overlap(self, self);
        self.normalization = self_overlap.sqrt().recip();
    }

    pub fn center(&self) -> &Vector3<f64> {
        &self.center
    }

    pub fn angular(&self) -> Angular {
        self.angular
    }

    pub fn angular_momentum(&self) -> i32 {
        let (l, m, n) = self.angular;
        l + m + n
    }

    pub fn primitives(&self) -> &[PrimitiveGaussian] {
        &self.primitives
    }

    pub fn normalization(&self) -> f64 {
        self.normalization
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Evaluate this basis function at a given position
    pub fn value(&self, point: &Vector3<f64>) -> f64 {
        self.normalization
            * self
                .primitives
                .iter()
                .map(|primitive| primitive.coefficient * primitive.amplitude(point))
                .sum::<f64>()
    }

    pub fn gradient(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.normalization
            * self
                .primitives
                .iter()
                .map(|primitive| primitive.coefficient * primitive.gradient(point))
                .sum::<Vector3<f64>>()
    }

    pub fn laplacian(&self, point: &Vector3<f64>) -> f64 {
        self.normalization
            * self
                .primitives
                .iter()
                .map(|primitive| primitive.coefficient * primitive.laplacian(point))
                .sum::<f64>()
    }

    /// Derivative with respect to the center coordinate `axis`.
    pub fn center_derivative(&self, axis: usize) -> CenterDerivative {
        let raised = self.shifted(axis, 1, |primitive| 2.0 * primitive.exponent);
        let power = [self.angular.0, self.angular.1, self.angular.2][axis];
        let lowered = (power > 0).then(|| self.shifted(axis, -1, |_| -power as f64));
        CenterDerivative { raised, lowered }
    }

    /// Contraction with the power along `axis` changed by `by`. Each primitive keeps its
    /// original weight times `factor`.
    fn shifted(&self, axis: usize, by: i32, factor: impl Fn(&PrimitiveGaussian) -> f64) -> Self {
        let mut powers = [self.angular.0, self.angular.1, self.angular.2];
        powers[axis] += by;
        let angular = (powers[0], powers[1], powers[2]);

        let primitives = self
            .primitives
            .iter()
            .map(|primitive| {
                let normalization = PrimitiveGaussian::norm(primitive.exponent, angular);
                PrimitiveGaussian {
                    angular,
                    coefficient: primitive.coefficient * primitive.normalization * factor(primitive)
                        / normalization,
                    normalization,
                    ..*primitive
                }
            })
            .collect();

        Self {
            center: self.center,
            angular,
            primitives,
            normalization: self.normalization,
            index: self.index,
        }
    }
}

/// d/dA_x of a contraction centered at A: 2 alpha g(l+1) - l g(l-1), stored as two
/// contractions so every integral routine applies to it unchanged.
#[derive(Clone, Debug)]
pub struct CenterDerivative {
    raised: ContractedGaussian,
    lowered: Option<ContractedGaussian>,
}

impl CenterDerivative {
    /// Applies a linear functional of one function to the derivative.
    pub fn apply(&self, mut integral: impl FnMut(&ContractedGaussian) -> f64) -> f64 {
        integral(&self.raised) + self.lowered.as_ref().map_or(0.0, integral)
    }

    pub fn try_apply<E>(
        &self,
        mut integral: impl FnMut(&ContractedGaussian) -> Result<f64, E>,
    ) -> Result<f64, E> {
        let lowered = match &self.lowered {
            Some(lowered) => integral(lowered)?,
            None => 0.0,
        };
        Ok(integral(&self.raised)? + lowered)
    }
}
