use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

struct Sample {
    error: DMatrix<f64>,
    fock: DMatrix<f64>,
}

/// Pulay's direct inversion in the iterative subspace: extrapolates the Fock matrix from
/// previous (error, fock) pairs, with error = FDS - SDF.
pub(crate) struct Diis {
    previous_samples: VecDeque<Sample>,
}

impl Diis {
    /// samples kept for the extrapolation
    const MAX_SAMPLES: usize = 8;
    /// samples needed before extrapolating
    const MIN_SAMPLES: usize = 3;

    pub fn new() -> Self {
        Self {
            previous_samples: VecDeque::with_capacity(Self::MAX_SAMPLES),
        }
    }

    /// Records a sample and returns the extrapolated Fock matrix. Until enough samples are
    /// collected, or if the DIIS equations are singular, `fock` is returned unchanged.
    pub fn extrapolate(&mut self, error: DMatrix<f64>, fock: DMatrix<f64>) -> DMatrix<f64> {
        self.previous_samples.push_front(Sample { error, fock });
        self.previous_samples.truncate(Self::MAX_SAMPLES);

        let n = self.previous_samples.len();
        let latest = || self.previous_samples[0].fock.clone();
        if n < Self::MIN_SAMPLES {
            return latest();
        }

        let matrix = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i, j) {
            (i, j) if i == n && j == n => 0.0,
            (i, j) if i == n || j == n => 1.0,
            _ => self.previous_samples[j]
                .error
                .dot(&self.previous_samples[i].error),
        });

        let b = DVector::from_fn(n + 1, |i, _| if i == n { 1.0 } else { 0.0 });

        let Some(solution) = matrix.lu().solve(&b) else {
            log::debug!("diis equations are singular, using the latest fock matrix");
            return latest();
        };

        solution
            .iter()
            .enumerate()
            .take(n)
            .map(|(i, &x)| x * &self.previous_samples[i].fock)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::Diis;

    #[test]
    fn passes_through_until_enough_samples() {
        let mut diis = Diis::new();
        let fock = DMatrix::from_element(2, 2, 3.0);
        let out = diis.extrapolate(DMatrix::from_element(2, 2, 0.1), fock.clone());
        assert_eq!(out, fock);
    }

    #[test]
    fn extrapolation_cancels_linear_error() {
        // errors e_k = f_k - f* that cancel in an affine combination, which reproduces f*
        let target = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.2, -0.5]);
        let first = DMatrix::from_row_slice(2, 2, &[0.3, 0.0, 0.0, 0.1]);
        let second = DMatrix::from_row_slice(2, 2, &[-0.1, 0.2, 0.2, 0.0]);
        let third = -(&first + &second);
        let directions = [first, second, third];

        let mut diis = Diis::new();
        let mut result = DMatrix::zeros(2, 2);
        for direction in &directions {
            result = diis.extrapolate(direction.clone(), &target + direction);
        }

        assert_relative_eq!(result, target, epsilon = 1e-10);
    }
}
