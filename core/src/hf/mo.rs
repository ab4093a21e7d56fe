use nalgebra::{DMatrix, DVector, Vector3};

use crate::basis::BasisFunctions;

use super::utils;

/// Represents the molecular orbitals of a hartree fock calculation: one coefficient column per
/// orbital, sorted by ascending orbital energy.
#[derive(Debug, Clone)]
pub struct MolecularOrbitals {
    coefficients: DMatrix<f64>,
    energies: DVector<f64>,
}

impl MolecularOrbitals {
    /// Diagonalizes `fock` in the orthonormal basis given by `transform` (usually S^(-1/2)) and
    /// transforms the eigenvectors back into the atomic orbital basis.
    pub fn from_fock(fock: &DMatrix<f64>, transform: &DMatrix<f64>) -> Self {
        let transformed_fock = transform.transpose() * (fock * transform);
        let (transformed_coefficients, energies) = utils::sorted_eigs(transformed_fock);
        let coefficients = transform * transformed_coefficients;

        Self {
            coefficients,
            energies,
        }
    }

    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    pub fn energies(&self) -> &DVector<f64> {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Closed shell density C_occ C_occ^T of the `n_occupied` lowest orbitals, each of which
    /// holds two electrons.
    pub fn density(&self, n_occupied: usize) -> DMatrix<f64> {
        let occupied = self.coefficients.columns(0, n_occupied);
        &occupied * occupied.transpose()
    }

    /// sum over occupied orbitals of e_a C_a C_a^T
    pub fn energy_weighted_density(&self, n_occupied: usize) -> DMatrix<f64> {
        let occupied = self.coefficients.columns(0, n_occupied);
        let weighted = DMatrix::from_fn(occupied.nrows(), n_occupied, |i, a| {
            occupied[(i, a)] * self.energies[a]
        });
        weighted * occupied.transpose()
    }

    /// Evaluate the n-th lowest energy orbital at a given position
    pub fn evaluate_orbital(
        &self,
        basis: &BasisFunctions,
        orbital: usize,
        position: &Vector3<f64>,
    ) -> f64 {
        self.coefficients
            .column(orbital)
            .iter()
            .zip(basis.functions())
            .map(|(coefficient, function)| coefficient * function.value(position))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::MolecularOrbitals;
    use crate::hf::utils::symmetric_orthogonalization;

    #[test]
    fn orbitals_are_orthonormal_in_overlap_metric() {
        let overlap = DMatrix::from_row_slice(3, 3, &[1.0, 0.5, 0.2, 0.5, 1.0, 0.4, 0.2, 0.4, 1.0]);
        let fock =
            DMatrix::from_row_slice(3, 3, &[-1.2, -0.6, -0.1, -0.6, -0.9, -0.3, -0.1, -0.3, 0.2]);

        let transform = symmetric_orthogonalization(&overlap).unwrap();
        let orbitals = MolecularOrbitals::from_fock(&fock, &transform);
        let c = orbitals.coefficients();

        assert_relative_eq!(c.transpose() * &overlap * c, DMatrix::identity(3, 3), epsilon = 1e-10);
        assert!(orbitals.energies()[0] <= orbitals.energies()[1]);

        // F C = S C e
        for a in 0..3 {
            assert_relative_eq!(
                &fock * c.column(a),
                &overlap * c.column(a) * orbitals.energies()[a],
                epsilon = 1e-10
            );
        }

        // idempotent in the overlap metric
        let density = orbitals.density(2);
        assert_relative_eq!(&density * &overlap * &density, density, epsilon = 1e-10);
    }
}
