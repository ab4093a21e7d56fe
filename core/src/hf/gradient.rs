//! Analytic nuclear forces of a converged closed shell wavefunction:
//! dE/dA = dVnn/dA + 2 tr(D dH/dA) + tr(D dG/dA) - 2 tr(Q dS/dA),
//! with D the density and Q the energy weighted density.

use nalgebra::{DMatrix, Vector3};

use crate::{
    basis::{BasisFunctions, CenterDerivative, ContractedGaussian},
    error::{Error, Result},
    integrals::{one_electron, PrecomputedIntegrals, TwoElectronTerm},
    molecule::Molecule,
    parallel::Partitioner,
};

use super::{
    gmatrix,
    scf::{ScfDriver, ScfResult},
    utils::{symmetric_matrix, trace_product},
};

/// Computes the force acting on each nucleus, the negative energy gradient.
pub struct HartreeFockForce<'a> {
    molecule: &'a Molecule,
    basis: &'a BasisFunctions,
    term: TwoElectronTerm,
    partitioner: &'a Partitioner,
    density: DMatrix<f64>,
    energy_weighted_density: DMatrix<f64>,
}

impl<'a> HartreeFockForce<'a> {
    pub fn new(driver: &'a ScfDriver<'_>, result: &ScfResult) -> Result<Self> {
        let n = driver.basis().len();
        if result.density.shape() != (n, n) {
            return Err(Error::Dimension {
                expected: n,
                found: result.density.nrows(),
            });
        }
        if !result.is_converged() {
            log::warn!("computing forces for an scf run that did not converge");
        }

        Ok(Self {
            molecule: driver.molecule(),
            basis: driver.basis(),
            term: driver.config().two_electron_term,
            partitioner: driver.partitioner(),
            density: result.orbitals.density(result.n_occupied),
            energy_weighted_density: result.orbitals.energy_weighted_density(result.n_occupied),
        })
    }

    /// Force on the atom with the given index.
    pub fn compute(&self, atom: usize) -> Result<Vector3<f64>> {
        let on_atom = self.basis.atom_range(atom)?;
        let nucleus = self.molecule.atom(atom)?;
        let repulsion = self.molecule.nuclear_repulsion_derivative(atom)?;

        let mut gradient = Vector3::zeros();
        for axis in 0..3 {
            let moved: Vec<CenterDerivative> = self
                .basis
                .functions()
                .iter()
                .map(|function| function.center_derivative(axis))
                .collect();
            let derivatives: Vec<Option<&CenterDerivative>> = moved
                .iter()
                .enumerate()
                .map(|(i, derivative)| on_atom.contains(&i).then_some(derivative))
                .collect();

            let overlap = self.one_electron_derivative(&derivatives, one_electron::overlap);
            let hcore = self.one_electron_derivative(&derivatives, |a, b| {
                one_electron::core_hamiltonian(a, b, self.molecule.atoms())
            });

            // the nuclear attraction operator of this atom moves with it
            let charge = nucleus.nuclear_charge() as f64;
            let operator = symmetric_matrix(self.basis.len(), |i, j| {
                let (a, b) = (&self.basis[i], &self.basis[j]);
                let center = nucleus.position();
                let moved_a = moved[i].apply(|a| one_electron::nuclear(a, b, center));
                let moved_b = moved[j].apply(|b| one_electron::nuclear(a, b, center));
                -charge * (moved_a + moved_b)
            });

            let repulsion_integrals = self.two_electron_derivative(&derivatives)?;
            let gmatrix = gmatrix::from_precomputed(&repulsion_integrals, &self.density)?;

            gradient[axis] = repulsion[axis]
                + 2.0 * trace_product(&self.density, &(hcore + operator))
                + trace_product(&self.density, &gmatrix)
                - 2.0 * trace_product(&self.energy_weighted_density, &overlap);
        }

        let force = -gradient;
        log::debug!("force on atom {atom} ({}): {force:?}", nucleus.symbol());
        Ok(force)
    }

    /// Forces on every atom, in atom order.
    pub fn forces(&self) -> Result<Vec<Vector3<f64>>> {
        (0..self.molecule.len()).map(|atom| self.compute(atom)).collect()
    }

    /// d<i|O|j>, where only the functions with a derivative move.
    fn one_electron_derivative(
        &self,
        derivatives: &[Option<&CenterDerivative>],
        integral: impl Fn(&ContractedGaussian, &ContractedGaussian) -> f64,
    ) -> DMatrix<f64> {
        symmetric_matrix(self.basis.len(), |i, j| {
            let (a, b) = (&self.basis[i], &self.basis[j]);
            let moved_a = derivatives[i]
                .map_or(0.0, |derivative| derivative.apply(|a| integral(a, b)));
            let moved_b = derivatives[j]
                .map_or(0.0, |derivative| derivative.apply(|b| integral(a, b)));
            moved_a + moved_b
        })
    }

    /// d(ij|kl) for every unique quartet, stored like the integrals themselves.
    fn two_electron_derivative(
        &self,
        derivatives: &[Option<&CenterDerivative>],
    ) -> Result<PrecomputedIntegrals> {
        let basis = self.basis;
        let term = self.term;

        PrecomputedIntegrals::from_fn(basis.len(), self.partitioner, |i, j, k, l| {
            let (a, b, c, d) = (&basis[i], &basis[j], &basis[k], &basis[l]);
            let mut sum = 0.0;
            if let Some(derivative) = derivatives[i] {
                sum += derivative.try_apply(|a| term.coulomb(a, b, c, d))?;
            }
            if let Some(derivative) = derivatives[j] {
                sum += derivative.try_apply(|b| term.coulomb(a, b, c, d))?;
            }
            if let Some(derivative) = derivatives[k] {
                sum += derivative.try_apply(|c| term.coulomb(a, b, c, d))?;
            }
            if let Some(derivative) = derivatives[l] {
                sum += derivative.try_apply(|d| term.coulomb(a, b, c, d))?;
            }
            Ok(sum)
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::HartreeFockForce;
    use crate::{
        basis::BasisFunctions,
        hf::scf::{ScfConfig, ScfDriver},
        molecule::Molecule,
        testing,
    };

    fn config() -> ScfConfig {
        ScfConfig {
            max_iterations: 200,
            energy_tolerance: 1e-12,
            density_tolerance: 1e-10,
            workers: Some(2),
            diis: true,
            ..ScfConfig::default()
        }
    }

    fn energy(molecule: &Molecule, basis_name: &str) -> f64 {
        let basis =
            BasisFunctions::new(molecule.atoms(), basis_name, &testing::basis_library()).unwrap();
        let result = ScfDriver::new(molecule, &basis, config()).unwrap().run().unwrap();
        assert!(result.is_converged());
        result.energy
    }

    fn finite_difference(molecule: &Molecule, basis_name: &str, atom: usize, axis: usize) -> f64 {
        let h = 1e-4;
        let mut step = Vector3::zeros();
        step[axis] = h;
        let position = *molecule.atoms()[atom].position();

        let mut forward = Molecule::new(molecule.atoms().iter().cloned());
        forward.set_position(atom, position + step).unwrap();
        let mut backward = Molecule::new(molecule.atoms().iter().cloned());
        backward.set_position(atom, position - step).unwrap();

        -(energy(&forward, basis_name) - energy(&backward, basis_name)) / (2.0 * h)
    }

    #[test]
    fn hydrogen_force_matches_finite_differences() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let mut driver = ScfDriver::new(&molecule, &basis, config()).unwrap();
        let result = driver.run().unwrap();

        let forces = HartreeFockForce::new(&driver, &result).unwrap();
        let force = forces.compute(1).unwrap();

        assert_relative_eq!(force.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(force.y, 0.0, epsilon = 1e-10);
        assert_relative_eq!(
            force.z,
            finite_difference(&molecule, "STO-3G", 1, 2),
            epsilon = 1e-5
        );
    }

    #[test]
    fn water_forces() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let mut driver = ScfDriver::new(&molecule, &basis, config()).unwrap();
        let result = driver.run().unwrap();

        let forces = HartreeFockForce::new(&driver, &result).unwrap().forces().unwrap();
        assert_eq!(forces.len(), 3);

        // no net force on an isolated molecule
        let total: Vector3<f64> = forces.iter().sum();
        assert_relative_eq!(total, Vector3::zeros(), epsilon = 1e-6);

        // the hydrogens are mirror images in x
        assert_relative_eq!(forces[1].x, -forces[2].x, epsilon = 1e-8);
        assert_relative_eq!(forces[1].y, forces[2].y, epsilon = 1e-8);

        assert_relative_eq!(
            forces[1].x,
            finite_difference(&molecule, "STO-3G", 1, 0),
            epsilon = 1e-5
        );
        assert_relative_eq!(
            forces[0].y,
            finite_difference(&molecule, "STO-3G", 0, 1),
            epsilon = 1e-5
        );
    }

    #[test]
    fn unknown_atom() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let mut driver = ScfDriver::new(&molecule, &basis, config()).unwrap();
        let result = driver.run().unwrap();
        let forces = HartreeFockForce::new(&driver, &result).unwrap();
        assert!(forces.compute(2).is_err());
    }
}
