use nalgebra::DMatrix;

use crate::{
    basis::BasisFunctions,
    error::{Error, Result},
    molecule::Molecule,
};

use super::{mo::MolecularOrbitals, utils};

/// Everything a density guesser may look at.
pub struct GuessContext<'a> {
    pub molecule: &'a Molecule,
    pub basis: &'a BasisFunctions,
    pub overlap: &'a DMatrix<f64>,
    pub hcore: &'a DMatrix<f64>,
    /// S^(-1/2)
    pub transform: &'a DMatrix<f64>,
    pub n_occupied: usize,
}

/// Produces the starting density of an scf run.
pub trait DensityGuesser {
    fn guess(&self, context: &GuessContext) -> Result<DMatrix<f64>>;
}

/// Occupies the eigenvectors of the core hamiltonian.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreHamiltonianGuess;

impl DensityGuesser for CoreHamiltonianGuess {
    fn guess(&self, context: &GuessContext) -> Result<DMatrix<f64>> {
        let orbitals = MolecularOrbitals::from_fock(context.hcore, context.transform);
        Ok(orbitals.density(context.n_occupied))
    }
}

/// Extended Hückel guess: H_ij = K S_ij (H_ii + H_jj) / 2 using the core hamiltonian diagonal.
#[derive(Debug, Clone, Copy)]
pub struct HuckelGuess {
    pub wolfsberg_helmholz: f64,
}

impl Default for HuckelGuess {
    fn default() -> Self {
        Self {
            wolfsberg_helmholz: 1.75,
        }
    }
}

impl DensityGuesser for HuckelGuess {
    fn guess(&self, context: &GuessContext) -> Result<DMatrix<f64>> {
        let GuessContext { overlap, hcore, .. } = *context;

        let hamiltonian_eht = utils::symmetric_matrix(context.basis.len(), |i, j| {
            self.wolfsberg_helmholz * overlap[(i, j)] * (hcore[(i, i)] + hcore[(j, j)]) / 2.0
        });

        let orbitals = MolecularOrbitals::from_fock(&hamiltonian_eht, context.transform);
        Ok(orbitals.density(context.n_occupied))
    }
}

/// A density supplied by the caller, e.g. from a previous run.
#[derive(Debug, Clone)]
pub struct ExplicitDensity(pub DMatrix<f64>);

impl DensityGuesser for ExplicitDensity {
    fn guess(&self, context: &GuessContext) -> Result<DMatrix<f64>> {
        let n = context.basis.len();
        let Self(density) = self;
        if density.nrows() != n || density.ncols() != n {
            return Err(Error::Dimension {
                expected: n,
                found: density.nrows().max(density.ncols()),
            });
        }
        Ok(density.clone())
    }
}
