//! Scalar properties of a wavefunction evaluated in real space.

use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    basis::BasisFunctions,
    error::{Error, Result},
    hf::{MolecularOrbitals, ScfResult},
    parallel::Partitioner,
};

/// A regular grid of points. Points are ordered with x as the slowest and z as the fastest
/// varying coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub origin: Vector3<f64>,
    pub spacing: Vector3<f64>,
    pub counts: [usize; 3],
}

impl Grid {
    /// Grid with the same spacing along every axis that covers the box `min..=max`.
    pub fn covering(min: Vector3<f64>, max: Vector3<f64>, spacing: f64) -> Self {
        let count = |axis: usize| ((max[axis] - min[axis]) / spacing).round().max(0.0) as usize + 1;
        Self {
            origin: min,
            spacing: Vector3::from_element(spacing),
            counts: [count(0), count(1), count(2)],
        }
    }

    pub fn len(&self) -> usize {
        self.counts.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Volume that belongs to a single point
    pub fn cell_volume(&self) -> f64 {
        self.spacing.x * self.spacing.y * self.spacing.z
    }

    pub fn point(&self, index: usize) -> Vector3<f64> {
        let [_, ny, nz] = self.counts;
        let (ix, rest) = (index / (ny * nz), index % (ny * nz));
        let (iy, iz) = (rest / nz, rest % nz);
        self.origin + self.spacing.component_mul(&Vector3::new(ix as f64, iy as f64, iz as f64))
    }

    pub fn points(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        let [nx, ny, nz] = self.counts;
        itertools::iproduct!(0..nx, 0..ny, 0..nz).map(|(ix, iy, iz)| {
            self.origin + self.spacing.component_mul(&Vector3::new(ix as f64, iy as f64, iz as f64))
        })
    }
}

/// A scalar function of position derived from one-electron quantities.
pub trait OneElectronProperty: Sync {
    fn compute(&self, point: &Vector3<f64>) -> f64;

    /// Evaluates every point, split over the workers of `partitioner`.
    fn compute_points(
        &self,
        points: &[Vector3<f64>],
        partitioner: &Partitioner,
    ) -> Result<Vec<f64>> {
        let blocks = partitioner.fork_join(points.len(), |range| {
            Ok(points[range].iter().map(|point| self.compute(point)).collect::<Vec<_>>())
        })?;
        Ok(blocks.concat())
    }

    /// Values in the point order of [`Grid::point`].
    fn compute_grid(&self, grid: &Grid, partitioner: &Partitioner) -> Result<Vec<f64>> {
        log::debug!("evaluating property on {:?} grid points", grid.counts);
        let blocks = partitioner.fork_join(grid.len(), |range| {
            Ok(range.map(|index| self.compute(&grid.point(index))).collect::<Vec<_>>())
        })?;
        Ok(blocks.concat())
    }
}

/// Total electron density 2 sum_ij D_ij phi_i phi_j of a closed shell density.
pub struct ElectronDensity<'a> {
    basis: &'a BasisFunctions,
    density: &'a DMatrix<f64>,
}

impl<'a> ElectronDensity<'a> {
    pub fn new(basis: &'a BasisFunctions, density: &'a DMatrix<f64>) -> Result<Self> {
        if density.shape() != (basis.len(), basis.len()) {
            return Err(Error::Dimension {
                expected: basis.len(),
                found: density.nrows(),
            });
        }
        Ok(Self { basis, density })
    }

    pub fn from_result(basis: &'a BasisFunctions, result: &'a ScfResult) -> Result<Self> {
        Self::new(basis, &result.density)
    }
}

impl OneElectronProperty for ElectronDensity<'_> {
    fn compute(&self, point: &Vector3<f64>) -> f64 {
        let values: Vec<f64> = self
            .basis
            .functions()
            .iter()
            .map(|function| function.value(point))
            .collect();

        let mut sum = 0.0;
        for (i, value_i) in values.iter().enumerate() {
            sum += self.density[(i, i)] * value_i * value_i;
            for (j, value_j) in values.iter().enumerate().take(i) {
                sum += 2.0 * self.density[(i, j)] * value_i * value_j;
            }
        }
        2.0 * sum
    }
}

/// Amplitude of a single molecular orbital.
pub struct OrbitalAmplitude<'a> {
    basis: &'a BasisFunctions,
    orbitals: &'a MolecularOrbitals,
    orbital: usize,
}

impl<'a> OrbitalAmplitude<'a> {
    pub fn new(
        basis: &'a BasisFunctions,
        orbitals: &'a MolecularOrbitals,
        orbital: usize,
    ) -> Result<Self> {
        if orbitals.coefficients().nrows() != basis.len() {
            return Err(Error::Dimension {
                expected: basis.len(),
                found: orbitals.coefficients().nrows(),
            });
        }
        if orbital >= orbitals.len() {
            return Err(Error::Dimension {
                expected: orbitals.len(),
                found: orbital,
            });
        }
        Ok(Self {
            basis,
            orbitals,
            orbital,
        })
    }
}

impl OneElectronProperty for OrbitalAmplitude<'_> {
    fn compute(&self, point: &Vector3<f64>) -> f64 {
        self.orbitals
            .evaluate_orbital(self.basis, self.orbital, point)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::{ElectronDensity, Grid, OneElectronProperty, OrbitalAmplitude};
    use crate::{
        basis::BasisFunctions,
        hf::{ScfConfig, ScfDriver},
        parallel::Partitioner,
        testing,
    };

    #[test]
    fn grid_order() {
        let grid = Grid {
            origin: Vector3::new(-1.0, 0.0, 2.0),
            spacing: Vector3::new(0.5, 1.0, 0.25),
            counts: [2, 3, 4],
        };
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.point(1), Vector3::new(-1.0, 0.0, 2.25));
        assert_eq!(grid.point(4), Vector3::new(-1.0, 1.0, 2.0));
        assert_eq!(grid.point(12), Vector3::new(-0.5, 0.0, 2.0));
        assert!(grid.points().enumerate().all(|(index, point)| point == grid.point(index)));

        let covering = Grid::covering(Vector3::zeros(), Vector3::new(1.0, 2.0, 0.0), 0.5);
        assert_eq!(covering.counts, [3, 5, 1]);
    }

    #[test]
    fn hydrogen_density_integrates_to_two_electrons() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let result = ScfDriver::new(&molecule, &basis, ScfConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let partitioner = Partitioner::new(4).unwrap();

        let density = ElectronDensity::from_result(&basis, &result).unwrap();
        let grid = Grid::covering(
            Vector3::new(-6.0, -6.0, -6.0),
            Vector3::new(6.0, 6.0, 7.4),
            0.1,
        );
        let values = density.compute_grid(&grid, &partitioner).unwrap();
        assert_eq!(values.len(), grid.len());
        assert!(values.iter().all(|&value| value >= 0.0));

        let electrons = values.iter().sum::<f64>() * grid.cell_volume();
        assert_relative_eq!(electrons, 2.0, epsilon = 1e-3);

        let orbital = OrbitalAmplitude::new(&basis, &result.orbitals, 0).unwrap();
        let norm = orbital
            .compute_grid(&grid, &partitioner)
            .unwrap()
            .iter()
            .map(|value| value * value)
            .sum::<f64>()
            * grid.cell_volume();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-3);

        assert!(OrbitalAmplitude::new(&basis, &result.orbitals, 2).is_err());
    }

    #[test]
    fn point_evaluation_matches_single_calls() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let result = ScfDriver::new(&molecule, &basis, ScfConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let density = ElectronDensity::new(&basis, &result.density).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let points: Vec<_> = (0..57)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                )
            })
            .collect();

        let values = density
            .compute_points(&points, &Partitioner::new(3).unwrap())
            .unwrap();
        for (point, value) in points.iter().zip(&values) {
            assert_eq!(*value, density.compute(point));
        }
    }
}
