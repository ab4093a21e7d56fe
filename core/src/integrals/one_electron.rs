use std::f64::consts::PI;

use nalgebra::{DMatrix, Vector3};

use crate::{
    atom::Atom,
    basis::{BasisFunctions, ContractedGaussian, PrimitiveGaussian},
    error::Result,
    parallel::Partitioner,
};

use super::utils::{binomial_prefactor, boys_values, double_factorial, factorial, product_center};

/// Overlap of two unnormalized primitives. Coefficients and normalization constants are ignored.
pub fn overlap_primitive(a: &PrimitiveGaussian, b: &PrimitiveGaussian) -> f64 {
    let (alpha, beta) = (a.exponent(), b.exponent());
    let gamma = alpha + beta;
    let rab2 = (a.center() - b.center()).norm_squared();
    let p = product_center(alpha, a.center(), beta, b.center());
    let pa = p - a.center();
    let pb = p - b.center();

    let (la, ma, na) = a.angular();
    let (lb, mb, nb) = b.angular();

    let prefactor = (PI / gamma).powf(1.5) * (-alpha * beta * rab2 / gamma).exp();
    prefactor
        * overlap_1d(la, lb, pa.x, pb.x, gamma)
        * overlap_1d(ma, mb, pa.y, pb.y, gamma)
        * overlap_1d(na, nb, pa.z, pb.z, gamma)
}

fn overlap_1d(l1: i32, l2: i32, pa: f64, pb: f64, gamma: f64) -> f64 {
    (0..=(l1 + l2) / 2)
        .map(|i| {
            binomial_prefactor(2 * i, l1, l2, pa, pb) * double_factorial(2 * i - 1)
                / (2.0 * gamma).powi(i)
        })
        .sum()
}

/// Kinetic energy integral of two unnormalized primitives.
pub fn kinetic_primitive(a: &PrimitiveGaussian, b: &PrimitiveGaussian) -> f64 {
    let beta = b.exponent();
    let (l, m, n) = b.angular();

    let shifted = |dl: i32, dm: i32, dn: i32| {
        overlap_primitive(a, &b.with_angular((l + dl, m + dm, n + dn)))
    };

    let term0 = beta * (2 * (l + m + n) + 3) as f64 * overlap_primitive(a, b);
    let term1 = -2.0 * beta * beta * (shifted(2, 0, 0) + shifted(0, 2, 0) + shifted(0, 0, 2));

    let mut term2 = 0.0;
    if l >= 2 {
        term2 += (l * (l - 1)) as f64 * shifted(-2, 0, 0);
    }
    if m >= 2 {
        term2 += (m * (m - 1)) as f64 * shifted(0, -2, 0);
    }
    if n >= 2 {
        term2 += (n * (n - 1)) as f64 * shifted(0, 0, -2);
    }

    term0 + term1 - 0.5 * term2
}

/// Attraction of two unnormalized primitives to a unit positive charge at `c`.
/// The result is negative.
pub fn nuclear_primitive(a: &PrimitiveGaussian, b: &PrimitiveGaussian, c: &Vector3<f64>) -> f64 {
    let (alpha, beta) = (a.exponent(), b.exponent());
    let gamma = alpha + beta;
    let rab2 = (a.center() - b.center()).norm_squared();
    let p = product_center(alpha, a.center(), beta, b.center());
    let rcp2 = (c - p).norm_squared();
    let pa = p - a.center();
    let pb = p - b.center();
    let cp = p - c;

    let (la, ma, na) = a.angular();
    let (lb, mb, nb) = b.angular();

    let ax = a_array(la, lb, pa.x, pb.x, cp.x, gamma);
    let ay = a_array(ma, mb, pa.y, pb.y, cp.y, gamma);
    let az = a_array(na, nb, pa.z, pb.z, cp.z, gamma);

    let boys = boys_values(ax.len() + ay.len() + az.len() - 3, rcp2 * gamma);

    let mut total = 0.0;
    for (i, ax) in ax.iter().enumerate() {
        for (j, ay) in ay.iter().enumerate() {
            for (k, az) in az.iter().enumerate() {
                total += ax * ay * az * boys[i + j + k];
            }
        }
    }

    -2.0 * PI / gamma * (-alpha * beta * rab2 / gamma).exp() * total
}

fn a_array(l1: i32, l2: i32, pa: f64, pb: f64, cp: f64, gamma: f64) -> Vec<f64> {
    let i_max = l1 + l2 + 1;
    let mut values = vec![0.0; i_max as usize];

    for i in 0..i_max {
        for r in 0..=i / 2 {
            for u in 0..=(i - 2 * r) / 2 {
                let index = i - 2 * r - u;
                values[index as usize] += a_term(i, r, u, l1, l2, pa, pb, cp, gamma);
            }
        }
    }

    values
}

#[allow(clippy::too_many_arguments)]
fn a_term(i: i32, r: i32, u: i32, l1: i32, l2: i32, pa: f64, pb: f64, cp: f64, gamma: f64) -> f64 {
    let sign = if (i + u) % 2 == 0 { 1.0 } else { -1.0 };
    sign * binomial_prefactor(i, l1, l2, pa, pb)
        * factorial(i)
        * cp.powi(i - 2 * r - 2 * u)
        * (0.25 / gamma).powi(r + u)
        / (factorial(r) * factorial(u) * factorial(i - 2 * r - 2 * u))
}

/// Sums a primitive integral over two contractions, including all coefficients and
/// normalization constants.
#[inline(always)]
fn contract(
    a: &ContractedGaussian,
    b: &ContractedGaussian,
    integral: impl Fn(&PrimitiveGaussian, &PrimitiveGaussian) -> f64,
) -> f64 {
    let mut sum = 0.0;
    for pa in a.primitives() {
        for pb in b.primitives() {
            sum += pa.coefficient()
                * pa.normalization()
                * pb.coefficient()
                * pb.normalization()
                * integral(pa, pb);
        }
    }
    a.normalization() * b.normalization() * sum
}

pub fn overlap(a: &ContractedGaussian, b: &ContractedGaussian) -> f64 {
    contract(a, b, overlap_primitive)
}

pub fn kinetic(a: &ContractedGaussian, b: &ContractedGaussian) -> f64 {
    contract(a, b, kinetic_primitive)
}

pub fn nuclear(a: &ContractedGaussian, b: &ContractedGaussian, center: &Vector3<f64>) -> f64 {
    contract(a, b, |pa, pb| nuclear_primitive(pa, pb, center))
}

/// Kinetic energy plus the attraction to every nucleus
pub fn core_hamiltonian(a: &ContractedGaussian, b: &ContractedGaussian, nuclei: &[Atom]) -> f64 {
    kinetic(a, b)
        + nuclei
            .iter()
            .map(|atom| atom.nuclear_charge() as f64 * nuclear(a, b, atom.position()))
            .sum::<f64>()
}

/// Overlap and core hamiltonian matrices of a basis.
#[derive(Debug, Clone)]
pub struct OneElectronIntegrals {
    overlap: DMatrix<f64>,
    hcore: DMatrix<f64>,
}

impl OneElectronIntegrals {
    /// Each worker fills the lower triangle of a contiguous block of rows.
    pub fn new(
        basis: &BasisFunctions,
        nuclei: &[Atom],
        partitioner: &Partitioner,
    ) -> Result<Self> {
        let n = basis.len();

        let blocks = partitioner.fork_join(n, |rows| {
            let mut block = Vec::with_capacity(rows.len() * (rows.end + 1));
            for i in rows {
                for j in 0..=i {
                    let overlap_ij = overlap(&basis[i], &basis[j]);
                    let hcore_ij = core_hamiltonian(&basis[i], &basis[j], nuclei);
                    log::trace!("overlap ({i}{j}) = {overlap_ij}, hcore ({i}{j}) = {hcore_ij}");
                    block.push((i, j, overlap_ij, hcore_ij));
                }
            }
            Ok(block)
        })?;

        let mut overlap = DMatrix::zeros(n, n);
        let mut hcore = DMatrix::zeros(n, n);
        for (i, j, overlap_ij, hcore_ij) in blocks.into_iter().flatten() {
            overlap[(i, j)] = overlap_ij;
            overlap[(j, i)] = overlap_ij;
            hcore[(i, j)] = hcore_ij;
            hcore[(j, i)] = hcore_ij;
        }

        log::debug!("overlap matrix: {overlap:0.4}");
        log::debug!("core hamiltonian: {hcore:0.4}");

        Ok(Self { overlap, hcore })
    }

    pub fn overlap(&self) -> &DMatrix<f64> {
        &self.overlap
    }

    pub fn hcore(&self) -> &DMatrix<f64> {
        &self.hcore
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::{kinetic, nuclear, overlap, OneElectronIntegrals};
    use crate::{
        basis::{BasisFunctions, ContractedGaussian},
        parallel::Partitioner,
        testing,
    };

    fn sto_3g_hydrogen(center: Vector3<f64>) -> ContractedGaussian {
        let mut function = ContractedGaussian::new(center, (0, 0, 0), 0);
        function.add_primitive(3.42525091, 0.15432897);
        function.add_primitive(0.62391373, 0.53532814);
        function.add_primitive(0.16885540, 0.44463454);
        function.normalize();
        function
    }

    #[test]
    fn hydrogen_molecule_reference_values() {
        // Szabo & Ostlund, table 3.5 (R = 1.4 bohr)
        let a = sto_3g_hydrogen(Vector3::zeros());
        let b = sto_3g_hydrogen(Vector3::new(0.0, 0.0, 1.4));

        assert_relative_eq!(overlap(&a, &b), 0.6593, epsilon = 1e-4);
        assert_relative_eq!(kinetic(&a, &a), 0.7600, epsilon = 1e-4);
        assert_relative_eq!(kinetic(&a, &b), 0.2365, epsilon = 1e-4);
        assert_relative_eq!(nuclear(&a, &a, a.center()), -1.2266, epsilon = 1e-4);
        assert_relative_eq!(nuclear(&a, &a, b.center()), -0.6538, epsilon = 1e-4);
        assert_relative_eq!(nuclear(&a, &b, a.center()), -0.5974, epsilon = 1e-4);
    }

    #[test]
    fn water_matrices_are_symmetric() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let integrals =
            OneElectronIntegrals::new(&basis, molecule.atoms(), &Partitioner::new(3).unwrap())
                .unwrap();

        let s = integrals.overlap();
        let h = integrals.hcore();
        for i in 0..basis.len() {
            assert_relative_eq!(s[(i, i)], 1.0, epsilon = 1e-10);
            for j in 0..basis.len() {
                assert_eq!(s[(i, j)], s[(j, i)]);
                assert_eq!(h[(i, j)], h[(j, i)]);
            }
        }

        // px and py on the oxygen are orthogonal to each other
        assert_relative_eq!(s[(2, 3)], 0.0, epsilon = 1e-12);

        let sequential =
            OneElectronIntegrals::new(&basis, molecule.atoms(), &Partitioner::new(1).unwrap())
                .unwrap();
        assert_relative_eq!(sequential.hcore(), h, epsilon = 1e-12);
    }

    #[test]
    fn kinetic_matches_laplacian_quadrature() {
        // <a|-1/2 nabla^2|b> for a p and a d type function, integrated on a grid
        let mut a = ContractedGaussian::new(Vector3::new(0.0, 0.0, 0.2), (1, 0, 0), 0);
        a.add_primitive(1.1, 1.0);
        a.normalize();
        let mut b = ContractedGaussian::new(Vector3::new(0.3, 0.0, -0.1), (2, 0, 0), 1);
        b.add_primitive(0.9, 1.0);
        b.normalize();

        let h = 0.1;
        let mut sum = 0.0;
        for i in -60..=60 {
            for j in -60..=60 {
                for k in -60..=60 {
                    let point = Vector3::new(i as f64 * h, j as f64 * h, k as f64 * h);
                    sum += a.value(&point) * -0.5 * b.laplacian(&point);
                }
            }
        }

        assert_relative_eq!(kinetic(&a, &b), sum * h * h * h, epsilon = 1e-6);
    }
}
