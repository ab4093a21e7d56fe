//! Two-electron part of the Fock matrix:
//! G_ij = sum_kl D_kl (2 (ij|kl) - 1/2 (ik|jl) - 1/2 (il|kj)).

use nalgebra::DMatrix;

use crate::{
    basis::BasisFunctions,
    error::{Error, Result},
    integrals::{
        two_electron::{for_each_unique_quartet, unique_count},
        PrecomputedIntegrals,
        TwoElectronIntegrals,
    },
    parallel::Partitioner,
};

/// Forms G for `density` with whichever integral strategy `integrals` holds.
pub fn form_gmatrix(
    integrals: &TwoElectronIntegrals,
    basis: &BasisFunctions,
    density: &DMatrix<f64>,
    partitioner: &Partitioner,
) -> Result<DMatrix<f64>> {
    let n = basis.len();
    if density.nrows() != n || density.ncols() != n {
        return Err(Error::Dimension {
            expected: n,
            found: density.nrows(),
        });
    }

    let gmatrix = match integrals {
        TwoElectronIntegrals::Precomputed(stored) => from_precomputed(stored, density)?,
        TwoElectronIntegrals::Direct { .. } => {
            direct(n, density, partitioner, |i, j, k, l| {
                if let TwoElectronIntegrals::Direct {
                    screening: Some(screening),
                    ..
                } = integrals
                {
                    if screening.is_negligible(i, j, k, l) {
                        return Ok(None);
                    }
                }
                integrals.value(basis, i, j, k, l).map(Some)
            })?
        }
    };

    log::trace!("gmatrix: {gmatrix:0.4}");
    Ok(gmatrix)
}

/// Single pass over the stored unique integrals.
pub(crate) fn from_precomputed(
    stored: &PrecomputedIntegrals,
    density: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let n = density.nrows();
    if stored.len() != unique_count(n) {
        return Err(Error::Dimension {
            expected: unique_count(n),
            found: stored.len(),
        });
    }

    let mut gmatrix = DMatrix::zeros(n, n);
    let mut targets = Vec::with_capacity(8);
    for_each_unique_quartet(0..n, |i, j, k, l| {
        scatter(&mut gmatrix, &mut targets, density, (i, j, k, l), stored.get(i, j, k, l));
        Ok(())
    })?;
    gmatrix *= 0.5;

    Ok(gmatrix)
}

/// Every worker enumerates the unique quartets of its rows and accumulates into a private
/// matrix. `integral` returns `None` for quartets that were screened out.
pub(crate) fn direct(
    n: usize,
    density: &DMatrix<f64>,
    partitioner: &Partitioner,
    integral: impl Fn(usize, usize, usize, usize) -> Result<Option<f64>> + Send + Sync,
) -> Result<DMatrix<f64>> {
    let partials = partitioner.fork_join(n, |rows| {
        let mut partial = DMatrix::zeros(n, n);
        let mut targets = Vec::with_capacity(8);

        for_each_unique_quartet(rows, |i, j, k, l| {
            if let Some(value) = integral(i, j, k, l)? {
                scatter(&mut partial, &mut targets, density, (i, j, k, l), value);
            }
            Ok(())
        })?;

        Ok(partial)
    })?;

    let mut gmatrix = DMatrix::zeros(n, n);
    for partial in &partials {
        gmatrix += partial;
    }
    gmatrix *= 0.5;

    log::debug!("direct gmatrix merged from {} partial matrices", partials.len());

    Ok(gmatrix)
}

type Quartet = (usize, usize, usize, usize);

/// Adds the contributions of one unique integral to every distinct permutation of its quartet.
/// The caller scales the finished sum by 0.5.
fn scatter(
    gmatrix: &mut DMatrix<f64>,
    targets: &mut Vec<Quartet>,
    density: &DMatrix<f64>,
    (i, j, k, l): Quartet,
    value: f64,
) {
    targets.clear();
    for target in [
        (i, j, k, l),
        (j, i, k, l),
        (j, i, l, k),
        (i, j, l, k),
        (l, k, i, j),
        (l, k, j, i),
        (k, l, i, j),
        (k, l, j, i),
    ] {
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    let coulomb = 2.0 * value;
    let exchange = 0.5 * value;
    for &(i, j, k, l) in targets.iter() {
        gmatrix[(i, j)] += density[(k, l)] * coulomb;
        gmatrix[(k, l)] += density[(i, j)] * coulomb;
        gmatrix[(i, k)] -= density[(j, l)] * exchange;
        gmatrix[(i, l)] -= density[(j, k)] * exchange;
        gmatrix[(j, k)] -= density[(i, l)] * exchange;
        gmatrix[(j, l)] -= density[(i, k)] * exchange;
    }
}
