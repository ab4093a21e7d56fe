use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{Error, Result};

/// Smallest overlap eigenvalue that is not treated as a linear dependency
const LINEAR_DEPENDENCE_CUTOFF: f64 = 1e-10;

#[inline(always)]
/// Create a symmetric, square matrix. Function is only run for the lower triangle of the matrix
pub(crate) fn symmetric_matrix(
    n: usize,
    mut func: impl FnMut(usize, usize) -> f64,
) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let value = func(i, j);
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
        }
    }
    matrix
}

pub(crate) fn eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let eigs = SymmetricEigen::new(matrix);
    (eigs.eigenvectors, eigs.eigenvalues)
}

/// Eigenvectors (as columns) and eigenvalues, in ascending eigenvalue order
pub(crate) fn sorted_eigs(matrix: DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let (eigenvectors, eigenvalues) = eigs(matrix);

    let mut val_vec_pairs = eigenvalues
        .into_iter()
        .zip(eigenvectors.column_iter())
        .collect::<Vec<_>>();

    val_vec_pairs.sort_unstable_by(|(a, _), (b, _)| a.total_cmp(b));

    let (values, vectors): (Vec<_>, Vec<_>) = val_vec_pairs.into_iter().unzip();

    (
        DMatrix::from_columns(&vectors),
        DVector::from_column_slice(&values),
    )
}

/// S^(-1/2), the symmetric (Löwdin) orthogonalization of an overlap matrix
pub fn symmetric_orthogonalization(overlap: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (u, lambda) = eigs(overlap.clone());

    let smallest = lambda.min();
    if smallest < LINEAR_DEPENDENCE_CUTOFF {
        return Err(Error::LinearDependence(smallest));
    }

    let diagonal_inv_sqrt = DMatrix::from_diagonal(&lambda.map(|value| value.sqrt().recip()));
    Ok(&u * (diagonal_inv_sqrt * u.transpose()))
}

/// Root mean square over all elements
pub fn rms(matrix: &DMatrix<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    (matrix.norm_squared() / matrix.len() as f64).sqrt()
}

/// sum_ij a_ij b_ij, the trace of a^T b
#[inline(always)]
pub fn trace_product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    a.dot(b)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::{rms, sorted_eigs, symmetric_orthogonalization};
    use crate::error::Error;

    #[test]
    fn orthogonalizer_inverts_square_root() {
        let overlap = DMatrix::from_row_slice(3, 3, &[1.0, 0.4, 0.1, 0.4, 1.0, 0.3, 0.1, 0.3, 1.0]);
        let x = symmetric_orthogonalization(&overlap).unwrap();

        assert_relative_eq!(
            x.transpose() * &overlap * &x,
            DMatrix::identity(3, 3),
            epsilon = 1e-12
        );
        assert_relative_eq!(x.transpose(), x, epsilon = 1e-12);
    }

    #[test]
    fn singular_overlap_is_rejected() {
        let overlap = DMatrix::from_element(2, 2, 1.0);
        assert!(matches!(
            symmetric_orthogonalization(&overlap),
            Err(Error::LinearDependence(_))
        ));
    }

    #[test]
    fn eigenvalues_ascend() {
        let matrix =
            DMatrix::from_row_slice(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
        let (vectors, values) = sorted_eigs(matrix.clone());
        assert!(values[0] < values[1] && values[1] < values[2]);
        for (index, vector) in vectors.column_iter().enumerate() {
            assert_relative_eq!(&matrix * vector, vector * values[index], epsilon = 1e-12);
        }
    }

    #[test]
    fn rms_of_matrix() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 1.0, -1.0]);
        assert_relative_eq!(rms(&matrix), 1.0);
    }
}
