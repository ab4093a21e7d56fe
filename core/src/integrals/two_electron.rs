use serde::{Deserialize, Serialize};

use crate::{
    basis::{BasisFunctions, ContractedGaussian, PrimitiveGaussian},
    error::{Error, Result},
    parallel::Partitioner,
};

use super::hgp;

/// Strategy used to evaluate electron repulsion integrals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TwoElectronTerm {
    /// Head-Gordon-Pople recurrence relations
    #[default]
    Hgp,
    /// Rys quadrature, not implemented
    Rys,
}

impl TwoElectronTerm {
    /// (ab|cd) of four contracted functions
    pub fn coulomb(
        &self,
        a: &ContractedGaussian,
        b: &ContractedGaussian,
        c: &ContractedGaussian,
        d: &ContractedGaussian,
    ) -> Result<f64> {
        match self {
            Self::Hgp => Ok(hgp::coulomb(a, b, c, d)),
            Self::Rys => Err(Error::UnsupportedIntegral("Rys quadrature")),
        }
    }

    /// (ab|cd) of four normalized primitives
    pub fn coulomb_repulsion(
        &self,
        a: &PrimitiveGaussian,
        b: &PrimitiveGaussian,
        c: &PrimitiveGaussian,
        d: &PrimitiveGaussian,
    ) -> Result<f64> {
        match self {
            Self::Hgp => Ok(hgp::coulomb_repulsion(a, b, c, d)),
            Self::Rys => Err(Error::UnsupportedIntegral("Rys quadrature")),
        }
    }
}

/// Index of an unordered pair (a, b) in a packed triangle
#[inline(always)]
pub fn pair_index(a: usize, b: usize) -> usize {
    let (max, min) = if a > b { (a, b) } else { (b, a) };
    max * (max + 1) / 2 + min
}

/// Canonical index of (ij|kl), identical for all 8 permutations
#[inline(always)]
pub fn integral_index(i: usize, j: usize, k: usize, l: usize) -> usize {
    pair_index(pair_index(i, j), pair_index(k, l))
}

/// Number of symmetry unique integrals of `n` functions
pub fn unique_count(n: usize) -> usize {
    let pairs = n * (n + 1) / 2;
    pairs * (pairs + 1) / 2
}

/// Calls `visit(i, j, k, l)` for every symmetry unique quartet with `i` in `rows`, in
/// increasing canonical index order. Quartets are normalized to i >= j, k >= l, ij >= kl.
pub(crate) fn for_each_unique_quartet(
    rows: std::ops::Range<usize>,
    mut visit: impl FnMut(usize, usize, usize, usize) -> Result<()>,
) -> Result<()> {
    for i in rows {
        for j in 0..=i {
            let ij = pair_index(i, j);
            'kl: for k in 0..=i {
                for l in 0..=k {
                    if pair_index(k, l) > ij {
                        break 'kl;
                    }
                    visit(i, j, k, l)?;
                }
            }
        }
    }
    Ok(())
}

/// All symmetry unique integrals of a basis, stored by canonical index.
#[derive(Debug, Clone)]
pub struct PrecomputedIntegrals {
    values: Vec<f64>,
}

impl PrecomputedIntegrals {
    /// Every worker computes the contiguous block of canonical indices that belongs to its
    /// rows, so merging is a concatenation.
    pub fn new(
        basis: &BasisFunctions,
        term: TwoElectronTerm,
        partitioner: &Partitioner,
    ) -> Result<Self> {
        Self::from_fn(basis.len(), partitioner, |i, j, k, l| {
            let value = term.coulomb(&basis[i], &basis[j], &basis[k], &basis[l])?;
            log::trace!("ERI ({i} {j}|{k} {l}) = {value}");
            Ok(value)
        })
    }

    /// Stores `integral(i, j, k, l)` for every unique quartet.
    pub(crate) fn from_fn(
        n: usize,
        partitioner: &Partitioner,
        integral: impl Fn(usize, usize, usize, usize) -> Result<f64> + Send + Sync,
    ) -> Result<Self> {
        let blocks = partitioner.fork_join(n, |rows| {
            let first = rows.start;
            let last = rows.end;
            let mut block =
                Vec::with_capacity(unique_count(last).saturating_sub(unique_count(first)));
            for_each_unique_quartet(rows, |i, j, k, l| {
                block.push(integral(i, j, k, l)?);
                Ok(())
            })?;
            Ok(block)
        })?;

        let values = blocks.concat();
        if values.len() != unique_count(n) {
            return Err(Error::Dimension {
                expected: unique_count(n),
                found: values.len(),
            });
        }

        Ok(Self { values })
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.values[integral_index(i, j, k, l)]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Memory used by the stored values
    pub fn bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f64>()
    }
}

/// Cauchy-Schwarz bounds |(ab|cd)| <= Q_ab Q_cd with Q_ab = max sqrt|(ab|ab)| over a shell pair.
#[derive(Debug, Clone)]
pub struct SchwarzScreening {
    /// function index -> shell index
    shell_of: Vec<usize>,
    n_shells: usize,
    bounds: Vec<f64>,
    threshold: f64,
}

impl SchwarzScreening {
    pub fn new(
        basis: &BasisFunctions,
        term: TwoElectronTerm,
        threshold: f64,
        partitioner: &Partitioner,
    ) -> Result<Self> {
        let shells = basis.shells();
        let n_shells = shells.len();

        let rows = partitioner.fork_join(n_shells, |range| {
            let mut rows = Vec::with_capacity(range.len() * n_shells);
            for shell_a in &shells[range] {
                for shell_b in shells {
                    let mut bound = 0.0f64;
                    for a in shell_a.functions.clone() {
                        for b in shell_b.functions.clone() {
                            let value = term.coulomb(&basis[a], &basis[b], &basis[a], &basis[b])?;
                            bound = bound.max(value.abs().sqrt());
                        }
                    }
                    rows.push(bound);
                }
            }
            Ok(rows)
        })?;

        Ok(Self {
            shell_of: (0..basis.len()).map(|i| basis.shell_of(i)).collect(),
            n_shells,
            bounds: rows.concat(),
            threshold,
        })
    }

    #[inline(always)]
    pub fn bound(&self, i: usize, j: usize) -> f64 {
        self.bounds[self.shell_of[i] * self.n_shells + self.shell_of[j]]
    }

    /// Whether (ij|kl) is certainly below the threshold
    #[inline(always)]
    pub fn is_negligible(&self, i: usize, j: usize, k: usize, l: usize) -> bool {
        self.bound(i, j) * self.bound(k, l) < self.threshold
    }
}

/// How two-electron integrals are provided to the GMatrix formation.
#[derive(Debug, Clone)]
pub enum TwoElectronIntegrals {
    /// Evaluated once, looked up by canonical index
    Precomputed(PrecomputedIntegrals),
    /// Evaluated every time they are needed
    Direct {
        term: TwoElectronTerm,
        screening: Option<SchwarzScreening>,
    },
}

impl TwoElectronIntegrals {
    pub fn precomputed(
        basis: &BasisFunctions,
        term: TwoElectronTerm,
        partitioner: &Partitioner,
    ) -> Result<Self> {
        Ok(Self::Precomputed(PrecomputedIntegrals::new(
            basis,
            term,
            partitioner,
        )?))
    }

    /// Direct evaluation, screened with Schwarz bounds unless `schwarz_threshold` is zero.
    pub fn direct(
        basis: &BasisFunctions,
        term: TwoElectronTerm,
        schwarz_threshold: f64,
        partitioner: &Partitioner,
    ) -> Result<Self> {
        let screening = if schwarz_threshold > 0.0 {
            Some(SchwarzScreening::new(
                basis,
                term,
                schwarz_threshold,
                partitioner,
            )?)
        } else {
            None
        };

        Ok(Self::Direct { term, screening })
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct { .. })
    }

    /// (ij|kl) over the functions of `basis`
    pub fn value(
        &self,
        basis: &BasisFunctions,
        i: usize,
        j: usize,
        k: usize,
        l: usize,
    ) -> Result<f64> {
        match self {
            Self::Precomputed(integrals) => Ok(integrals.get(i, j, k, l)),
            Self::Direct { term, .. } => term.coulomb(&basis[i], &basis[j], &basis[k], &basis[l]),
        }
    }
}
