//! Electron repulsion integrals using the Head-Gordon-Pople scheme.
//!
//! The horizontal recurrence relation moves all angular momentum from b onto a and from
//! d onto c. The remaining (a0|c0) integrals come from the vertical recurrence relation,
//! which builds them up from the (00|00)^(m) base integrals in a table indexed by
//! (la, ma, na, lc, mc, nc, m).

use std::{
    f64::consts::{PI, SQRT_2},
    ops::{Index, IndexMut},
};

use nalgebra::Vector3;

use crate::basis::{Angular, ContractedGaussian, PrimitiveGaussian};

use super::utils::{boys_values, product_center};

type Powers = [i32; 3];

#[inline(always)]
fn powers((l, m, n): Angular) -> Powers {
    [l, m, n]
}

#[inline(always)]
fn angular([l, m, n]: Powers) -> Angular {
    (l, m, n)
}

#[inline(always)]
fn shifted(mut powers: Powers, axis: usize, by: i32) -> Powers {
    powers[axis] += by;
    powers
}

/// (ab|cd) of four contracted functions.
pub fn coulomb(
    a: &ContractedGaussian,
    b: &ContractedGaussian,
    c: &ContractedGaussian,
    d: &ContractedGaussian,
) -> f64 {
    let ab = a.center() - b.center();
    let cd = c.center() - d.center();

    let contracted_vrr = |a_powers: Powers, c_powers: Powers| {
        let mut sum = 0.0;
        for pa in a.primitives() {
            let pa_shifted = pa.with_angular(angular(a_powers));
            let wa = pa.coefficient() * pa.normalization();
            for pb in b.primitives() {
                let wb = pb.coefficient() * pb.normalization();
                for pc in c.primitives() {
                    let pc_shifted = pc.with_angular(angular(c_powers));
                    let wc = pc.coefficient() * pc.normalization();
                    for pd in d.primitives() {
                        let wd = pd.coefficient() * pd.normalization();
                        sum += wa * wb * wc * wd * vrr(&pa_shifted, pb, &pc_shifted, pd, 0);
                    }
                }
            }
        }
        sum
    };

    a.normalization()
        * b.normalization()
        * c.normalization()
        * d.normalization()
        * hrr(
            [
                powers(a.angular()),
                powers(b.angular()),
                powers(c.angular()),
                powers(d.angular()),
            ],
            &ab,
            &cd,
            &contracted_vrr,
        )
}

/// (ab|cd) of four primitives, including their normalization constants but not their
/// contraction coefficients.
pub fn coulomb_repulsion(
    a: &PrimitiveGaussian,
    b: &PrimitiveGaussian,
    c: &PrimitiveGaussian,
    d: &PrimitiveGaussian,
) -> f64 {
    let ab = a.center() - b.center();
    let cd = c.center() - d.center();

    let primitive_vrr = |a_powers: Powers, c_powers: Powers| {
        vrr(
            &a.with_angular(angular(a_powers)),
            b,
            &c.with_angular(angular(c_powers)),
            d,
            0,
        )
    };

    a.normalization()
        * b.normalization()
        * c.normalization()
        * d.normalization()
        * hrr(
            [
                powers(a.angular()),
                powers(b.angular()),
                powers(c.angular()),
                powers(d.angular()),
            ],
            &ab,
            &cd,
            &primitive_vrr,
        )
}

/// Horizontal recurrence: (a,b+1i|cd) = (a+1i,b|cd) + (A-B)_i (ab|cd), same for d onto c.
fn hrr<F>(
    [a, b, c, d]: [Powers; 4],
    ab: &Vector3<f64>,
    cd: &Vector3<f64>,
    vrr: &F,
) -> f64
where
    F: Fn(Powers, Powers) -> f64,
{
    if let Some(axis) = (0..3).find(|&axis| b[axis] > 0) {
        let b = shifted(b, axis, -1);
        return hrr([shifted(a, axis, 1), b, c, d], ab, cd, vrr)
            + ab[axis] * hrr([a, b, c, d], ab, cd, vrr);
    }

    if let Some(axis) = (0..3).find(|&axis| d[axis] > 0) {
        let d = shifted(d, axis, -1);
        return hrr([a, b, shifted(c, axis, 1), d], ab, cd, vrr)
            + cd[axis] * hrr([a, b, c, d], ab, cd, vrr);
    }

    vrr(a, c)
}

/// Everything about a primitive quartet the recurrences need.
struct QuartetGeometry {
    zeta: f64,
    eta: f64,
    rho: f64,
    pa: Vector3<f64>,
    wp: Vector3<f64>,
    qc: Vector3<f64>,
    wq: Vector3<f64>,
    /// Kab * Kcd / sqrt(zeta + eta)
    prefactor: f64,
    /// argument of the boys function
    t: f64,
}

impl QuartetGeometry {
    fn new(
        a: &PrimitiveGaussian,
        b: &PrimitiveGaussian,
        c: &PrimitiveGaussian,
        d: &PrimitiveGaussian,
    ) -> Self {
        let (alpha, beta) = (a.exponent(), b.exponent());
        let (gamma, delta) = (c.exponent(), d.exponent());

        let zeta = alpha + beta;
        let eta = gamma + delta;
        let rho = zeta + eta;

        let p = product_center(alpha, a.center(), beta, b.center());
        let q = product_center(gamma, c.center(), delta, d.center());
        let w = product_center(zeta, &p, eta, &q);

        let rab2 = (a.center() - b.center()).norm_squared();
        let rcd2 = (c.center() - d.center()).norm_squared();
        let rpq2 = (p - q).norm_squared();

        let kab = SQRT_2 * PI.powf(1.25) / zeta * (-alpha * beta / zeta * rab2).exp();
        let kcd = SQRT_2 * PI.powf(1.25) / eta * (-gamma * delta / eta * rcd2).exp();

        Self {
            zeta,
            eta,
            rho,
            pa: p - a.center(),
            wp: w - p,
            qc: q - c.center(),
            wq: w - q,
            prefactor: kab * kcd / rho.sqrt(),
            t: zeta * eta / rho * rpq2,
        }
    }
}

/// Flat storage for the vertical recurrence, indexed by (la, ma, na, lc, mc, nc, m).
struct VrrTable {
    dims: [usize; 7],
    values: Vec<f64>,
}

impl VrrTable {
    fn new(dims: [usize; 7]) -> Self {
        Self {
            dims,
            values: vec![0.0; dims.iter().product()],
        }
    }

    #[inline(always)]
    fn offset(&self, index: [usize; 7]) -> usize {
        index
            .iter()
            .zip(&self.dims)
            .fold(0, |offset, (i, dim)| offset * dim + i)
    }
}

impl Index<[usize; 7]> for VrrTable {
    type Output = f64;

    #[inline(always)]
    fn index(&self, index: [usize; 7]) -> &Self::Output {
        &self.values[self.offset(index)]
    }
}

impl IndexMut<[usize; 7]> for VrrTable {
    #[inline(always)]
    fn index_mut(&mut self, index: [usize; 7]) -> &mut Self::Output {
        let offset = self.offset(index);
        &mut self.values[offset]
    }
}

/// (a0|c0)^(m) of four unnormalized primitives. Only the angular powers of `a` and `c` are used.
pub fn vrr(
    a: &PrimitiveGaussian,
    b: &PrimitiveGaussian,
    c: &PrimitiveGaussian,
    d: &PrimitiveGaussian,
    m: usize,
) -> f64 {
    let [la, ma, na] = powers(a.angular()).map(|power| power as usize);
    let [lc, mc, nc] = powers(c.angular()).map(|power| power as usize);

    let QuartetGeometry {
        zeta,
        eta,
        rho,
        pa,
        wp,
        qc,
        wq,
        prefactor,
        t,
    } = QuartetGeometry::new(a, b, c, d);

    let mtot = la + ma + na + lc + mc + nc + m;
    let mut table = VrrTable::new([la + 1, ma + 1, na + 1, lc + 1, mc + 1, nc + 1, mtot + 1]);

    for (im, boys) in boys_values(mtot, t).into_iter().enumerate() {
        table[[0, 0, 0, 0, 0, 0, im]] = prefactor * boys;
    }

    let a_half = 0.5 / zeta;
    let c_half = 0.5 / eta;
    let cross_half = 0.5 / rho;

    for i in 0..la {
        for im in 0..mtot - i {
            let mut value =
                pa.x * table[[i, 0, 0, 0, 0, 0, im]] + wp.x * table[[i, 0, 0, 0, 0, 0, im + 1]];
            if i > 0 {
                value += i as f64
                    * a_half
                    * (table[[i - 1, 0, 0, 0, 0, 0, im]]
                        - eta / rho * table[[i - 1, 0, 0, 0, 0, 0, im + 1]]);
            }
            table[[i + 1, 0, 0, 0, 0, 0, im]] = value;
        }
    }

    for j in 0..ma {
        for i in 0..=la {
            for im in 0..mtot - i - j {
                let mut value =
                    pa.y * table[[i, j, 0, 0, 0, 0, im]] + wp.y * table[[i, j, 0, 0, 0, 0, im + 1]];
                if j > 0 {
                    value += j as f64
                        * a_half
                        * (table[[i, j - 1, 0, 0, 0, 0, im]]
                            - eta / rho * table[[i, j - 1, 0, 0, 0, 0, im + 1]]);
                }
                table[[i, j + 1, 0, 0, 0, 0, im]] = value;
            }
        }
    }

    for k in 0..na {
        for j in 0..=ma {
            for i in 0..=la {
                for im in 0..mtot - i - j - k {
                    let mut value = pa.z * table[[i, j, k, 0, 0, 0, im]]
                        + wp.z * table[[i, j, k, 0, 0, 0, im + 1]];
                    if k > 0 {
                        value += k as f64
                            * a_half
                            * (table[[i, j, k - 1, 0, 0, 0, im]]
                                - eta / rho * table[[i, j, k - 1, 0, 0, 0, im + 1]]);
                    }
                    table[[i, j, k + 1, 0, 0, 0, im]] = value;
                }
            }
        }
    }

    for q in 0..lc {
        for k in 0..=na {
            for j in 0..=ma {
                for i in 0..=la {
                    for im in 0..mtot - i - j - k - q {
                        let mut value = qc.x * table[[i, j, k, q, 0, 0, im]]
                            + wq.x * table[[i, j, k, q, 0, 0, im + 1]];
                        if q > 0 {
                            value += q as f64
                                * c_half
                                * (table[[i, j, k, q - 1, 0, 0, im]]
                                    - zeta / rho * table[[i, j, k, q - 1, 0, 0, im + 1]]);
                        }
                        if i > 0 {
                            value += i as f64 * cross_half * table[[i - 1, j, k, q, 0, 0, im + 1]];
                        }
                        table[[i, j, k, q + 1, 0, 0, im]] = value;
                    }
                }
            }
        }
    }

    for r in 0..mc {
        for q in 0..=lc {
            for k in 0..=na {
                for j in 0..=ma {
                    for i in 0..=la {
                        for im in 0..mtot - i - j - k - q - r {
                            let mut value = qc.y * table[[i, j, k, q, r, 0, im]]
                                + wq.y * table[[i, j, k, q, r, 0, im + 1]];
                            if r > 0 {
                                value += r as f64
                                    * c_half
                                    * (table[[i, j, k, q, r - 1, 0, im]]
                                        - zeta / rho * table[[i, j, k, q, r - 1, 0, im + 1]]);
                            }
                            if j > 0 {
                                value +=
                                    j as f64 * cross_half * table[[i, j - 1, k, q, r, 0, im + 1]];
                            }
                            table[[i, j, k, q, r + 1, 0, im]] = value;
                        }
                    }
                }
            }
        }
    }

    for s in 0..nc {
        for r in 0..=mc {
            for q in 0..=lc {
                for k in 0..=na {
                    for j in 0..=ma {
                        for i in 0..=la {
                            for im in 0..mtot - i - j - k - q - r - s {
                                let mut value = qc.z * table[[i, j, k, q, r, s, im]]
                                    + wq.z * table[[i, j, k, q, r, s, im + 1]];
                                if s > 0 {
                                    value += s as f64
                                        * c_half
                                        * (table[[i, j, k, q, r, s - 1, im]]
                                            - zeta / rho * table[[i, j, k, q, r, s - 1, im + 1]]);
                                }
                                if k > 0 {
                                    value += k as f64
                                        * cross_half
                                        * table[[i, j, k - 1, q, r, s, im + 1]];
                                }
                                table[[i, j, k, q, r, s + 1, im]] = value;
                            }
                        }
                    }
                }
            }
        }
    }

    table[[la, ma, na, lc, mc, nc, m]]
}

/// Plain recursive form of [`vrr`], only used to check the table based version.
#[cfg(test)]
pub(crate) fn vrr_recursive(
    a: &PrimitiveGaussian,
    b: &PrimitiveGaussian,
    c: &PrimitiveGaussian,
    d: &PrimitiveGaussian,
    m: usize,
) -> f64 {
    fn recurse(geometry: &QuartetGeometry, a: Powers, c: Powers, m: usize) -> f64 {
        let QuartetGeometry {
            zeta, eta, rho, ..
        } = *geometry;

        if let Some(axis) = (0..3).rev().find(|&axis| c[axis] > 0) {
            let c1 = shifted(c, axis, -1);
            let mut value = geometry.qc[axis] * recurse(geometry, a, c1, m)
                + geometry.wq[axis] * recurse(geometry, a, c1, m + 1);
            if c1[axis] > 0 {
                let c2 = shifted(c1, axis, -1);
                value += c1[axis] as f64 / (2.0 * eta)
                    * (recurse(geometry, a, c2, m) - zeta / rho * recurse(geometry, a, c2, m + 1));
            }
            if a[axis] > 0 {
                value += a[axis] as f64 / (2.0 * rho)
                    * recurse(geometry, shifted(a, axis, -1), c1, m + 1);
            }
            return value;
        }

        if let Some(axis) = (0..3).rev().find(|&axis| a[axis] > 0) {
            let a1 = shifted(a, axis, -1);
            let mut value = geometry.pa[axis] * recurse(geometry, a1, c, m)
                + geometry.wp[axis] * recurse(geometry, a1, c, m + 1);
            if a1[axis] > 0 {
                let a2 = shifted(a1, axis, -1);
                value += a1[axis] as f64 / (2.0 * zeta)
                    * (recurse(geometry, a2, c, m) - eta / rho * recurse(geometry, a2, c, m + 1));
            }
            return value;
        }

        geometry.prefactor * boys_values(m, geometry.t)[m]
    }

    let geometry = QuartetGeometry::new(a, b, c, d);
    recurse(&geometry, powers(a.angular()), powers(c.angular()), m)
}
