pub mod atom;
pub mod basis;
pub mod config;
mod diis;
pub mod error;
pub mod hf;
pub mod integrals;
pub mod molecule;
pub mod parallel;
pub mod periodic_table;
pub mod property;

pub use nalgebra;

pub use error::{ConfigError, Error, Result};

/// Builds a [`Molecule`](molecule::Molecule) from `Element => (x, y, z)` entries, positions in
/// bohr.
#[macro_export]
macro_rules! molecule {
    ($(
        $element:ident => ($x:expr, $y:expr, $z:expr)
    ),* $(,)?) => {
        $crate::molecule::Molecule::new([
            $($crate::atom::Atom::new(
                $crate::periodic_table::ElementType::$element,
                $crate::nalgebra::Vector3::new($x, $y, $z),
            )),*
        ])
    };
}

/// Small molecules and basis sets shared by tests and benchmarks.
pub mod testing {
    use crate::{basis::BasisLibrary, config::ConfigBasisSet, molecule::Molecule};

    /// STO-3G for H, C and O from the Basis Set Exchange
    pub const STO_3G_JSON: &str = r#"{"molssi_bse_schema":{"schema_type":"complete","schema_version":"0.1"},"revision_description":"DatafromGaussian09","revision_date":"2018-06-19","elements":{"1":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.3425250914E+01","0.6239137298E+00","0.1688554040E+00"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"6":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.7161683735E+02","0.1304509632E+02","0.3530512160E+01"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]},{"function_type":"gto","region":"","angular_momentum":[0,1],"exponents":["0.2941249355E+01","0.6834830964E+00","0.2222899159E+00"],"coefficients":[["-0.9996722919E-01","0.3995128261E+00","0.7001154689E+00"],["0.1559162750E+00","0.6076837186E+00","0.3919573931E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]},"8":{"electron_shells":[{"function_type":"gto","region":"","angular_momentum":[0],"exponents":["0.1307093214E+03","0.2380886605E+02","0.6443608313E+01"],"coefficients":[["0.1543289673E+00","0.5353281423E+00","0.4446345422E+00"]]},{"function_type":"gto","region":"","angular_momentum":[0,1],"exponents":["0.5033151319E+01","0.1169596125E+01","0.3803889600E+00"],"coefficients":[["-0.9996722919E-01","0.3995128261E+00","0.7001154689E+00"],["0.1559162750E+00","0.6076837186E+00","0.3919573931E+00"]]}],"references":[{"reference_description":"STO-3GMinimalBasis(3functions/AO)","reference_keys":["hehre1969a"]}]}},"version":"1","function_types":["gto"],"names":["STO-3G"],"tags":[],"family":"sto","description":"STO-3GMinimalBasis(3functions/AO)","role":"orbital","auxiliaries":{},"name":"STO-3G"}"#;

    /// 6-31G for H and O from the Basis Set Exchange
    pub const SIX_31G_JSON: &str = r#"{"molssi_bse_schema":{"schema_type":"complete","schema_version":"0.1"},"revision_description":"DatafromGaussian09/GAMESS","revision_date":"2018-06-19","elements":{"1":{"electron_shells":[{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.1873113696E+02","0.2825394365E+01","0.6401216923E+00"],"coefficients":[["0.3349460434E-01","0.2347269535E+00","0.8137573261E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.1612777588E+00"],"coefficients":[["1.0000000"]]}],"references":[{"reference_description":"31GSplit-valencebasissetforH,He","reference_keys":["ditchfield1971a"]}]},"8":{"electron_shells":[{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.5484671660E+04","0.8252349460E+03","0.1880469580E+03","0.5296450000E+02","0.1689757040E+02","0.5799635340E+01"],"coefficients":[["0.1831074430E-02","0.1395017220E-01","0.6844507810E-01","0.2327143360E+00","0.4701928980E+00","0.3585208530E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0,1],"exponents":["0.1553961625E+02","0.3599933586E+01","0.1013761750E+01"],"coefficients":[["-0.1107775495E+00","-0.1480262627E+00","0.1130767015E+01"],["0.7087426823E-01","0.3397528391E+00","0.7271585773E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0,1],"exponents":["0.2700058226E+00"],"coefficients":[["0.1000000000E+01"],["0.1000000000E+01"]]}],"references":[{"reference_description":"6-31GSplit-valencebasisset","reference_keys":["hehre1972a"]}]}},"version":"1","function_types":["gto"],"names":["6-31G"],"tags":[],"family":"pople","description":"6-31Gvalencedouble-zeta","role":"orbital","auxiliaries":{},"name":"6-31G"}"#;

    /// STO-3G and 6-31G
    pub fn basis_library() -> BasisLibrary {
        [STO_3G_JSON, SIX_31G_JSON]
            .into_iter()
            .map(|json| ConfigBasisSet::from_json(json).expect("fixture basis sets are valid"))
            .collect()
    }

    /// H2 with a bond length of 1.4 bohr along z
    pub fn hydrogen_molecule() -> Molecule {
        crate::molecule! {
            H => (0.0, 0.0, 0.0),
            H => (0.0, 0.0, 1.4)
        }
    }

    /// Water in the xy plane, mirror symmetric in x
    pub fn water() -> Molecule {
        crate::molecule! {
            O => (0.0, -0.143225816552, 0.0),
            H => (1.638036840407, 1.136548822547, 0.0),
            H => (-1.638036840407, 1.136548822547, 0.0)
        }
    }
}
