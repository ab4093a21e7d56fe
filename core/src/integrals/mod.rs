pub mod hgp;
pub mod one_electron;
pub mod two_electron;
pub mod utils;

pub use one_electron::OneElectronIntegrals;
pub use two_electron::{
    integral_index, PrecomputedIntegrals, SchwarzScreening, TwoElectronIntegrals, TwoElectronTerm,
};
