//! Json adapters that turn config files into the types the engine consumes.

mod basis_set;
mod molecule;

pub use basis_set::ConfigBasisSet;
pub use molecule::ConfigMolecule;
