mod functions;
mod molecular;
mod set;

pub use functions::{Angular, CenterDerivative, ContractedGaussian, PrimitiveGaussian};
pub use molecular::{BasisFunctions, BasisReadGuard, SharedBasis, Shell};
pub use set::{AtomicBasis, BasisLibrary, BasisSet, BasisSetRepository, ElectronShell};
