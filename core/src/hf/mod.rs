pub mod density;
pub mod gmatrix;
mod gradient;
mod mo;
mod scf;
pub mod utils;

pub use density::{CoreHamiltonianGuess, DensityGuesser, ExplicitDensity, GuessContext, HuckelGuess};
pub use gmatrix::form_gmatrix;
pub use gradient::HartreeFockForce;
pub use mo::MolecularOrbitals;
pub use scf::{
    IntegralStorage, ListenerResult, ScfConfig, ScfDriver, ScfEvent, ScfEventKind, ScfListener,
    ScfResult, ScfState, ScfStatus, ScfType,
};
