use std::sync::Arc;

use thiserror::Error;

/// Problems with the requested calculation that are detected before any work is done.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown scf type: {0}")]
    UnknownScfType(String),
    #[error("unknown basis set: {0}")]
    UnknownBasisSet(String),
    #[error("basis set {basis} has no functions for element {element}")]
    MissingElement { basis: String, element: String },
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("invalid electron shell: {0}")]
    InvalidShell(String),
    #[error("only closed shell systems are supported, found {0} electrons")]
    OpenShell(i64),
    #[error("the worker pool needs at least one worker")]
    NoWorkers,
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} integrals are not implemented")]
    UnsupportedIntegral(&'static str),
    #[error("atom index {index} is out of range for a molecule with {len} atoms")]
    AtomIndex { index: usize, len: usize },
    #[error("dimension mismatch: expected {expected}, found {found}")]
    Dimension { expected: usize, found: usize },
    #[error("overlap matrix is numerically singular (smallest eigenvalue {0:e})")]
    LinearDependence(f64),
    #[error("basis no longer matches its molecule, the last rebuild failed: {0}")]
    StaleBasis(Arc<Error>),
    #[error("worker pool error: {0}")]
    WorkerPool(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
