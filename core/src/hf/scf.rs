use std::{fmt, str::FromStr};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    basis::BasisFunctions,
    diis::Diis,
    error::{ConfigError, Error, Result},
    integrals::{
        two_electron::unique_count, OneElectronIntegrals, TwoElectronIntegrals, TwoElectronTerm,
    },
    molecule::{ListenerId, Molecule},
    parallel::Partitioner,
};

use super::{
    density::{CoreHamiltonianGuess, DensityGuesser, ExplicitDensity, GuessContext},
    gmatrix::form_gmatrix,
    mo::MolecularOrbitals,
    utils,
};

/// Which calculation a driver performs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScfType {
    /// Restricted closed shell hartree fock
    #[default]
    HartreeFock,
    /// Hartree fock that never stores two-electron integrals
    HartreeFockDirect,
    /// Reserved for a perturbative correlation correction, currently reports the hartree fock
    /// reference
    MollerPlesset,
}

impl FromStr for ScfType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hf" | "rhf" | "hartree-fock" | "hartreefock" => Ok(Self::HartreeFock),
            "hf-direct" | "direct" | "hartree-fock-direct" | "hartreefockdirect" => {
                Ok(Self::HartreeFockDirect)
            }
            "mp2" | "moller-plesset" | "mollerplesset" => Ok(Self::MollerPlesset),
            _ => Err(ConfigError::UnknownScfType(s.to_owned())),
        }
    }
}

impl fmt::Display for ScfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HartreeFock => "hartree-fock",
            Self::HartreeFockDirect => "hartree-fock-direct",
            Self::MollerPlesset => "moller-plesset",
        })
    }
}

impl TryFrom<String> for ScfType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScfType> for String {
    fn from(value: ScfType) -> Self {
        value.to_string()
    }
}

/// Where two-electron integrals live during an scf run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegralStorage {
    /// Precompute if the unique integrals fit into `max_bytes`, otherwise go direct
    Auto { max_bytes: usize },
    Precomputed,
    Direct,
}

impl Default for IntegralStorage {
    fn default() -> Self {
        Self::Auto {
            max_bytes: 1 << 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScfConfig {
    pub scf_type: ScfType,
    /// the maximum number of iterations to try
    pub max_iterations: usize,
    /// largest energy change between two iterations that counts as converged
    pub energy_tolerance: f64,
    /// largest rms density change between two iterations that counts as converged
    pub density_tolerance: f64,
    pub molecular_charge: i32,
    pub integral_storage: IntegralStorage,
    pub two_electron_term: TwoElectronTerm,
    /// quartets with a smaller Schwarz bound are skipped in direct mode, 0 disables screening
    pub schwarz_threshold: f64,
    /// size of the worker pool, defaults to the available parallelism
    pub workers: Option<usize>,
    pub diis: bool,
}

impl Default for ScfConfig {
    fn default() -> Self {
        Self {
            scf_type: ScfType::default(),
            max_iterations: 20,
            energy_tolerance: 1e-4,
            density_tolerance: 1e-4,
            molecular_charge: 0,
            integral_storage: IntegralStorage::default(),
            two_electron_term: TwoElectronTerm::default(),
            schwarz_threshold: 1e-12,
            workers: None,
            diis: false,
        }
    }
}

impl ScfConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_iterations",
                reason: "at least one iteration is needed".to_owned(),
            });
        }

        for (name, value) in [
            ("energy_tolerance", self.energy_tolerance),
            ("density_tolerance", self.density_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("{value} is not a positive number"),
                });
            }
        }

        if !(self.schwarz_threshold.is_finite() && self.schwarz_threshold >= 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "schwarz_threshold",
                reason: format!("{} is negative", self.schwarz_threshold),
            });
        }

        if self.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }

        Ok(())
    }
}

/// Lifecycle of a driver. `Converged` and `Failed` are terminal until the next run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScfState {
    Init,
    Iterating,
    Converged,
    Failed,
}

/// How an scf run ended. Running out of iterations is not an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ScfStatus {
    Converged,
    Failed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScfEventKind {
    /// Progress after an iteration
    Info = 1,
    Converged = 2,
    FailedConvergence = 3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScfEvent {
    pub kind: ScfEventKind,
    pub iteration: usize,
    pub energy: f64,
    pub energy_change: f64,
    pub density_change: f64,
}

pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives progress events. Errors are logged and never stop the iteration.
pub trait ScfListener {
    fn on_event(&mut self, event: &ScfEvent) -> ListenerResult;
}

impl<F> ScfListener for F
where
    F: FnMut(&ScfEvent) -> ListenerResult,
{
    fn on_event(&mut self, event: &ScfEvent) -> ListenerResult {
        self(event)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ScfResult {
    pub status: ScfStatus,
    pub iterations: usize,
    /// Total energy, electronic plus nuclear repulsion
    pub energy: f64,
    pub electronic_energy: f64,
    pub nuclear_repulsion: f64,
    pub energy_change: f64,
    pub density_change: f64,
    pub orbitals: MolecularOrbitals,
    pub density: DMatrix<f64>,
    pub fock: DMatrix<f64>,
    pub gmatrix: DMatrix<f64>,
    pub overlap: DMatrix<f64>,
    pub hcore: DMatrix<f64>,
    pub n_occupied: usize,
}

impl ScfResult {
    pub fn is_converged(&self) -> bool {
        self.status == ScfStatus::Converged
    }

    pub fn orbital_energies(&self) -> &[f64] {
        self.orbitals.energies().as_slice()
    }
}

/// State of the last completed iteration
struct Iteration {
    index: usize,
    energy: f64,
    electronic_energy: f64,
    energy_change: f64,
    density_change: f64,
    orbitals: MolecularOrbitals,
    fock: DMatrix<f64>,
    gmatrix: DMatrix<f64>,
}

/// Runs the self consistent field iteration for one molecule and basis.
pub struct ScfDriver<'a> {
    molecule: &'a Molecule,
    basis: &'a BasisFunctions,
    config: ScfConfig,
    partitioner: Partitioner,
    guesser: Box<dyn DensityGuesser + 'a>,
    listeners: Vec<(ListenerId, Box<dyn ScfListener + 'a>)>,
    next_listener: u64,
    state: ScfState,
    n_occupied: usize,
}

impl<'a> ScfDriver<'a> {
    /// Validates the configuration and the electron count. Nothing is computed yet.
    pub fn new(
        molecule: &'a Molecule,
        basis: &'a BasisFunctions,
        config: ScfConfig,
    ) -> Result<Self> {
        config.validate()?;

        if basis.n_atoms() != molecule.len() {
            return Err(Error::Dimension {
                expected: molecule.len(),
                found: basis.n_atoms(),
            });
        }

        let n_electrons = molecule.nuclear_charge() - config.molecular_charge as i64;
        if n_electrons < 0 {
            return Err(ConfigError::InvalidValue {
                name: "molecular_charge",
                reason: format!("{} leaves a negative electron count", config.molecular_charge),
            }
            .into());
        }
        if n_electrons % 2 != 0 {
            return Err(ConfigError::OpenShell(n_electrons).into());
        }

        let n_occupied = (n_electrons / 2) as usize;
        if n_occupied > basis.len() {
            return Err(ConfigError::InvalidValue {
                name: "basis",
                reason: format!(
                    "{n_occupied} occupied orbitals but only {} basis functions",
                    basis.len()
                ),
            }
            .into());
        }

        let partitioner = match config.workers {
            Some(workers) => Partitioner::new(workers)?,
            None => Partitioner::with_available_parallelism()?,
        };

        Ok(Self {
            molecule,
            basis,
            config,
            partitioner,
            guesser: Box::new(CoreHamiltonianGuess),
            listeners: Vec::new(),
            next_listener: 0,
            state: ScfState::Init,
            n_occupied,
        })
    }

    /// Creates a driver for a method given by name, e.g. `"hf"` or `"hf-direct"`.
    pub fn for_method(
        method: &str,
        molecule: &'a Molecule,
        basis: &'a BasisFunctions,
        config: ScfConfig,
    ) -> Result<Self> {
        let scf_type = method.parse::<ScfType>()?;
        Self::new(molecule, basis, ScfConfig { scf_type, ..config })
    }

    pub fn with_guesser(mut self, guesser: impl DensityGuesser + 'a) -> Self {
        self.guesser = Box::new(guesser);
        self
    }

    pub fn with_initial_density(self, density: DMatrix<f64>) -> Self {
        self.with_guesser(ExplicitDensity(density))
    }

    pub fn subscribe(&mut self, listener: impl ScfListener + 'a) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether a listener with this id was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    pub fn state(&self) -> ScfState {
        self.state
    }

    pub fn config(&self) -> &ScfConfig {
        &self.config
    }

    pub fn molecule(&self) -> &'a Molecule {
        self.molecule
    }

    pub fn basis(&self) -> &'a BasisFunctions {
        self.basis
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    pub fn n_occupied(&self) -> usize {
        self.n_occupied
    }

    /// Iterates until both convergence criteria hold or the iteration cap is reached.
    pub fn run(&mut self) -> Result<ScfResult> {
        self.state = ScfState::Init;
        if self.config.scf_type == ScfType::MollerPlesset {
            log::warn!(
                "no correlation correction is applied, reporting the hartree fock reference"
            );
        }

        let nuclear_repulsion = self.molecule.nuclear_repulsion();
        let one_electron =
            OneElectronIntegrals::new(self.basis, self.molecule.atoms(), &self.partitioner)?;
        let overlap = one_electron.overlap();
        let hcore = one_electron.hcore();
        let transform = utils::symmetric_orthogonalization(overlap)?;
        let integrals = self.two_electron_integrals()?;

        let mut density = self.guesser.guess(&GuessContext {
            molecule: self.molecule,
            basis: self.basis,
            overlap,
            hcore,
            transform: &transform,
            n_occupied: self.n_occupied,
        })?;
        let n = self.basis.len();
        if density.shape() != (n, n) {
            return Err(Error::Dimension {
                expected: n,
                found: density.nrows(),
            });
        }

        let mut diis = self.config.diis.then(Diis::new);
        let mut last: Option<Iteration> = None;
        self.state = ScfState::Iterating;

        for index in 1..=self.config.max_iterations {
            let gmatrix = form_gmatrix(&integrals, self.basis, &density, &self.partitioner)?;
            let fock = hcore + &gmatrix;
            let electronic_energy = utils::trace_product(&density, &(hcore + &fock));
            let energy = electronic_energy + nuclear_repulsion;

            let orbitals = match diis.as_mut() {
                Some(diis) => {
                    let error = &fock * &density * overlap - overlap * &density * &fock;
                    MolecularOrbitals::from_fock(&diis.extrapolate(error, fock.clone()), &transform)
                }
                None => MolecularOrbitals::from_fock(&fock, &transform),
            };
            let new_density = orbitals.density(self.n_occupied);

            let energy_change = last
                .as_ref()
                .map_or(f64::INFINITY, |previous| energy - previous.energy);
            let density_change = utils::rms(&(&new_density - &density));

            log::info!(
                "iteration {index:<4} - energy {energy:1.8}, change {energy_change:1.4e}, \
                 density rms {density_change:1.4e}",
            );

            self.notify(&ScfEvent {
                kind: ScfEventKind::Info,
                iteration: index,
                energy,
                energy_change,
                density_change,
            });

            density = new_density;
            let iteration = last.insert(Iteration {
                index,
                energy,
                electronic_energy,
                energy_change,
                density_change,
                orbitals,
                fock,
                gmatrix,
            });

            if energy_change.abs() < self.config.energy_tolerance
                && density_change < self.config.density_tolerance
            {
                log::info!("converged after {index} iterations, energy {energy:1.10}");
                self.state = ScfState::Converged;
                let event = iteration.event(ScfEventKind::Converged);
                self.notify(&event);
                break;
            }
        }

        let Some(last) = last else {
            return Err(ConfigError::InvalidValue {
                name: "max_iterations",
                reason: "at least one iteration is needed".to_owned(),
            }
            .into());
        };

        let status = if self.state == ScfState::Converged {
            ScfStatus::Converged
        } else {
            log::warn!(
                "scf did not converge in {} iterations, last energy change {:1.4e}, \
                 density rms {:1.4e}",
                last.index,
                last.energy_change,
                last.density_change
            );
            self.state = ScfState::Failed;
            self.notify(&last.event(ScfEventKind::FailedConvergence));
            ScfStatus::Failed
        };

        Ok(ScfResult {
            status,
            iterations: last.index,
            energy: last.energy,
            electronic_energy: last.electronic_energy,
            nuclear_repulsion,
            energy_change: last.energy_change,
            density_change: last.density_change,
            orbitals: last.orbitals,
            density,
            fock: last.fock,
            gmatrix: last.gmatrix,
            overlap: overlap.clone(),
            hcore: hcore.clone(),
            n_occupied: self.n_occupied,
        })
    }

    fn two_electron_integrals(&self) -> Result<TwoElectronIntegrals> {
        let storage = match self.config.scf_type {
            ScfType::HartreeFockDirect => IntegralStorage::Direct,
            _ => self.config.integral_storage,
        };

        let direct = match storage {
            IntegralStorage::Precomputed => false,
            IntegralStorage::Direct => true,
            IntegralStorage::Auto { max_bytes } => {
                let required =
                    unique_count(self.basis.len()).saturating_mul(std::mem::size_of::<f64>());
                let direct = required > max_bytes;
                if direct {
                    log::info!(
                        "{required} bytes of two-electron integrals exceed the budget of \
                         {max_bytes} bytes, using direct mode"
                    );
                }
                direct
            }
        };

        let term = self.config.two_electron_term;
        if direct {
            TwoElectronIntegrals::direct(
                self.basis,
                term,
                self.config.schwarz_threshold,
                &self.partitioner,
            )
        } else {
            TwoElectronIntegrals::precomputed(self.basis, term, &self.partitioner)
        }
    }

    fn notify(&mut self, event: &ScfEvent) {
        for (id, listener) in &mut self.listeners {
            if let Err(err) = listener.on_event(event) {
                log::warn!("scf listener {id:?} failed on {:?} event: {err}", event.kind);
            }
        }
    }
}

impl Iteration {
    fn event(&self, kind: ScfEventKind) -> ScfEvent {
        ScfEvent {
            kind,
            iteration: self.index,
            energy: self.energy,
            energy_change: self.energy_change,
            density_change: self.density_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::{
        IntegralStorage, ListenerResult, ScfConfig, ScfDriver, ScfEvent, ScfEventKind, ScfState,
        ScfStatus, ScfType,
    };
    use crate::{
        basis::BasisFunctions,
        error::{ConfigError, Error},
        hf::density::HuckelGuess,
        integrals::TwoElectronTerm,
        testing,
    };

    fn tight() -> ScfConfig {
        ScfConfig {
            max_iterations: 100,
            energy_tolerance: 1e-10,
            density_tolerance: 1e-8,
            workers: Some(2),
            ..ScfConfig::default()
        }
    }

    #[test]
    fn hydrogen_sto_3g() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();

        let mut driver = ScfDriver::new(&molecule, &basis, ScfConfig::default()).unwrap();
        assert_eq!(driver.state(), ScfState::Init);
        let result = driver.run().unwrap();

        assert_eq!(result.status, ScfStatus::Converged);
        assert_eq!(driver.state(), ScfState::Converged);
        assert!(result.iterations <= 20);
        assert_relative_eq!(result.energy, -1.116759, epsilon = 1e-4);
        assert_relative_eq!(result.nuclear_repulsion, 1.0 / 1.4, epsilon = 1e-12);
        assert_relative_eq!(result.orbital_energies()[0], -0.578, epsilon = 1e-3);
        assert_relative_eq!(result.orbital_energies()[1], 0.670, epsilon = 1e-3);
    }

    #[test]
    fn hydrogen_6_31g() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "6-31G", &testing::basis_library()).unwrap();
        let result = ScfDriver::new(&molecule, &basis, tight()).unwrap().run().unwrap();

        // references from an independent McMurchie-Davidson calculation
        assert!(result.is_converged());
        assert_relative_eq!(result.electronic_energy, -1.841028414986528, epsilon = 1e-8);
        assert_relative_eq!(result.nuclear_repulsion, 0.7142857142857143, epsilon = 1e-12);

        let expected = [
            -0.5955599597547827,
            0.23824588465411062,
            0.7751321841348875,
            1.403292870183826,
        ];
        for (energy, expected) in result.orbital_energies().iter().zip(expected) {
            assert_relative_eq!(*energy, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn water_sto_3g() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();

        let plain = ScfDriver::new(&molecule, &basis, tight()).unwrap().run().unwrap();
        assert!(plain.is_converged());
        assert_relative_eq!(plain.nuclear_repulsion, 8.002367061810450, epsilon = 1e-8);
        assert_relative_eq!(plain.energy, -74.942079928192, epsilon = 1e-6);

        // D S D = D at convergence
        let dsd = &plain.density * &plain.overlap * &plain.density;
        assert_relative_eq!(dsd, plain.density, epsilon = 1e-6);

        let accelerated = ScfDriver::new(&molecule, &basis, ScfConfig { diis: true, ..tight() })
            .unwrap()
            .with_guesser(HuckelGuess::default())
            .run()
            .unwrap();
        assert!(accelerated.is_converged());
        assert!(accelerated.iterations <= plain.iterations);
        assert_relative_eq!(accelerated.energy, plain.energy, epsilon = 1e-8);

        let direct = ScfDriver::for_method("hf-direct", &molecule, &basis, tight())
            .unwrap()
            .run()
            .unwrap();
        assert_relative_eq!(direct.energy, plain.energy, epsilon = 1e-8);
    }

    #[test]
    fn water_6_31g() {
        let molecule = crate::molecule! {
            O => (0.0, 0.0, 0.0),
            H => (0.0, 0.75, 0.585),
            H => (0.0, -0.75, 0.585)
        };
        let basis =
            BasisFunctions::new(molecule.atoms(), "6-31G", &testing::basis_library()).unwrap();
        let config = ScfConfig {
            diis: true,
            ..tight()
        };
        let result = ScfDriver::new(&molecule, &basis, config).unwrap().run().unwrap();

        // references from an independent McMurchie-Davidson calculation at this geometry
        assert!(result.is_converged());
        assert_relative_eq!(result.electronic_energy, -91.94201647717664, epsilon = 1e-8);
        assert_relative_eq!(result.nuclear_repulsion, 17.488049195046212, epsilon = 1e-10);
        assert_relative_eq!(result.energy, -74.45396728213042, epsilon = 1e-8);

        let expected = [
            -20.545536674439433,
            -1.7501302888864012,
            -1.0404414951694305,
            -0.6347371289275986,
            -0.5661770145587709,
            0.26030071536469596,
            0.3511292223720662,
            1.0386948106944156,
            1.12673848260664,
            1.1702986282819465,
            1.6997918441598172,
            2.3146072833238764,
            2.8980758928948056,
        ];
        assert_eq!(result.orbital_energies().len(), expected.len());
        for (energy, expected) in result.orbital_energies().iter().zip(expected) {
            assert_relative_eq!(*energy, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn terminates_for_every_iteration_cap() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();

        for max_iterations in [1, 2, 3, 7, 20, 1000] {
            let config = ScfConfig {
                max_iterations,
                energy_tolerance: 1e-9,
                density_tolerance: 1e-7,
                workers: Some(2),
                ..ScfConfig::default()
            };
            let mut driver = ScfDriver::new(&molecule, &basis, config.clone()).unwrap();
            let result = driver.run().unwrap();

            assert!(result.iterations >= 1 && result.iterations <= max_iterations);
            let criteria = result.energy_change.abs() < config.energy_tolerance
                && result.density_change < config.density_tolerance;
            match result.status {
                ScfStatus::Converged => {
                    assert!(criteria);
                    assert_eq!(driver.state(), ScfState::Converged);
                }
                ScfStatus::Failed => {
                    assert!(!criteria);
                    assert_eq!(result.iterations, max_iterations);
                    assert_eq!(driver.state(), ScfState::Failed);
                }
            }
        }
    }

    #[test]
    fn a_single_iteration_never_converges() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let config = ScfConfig {
            max_iterations: 1,
            ..ScfConfig::default()
        };
        let result = ScfDriver::new(&molecule, &basis, config).unwrap().run().unwrap();
        assert_eq!(result.status, ScfStatus::Failed);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn listeners() {
        let molecule = testing::water();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();

        let reference = ScfDriver::new(&molecule, &basis, tight()).unwrap().run().unwrap();

        let seen = Rc::new(RefCell::new(Vec::<ScfEvent>::new()));
        let removed = Rc::new(RefCell::new(0));

        let mut driver = ScfDriver::new(&molecule, &basis, tight()).unwrap();
        let sink = seen.clone();
        driver.subscribe(move |event: &ScfEvent| -> ListenerResult {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        driver.subscribe(|_: &ScfEvent| -> ListenerResult { Err("listener failure".into()) });
        let counter = removed.clone();
        let id = driver.subscribe(move |_: &ScfEvent| -> ListenerResult {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        assert!(driver.unsubscribe(id));

        let result = driver.run().unwrap();
        assert_eq!(result.energy, reference.energy);
        assert_eq!(result.iterations, reference.iterations);
        assert_eq!(*removed.borrow(), 0);

        let seen = seen.borrow();
        assert_eq!(seen.len(), result.iterations + 1);
        assert!(seen[..result.iterations]
            .iter()
            .enumerate()
            .all(|(index, event)| {
                event.kind == ScfEventKind::Info && event.iteration == index + 1
            }));
        assert_eq!(seen[result.iterations].kind, ScfEventKind::Converged);

        let failed = Rc::new(RefCell::new(None));
        let sink = failed.clone();
        let mut driver = ScfDriver::new(
            &molecule,
            &basis,
            ScfConfig {
                max_iterations: 2,
                ..tight()
            },
        )
        .unwrap();
        driver.subscribe(move |event: &ScfEvent| -> ListenerResult {
            *sink.borrow_mut() = Some(event.kind);
            Ok(())
        });
        driver.run().unwrap();
        assert_eq!(*failed.borrow(), Some(ScfEventKind::FailedConvergence));
        assert_ne!(
            ScfEventKind::Converged as u8,
            ScfEventKind::FailedConvergence as u8
        );
    }

    #[test]
    fn configuration_errors_fail_fast() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();

        assert!(matches!(
            "ccsd(t)".parse::<ScfType>(),
            Err(ConfigError::UnknownScfType(_))
        ));
        assert!(matches!(
            ScfDriver::for_method("ccsd(t)", &molecule, &basis, ScfConfig::default()),
            Err(Error::Config(ConfigError::UnknownScfType(_)))
        ));

        let charged = ScfConfig {
            molecular_charge: 1,
            ..ScfConfig::default()
        };
        assert!(matches!(
            ScfDriver::new(&molecule, &basis, charged),
            Err(Error::Config(ConfigError::OpenShell(1)))
        ));

        let no_workers = ScfConfig {
            workers: Some(0),
            ..ScfConfig::default()
        };
        assert!(matches!(
            ScfDriver::new(&molecule, &basis, no_workers),
            Err(Error::Config(ConfigError::NoWorkers))
        ));

        let wrong_density = ScfDriver::new(&molecule, &basis, ScfConfig::default())
            .unwrap()
            .with_initial_density(DMatrix::zeros(5, 5))
            .run();
        assert!(matches!(wrong_density, Err(Error::Dimension { .. })));
    }

    #[test]
    fn rys_aborts_the_run() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let config = ScfConfig {
            two_electron_term: TwoElectronTerm::Rys,
            integral_storage: IntegralStorage::Direct,
            schwarz_threshold: 0.0,
            ..ScfConfig::default()
        };
        let mut driver = ScfDriver::new(&molecule, &basis, config).unwrap();
        assert!(matches!(driver.run(), Err(Error::UnsupportedIntegral(_))));
    }

    #[test]
    fn moller_plesset_reports_reference() {
        let molecule = testing::hydrogen_molecule();
        let basis =
            BasisFunctions::new(molecule.atoms(), "STO-3G", &testing::basis_library()).unwrap();
        let hf = ScfDriver::for_method("hf", &molecule, &basis, tight())
            .unwrap()
            .run()
            .unwrap();
        let mp = ScfDriver::for_method("mp2", &molecule, &basis, tight())
            .unwrap()
            .run()
            .unwrap();
        assert_relative_eq!(hf.energy, mp.energy, epsilon = 1e-12);
    }

    #[test]
    fn config_from_json() {
        let config: ScfConfig = serde_json::from_str(
            r#"{"scf_type": "hf-direct", "max_iterations": 50, "integral_storage": "precomputed"}"#,
        )
        .unwrap();
        assert_eq!(config.scf_type, ScfType::HartreeFockDirect);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.integral_storage, IntegralStorage::Precomputed);
        assert_eq!(config.energy_tolerance, 1e-4);

        let auto: ScfConfig =
            serde_json::from_str(r#"{"integral_storage": {"auto": {"max_bytes": 1024}}}"#).unwrap();
        assert_eq!(auto.integral_storage, IntegralStorage::Auto { max_bytes: 1024 });

        assert!(serde_json::from_str::<ScfConfig>(r#"{"scf_type": "dft"}"#).is_err());
    }
}
