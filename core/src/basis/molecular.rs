use std::{
    ops::{Deref, Index, Range},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard},
};

use crate::{
    atom::Atom,
    error::{Error, Result},
    molecule::{ListenerId, Molecule},
};

use super::{BasisSetRepository, ContractedGaussian};

/// Functions generated from one shell specification on one atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Shell {
    pub atom: usize,
    pub angular_magnitude: i32,
    pub functions: Range<usize>,
}

/// All contracted basis functions of a molecule, in index order.
#[derive(Debug, Clone)]
pub struct BasisFunctions {
    basis_name: String,
    functions: Vec<ContractedGaussian>,
    shells: Vec<Shell>,
    /// function index -> shell index
    shell_of: Vec<usize>,
    /// atom index -> functions centered on that atom
    atom_ranges: Vec<Range<usize>>,
    generation: u64,
}

impl BasisFunctions {
    /// Builds the basis of every atom, in atom order.
    pub fn new(
        atoms: &[Atom],
        basis_name: &str,
        repository: &(impl BasisSetRepository + ?Sized),
    ) -> Result<Self> {
        let mut functions = Vec::new();
        let mut shells = Vec::new();
        let mut shell_of = Vec::new();
        let mut atom_ranges = Vec::with_capacity(atoms.len());

        for atom in atoms {
            let atom_start = functions.len();

            for shell in repository.shells(basis_name, atom.element_type())? {
                let shell_start = functions.len();

                for angular in shell.angular_vectors() {
                    let mut function =
                        ContractedGaussian::new(*atom.position(), angular, functions.len());
                    for (exponent, coefficient) in shell.primitives() {
                        function.add_primitive(exponent, coefficient);
                    }
                    function.normalize();

                    shell_of.push(shells.len());
                    functions.push(function);
                }

                shells.push(Shell {
                    atom: atom.index(),
                    angular_magnitude: shell.angular_magnitude(),
                    functions: shell_start..functions.len(),
                });
            }

            atom_ranges.push(atom_start..functions.len());
        }

        log::debug!(
            "built {} basis functions in {} shells from basis {basis_name}",
            functions.len(),
            shells.len()
        );

        Ok(Self {
            basis_name: basis_name.to_owned(),
            functions,
            shells,
            shell_of,
            atom_ranges,
            generation: 0,
        })
    }

    /// Builds the basis for `molecule` and keeps it up to date: every change of the molecule
    /// rebuilds the whole basis and increments its generation. A failed rebuild invalidates the
    /// handle until a later change rebuilds successfully.
    pub fn attach(
        molecule: &mut Molecule,
        basis_name: &str,
        repository: Arc<dyn BasisSetRepository + Send + Sync>,
    ) -> Result<SharedBasis> {
        let current = Self::new(molecule.atoms(), basis_name, repository.as_ref())?;
        let state = Arc::new(RwLock::new(BasisState {
            current,
            failure: None,
        }));

        let target = Arc::clone(&state);
        let basis_name = basis_name.to_owned();
        let listener = molecule.subscribe(move |change, atoms| {
            let mut state = target.write().unwrap_or_else(PoisonError::into_inner);
            match Self::new(atoms, &basis_name, repository.as_ref()) {
                Ok(rebuilt) => {
                    let generation = state.current.generation + 1;
                    state.current = Self {
                        generation,
                        ..rebuilt
                    };
                    state.failure = None;
                    log::debug!("rebuilt basis after {change:?}, generation {generation}");
                }
                Err(err) => {
                    log::error!("failed to rebuild basis after {change:?}: {err}");
                    state.failure = Some(Arc::new(err));
                }
            }
        });

        Ok(SharedBasis { state, listener })
    }

    pub fn basis_name(&self) -> &str {
        &self.basis_name
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn functions(&self) -> &[ContractedGaussian] {
        &self.functions
    }

    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    pub fn shell_of(&self, function: usize) -> usize {
        self.shell_of[function]
    }

    /// Number of rebuilds since the basis was first built
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn n_atoms(&self) -> usize {
        self.atom_ranges.len()
    }

    /// Index range of the functions centered on an atom
    pub fn atom_range(&self, atom: usize) -> Result<Range<usize>> {
        self.atom_ranges.get(atom).cloned().ok_or(Error::AtomIndex {
            index: atom,
            len: self.atom_ranges.len(),
        })
    }

    pub fn functions_on_atom(&self, atom: usize) -> Result<&[ContractedGaussian]> {
        Ok(&self.functions[self.atom_range(atom)?])
    }
}

impl Index<usize> for BasisFunctions {
    type Output = ContractedGaussian;

    fn index(&self, index: usize) -> &Self::Output {
        &self.functions[index]
    }
}

#[derive(Debug)]
struct BasisState {
    current: BasisFunctions,
    /// set while the last rebuild failed
    failure: Option<Arc<Error>>,
}

/// Handle to a basis that follows its molecule. Detach it to stop the rebuilds.
#[derive(Debug)]
pub struct SharedBasis {
    state: Arc<RwLock<BasisState>>,
    listener: ListenerId,
}

/// Read access to a valid build. Holding it blocks rebuilds.
pub struct BasisReadGuard<'a>(RwLockReadGuard<'a, BasisState>);

impl Deref for BasisReadGuard<'_> {
    type Target = BasisFunctions;

    fn deref(&self) -> &Self::Target {
        &self.0.current
    }
}

impl SharedBasis {
    /// The current build, or the error of the last rebuild if it failed.
    pub fn read(&self) -> Result<BasisReadGuard<'_>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(err) = &state.failure {
            return Err(Error::StaleBasis(Arc::clone(err)));
        }
        Ok(BasisReadGuard(state))
    }

    /// Whether the basis matches the current molecule
    pub fn is_valid(&self) -> bool {
        self.read().is_ok()
    }

    /// Generation of the last successful build
    pub fn generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .generation()
    }

    /// A copy of the current build, independent of later rebuilds.
    pub fn snapshot(&self) -> Result<BasisFunctions> {
        Ok(self.read()?.clone())
    }

    /// Stops following `molecule` and returns the last build.
    pub fn detach(self, molecule: &mut Molecule) -> Result<BasisFunctions> {
        if !molecule.unsubscribe(self.listener) {
            log::warn!("basis was not subscribed to this molecule");
        }
        self.snapshot()
    }
}
