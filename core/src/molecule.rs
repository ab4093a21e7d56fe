use nalgebra::Vector3;

use crate::{
    atom::Atom,
    error::{Error, Result},
    periodic_table::ElementType,
};

/// Identifies a registered listener so it can be removed again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// What happened to a molecule. Listeners receive this together with the updated atom list.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MoleculeChange {
    AtomAdded { index: usize },
    AtomRemoved { index: usize },
    AtomMoved { index: usize },
}

type MoleculeListener = Box<dyn FnMut(&MoleculeChange, &[Atom]) + Send>;

/// Represents a molecule: an ordered list of atoms that notifies listeners on every mutation.
pub struct Molecule {
    pub(crate) atoms: Vec<Atom>,
    listeners: Vec<(ListenerId, MoleculeListener)>,
    next_listener: u64,
}

impl Molecule {
    pub fn new(atoms: impl IntoIterator<Item = Atom>) -> Self {
        let atoms = atoms
            .into_iter()
            .enumerate()
            .map(|(index, atom)| Atom { index, ..atom })
            .collect();

        Self {
            atoms,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Result<&Atom> {
        self.atoms.get(index).ok_or(Error::AtomIndex {
            index,
            len: self.atoms.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Sum of all nuclear charges
    pub fn nuclear_charge(&self) -> i64 {
        self.atoms
            .iter()
            .map(|atom| atom.nuclear_charge() as i64)
            .sum()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, element_type: ElementType, position: Vector3<f64>) -> usize {
        let index = self.atoms.len();
        self.atoms.push(Atom {
            position,
            element_type,
            index,
        });
        self.notify(MoleculeChange::AtomAdded { index });
        index
    }

    /// Removes an atom. Atoms after it shift down by one index.
    pub fn remove_atom(&mut self, index: usize) -> Result<Atom> {
        self.atom(index)?;

        let removed = self.atoms.remove(index);
        for (index, atom) in self.atoms.iter_mut().enumerate().skip(index) {
            atom.index = index;
        }

        self.notify(MoleculeChange::AtomRemoved { index });
        Ok(removed)
    }

    pub fn set_position(&mut self, index: usize, position: Vector3<f64>) -> Result<()> {
        let len = self.atoms.len();
        let atom = self
            .atoms
            .get_mut(index)
            .ok_or(Error::AtomIndex { index, len })?;

        atom.position = position;
        self.notify(MoleculeChange::AtomMoved { index });
        Ok(())
    }

    /// Registers a listener that is called synchronously after every change.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&MoleculeChange, &[Atom]) + Send + 'static,
    ) -> ListenerId {
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

    pub fn n_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Classical repulsion energy between all pairs of nuclei
    pub fn nuclear_repulsion(&self) -> f64 {
        let n_atoms = self.atoms.len();

        let mut potential = 0.0;
        for atom_a in 0..n_atoms {
            for atom_b in atom_a + 1..n_atoms {
                potential += (self.atoms[atom_a].nuclear_charge()
                    * self.atoms[atom_b].nuclear_charge()) as f64
                    / (self.atoms[atom_b].position - self.atoms[atom_a].position).norm()
            }
        }
        log::debug!("nuclear repulsion energy: {potential}");
        potential
    }

    /// Derivative of the nuclear repulsion energy with respect to the position of one atom.
    pub fn nuclear_repulsion_derivative(&self, index: usize) -> Result<Vector3<f64>> {
        let atom = self.atom(index)?;

        let mut derivative = Vector3::zeros();
        for other in self.atoms.iter().filter(|other| other.index != index) {
            let separation = other.position - atom.position;
            let distance = separation.norm();
            derivative += (atom.nuclear_charge() * other.nuclear_charge()) as f64 * separation
                / distance.powi(3);
        }
        Ok(derivative)
    }

    fn notify(&mut self, change: MoleculeChange) {
        log::debug!("molecule changed: {change:?}");
        for (_, listener) in &mut self.listeners {
            listener(&change, &self.atoms);
        }
    }
}

impl std::fmt::Debug for Molecule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Molecule")
            .field("atoms", &self.atoms)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
