use nalgebra::Vector3;

use crate::periodic_table::ElementType;

/// Represents an atom in a molecule.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Atom {
    pub(crate) position: Vector3<f64>,
    pub(crate) element_type: ElementType,
    /// position of this atom in its molecule
    pub(crate) index: usize,
}

impl Atom {
    pub fn new(element_type: ElementType, position: Vector3<f64>) -> Self {
        Self {
            position,
            element_type,
            index: 0,
        }
    }

    /// Returns the charge of this nucleus
    pub fn nuclear_charge(&self) -> i32 {
        self.element_type.atomic_number() as i32
    }

    /// Position in atomic units (bohr)
    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn symbol(&self) -> &'static str {
        self.element_type.symbol()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
