use std::collections::HashMap;

use crate::{error::ConfigError, periodic_table::ElementType};

/// Supplies shell specifications for a named basis set.
pub trait BasisSetRepository {
    fn shells(
        &self,
        basis_name: &str,
        element: ElementType,
    ) -> Result<&[ElectronShell], ConfigError>;
}

/// A single named basis set, e.g. STO-3G.
#[derive(Debug, Clone)]
pub struct BasisSet {
    name: String,
    atomic_mapping: HashMap<ElementType, AtomicBasis>,
}

impl BasisSet {
    /// Create a new basis set given mappings from element type to the basis of that element
    pub fn new(name: impl Into<String>, atomic_mapping: HashMap<ElementType, AtomicBasis>) -> Self {
        Self {
            name: name.into(),
            atomic_mapping,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the basis of a given element, if it exists.
    pub fn for_element(&self, element: ElementType) -> Option<&AtomicBasis> {
        self.atomic_mapping.get(&element)
    }
}

impl BasisSetRepository for BasisSet {
    fn shells(
        &self,
        basis_name: &str,
        element: ElementType,
    ) -> Result<&[ElectronShell], ConfigError> {
        if !self.name.eq_ignore_ascii_case(basis_name) {
            return Err(ConfigError::UnknownBasisSet(basis_name.to_owned()));
        }

        self.for_element(element)
            .map(|basis| basis.shells.as_slice())
            .ok_or_else(|| ConfigError::MissingElement {
                basis: self.name.clone(),
                element: element.to_string(),
            })
    }
}

/// A collection of basis sets, looked up by case-insensitive name.
#[derive(Debug, Default, Clone)]
pub struct BasisLibrary {
    sets: HashMap<String, BasisSet>,
}

impl BasisLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, basis_set: BasisSet) {
        self.sets
            .insert(basis_set.name.to_ascii_lowercase(), basis_set);
    }

    pub fn get(&self, name: &str) -> Option<&BasisSet> {
        self.sets.get(&name.to_ascii_lowercase())
    }
}

impl FromIterator<BasisSet> for BasisLibrary {
    fn from_iter<T: IntoIterator<Item = BasisSet>>(iter: T) -> Self {
        let mut library = Self::new();
        for basis_set in iter {
            library.insert(basis_set);
        }
        library
    }
}

impl BasisSetRepository for BasisLibrary {
    fn shells(
        &self,
        basis_name: &str,
        element: ElementType,
    ) -> Result<&[ElectronShell], ConfigError> {
        self.get(basis_name)
            .ok_or_else(|| ConfigError::UnknownBasisSet(basis_name.to_owned()))?
            .shells(basis_name, element)
    }
}

/// Represents the shells of a single element.
#[derive(Debug, Clone, Default)]
pub struct AtomicBasis {
    pub(crate) shells: Vec<ElectronShell>,
}

impl AtomicBasis {
    pub fn new(shells: Vec<ElectronShell>) -> Self {
        Self { shells }
    }

    pub fn shells(&self) -> &[ElectronShell] {
        &self.shells
    }
}

/// One contraction pattern with a total angular momentum, shared by every function of the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronShell {
    pub(crate) angular_magnitude: i32,
    pub(crate) exponents: Vec<f64>,
    pub(crate) coefficients: Vec<f64>,
}

impl ElectronShell {
    pub fn new(
        angular_magnitude: i32,
        exponents: Vec<f64>,
        coefficients: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        if angular_magnitude < 0 {
            return Err(ConfigError::InvalidShell(format!(
                "negative angular momentum {angular_magnitude}"
            )));
        }
        if exponents.is_empty() || exponents.len() != coefficients.len() {
            return Err(ConfigError::InvalidShell(format!(
                "{} exponents but {} coefficients",
                exponents.len(),
                coefficients.len()
            )));
        }
        if let Some(exponent) = exponents.iter().find(|exponent| **exponent <= 0.0) {
            return Err(ConfigError::InvalidShell(format!(
                "exponent {exponent} is not positive"
            )));
        }

        Ok(Self {
            angular_magnitude,
            exponents,
            coefficients,
        })
    }

    pub fn angular_magnitude(&self) -> i32 {
        self.angular_magnitude
    }

    /// (exponent, coefficient) pairs of this contraction
    pub fn primitives(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.exponents
            .iter()
            .copied()
            .zip(self.coefficients.iter().copied())
    }

    /// Every (l, m, n) with l + m + n equal to the angular momentum, x powers first.
    pub fn angular_vectors(&self) -> Vec<(i32, i32, i32)> {
        let magnitude = self.angular_magnitude;
        let mut angular_vectors =
            Vec::with_capacity(((magnitude + 1) * (magnitude + 2) / 2) as usize);

        for i in (0..=magnitude).rev() {
            for j in (0..=magnitude - i).rev() {
                angular_vectors.push((i, j, magnitude - i - j));
            }
        }

        angular_vectors
    }
}
