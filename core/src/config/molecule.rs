use nalgebra::Vector3;
use serde::Deserialize;

use crate::{
    atom::Atom,
    error::{ConfigError, Result},
    molecule::Molecule,
    periodic_table::ElementType,
};

/// Represents a full molecule in a config file.
/// A molecule is just a list of positioned atoms, positions in bohr.
#[derive(Debug, Deserialize)]
pub struct ConfigMolecule(Vec<ConfigAtom>);

#[derive(Debug, Deserialize)]
struct ConfigAtom {
    element: ElementType,
    position: Vec<f64>,
}

impl ConfigMolecule {
    pub fn from_json(json: &str) -> Result<Molecule> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.try_into()?)
    }
}

impl TryFrom<ConfigMolecule> for Molecule {
    type Error = ConfigError;

    fn try_from(value: ConfigMolecule) -> Result<Self, Self::Error> {
        let ConfigMolecule(config_atoms) = value;

        let mut atoms = Vec::with_capacity(config_atoms.len());
        for atom in config_atoms {
            let &[x, y, z] = atom.position.as_slice() else {
                return Err(ConfigError::InvalidValue {
                    name: "position",
                    reason: format!(
                        "{} atom has {} coordinates instead of 3",
                        atom.element,
                        atom.position.len()
                    ),
                });
            };

            atoms.push(Atom::new(atom.element, Vector3::new(x, y, z)));
        }

        Ok(Molecule::new(atoms))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::ConfigMolecule;
    use crate::{error::Error, periodic_table::ElementType};

    #[test]
    fn reads_atoms_in_order() {
        let molecule = ConfigMolecule::from_json(
            r#"[{"element": "O", "position": [0.0, 0.0, 0.0]},
                {"element": "H", "position": [0.0, 1.43, 1.1]}]"#,
        )
        .unwrap();

        assert_eq!(molecule.len(), 2);
        assert_eq!(molecule.atoms()[0].element_type(), ElementType::O);
        assert_eq!(molecule.atoms()[1].index(), 1);
        assert_eq!(*molecule.atoms()[1].position(), Vector3::new(0.0, 1.43, 1.1));
    }

    #[test]
    fn rejects_bad_positions() {
        let result = ConfigMolecule::from_json(r#"[{"element": "H", "position": [0.0, 1.0]}]"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
