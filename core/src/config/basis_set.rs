use std::{collections::HashMap, str::FromStr};

use serde::Deserialize;

use crate::{
    basis::{AtomicBasis, BasisSet, ElectronShell},
    error::{ConfigError, Result},
    periodic_table::ElementType,
};

/// A basis set in the Basis Set Exchange JSON format.
#[derive(Debug, Deserialize)]
pub struct ConfigBasisSet {
    name: String,
    /// atomic number -> shells
    elements: HashMap<String, ConfigElectronicConfiguration>,
}

#[derive(Debug, Deserialize)]
struct ConfigElectronicConfiguration {
    electron_shells: Vec<ConfigElectronShell>,
}

#[derive(Debug, Deserialize)]
struct ConfigElectronShell {
    function_type: String,
    angular_momentum: Vec<i32>,
    exponents: Vec<String>,
    coefficients: Vec<Vec<String>>,
}

impl ConfigBasisSet {
    pub fn from_json(json: &str) -> Result<BasisSet> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.try_into()?)
    }
}

impl TryFrom<ConfigBasisSet> for BasisSet {
    type Error = ConfigError;

    fn try_from(value: ConfigBasisSet) -> Result<Self, Self::Error> {
        let mut atomic_mapping = HashMap::with_capacity(value.elements.len());

        for (atomic_number, configuration) in value.elements {
            let element = atomic_number
                .parse::<u32>()
                .ok()
                .and_then(ElementType::from_atomic_number)
                .ok_or_else(|| ConfigError::UnknownElement(atomic_number.clone()))?;

            let mut shells = Vec::with_capacity(configuration.electron_shells.len());
            for shell in &configuration.electron_shells {
                shells.extend(shell.split()?);
            }

            log::debug!("{}: {} shells for {element}", value.name, shells.len());
            atomic_mapping.insert(element, AtomicBasis::new(shells));
        }

        Ok(BasisSet::new(value.name, atomic_mapping))
    }
}

impl ConfigElectronShell {
    /// Splits combined shells into one shell per angular momentum: an SP shell lists one
    /// angular momentum per coefficient row, a general contraction repeats a single one.
    fn split(&self) -> Result<Vec<ElectronShell>, ConfigError> {
        if !self.function_type.starts_with("gto") {
            return Err(ConfigError::InvalidShell(format!(
                "unsupported function type {}",
                self.function_type
            )));
        }
        if self.function_type == "gto_spherical" {
            log::warn!("spherical shells are expanded into cartesian functions");
        }

        let exponents = parse_all(&self.exponents)?;
        let rows = self.coefficients.len();
        let angular_momenta: Vec<i32> = match self.angular_momentum.as_slice() {
            &[angular] => vec![angular; rows],
            angular if angular.len() == rows => angular.to_vec(),
            angular => {
                return Err(ConfigError::InvalidShell(format!(
                    "{} angular momenta for {rows} coefficient rows",
                    angular.len()
                )))
            }
        };

        angular_momenta
            .into_iter()
            .zip(&self.coefficients)
            .map(|(angular, coefficients)| {
                ElectronShell::new(angular, exponents.clone(), parse_all(coefficients)?)
            })
            .collect()
    }
}

fn parse_all(values: &[String]) -> Result<Vec<f64>, ConfigError> {
    values
        .iter()
        .map(|value| {
            f64::from_str(value.trim())
                .map_err(|err| ConfigError::InvalidShell(format!("{value:?}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::ConfigBasisSet;
    use crate::{basis::BasisSetRepository, error::Error, periodic_table::ElementType, testing};

    #[test]
    fn sp_shells_are_split() {
        let basis_set = ConfigBasisSet::from_json(testing::STO_3G_JSON).unwrap();
        assert_eq!(basis_set.name(), "STO-3G");

        let oxygen = basis_set.shells("sto-3g", ElementType::O).unwrap();
        let momenta: Vec<_> = oxygen.iter().map(|shell| shell.angular_magnitude()).collect();
        assert_eq!(momenta, vec![0, 0, 1]);

        let hydrogen = basis_set.shells("STO-3G", ElementType::H).unwrap();
        assert_eq!(hydrogen.len(), 1);
        let (exponent, coefficient) = hydrogen[0].primitives().next().unwrap();
        assert_eq!(exponent, 3.425250914);
        assert_eq!(coefficient, 0.1543289673);
    }

    #[test]
    fn malformed_input() {
        let unknown_element = r#"{"name": "x", "elements": {"200": {"electron_shells": []}}}"#;
        assert!(ConfigBasisSet::from_json(unknown_element).is_err());

        let bad_number = r#"{"name": "x", "elements": {"1": {"electron_shells": [
            {"function_type": "gto", "angular_momentum": [0],
             "exponents": ["one"], "coefficients": [["1.0"]]}
        ]}}}"#;
        assert!(matches!(ConfigBasisSet::from_json(bad_number), Err(Error::Config(_))));

        assert!(matches!(ConfigBasisSet::from_json("{"), Err(Error::Json(_))));
    }
}
