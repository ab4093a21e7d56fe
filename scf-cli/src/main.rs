use std::{fs, path::PathBuf, time::Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use scf_core::{
    basis::{BasisFunctions, BasisSet},
    config::{ConfigBasisSet, ConfigMolecule},
    hf::{HartreeFockForce, ListenerResult, ScfConfig, ScfDriver, ScfEvent, ScfResult, ScfType},
    molecule::Molecule,
    property::{ElectronDensity, Grid, OneElectronProperty},
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: QcCommand,
}

#[derive(clap::Args, Debug)]
struct ScfArgs {
    /// A Basis Set Exchange json file with the basis set to use
    #[arg(long, short)]
    basis_set: PathBuf,
    /// A json file with the molecule to perform the calculation on, positions in bohr
    #[arg(long, short)]
    molecule: PathBuf,
    /// A json file with scf settings, command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// The method to run, e.g. hf, hf-direct or mp2
    #[arg(long)]
    method: Option<ScfType>,
    /// The maximum number of iterations the SCF loop should attempt before giving up
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Converged once the energy changes by less than this between iterations
    #[arg(long)]
    energy_tolerance: Option<f64>,
    /// Converged once the density rms changes by less than this between iterations
    #[arg(long)]
    density_tolerance: Option<f64>,
    /// The charge of the molecule
    #[arg(long, short)]
    charge: Option<i32>,
    /// Number of worker threads
    #[arg(long, short)]
    workers: Option<usize>,
    /// Accelerate convergence with DIIS
    #[arg(long)]
    diis: bool,
}

#[derive(Subcommand, Debug)]
enum QcCommand {
    /// Runs the scf loop and prints energies
    #[command(name = "scf")]
    SelfConsistentField {
        #[command(flatten)]
        scf: ScfArgs,
        /// Also compute the force on every nucleus
        #[arg(long)]
        forces: bool,
    },
    /// Runs the scf loop and writes the electron density on a grid around the molecule
    #[command(name = "density")]
    ElectronDensity {
        #[command(flatten)]
        scf: ScfArgs,
        /// Distance between grid points in bohr
        #[arg(long, default_value_t = 0.2)]
        spacing: f64,
        /// Space around the outermost atoms in bohr
        #[arg(long, default_value_t = 4.0)]
        padding: f64,
        /// Where to write the grid as json
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct DensityOutput {
    grid: Grid,
    values: Vec<f64>,
}

impl ScfArgs {
    fn load(&self) -> anyhow::Result<(Molecule, BasisSet, ScfConfig)> {
        let molecule = ConfigMolecule::from_json(&fs::read_to_string(&self.molecule)?)
            .with_context(|| format!("reading molecule {}", self.molecule.display()))?;
        let basis_set = ConfigBasisSet::from_json(&fs::read_to_string(&self.basis_set)?)
            .with_context(|| format!("reading basis set {}", self.basis_set.display()))?;

        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)
                .with_context(|| format!("reading scf config {}", path.display()))?,
            None => ScfConfig::default(),
        };
        if let Some(method) = self.method {
            config.scf_type = method;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(energy_tolerance) = self.energy_tolerance {
            config.energy_tolerance = energy_tolerance;
        }
        if let Some(density_tolerance) = self.density_tolerance {
            config.density_tolerance = density_tolerance;
        }
        if let Some(charge) = self.charge {
            config.molecular_charge = charge;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config.diis |= self.diis;

        Ok((molecule, basis_set, config))
    }
}

fn report(result: &ScfResult, start: Instant) {
    if result.is_converged() {
        println!(
            "hartree fock converged after {} iterations and {:0.2?}",
            result.iterations,
            start.elapsed()
        );
    } else {
        println!(
            "hartree fock did not converge within {} iterations ({:0.2?}), \
             reporting the last iteration",
            result.iterations,
            start.elapsed()
        );
    }
    println!("electronic energy: {:3.8}", result.electronic_energy);
    println!("nuclear repulsion energy: {:3.8}", result.nuclear_repulsion);
    println!("hartree fock energy: {:3.8}", result.energy);
    println!("orbital energies: {:3.4?}", result.orbital_energies());
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args: Args = Args::parse();

    match args.command {
        QcCommand::SelfConsistentField { scf, forces } => {
            let (molecule, basis_set, config) = scf.load()?;
            let basis = BasisFunctions::new(molecule.atoms(), basis_set.name(), &basis_set)?;

            let start = Instant::now();
            let mut driver = ScfDriver::new(&molecule, &basis, config)?;
            driver.subscribe(|event: &ScfEvent| -> ListenerResult {
                log::debug!(
                    "{:?} after iteration {}: {:3.8}",
                    event.kind,
                    event.iteration,
                    event.energy
                );
                Ok(())
            });
            let result = driver.run()?;
            report(&result, start);

            if forces {
                let forces = HartreeFockForce::new(&driver, &result)?.forces()?;
                for (atom, force) in molecule.atoms().iter().zip(&forces) {
                    println!(
                        "force on {} {}: [{:3.6}, {:3.6}, {:3.6}]",
                        atom.symbol(),
                        atom.index(),
                        force.x,
                        force.y,
                        force.z
                    );
                }
            }
        }

        QcCommand::ElectronDensity {
            scf,
            spacing,
            padding,
            output,
        } => {
            if !(spacing > 0.0) {
                bail!("grid spacing must be positive, got {spacing}");
            }

            let (molecule, basis_set, config) = scf.load()?;
            let basis = BasisFunctions::new(molecule.atoms(), basis_set.name(), &basis_set)?;

            let start = Instant::now();
            let mut driver = ScfDriver::new(&molecule, &basis, config)?;
            let result = driver.run()?;
            report(&result, start);

            let (min, max) = molecule.atoms().iter().fold(
                (Vector3::repeat(f64::INFINITY), Vector3::repeat(f64::NEG_INFINITY)),
                |(min, max), atom| (min.inf(atom.position()), max.sup(atom.position())),
            );
            let padding = Vector3::repeat(padding);
            let grid = Grid::covering(min - padding, max + padding, spacing);

            let density = ElectronDensity::from_result(&basis, &result)?;
            let values = density.compute_grid(&grid, driver.partitioner())?;
            let electrons = values.iter().sum::<f64>() * grid.cell_volume();
            println!(
                "{} grid points, integrated electron count {electrons:3.4}",
                values.len()
            );

            fs::write(&output, serde_json::to_string(&DensityOutput { grid, values })?)
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    Ok(())
}
