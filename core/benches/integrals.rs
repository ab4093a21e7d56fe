use criterion::{criterion_group, criterion_main, Criterion};
use scf_core::{
    basis::BasisFunctions,
    hf::form_gmatrix,
    integrals::{OneElectronIntegrals, TwoElectronIntegrals, TwoElectronTerm},
    molecule::Molecule,
    nalgebra::DMatrix,
    parallel::Partitioner,
    testing,
};

struct Instance {
    name: String,
    molecule: Molecule,
    basis: BasisFunctions,
}

fn instances() -> Vec<Instance> {
    let library = testing::basis_library();
    let mut instances = Vec::new();

    for (molecule_name, molecule) in [
        ("hydrogen", testing::hydrogen_molecule()),
        ("water", testing::water()),
    ] {
        for basis_name in ["STO-3G", "6-31G"] {
            let basis = BasisFunctions::new(molecule.atoms(), basis_name, &library)
                .expect("fixture basis covers the fixture molecules");
            instances.push(Instance {
                name: format!("{molecule_name} {basis_name}"),
                molecule: Molecule::new(molecule.atoms().iter().cloned()),
                basis,
            });
        }
    }

    instances
}

fn bench_one_electron(c: &mut Criterion) {
    let partitioner = Partitioner::with_available_parallelism().unwrap();

    for instance in instances() {
        c.bench_function(&format!("One electron {}", instance.name), |b| {
            b.iter(|| {
                OneElectronIntegrals::new(&instance.basis, instance.molecule.atoms(), &partitioner)
                    .unwrap()
            })
        });
    }
}

fn bench_electron_repulsion(c: &mut Criterion) {
    let partitioner = Partitioner::with_available_parallelism().unwrap();

    for instance in instances() {
        c.bench_function(&format!("Electron repulsion {}", instance.name), |b| {
            b.iter(|| {
                TwoElectronIntegrals::precomputed(
                    &instance.basis,
                    TwoElectronTerm::Hgp,
                    &partitioner,
                )
                .unwrap()
            })
        });
    }
}

fn bench_gmatrix(c: &mut Criterion) {
    let partitioner = Partitioner::with_available_parallelism().unwrap();

    for instance in instances() {
        let n = instance.basis.len();
        let density = DMatrix::from_fn(n, n, |i, j| 1.0 / (1.0 + (i + j) as f64));

        let precomputed =
            TwoElectronIntegrals::precomputed(&instance.basis, TwoElectronTerm::Hgp, &partitioner)
                .unwrap();
        c.bench_function(&format!("GMatrix precomputed {}", instance.name), |b| {
            b.iter(|| form_gmatrix(&precomputed, &instance.basis, &density, &partitioner).unwrap())
        });

        let direct =
            TwoElectronIntegrals::direct(&instance.basis, TwoElectronTerm::Hgp, 1e-12, &partitioner)
                .unwrap();
        c.bench_function(&format!("GMatrix direct {}", instance.name), |b| {
            b.iter(|| form_gmatrix(&direct, &instance.basis, &density, &partitioner).unwrap())
        });
    }
}

criterion_group!(
    benches,
    bench_one_electron,
    bench_electron_repulsion,
    bench_gmatrix
);
criterion_main!(benches);
