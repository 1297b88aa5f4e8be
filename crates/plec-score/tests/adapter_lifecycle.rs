//! End-to-end adapter lifecycle over a synthetic PDBBind tree.
//!
//! Exercises descriptor generation, slow- and fast-path training, parameter
//! export, the ignore-json override, deterministic random-forest training
//! and the load-or-train factory, all inside temporary directories.

use plec_core::Molecule;
use plec_score::{LoadOptions, ModelVariant, PlecConfig, PlecScore, ScoreError, TrainOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SIZE: u32 = 256;
const DEPTH_PROTEIN: usize = 3;
const DEPTH_LIGAND: usize = 1;

fn pdb_line(
    serial: u32,
    name: &str,
    res_name: &str,
    res_seq: i32,
    coords: (f64, f64, f64),
    element: &str,
) -> String {
    format!(
        "{:<6}{:>5} {:<4}{:1}{:<3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        "ATOM", serial, name, ' ', res_name, 'A', res_seq, "", coords.0, coords.1, coords.2,
        1.00, 20.00, element
    )
}

/// Write one synthetic complex: a small peptide fragment and a two-atom
/// ligand sitting in contact range. Coordinates and elements vary with `i`
/// so every entry produces a distinct descriptor.
fn write_entry(root: &Path, id: &str, i: u32) {
    let dir = root.join("v2016").join(id);
    fs::create_dir_all(&dir).unwrap();

    let z = 0.07 * i as f64;
    let extra_element = ["S", "N", "O"][(i % 3) as usize];
    let pdb = [
        "HEADER    SYNTHETIC COMPLEX".to_string(),
        pdb_line(1, "N", "ALA", 1, (0.0, 0.0, z), "N"),
        pdb_line(2, "CA", "ALA", 1, (1.46, 0.0, z), "C"),
        pdb_line(3, "C", "ALA", 1, (2.0, 1.4, z), "C"),
        pdb_line(4, "O", "ALA", 1, (3.2, 1.5, z), "O"),
        pdb_line(5, "SG", "CYS", 2, (0.5, 1.8, z + 0.4), extra_element),
        "END".to_string(),
    ]
    .join("\n");
    fs::write(dir.join(format!("{id}_pocket.pdb")), pdb).unwrap();

    let lz = z + 1.1 + 0.05 * i as f64;
    let mol2 = format!(
        "@<TRIPOS>MOLECULE\n{id}_ligand\n 3 2 1\nSMALL\nNO_CHARGES\n@<TRIPOS>ATOM\n\
      1 C1          0.7000    0.7000 {lz:>9.4} C.3     1  LIG1        0.0000\n\
      2 O1          1.9000    0.9000 {lz2:>9.4} O.3     1  LIG1        0.0000\n\
      3 C2          2.9000    1.8000 {lz3:>9.4} C.2     1  LIG1        0.0000\n\
@<TRIPOS>BOND\n     1     1     2    1\n     2     2     3    1\n",
        lz2 = lz + 0.2,
        lz3 = lz + 0.3 + 0.02 * i as f64,
    );
    fs::write(dir.join(format!("{id}_ligand.mol2")), mol2).unwrap();
}

fn write_index(root: &Path, partition: &str, entries: &[(String, f64)]) {
    let index_dir = root.join("v2016").join("index");
    fs::create_dir_all(&index_dir).unwrap();

    let mut lines = vec![format!("# INDEX_{partition}_data.2016 (synthetic)")];
    for (id, affinity) in entries {
        lines.push(format!("{id}  2.00  2015  {affinity:.2}  Kd=1nM  // lig"));
    }
    fs::write(
        index_dir.join(format!("INDEX_{partition}_data.2016")),
        lines.join("\n"),
    )
    .unwrap();
}

/// Build the synthetic benchmark: 10 refined, 6 general and 4 core entries.
fn setup_benchmark(root: &Path) {
    let affinity = |i: u32| 3.0 + (i % 7) as f64 * 0.55;

    let mut refined = Vec::new();
    for i in 0..10u32 {
        let id = format!("1r{i:02}");
        write_entry(root, &id, i);
        refined.push((id, affinity(i)));
    }
    write_index(root, "refined", &refined);

    let mut general = Vec::new();
    for i in 0..6u32 {
        let id = format!("2g{i:02}");
        write_entry(root, &id, i + 10);
        general.push((id, affinity(i + 10)));
    }
    write_index(root, "general", &general);

    let mut core = Vec::new();
    for i in 0..4u32 {
        let id = format!("3c{i:02}");
        write_entry(root, &id, i + 16);
        core.push((id, affinity(i + 16)));
    }
    write_index(root, "core", &core);
}

fn test_config(variant: ModelVariant) -> PlecConfig {
    PlecConfig {
        protein: None,
        n_jobs: 1,
        variant,
        depth_protein: DEPTH_PROTEIN,
        depth_ligand: DEPTH_LIGAND,
        size: SIZE,
    }
}

/// Generate the descriptor CSV once and return (benchmark root, home dir, csv path)
fn generated_home(variant: ModelVariant) -> (TempDir, TempDir, PathBuf) {
    let benchmark = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    setup_benchmark(benchmark.path());

    let scorer = PlecScore::new(test_config(variant)).unwrap();
    let csv_path = scorer
        .gen_training_data(benchmark.path(), &[2016], home.path())
        .unwrap();
    (benchmark, home, csv_path)
}

fn probe_pair(benchmark_root: &Path) -> (Molecule, Molecule) {
    let dir = benchmark_root.join("v2016").join("3c00");
    let protein = Molecule::from_pdb_file(&dir.join("3c00_pocket.pdb")).unwrap();
    let ligand = Molecule::from_mol2_file(&dir.join("3c00_ligand.mol2")).unwrap();
    (protein, ligand)
}

#[test]
fn gen_training_data_writes_the_deterministic_csv() {
    let (_benchmark, home, csv_path) = generated_home(ModelVariant::Linear);

    assert_eq!(
        csv_path,
        home.path().join(format!(
            "plecscore_descs_p{DEPTH_PROTEIN}_l{DEPTH_LIGAND}_s{SIZE}.csv"
        ))
    );
    assert!(csv_path.is_file());

    // the table must split into 16 train rows and the 4 core test rows
    let scorer = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    let split = scorer.scorer().load_pdbbind_descriptors(&csv_path).unwrap();
    assert_eq!(split.train_descs.len(), 16);
    assert_eq!(split.test_descs.len(), 4);
    assert!(split.train_descs.iter().all(|d| d.nnz() > 0));
}

#[test]
fn slow_path_trains_and_persists_at_the_deterministic_name() {
    let (benchmark, home, _csv) = generated_home(ModelVariant::Linear);

    let mut scorer = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    let artifact = scorer
        .train(&TrainOptions::new(home.path()))
        .unwrap()
        .expect("slow path must persist an artifact");

    assert_eq!(
        artifact,
        home.path().join(format!(
            "PLEClinear_p{DEPTH_PROTEIN}_l{DEPTH_LIGAND}_pdbbind2016_s{SIZE}.bin"
        ))
    );
    assert!(scorer.is_fitted());

    let (protein, ligand) = probe_pair(benchmark.path());
    assert!(scorer.predict(&protein, &ligand).unwrap().is_finite());
}

#[test]
fn rf_training_is_deterministic() {
    let (_benchmark, home, _csv) = generated_home(ModelVariant::RandomForest);

    let train_once = |artifact_name: &str| -> Vec<u8> {
        let mut scorer = PlecScore::new(test_config(ModelVariant::RandomForest)).unwrap();
        let path = home.path().join(artifact_name);
        scorer
            .train(&TrainOptions {
                home_dir: home.path().to_path_buf(),
                artifact_path: Some(path.clone()),
                pdbbind_version: 2016,
                ignore_json: false,
            })
            .unwrap();
        fs::read(path).unwrap()
    };

    // identical seed + identical descriptors => byte-identical artifacts,
    // which pins the OOB and test-set metrics as well
    let first = train_once("run_a.bin");
    let second = train_once("run_b.bin");
    assert_eq!(first, second);
}

#[test]
fn linear_json_export_round_trips_without_retraining() {
    let (benchmark, home, _csv) = generated_home(ModelVariant::Linear);

    let mut trained = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    trained.train(&TrainOptions::new(home.path())).unwrap();
    let json_path = trained.gen_json(home.path(), 2016).unwrap();

    assert_eq!(
        json_path.file_name().unwrap().to_str().unwrap(),
        format!("plecscore_linear_p{DEPTH_PROTEIN}_l{DEPTH_LIGAND}_s{SIZE}_pdbbind2016.json")
    );

    // a home containing only the JSON document: the fast path must restore
    // the exact weights without touching any dataset
    let json_only_home = TempDir::new().unwrap();
    fs::copy(
        &json_path,
        json_only_home.path().join(json_path.file_name().unwrap()),
    )
    .unwrap();

    let mut restored = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    let outcome = restored
        .train(&TrainOptions::new(json_only_home.path()))
        .unwrap();
    assert!(outcome.is_none(), "fast path must not persist an artifact");
    assert!(restored.is_fitted());

    let (protein, ligand) = probe_pair(benchmark.path());
    assert_eq!(
        trained.predict(&protein, &ligand).unwrap(),
        restored.predict(&protein, &ligand).unwrap()
    );
}

#[test]
fn ignore_json_forces_the_slow_path() {
    let (_benchmark, home, _csv) = generated_home(ModelVariant::Linear);

    let mut trained = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    trained.train(&TrainOptions::new(home.path())).unwrap();
    let json_path = trained.gen_json(home.path(), 2016).unwrap();

    // JSON present but no descriptor CSV: with ignore_json the dataset
    // loader must run and fail with file-not-found
    let json_only_home = TempDir::new().unwrap();
    fs::copy(
        &json_path,
        json_only_home.path().join(json_path.file_name().unwrap()),
    )
    .unwrap();

    let mut scorer = PlecScore::new(test_config(ModelVariant::Linear)).unwrap();
    let err = scorer
        .train(&TrainOptions {
            home_dir: json_only_home.path().to_path_buf(),
            artifact_path: None,
            pdbbind_version: 2016,
            ignore_json: true,
        })
        .unwrap_err();

    match err {
        ScoreError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected a file-not-found error, got {other}"),
    }
}

#[test]
fn load_without_artifact_trains_a_usable_scorer() {
    let (benchmark, home, _csv) = generated_home(ModelVariant::Linear);

    let loaded = PlecScore::load(LoadOptions {
        path: None,
        home_dir: home.path().to_path_buf(),
        variant: ModelVariant::Linear,
        depth_protein: DEPTH_PROTEIN,
        depth_ligand: DEPTH_LIGAND,
        size: SIZE,
        pdbbind_version: 2016,
    })
    .unwrap();

    assert!(loaded.is_fitted());
    assert_eq!(
        loaded.score_title(),
        format!("PLEClinear_p{DEPTH_PROTEIN}_l{DEPTH_LIGAND}")
    );

    // the full train cycle must have left the deterministic artifact behind
    let artifact = home.path().join(format!(
        "PLEClinear_p{DEPTH_PROTEIN}_l{DEPTH_LIGAND}_pdbbind2016_s{SIZE}.bin"
    ));
    assert!(artifact.is_file());

    let (protein, ligand) = probe_pair(benchmark.path());
    assert!(loaded.predict(&protein, &ligand).unwrap().is_finite());

    // a second load now takes the artifact path and agrees exactly
    let reloaded = PlecScore::load(LoadOptions {
        path: Some(artifact),
        home_dir: home.path().to_path_buf(),
        variant: ModelVariant::Linear,
        depth_protein: DEPTH_PROTEIN,
        depth_ligand: DEPTH_LIGAND,
        size: SIZE,
        pdbbind_version: 2016,
    })
    .unwrap();
    assert_eq!(
        loaded.predict(&protein, &ligand).unwrap(),
        reloaded.predict(&protein, &ligand).unwrap()
    );
}
