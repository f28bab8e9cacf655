use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const PIPELINE: &str = r#"
name: nordic
settings:
  inputDirectory: incoming
  outputDirectory: archive
  workers: 2
  retry:
    maxAttempts: 2
    delayMillis: 1
transformers:
  - type: trim
    config: { collapseWhitespace: true }
  - type: replace
    name: strip-auto
    when: { type: kind, config: { kinds: [METAR, SPECI] } }
    config: { regex: "AUTO ", replacement: "" }
actions:
  - type: archive
    config: { directory: all }
  - type: archive
    name: helsinki
    when: { type: station, config: { stations: EFHK } }
    config: { directory: efhk, extension: tac }
"#;

fn write_project(dir: &Path, pipeline: &str) -> String {
    let config = dir.join("metforge.yaml");
    std::fs::write(&config, pipeline).unwrap();
    config.to_str().unwrap().to_string()
}

#[test]
fn test_validate_accepts_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), PIPELINE);

    cargo_bin_cmd!("metforge")
        .args(["--config", &config, "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline 'nordic' is valid"));
}

#[test]
fn test_validate_rejects_unknown_option() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(
        dir.path(),
        &PIPELINE.replace("collapseWhitespace", "collapse"),
    );

    cargo_bin_cmd!("metforge")
        .args(["--config", &config, "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("collapse"));
}

#[test]
fn test_show_prints_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), PIPELINE);

    cargo_bin_cmd!("metforge")
        .args(["--config", &config, "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# PipelineSettings"))
        .stdout(predicate::str::contains("inputDirectory: incoming"))
        .stdout(predicate::str::contains("maxAttempts: 2"))
        .stdout(predicate::str::is_match("# fingerprint: [0-9a-f]{64}").unwrap());
}

#[test]
fn test_schemas_lists_builtins() {
    cargo_bin_cmd!("metforge")
        .arg("schemas")
        .assert()
        .success()
        .stdout(predicate::str::contains("regex_replace [limit, pattern, replacement]"))
        .stdout(predicate::str::contains("station [invert, stations]"))
        .stdout(predicate::str::contains("archive [directory, extension]"));
}

#[test]
fn test_run_archives_bulletins() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), PIPELINE);
    let incoming = dir.path().join("incoming");
    std::fs::create_dir(&incoming).unwrap();
    std::fs::write(
        incoming.join("0410.txt"),
        "METAR EFHK 041020Z AUTO 22005KT 9999 FEW030 M02/M05 Q1012=\n\
         TAF   ESSA 041100Z 0412/0512 24010KT CAVOK=\n",
    )
    .unwrap();
    std::fs::write(incoming.join("ignored.md"), "METAR EFHK 041050Z=").unwrap();

    cargo_bin_cmd!("metforge")
        .args(["--config", &config, "run", "--workers", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Processed 2 bulletins from 1 files: 3 actions applied, 0 failed",
        ));

    let archive = dir.path().join("archive");
    let metar = std::fs::read_to_string(archive.join("all/METAR_EFHK.txt")).unwrap();
    assert_eq!(metar, "METAR EFHK 041020Z 22005KT 9999 FEW030 M02/M05 Q1012=\n");
    let taf = std::fs::read_to_string(archive.join("all/TAF_ESSA.txt")).unwrap();
    assert_eq!(taf, "TAF ESSA 041100Z 0412/0512 24010KT CAVOK=\n");
    assert!(archive.join("efhk/METAR_EFHK.tac").exists());
    assert!(!archive.join("efhk/TAF_ESSA.tac").exists());
}

#[test]
fn test_run_requires_input_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), PIPELINE);

    cargo_bin_cmd!("metforge")
        .args(["--config", &config, "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input directory not found"));
}
