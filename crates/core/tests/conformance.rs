//! Conformance suite runner.
//!
//! Every `conformance/positive/*.ccraft` must compile to exactly its
//! `.expected.json`; every `conformance/negative/*.ccraft` must fail with
//! exactly its `.expected-error.json`. Both run against the shipped canon.

use codecraft_core::{parse_ritual, PipelineOptions};
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn options() -> PipelineOptions {
    PipelineOptions {
        canon_path: Some(workspace_root().join("lexicon/canon.lock.yaml")),
        ..PipelineOptions::default()
    }
}

fn rituals(dir: &str) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(workspace_root().join("conformance").join(dir))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "ccraft"))
        .collect();
    paths.sort();
    paths
}

fn expected(ritual: &Path, suffix: &str) -> serde_json::Value {
    let stem = ritual.file_stem().unwrap().to_string_lossy();
    let path = ritual.with_file_name(format!("{}{}", stem, suffix));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing {}: {}", path.display(), e));
    serde_json::from_str(&text).unwrap()
}

#[test]
fn positive_rituals_match_expected_output() {
    let cases = rituals("positive");
    assert!(!cases.is_empty());

    let mut failures = Vec::new();
    for ritual in &cases {
        let want = expected(ritual, ".expected.json");
        match parse_ritual(ritual, &options()) {
            Ok(out) if out.to_json_value() == want => {}
            Ok(out) => failures.push(format!(
                "{}: got {}",
                ritual.display(),
                serde_json::to_string_pretty(&out).unwrap()
            )),
            Err(e) => failures.push(format!("{}: unexpected error: {}", ritual.display(), e)),
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n\n"));
}

#[test]
fn negative_rituals_match_expected_error() {
    let cases = rituals("negative");
    assert!(!cases.is_empty());

    let mut failures = Vec::new();
    for ritual in &cases {
        let want = expected(ritual, ".expected-error.json");
        match parse_ritual(ritual, &options()) {
            Err(e) if e.to_json_value() == want => {}
            Err(e) => failures.push(format!(
                "{}: got {}",
                ritual.display(),
                serde_json::to_string_pretty(&e.to_json_value()).unwrap()
            )),
            Ok(_) => failures.push(format!("{}: compiled but should fail", ritual.display())),
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n\n"));
}

#[test]
fn shipped_canon_lists_twenty_schools() {
    let provider = codecraft_core::source::FileSystemProvider;
    let rules = codecraft_core::CanonRules::load(
        &workspace_root().join("lexicon/canon.lock.yaml"),
        &provider,
    )
    .unwrap()
    .expect("canon present");
    assert_eq!(rules.schools().len(), 20);
    assert!(rules.has_school("necromancy"));
    assert!(rules.operations_for("web").unwrap().contains("render"));
}
