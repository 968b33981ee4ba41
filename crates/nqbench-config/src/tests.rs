//! Tests for harness configuration.

use std::io::Write;

use nqbench_core::{DiagramFamily, OutputFormat, WorkerSupport};

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        sizes = [4, 5, 6]
        workers = [0, 2]
        targets = ["sylvan"]
        output = "out/metrics.csv"
        timeout_secs = 30
        skip_build = true
        node_tolerance = 0.05

        [[target]]
        id = "oxidd"
        language = "Rust"
        run = "{root}/oxidd/nqueens --threads {workers} {size}"
        workers = "explicit"
        family = "ndd"
        env = { LD_LIBRARY_PATH = "{root}/oxidd/lib:${LD_LIBRARY_PATH}" }

        [[target.build]]
        command = "cargo build --release -j{jobs}"
        cwd = "oxidd"
        creates = "oxidd/target/release/nqueens"
    "#;

    let config = HarnessConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.sizes, vec![4, 5, 6]);
    assert_eq!(config.workers, vec![0, 2]);
    assert_eq!(config.targets, vec!["sylvan".to_string()]);
    assert_eq!(config.output, PathBuf::from("out/metrics.csv"));
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert!(config.skip_build);

    let target = &config.registry[0];
    assert_eq!(target.workers, WorkerSupport::Explicit);
    assert_eq!(target.family, DiagramFamily::Ndd);
    assert_eq!(target.output, OutputFormat::structured_log());
    assert_eq!(target.build.len(), 1);
    assert_eq!(target.build[0].cwd, Some(PathBuf::from("oxidd")));
    assert!(target.env.contains_key("LD_LIBRARY_PATH"));
    config.validate().unwrap();
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        sizes: [8]
        timeout_secs: 45
        target:
          - id: jdd
            language: Java
            run: "java -cp {root}/jdd/jdd.jar NQueens {size}"
            output:
              kind: absent
    "#;

    let config = HarnessConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.sizes, vec![8]);
    assert_eq!(config.workers, vec![0]);
    assert_eq!(config.timeout_secs, 45);
    assert_eq!(config.registry[0].output, OutputFormat::Absent);
}

#[test]
fn test_unknown_fields_rejected() {
    let err = HarnessConfig::from_toml_str("size = [4]").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_defaults() {
    let config = HarnessConfig::from_toml_str("").unwrap();
    assert_eq!(config.sizes, (4..=12).collect::<Vec<_>>());
    assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.kill_grace(), Duration::from_secs(2));
    assert!(config.registry.is_empty());
    config.validate().unwrap();
}

#[test]
fn test_builder() {
    let config = HarnessConfig::new()
        .with_sizes([6, 7])
        .with_workers([1])
        .with_targets(["buddy", "cudd"])
        .with_timeout_secs(5)
        .with_root("/opt/bench");

    assert_eq!(config.sizes, vec![6, 7]);
    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.root, Some(PathBuf::from("/opt/bench")));
}

#[test]
fn test_validation_errors() {
    let cases = [
        HarnessConfig::new().with_sizes([]),
        HarnessConfig::new().with_sizes([0, 4]),
        HarnessConfig::new().with_workers([]),
        HarnessConfig::new().with_timeout_secs(0),
        HarnessConfig::new().with_output(""),
        HarnessConfig {
            node_tolerance: -1.0,
            ..HarnessConfig::default()
        },
        HarnessConfig {
            replace_builtin: true,
            ..HarnessConfig::default()
        },
    ];
    for config in cases {
        assert!(
            matches!(config.validate(), Err(ConfigError::Invalid(_))),
            "{config:?}"
        );
    }
}

#[test]
fn test_invalid_target_rejected() {
    let bad = Target::new("has space", "C", "./run {size}");
    let err = HarnessConfig::new().with_target(bad).validate().unwrap_err();
    assert!(err.to_string().contains("has space"));

    let dup = Target::new("x", "C", "./x {size}");
    let err = HarnessConfig::new()
        .with_target(dup.clone())
        .with_target(dup)
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_duplicate_ids_differing_in_case_rejected() {
    let err = HarnessConfig::new()
        .with_target(Target::new("mybdd", "C", "./lower {size}"))
        .with_target(Target::new("MyBDD", "C", "./upper {size}"))
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("'MyBDD' is defined more than once"), "{err}");
}

#[test]
fn test_format_from_extension() {
    assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
    assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), ConfigFormat::Yaml);
    assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
    assert_eq!(ConfigFormat::from_path(Path::new("bench")), ConfigFormat::Toml);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.yml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "sizes: [5, 6]\nworkers: [1]").unwrap();

    let config = HarnessConfig::load(&path).unwrap();
    assert_eq!(config.sizes, vec![5, 6]);

    let missing = HarnessConfig::load(dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));
}

#[test]
fn test_resolve_path() {
    let config = HarnessConfig::default();
    let root = Path::new("/opt/bench");
    assert_eq!(
        config.resolve_path(root, Path::new("results/x.csv")),
        PathBuf::from("/opt/bench/results/x.csv")
    );
    assert_eq!(
        config.resolve_path(root, Path::new("/tmp/x.csv")),
        PathBuf::from("/tmp/x.csv")
    );
}
