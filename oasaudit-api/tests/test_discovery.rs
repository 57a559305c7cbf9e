//! Integration tests for repository discovery

mod common;

use common::fixtures::*;
use oasaudit_api::{
    ContractClassifier, ContractDiscoverer, DiscoverContractsUseCase, DiscoveryError,
    DiscoveryOptions, SkipReason,
};
use tempfile::TempDir;

fn discoverer(options: DiscoveryOptions) -> ContractDiscoverer {
    ContractDiscoverer::new(options).unwrap()
}

#[test]
fn test_discovers_only_json_and_yaml_in_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "c.txt", "openapi: 3.0.0");
    write(dir.path(), "b.json", swagger_20_json());
    write(dir.path(), "a.yaml", openapi_30_yaml());

    let files = discoverer(DiscoveryOptions::default())
        .discover(dir.path())
        .unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(paths, ["a.yaml", "b.json"]);
}

#[test]
fn test_scenario_two_contracts_and_a_text_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.yaml", openapi_30_yaml());
    write(dir.path(), "b.json", swagger_20_json());
    write(dir.path(), "c.txt", "not a contract");

    let use_case = DiscoverContractsUseCase::new(
        discoverer(DiscoveryOptions::default()),
        ContractClassifier::new(),
    );
    let report = use_case.execute(dir.path()).unwrap();

    assert_eq!(report.discovered, 2);
    let contracts: Vec<&str> = report.contracts.iter().map(|c| c.relative_path()).collect();
    assert_eq!(contracts, ["a.yaml", "b.json"]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.ignored, 0);
}

#[test]
fn test_nested_paths_sort_lexicographically() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "api/v2/spec.yaml", openapi_30_yaml());
    write(dir.path(), "api.json", swagger_20_json());
    write(dir.path(), "api/v1/spec.yml", openapi_30_yaml());

    let files = discoverer(DiscoveryOptions::default())
        .discover(dir.path())
        .unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(paths, ["api.json", "api/v1/spec.yml", "api/v2/spec.yaml"]);
}

#[test]
fn test_default_excludes_prune_dependency_dirs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "node_modules/lib/openapi.json", swagger_20_json());
    write(dir.path(), "sub/.git/config.json", "{}");
    write(dir.path(), "specs/openapi.yaml", openapi_30_yaml());

    let files = discoverer(DiscoveryOptions::default())
        .discover(dir.path())
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].relative_path, "specs/openapi.yaml");
}

#[test]
fn test_include_and_exclude_globs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "specs/public.yaml", openapi_30_yaml());
    write(dir.path(), "specs/internal/private.yaml", openapi_30_yaml());
    write(dir.path(), "config/app.json", package_json());

    let options = DiscoveryOptions {
        include: vec!["specs/**".to_string()],
        exclude: vec!["**/internal".to_string()],
        ..DiscoveryOptions::default()
    };
    let files = discoverer(options).discover(dir.path()).unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(paths, ["specs/public.yaml"]);
}

#[test]
fn test_oversized_and_binary_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "big.json", &format!("{{\"pad\": \"{}\"}}", "x".repeat(2048)));
    write(dir.path(), "small.yaml", openapi_30_yaml());
    std::fs::write(dir.path().join("blob.json"), [0x7b, 0x00, 0x7d]).unwrap();

    let options = DiscoveryOptions {
        max_file_size: 1024,
        ..DiscoveryOptions::default()
    };
    let files = discoverer(options).discover(dir.path()).unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(paths, ["small.yaml"]);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");

    let result = discoverer(DiscoveryOptions::default()).discover(&missing);
    assert!(matches!(result, Err(DiscoveryError::RootNotFound(_))));
}

#[test]
fn test_single_file_root() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "openapi.yaml", openapi_30_yaml());

    let files = discoverer(DiscoveryOptions::default())
        .discover(&dir.path().join("openapi.yaml"))
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].relative_path, "openapi.yaml");
}

#[test]
fn test_unsupported_and_incomplete_are_reported_not_audited() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "new.yaml", openapi_31_yaml());
    write(dir.path(), "partial.json", openapi_30_missing_paths());
    write(dir.path(), "package.json", package_json());
    write(dir.path(), "docker-compose.yml", compose_yaml());
    write(dir.path(), "ok.yaml", openapi_30_yaml());

    let use_case = DiscoverContractsUseCase::new(
        discoverer(DiscoveryOptions::default()),
        ContractClassifier::new(),
    );
    let report = use_case.execute(dir.path()).unwrap();

    assert_eq!(report.discovered, 5);
    assert_eq!(report.contracts.len(), 1);
    assert_eq!(report.ignored, 2);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].path, "new.yaml");
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::UnsupportedVersion {
            version: "3.1.0".to_string()
        }
    );
    assert_eq!(report.skipped[1].path, "partial.json");
    assert_eq!(
        report.skipped[1].reason,
        SkipReason::Incomplete {
            missing: vec!["paths".to_string()]
        }
    );
}
