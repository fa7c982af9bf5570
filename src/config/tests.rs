//! Configuration tests

use super::*;
use catalog_generator::PublishTarget;
use rstest::rstest;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn source(cluster: &str) -> Source {
    Source {
        cluster: cluster.to_string(),
        url: None,
        path: PathBuf::from(format!("./manifests/{cluster}")),
    }
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config, parsed);
}

#[test]
fn test_config_from_file() {
    let mut config = Config::default();
    config.sources.push(source("prod"));
    config.generation.publish.target = PublishTarget::Gitlab;
    config.output.format = OutputFormat::Json;

    let temp_file = NamedTempFile::new().unwrap();
    config.save_to_file(temp_file.path()).unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config, loaded);
}

#[test]
fn test_minimal_file_gets_defaults() {
    let yaml = r#"
version: "1.0"
sources:
  - cluster: prod
    path: ./manifests
generation:
  name_prefix: team-
  publish:
    target: bitbucketCloud
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.generation.name_prefix, "team-");
    assert_eq!(config.generation.publish.target, PublishTarget::BitbucketCloud);
    assert_eq!(config.generation.publish.target_branch, "main");
    assert_eq!(config.generation.annotation_prefix, "terasky.backstage.io");
    assert_eq!(config.output, OutputConfig::default());
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_err());

    config.sources.push(source("prod"));
    assert!(config.validate().is_ok());

    config.sources.push(source("prod"));
    assert!(config.validate().is_err());

    config.sources.pop();
    config.version = "2.0".to_string();
    assert!(config.validate().is_err());
}

#[rstest]
#[case("yaml", Some(OutputFormat::Yaml))]
#[case("yml", Some(OutputFormat::Yaml))]
#[case("json", Some(OutputFormat::Json))]
#[case("toml", None)]
fn test_output_format_parsing(#[case] input: &str, #[case] expected: Option<OutputFormat>) {
    assert_eq!(input.parse::<OutputFormat>().ok(), expected);
}
