use std::collections::HashMap;

use tempfile::TempDir;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_generator_config_default() {
    let config = GeneratorConfig::default();
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.hardhat.program, "npx");
    assert_eq!(config.hardhat.base_args, vec!["hardhat"]);
    assert_eq!(config.queue.remove_on_complete, 60);
    assert_eq!(config.queue.remove_on_fail, 60);
    assert_eq!(config.queue.timeout_secs, 3600);
    assert!(config.queue.lifo);
    assert_eq!(config.editor.matching, MarkerMatching::Substring);
    assert!(config.chains.contains_key("JFIN"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_paths_resolve_against_root() {
    let paths = PathsConfig::rooted_at("/srv/generator");
    assert_eq!(paths.original_dir(), PathBuf::from("/srv/generator/contracts/original"));
    assert_eq!(paths.args_dir(), PathBuf::from("/srv/generator/contracts/args"));

    let absolute = PathsConfig {
        compiled: PathBuf::from("/var/artifacts"),
        ..PathsConfig::rooted_at("/srv/generator")
    };
    assert_eq!(absolute.compiled_dir(), PathBuf::from("/var/artifacts"));
}

#[test]
fn test_environment_specific_defaults() {
    let production = GeneratorConfig::for_environment(Environment::Production);
    assert_eq!(production.logging.format, "json");
    assert!(production.editor.clean_markers);

    let test = GeneratorConfig::for_environment(Environment::Test);
    assert_eq!(test.hardhat.timeout_secs, 60);
    assert!(!test.editor.clean_markers);
}

#[test]
fn test_environment_parsing() {
    assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
    assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Staging);
    assert!("qa".parse::<Environment>().is_err());
}

#[test]
fn test_config_validation() {
    let mut config = GeneratorConfig::default();
    config.logging.level = "loud".to_string();
    config.hardhat.timeout_secs = 0;
    config.paths.generated = config.paths.original.clone();

    let errors = config.validate().unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"logging.level"));
    assert!(fields.contains(&"hardhat.timeout_secs"));
    assert!(fields.contains(&"paths.generated"));
}

#[test]
fn test_clean_markers_requires_patterns() {
    let mut config = GeneratorConfig::default();
    config.editor.clean_markers = true;
    config.editor.marker_patterns.clear();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors[0].field, "editor.marker_patterns");
}

#[test]
fn test_environment_overrides() {
    let mut manager = ConfigManager::new();
    manager
        .apply_overrides_from(lookup(&[
            ("TOKEN_GENERATOR_ROOT", "/opt/tokens"),
            ("TOKEN_GENERATOR_HARDHAT_PROGRAM", "yarn"),
            ("TOKEN_GENERATOR_HARDHAT_TIMEOUT", "42"),
            ("TOKEN_GENERATOR_LOG_LEVEL", "trace"),
            ("TOKEN_GENERATOR_MARKER_MATCHING", "boundary"),
            ("TOKEN_GENERATOR_ENVIRONMENT", "staging"),
        ]))
        .unwrap();

    let config = manager.config();
    assert_eq!(config.paths.root, PathBuf::from("/opt/tokens"));
    assert_eq!(config.hardhat.program, "yarn");
    assert_eq!(config.hardhat.timeout_secs, 42);
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.editor.matching, MarkerMatching::Boundary);
    assert_eq!(config.environment, Environment::Staging);
}

#[test]
fn test_invalid_override_is_rejected() {
    let mut manager = ConfigManager::new();
    let result = manager.apply_overrides_from(lookup(&[("TOKEN_GENERATOR_HARDHAT_TIMEOUT", "soon")]));
    assert!(result.is_err());
}

#[test]
fn test_config_file_operations() {
    let temp_dir = TempDir::new().unwrap();

    for file_name in ["config.toml", "config.json", "config.yaml"] {
        let path = temp_dir.path().join(file_name);
        ConfigManager::generate_default_config(&path, Environment::Production).unwrap();
        assert!(path.exists());

        let loaded = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(loaded.config_path(), path.as_path());
        assert_eq!(loaded.config().chains.len(), 2);
        assert!(loaded.config().editor.clean_markers);
    }

    let unsupported = temp_dir.path().join("config.ini");
    assert!(ConfigManager::new().save_to_file(&unsupported).is_err());
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("token-generator.toml");
    fs::write(&path, "[hardhat]\nprogram = \"pnpm\"\n\n[queue]\nlifo = false\n").unwrap();

    let manager = ConfigManager::load_from_file(&path).unwrap();
    let config = manager.config();
    assert_eq!(config.hardhat.program, "pnpm");
    assert_eq!(config.hardhat.base_args, vec!["hardhat"]);
    assert!(!config.queue.lifo);
    assert_eq!(config.queue.timeout_secs, 3600);
}

#[test]
fn test_load_for_environment_prefers_environment_file() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("token-generator.toml");

    let missing = ConfigManager::load_for_environment(&base, Environment::Test).unwrap();
    assert_eq!(missing.config().hardhat.timeout_secs, 60);

    fs::write(&base, "[queue]\ntimeout_secs = 10\n").unwrap();
    let base_only = ConfigManager::load_for_environment(&base, Environment::Test).unwrap();
    assert_eq!(base_only.config().queue.timeout_secs, 10);

    let env_file = temp_dir.path().join("token-generator.test.toml");
    fs::write(&env_file, "[queue]\ntimeout_secs = 5\n").unwrap();
    let specific = ConfigManager::load_for_environment(&base, Environment::Test).unwrap();
    assert_eq!(specific.config().queue.timeout_secs, 5);
}
