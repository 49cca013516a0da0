use anyhow::Result;
use sponsor_auth::config::Config;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let mut config = Config::default();
    config.service.port = 8081;
    config.service.address = "192.168.1.1".to_string();
    config.token.issuer = "staging".to_string();
    config.token.validity_secs = 600;
    config.keys.private_key_path = PathBuf::from("/etc/sponsor/private_key.pem");

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;

    // Verify loaded config matches original
    assert_eq!(loaded_config.service.port, 8081);
    assert_eq!(loaded_config.service.address, "192.168.1.1");
    assert_eq!(loaded_config.token.issuer, "staging");
    assert_eq!(loaded_config.token.validity_secs, 600);
    assert_eq!(
        loaded_config.keys.private_key_path,
        PathBuf::from("/etc/sponsor/private_key.pem")
    );

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config.service.port, 8080);
    assert_eq!(default_config.service.address, "127.0.0.1");
    assert_eq!(default_config.token.algorithm, "RS256");
    assert!(default_config.keys.cache);

    // Test apply_args method
    let mut config = Config::default();
    config.apply_args(Some(9000), Some("192.168.0.1".to_string()));
    assert_eq!(config.service.port, 9000);
    assert_eq!(config.service.address, "192.168.0.1");

    // None values leave the configuration untouched
    config.apply_args(None, None);
    assert_eq!(config.service.port, 9000);

    Ok(())
}

#[test]
fn test_config_validation() -> Result<()> {
    // Valid default config
    let valid_config = Config::default();
    assert!(valid_config.validate().is_ok());

    // Unsupported algorithm
    let mut invalid_algorithm = Config::default();
    invalid_algorithm.token.algorithm = "HS256".to_string();
    assert!(invalid_algorithm.validate().is_err());

    // Zero validity would make expiry equal to issued-at
    let mut zero_validity = Config::default();
    zero_validity.token.validity_secs = 0;
    assert!(zero_validity.validate().is_err());

    // Windows beyond the supported maximum would wrap or overflow the
    // expiry arithmetic
    let mut wrapping_validity = Config::default();
    wrapping_validity.token.validity_secs = u64::MAX;
    assert!(wrapping_validity.validate().is_err());

    let mut huge_validity = Config::default();
    huge_validity.token.validity_secs = 10_000_000_000_000_000;
    assert!(huge_validity.validate().is_err());

    // Empty allowlist is a configuration mistake, not "allow none"
    let mut empty_allowlist = Config::default();
    empty_allowlist.access.sender_allowlist = Some(vec![]);
    assert!(empty_allowlist.validate().is_err());

    Ok(())
}

#[test]
fn test_invalid_yaml_rejected_with_sample_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Unknown section fails schema validation before deserialization
    std::fs::write(&config_path, "bogus_section:\n  key: value\n")?;
    assert!(Config::from_file(&config_path).is_err());

    // A sample file is generated for the operator to edit
    assert!(temp_dir.path().join("config.sample.yaml").exists());

    Ok(())
}

#[test]
fn test_out_of_range_port_rejected() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    std::fs::write(&config_path, "service:\n  port: 0\n")?;
    assert!(Config::from_file(&config_path).is_err());

    Ok(())
}
