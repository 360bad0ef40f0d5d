//! 配置模块单元测试

use std::collections::HashMap;

use crate::util::config::{load_config, save_config, ConfigError, RuntimeConfig};
use crate::util::logger::LogLevel;

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert!(!config.pool.enabled);
        assert_eq!(config.pool.unit_capacity, 200);
        assert_eq!(config.pool.adapter_capacity, 80);
        assert_eq!(config.coroutine.origin_tracking_depth, 0);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [pool]
            enabled = true

            [coroutine]
            origin_tracking_depth = 3

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(config.pool.enabled);
        assert_eq!(config.pool.unit_capacity, 200);
        assert_eq!(config.coroutine.origin_tracking_depth, 3);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(
            RuntimeConfig::from_toml_str("").unwrap(),
            RuntimeConfig::default()
        );
    }

    #[test]
    fn test_parse_error() {
        let err = RuntimeConfig::from_toml_str("[pool\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().starts_with("Config parse error"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("RESUMABLE_POOL_ENABLED", "true"),
            ("RESUMABLE_POOL_CAPACITY", "16"),
            ("RESUMABLE_ORIGIN_DEPTH", "nope"),
        ]
        .into_iter()
        .collect();
        let config = RuntimeConfig::default()
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert!(config.pool.enabled);
        assert_eq!(config.pool.unit_capacity, 16);
        assert_eq!(config.coroutine.origin_tracking_depth, 0);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resumable.toml");
        let mut config = RuntimeConfig::default();
        config.pool.enabled = true;
        config.pool.adapter_capacity = 8;
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }
}
