//! Logger 单元测试

use super::*;

#[test]
fn test_level_conversion() {
    assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
    assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
}

#[test]
fn test_second_init_is_noop() {
    init_debug();
    assert!(!try_init_with_level(LogLevel::Warn));
}

#[test]
fn test_init_from_config_uses_log_level() {
    let mut config = crate::util::config::RuntimeConfig::default();
    config.log.level = LogLevel::Warn;
    init_debug();
    assert!(!init_from_config(&config));
}
