//! Configuration driving context behavior

use resumable::runtime::context::ExecContext;
use resumable::runtime::engine::ScriptFrame;
use resumable::runtime::value::Value;
use resumable::unit::{Generator, UnitKind};
use resumable::util::config::{load_config, save_config, RuntimeConfig};
use tempfile::tempdir;

#[test]
fn test_config_file_enables_pooling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("resumable.toml");
    std::fs::write(&path, "[pool]\nenabled = true\nunit_capacity = 2\n").unwrap();

    let config = load_config(&path).unwrap();
    assert!(config.pool.enabled);
    assert_eq!(config.pool.adapter_capacity, 80);

    let ctx = ExecContext::with_config(config);
    let batch: Vec<_> = (0..3)
        .map(|_| Generator::new(&ctx, "g", ScriptFrame::yielding([], Value::None).boxed()))
        .collect();
    drop(batch);
    assert_eq!(ctx.pools().unit_pool_len(UnitKind::Generator), 2);
}

#[test]
fn test_saved_config_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.toml");
    let mut config = RuntimeConfig::default();
    config.coroutine.origin_tracking_depth = 5;
    save_config(&path, &config).unwrap();
    assert_eq!(load_config(&path).unwrap(), config);
}

#[test]
fn test_env_style_overrides() {
    let config = RuntimeConfig::default().apply_overrides(|key| match key {
        "RESUMABLE_POOL_ENABLED" => Some("on".into()),
        "RESUMABLE_ORIGIN_DEPTH" => Some("3".into()),
        _ => None,
    });
    assert!(config.pool.enabled);
    assert_eq!(config.coroutine.origin_tracking_depth, 3);
    assert_eq!(config.pool.unit_capacity, 200);
}
