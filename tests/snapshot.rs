//! Agent built from a configuration file, serving a refreshed value file.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_snmp_agent::handler::{SnapshotProvider, ValueProvider};
use async_snmp_agent::{AgentConfig, Value};
use common::{Manager, scalar};

const CONFIG: &str = r#"{
    "bind": "127.0.0.1:0",
    "refresh_secs": 0,
    "values": "data.json",
    "objects": [
        { "suffix": "1.1.0", "syntax": "Integer32", "key": "Param1" },
        { "suffix": "1.28.0", "syntax": "TimeTicks", "key": "Param28" }
    ]
}"#;

struct Deployment {
    _dir: tempfile::TempDir,
    config: AgentConfig,
}

fn deploy(values: &str) -> Deployment {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("agent.json"), CONFIG).unwrap();
    std::fs::write(dir.path().join("data.json"), values).unwrap();
    let config = AgentConfig::from_file(dir.path().join("agent.json")).unwrap();
    Deployment { _dir: dir, config }
}

#[tokio::test]
async fn serves_values_from_file_and_picks_up_reloads() {
    let deployment = deploy(r#"{ "Param1": 7, "Param28": "12345", "Unused": 1 }"#);
    let config = &deployment.config;
    assert!(config.values.is_absolute());
    assert_eq!(config.refresh_interval(), None);

    let store = config.object_store().unwrap();
    let provider = Arc::new(SnapshotProvider::for_store(&config.values, &store));
    assert_eq!(provider.load().unwrap(), 2);

    let agent = config
        .agent_builder()
        .unwrap()
        .provider(provider.clone())
        .build()
        .await
        .unwrap();
    let task = tokio::spawn({
        let agent = agent.clone();
        async move { agent.run().await }
    });

    let mut manager = Manager::connect(agent.local_addr(), "public").await;
    let response = manager.get(&[scalar(1), scalar(28)]).await.expect("reply");
    assert_eq!(response.varbinds[0].value, Value::Integer(7));
    assert_eq!(response.varbinds[1].value, Value::TimeTicks(12345));

    // Param28 disappears from the file; its object stops answering.
    std::fs::write(&config.values, r#"{ "Param1": 8 }"#).unwrap();
    assert_eq!(provider.reload().await.unwrap(), 1);

    let response = manager.get(&[scalar(1), scalar(28)]).await.expect("reply");
    assert_eq!(response.varbinds[0].value, Value::Integer(8));
    assert_eq!(response.varbinds[1].value, Value::NoSuchObject);

    // A broken file leaves the last good snapshot in place.
    std::fs::write(&config.values, "{ not json").unwrap();
    assert!(provider.reload().await.is_err());

    let response = manager.get(&[scalar(1)]).await.expect("reply");
    assert_eq!(response.varbinds[0].value, Value::Integer(8));

    agent.cancel().cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("agent stops")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn background_refresh_updates_values() {
    let deployment = deploy(r#"{ "Param1": 1 }"#);
    let config = &deployment.config;

    let store = config.object_store().unwrap();
    let provider = Arc::new(SnapshotProvider::for_store(&config.values, &store));
    provider.load().unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let refresh = provider.spawn_refresh(Duration::from_millis(20), cancel.clone());

    std::fs::write(&config.values, r#"{ "Param1": 2 }"#).unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if provider.fetch("Param1") == Some(Value::Integer(2)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(updated.is_ok(), "refresh never picked up the new value");

    cancel.cancel();
    refresh.await.unwrap();
}

#[test]
fn sample_deployment_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/agent.json");
    let config = AgentConfig::from_file(path).unwrap();

    let store = config.object_store().unwrap();
    assert_eq!(store.len(), 38);
    assert!(store.get(&scalar(34)).is_none());
    assert_eq!(
        store.get(&scalar(35)).map(|o| o.syntax),
        Some(async_snmp_agent::Syntax::TimeTicks)
    );

    let provider = SnapshotProvider::for_store(&config.values, &store);
    assert_eq!(provider.load().unwrap(), 38);
    assert_eq!(provider.fetch("Param39"), Some(Value::Integer(39)));
}
