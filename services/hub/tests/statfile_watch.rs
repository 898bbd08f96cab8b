//! Stats-file watcher behaviour against a real file on disk.

use hub::Engine;
use hub::config::{HubConfig, IngestMode};
use oes_core::Sport;
use serde_json::json;
use std::time::Duration;

fn test_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = HubConfig {
        bind_addr: "127.0.0.1:0".to_owned(),
        scoreboard_tcp_port: 0,
        scoreboard_udp_port: 0,
        ingest_mode: IngestMode::Auto,
        serial_port: "COM1".to_owned(),
        sources_file: dir.path().join("data_sources.json"),
        statcrew_file: dir.path().join("statcrew_sources.json"),
        virtius_file: dir.path().join("virtius_sources.json"),
    };
    let engine = Engine::new(cfg);
    (dir, engine)
}

fn summary_xml(runs: &str) -> String {
    format!(
        r#"<bsgame>
            <venue gameid="G1" date="2026-04-01"/>
            <team id="UNC" name="Home U" vh="H">
                <linescore runs="{runs}" hits="7" errs="0"/>
            </team>
        </bsgame>"#
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn watcher_parses_on_start_and_on_mtime_change() {
    let (dir, engine) = test_engine();
    let stat_path = dir.path().join("game.xml");
    std::fs::write(&stat_path, summary_xml("3")).expect("write xml");

    let updated = engine
        .statfiles
        .update_config(
            Sport::Baseball,
            json!({
                "enabled": true,
                "file_path": stat_path.to_string_lossy(),
                "poll_interval": 1,
            })
            .as_object()
            .unwrap(),
        )
        .await;
    assert_eq!(updated["enabled"], true);
    assert_eq!(updated["running"], true);

    // First observation parses immediately.
    let mut record = Default::default();
    for _ in 0..100 {
        record = engine.statfiles.get_data(Sport::Baseball).await;
        if !record.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(record["home_name"], "Home U");
    assert_eq!(record["teams"][0]["linescore"]["runs"], "3");
    assert_eq!(
        record["_meta"]["source"],
        stat_path.to_string_lossy().as_ref()
    );
    let first_mtime = record["_meta"]["mtime"].as_f64().unwrap();

    // Rewrite with a newer mtime; the watcher must reparse.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    std::fs::write(&stat_path, summary_xml("5")).expect("rewrite xml");
    let mut reparsed = false;
    for _ in 0..100 {
        let record = engine.statfiles.get_data(Sport::Baseball).await;
        if record["teams"][0]["linescore"]["runs"] == "5" {
            assert!(record["_meta"]["mtime"].as_f64().unwrap() > first_mtime);
            reparsed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(reparsed, "watcher never picked up the rewritten file");

    // Disabling stops the watcher.
    let updated = engine
        .statfiles
        .update_config(
            Sport::Baseball,
            json!({"enabled": false}).as_object().unwrap(),
        )
        .await;
    assert_eq!(updated["running"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_rewrite_keeps_last_good_record() {
    let (dir, engine) = test_engine();
    let stat_path = dir.path().join("game.xml");
    std::fs::write(&stat_path, summary_xml("3")).expect("write xml");

    engine
        .statfiles
        .update_config(
            Sport::Baseball,
            json!({
                "enabled": true,
                "file_path": stat_path.to_string_lossy(),
                "poll_interval": 1,
            })
            .as_object()
            .unwrap(),
        )
        .await;

    for _ in 0..100 {
        if !engine.statfiles.get_data(Sport::Baseball).await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    tokio::time::sleep(Duration::from_millis(1100)).await;
    std::fs::write(&stat_path, "<broken").expect("rewrite xml");
    // Give the watcher time to poll the broken file.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let record = engine.statfiles.get_data(Sport::Baseball).await;
    assert_eq!(record["home_name"], "Home U", "good record was overwritten");
}

#[tokio::test(flavor = "multi_thread")]
async fn watcher_config_persists_across_restart() {
    let (dir, engine) = test_engine();
    let stat_path = dir.path().join("game.xml");
    std::fs::write(&stat_path, summary_xml("1")).expect("write xml");

    engine
        .statfiles
        .update_config(
            Sport::Softball,
            json!({
                "enabled": true,
                "file_path": stat_path.to_string_lossy(),
                "poll_interval": 7,
            })
            .as_object()
            .unwrap(),
        )
        .await;
    engine.statfiles.stop_watcher(Sport::Softball).await;

    // A fresh engine over the same files sees the saved configuration.
    let reloaded = Engine::new(engine.cfg.as_ref().clone());
    let config = reloaded.statfiles.get_config(Sport::Softball).await;
    assert_eq!(config["enabled"], true);
    assert_eq!(config["poll_interval"], 7.0);
    assert_eq!(
        config["file_path"],
        stat_path.to_string_lossy().as_ref()
    );
    assert_eq!(config["running"], false);
}
