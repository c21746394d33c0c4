//! Checklist durability across manager restarts and failed writes.

mod common;

use common::strategies::{payload_strategy, stage_strategy};
use nowcast::checklist::{Checklist, ChecklistError};
use proptest::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_is_self_describing_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nowcast_checklist.yaml");
    let mut checklist = Checklist::new(&path);

    checklist.set("weather", json!({"06 forecast": true})).unwrap();
    checklist.set("rivers", json!("/results/forcing/rivers/R201a_y2026m10d19.nc")).unwrap();

    let document: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document["weather"]["06 forecast"], serde_yaml::Value::Bool(true));
    assert_eq!(
        document["rivers"].as_str(),
        Some("/results/forcing/rivers/R201a_y2026m10d19.nc")
    );
}

#[test]
fn test_no_temp_file_left_behind() {
    let dir = TempDir::new().unwrap();
    let mut checklist = Checklist::new(dir.path().join("nowcast_checklist.yaml"));
    checklist.set("weather", json!(true)).unwrap();
    checklist.clear().unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["nowcast_checklist.yaml"]);
}

#[test]
fn test_failed_persist_keeps_prior_value_and_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("nowcast_checklist.yaml");
    let mut checklist = Checklist::new(&path);
    checklist.set("weather", json!("first")).unwrap();
    let on_disk = fs::read_to_string(&path).unwrap();

    // replace the state directory with a plain file so every write fails
    fs::remove_dir_all(dir.path().join("state")).unwrap();
    fs::write(dir.path().join("state"), "blocker").unwrap();

    let result = checklist.set("weather", json!("second"));
    assert!(matches!(result, Err(ChecklistError::PersistError { .. })));
    assert_eq!(checklist.get("weather"), Some(&json!("first")));

    // restore and confirm the last committed document is what a restart sees
    fs::remove_file(dir.path().join("state")).unwrap();
    fs::create_dir(dir.path().join("state")).unwrap();
    fs::write(&path, on_disk).unwrap();
    assert_eq!(Checklist::load(&path).unwrap().get("weather"), Some(&json!("first")));
}

#[test]
fn test_corrupt_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nowcast_checklist.yaml");
    fs::write(&path, "weather: [unterminated").unwrap();

    assert!(matches!(Checklist::load(&path), Err(ChecklistError::LoadError { .. })));
}

proptest! {
    /// Property: a committed value survives a reload unchanged
    #[test]
    fn committed_values_survive_reload(stage in stage_strategy(), value in payload_strategy()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nowcast_checklist.yaml");

        let mut checklist = Checklist::new(&path);
        checklist.set(stage.clone(), value.clone()).unwrap();

        let reloaded = Checklist::load(&path).unwrap();
        prop_assert_eq!(reloaded.get(&stage), Some(&value));
    }

    /// Property: setting the same value twice equals setting it once
    #[test]
    fn update_is_idempotent(stage in stage_strategy(), value in payload_strategy()) {
        let dir = TempDir::new().unwrap();
        let once_path = dir.path().join("once.yaml");
        let twice_path = dir.path().join("twice.yaml");

        let mut once = Checklist::new(&once_path);
        once.set(stage.clone(), value.clone()).unwrap();

        let mut twice = Checklist::new(&twice_path);
        twice.set(stage.clone(), value.clone()).unwrap();
        twice.set(stage, value).unwrap();

        prop_assert_eq!(once.entries(), twice.entries());
        prop_assert_eq!(
            fs::read_to_string(once_path).unwrap(),
            fs::read_to_string(twice_path).unwrap()
        );
    }
}
