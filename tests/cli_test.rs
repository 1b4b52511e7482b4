//! Tests for the command line tool
//!
//! These run the built binary on pose documents written to the temp
//! directory and inspect the files it produces.


use motion_retarget::{
    document::{load_pose_sequence, read_json, write_json},
    retarget::BoneTransformSequence,
    sequence::PoseSequence,
};
use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};
use test_helpers::noisy_sequence;

const BIN: &str = env!("CARGO_BIN_EXE_motion-retarget");

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("motion_retarget_cli_{}_{name}", std::process::id()))
}

/// Write a noisy pose document and return its path
fn write_input(name: &str, frames: usize) -> PathBuf {
    let path = temp_path(name);
    write_json(&path, &noisy_sequence(frames, 0.02, 0.0, 11).to_document()).unwrap();
    path
}

fn run(input: &Path, output: &Path, extra: &[&str]) -> Output {
    Command::new(BIN)
        .arg("--input")
        .arg(input)
        .arg("--output")
        .arg(output)
        .args(extra)
        .output()
        .expect("failed to run motion-retarget")
}

fn max_difference(a: &PoseSequence, b: &PoseSequence) -> f64 {
    a.positions()
        .iter()
        .zip(b.positions())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn cleanup(paths: &[&Path]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}

#[test]
fn test_writes_animation() {
    let input = write_input("basic_in.json", 12);
    let output = temp_path("basic_out.json");

    let result = run(&input, &output, &[]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let animation: BoneTransformSequence = read_json(&output).unwrap();
    assert_eq!(animation.len(), 12);
    assert_eq!(animation.rig, "generic");
    assert!(animation.bone_names().contains("Left_Lower_Arm"));

    cleanup(&[&input, &output]);
}

#[test]
fn test_method_selects_filter() {
    let input = write_input("method_in.json", 20);
    let output = temp_path("method_out.json");
    let raw_path = temp_path("method_none.json");
    let smoothed_path = temp_path("method_combined.json");

    let result = run(&input, &output, &["--method", "none", "--smoothed", raw_path.to_str().unwrap()]);
    assert!(result.status.success());
    let result = run(&input, &output, &["--method", "combined", "--smoothed", smoothed_path.to_str().unwrap()]);
    assert!(result.status.success());

    let original = load_pose_sequence(&input).unwrap();
    let raw = load_pose_sequence(&raw_path).unwrap();
    let smoothed = load_pose_sequence(&smoothed_path).unwrap();

    assert_eq!(raw.frame_count(), 20);
    assert!(max_difference(&original, &raw) < 1e-9);
    assert!(max_difference(&original, &smoothed) > 1e-4);

    let result = run(&input, &output, &["--method", "median"]);
    assert!(!result.status.success());

    cleanup(&[&input, &output, &raw_path, &smoothed_path]);
}

#[test]
fn test_rig_selects_profile() {
    let input = write_input("rig_in.json", 8);
    let output = temp_path("rig_out.json");

    let result = run(&input, &output, &["--rig", "mixamo"]);
    assert!(result.status.success());
    let animation: BoneTransformSequence = read_json(&output).unwrap();
    assert_eq!(animation.rig, "mixamo");
    assert!(animation.bone_names().contains("LeftForeArm"));
    assert!(animation.bone_names().contains("Hips"));

    let result = run(&input, &output, &["--rig", "unreal"]);
    assert!(result.status.success());
    let animation: BoneTransformSequence = read_json(&output).unwrap();
    assert_eq!(animation.rig, "ue4");

    cleanup(&[&input, &output]);
}

#[test]
fn test_custom_rig_from_config() {
    let input = write_input("custom_in.json", 3);
    let output = temp_path("custom_out.json");
    let config = temp_path("custom_config.yaml");
    std::fs::write(&config, "rig:\n  custom_mapping:\n    LEFT_ELBOW: forearm\n").unwrap();
    let config_arg = config.to_str().unwrap();

    for extra in [vec!["-C", config_arg], vec!["-C", config_arg, "--rig", "custom"]] {
        let result = run(&input, &output, &extra);
        assert!(result.status.success(), "{extra:?}: {}", String::from_utf8_lossy(&result.stderr));

        let animation: BoneTransformSequence = read_json(&output).unwrap();
        assert_eq!(animation.len(), 3);
        assert_eq!(animation.rig, "custom");
        assert!(animation.bone_names().contains("forearm"));
    }

    // A built-in family replaces the configured mapping
    let result = run(&input, &output, &["-C", config_arg, "--rig", "rigify"]);
    assert!(result.status.success());
    let animation: BoneTransformSequence = read_json(&output).unwrap();
    assert_eq!(animation.rig, "rigify");
    assert!(!animation.bone_names().contains("forearm"));

    cleanup(&[&input, &output, &config]);
}

#[test]
fn test_custom_rig_without_mapping_fails() {
    let input = write_input("no_mapping_in.json", 3);
    let output = temp_path("no_mapping_out.json");

    let result = run(&input, &output, &["--rig", "custom"]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("custom_mapping"));
    assert!(!output.exists());

    cleanup(&[&input]);
}

#[test]
fn test_writes_stats() {
    let input = write_input("stats_in.json", 10);
    let output = temp_path("stats_out.json");
    let stats = temp_path("stats.json");

    let result = run(&input, &output, &["--stats", stats.to_str().unwrap()]);
    assert!(result.status.success());

    let value: serde_json::Value = read_json(&stats).unwrap();
    assert_eq!(value["total_frames"], 10);
    assert!(value["joints"]["LEFT_ELBOW"].is_object());

    cleanup(&[&input, &output, &stats]);
}

#[test]
fn test_missing_input_fails() {
    let input = temp_path("does_not_exist.json");
    let output = temp_path("missing_out.json");

    let result = run(&input, &output, &[]);
    assert!(!result.status.success());
    assert!(!output.exists());
}
