//! Integration tests for the nether-gltf CLI
//!
//! Tests the full pipeline: generate test assets -> run the binary -> verify output

mod gltf_generator;

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn nether_gltf(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nether-gltf"))
        .args(args)
        .output()
        .expect("Failed to run nether-gltf")
}

fn write_glb(dir: &Path, name: &str, data: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("Failed to write GLB");
    path.to_str().unwrap().to_string()
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("Failed to read output");
    serde_json::from_str(&text).expect("Output is not JSON")
}

#[test]
fn test_cli_mesh_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_glb(dir.path(), "column.glb", &gltf_generator::generate_skinned_glb());
    let stem = dir.path().join("out");

    let output = nether_gltf(&["mesh", &input, "-o", stem.to_str().unwrap()]);
    assert!(output.status.success(), "mesh command failed: {output:?}");

    let mesh = read_json(&dir.path().join("out.mesh.json"));
    let data = std::fs::read(dir.path().join("out.bin")).expect("Buffer file should exist");
    let bundle = &mesh["vertexBundles"][0]["view"];
    assert_eq!(bundle["count"], 16);
    let end = bundle["offset"].as_u64().unwrap() + bundle["length"].as_u64().unwrap();
    assert!(end as usize <= data.len());
    assert_eq!(mesh["jointMaps"][0].as_array().unwrap().len(), gltf_generator::BONE_COUNT);
}

#[test]
fn test_cli_skeleton_export() {
    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "column.glb", &gltf_generator::generate_skinned_glb());
    let stem = dir.path().join("rig");

    let output = nether_gltf(&["skeleton", &input, "-o", stem.to_str().unwrap()]);
    assert!(output.status.success(), "skeleton command failed: {output:?}");

    let skeleton = read_json(&dir.path().join("rig.skeleton.json"));
    assert_eq!(skeleton["joints"][0], "Socket/Root");
    assert_eq!(
        skeleton["bindposes"].as_array().unwrap().len(),
        gltf_generator::BONE_COUNT
    );
}

#[test]
fn test_cli_animation_export_with_config() {
    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "column.glb", &gltf_generator::generate_skinned_glb());
    let config = dir.path().join("import.toml");
    std::fs::write(
        &config,
        "promote_single_root_node = true\nanimation_sample_rate = 60.0\n",
    )
    .unwrap();
    let stem = dir.path().join("wave");

    let output = nether_gltf(&[
        "animation",
        &input,
        "-o",
        stem.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--bake",
    ]);
    assert!(output.status.success(), "animation command failed: {output:?}");

    let clip = read_json(&dir.path().join("wave.anim.json"));
    assert_eq!(clip["name"], "Wave");
    assert_eq!(clip["sampleRate"], 60.0);
    let paths: Vec<&str> = clip["jointTracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"Root/Spine"));
    assert!(!paths.iter().any(|p| p.starts_with("Socket")));
}

#[test]
fn test_cli_lists_animations() {
    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "column.glb", &gltf_generator::generate_skinned_glb());

    let output = nether_gltf(&["animation", &input, "--list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[0] Wave (4 channels)"), "{stdout}");
}

#[test]
fn test_cli_scene_export() {
    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "column.glb", &gltf_generator::generate_skinned_glb());
    let stem = dir.path().join("scene");

    let output = nether_gltf(&["scene", &input, "-o", stem.to_str().unwrap()]);
    assert!(output.status.success(), "scene command failed: {output:?}");

    let scene = read_json(&dir.path().join("scene.scene.json"));
    assert_eq!(scene["name"], "Scene");
    assert_eq!(scene["sockets"][0]["path"], "Socket");
}

#[test]
fn test_cli_inspect_reports_required_extension() {
    let mut buffer = gltf_generator::BufferBuilder::new();
    let mut root = gltf_generator::skinned_root(&mut buffer);
    root["extensionsUsed"] = serde_json::json!(["EXT_unknown_compression"]);
    root["extensionsRequired"] = serde_json::json!(["EXT_unknown_compression"]);
    let glb = gltf_generator::finish_glb(root, buffer);

    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "needs_ext.glb", &glb);

    let output = nether_gltf(&["inspect", &input]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("UnsupportedExtension"), "{stdout}");
    assert!(stdout.contains("sockets:    1"), "{stdout}");
}

#[test]
fn test_cli_rejects_invalid_glb() {
    let dir = tempdir().unwrap();
    let input = write_glb(dir.path(), "garbage.glb", b"glTF\x01\x00\x00\x00");

    let output = nether_gltf(&["mesh", &input]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad GLB format"), "{stderr}");
}
