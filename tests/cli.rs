use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bundled_assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

/// Copies the bundled shaders into a scratch asset directory so individual
/// files can be broken per test.
fn scratch_assets() -> TempDir {
    let dir = TempDir::new().expect("temp assets");
    let shaders = dir.path().join("shaders");
    fs::create_dir_all(&shaders).expect("shader dir");
    for entry in fs::read_dir(bundled_assets().join("shaders")).expect("bundled shaders") {
        let entry = entry.expect("shader entry");
        fs::copy(entry.path(), shaders.join(entry.file_name())).expect("copy shader");
    }
    fs::create_dir_all(dir.path().join("textures")).expect("texture dir");
    image::RgbImage::from_pixel(4, 2, image::Rgb([180, 60, 40]))
        .save(dir.path().join("textures").join("brick.png"))
        .expect("write texture");
    dir
}

#[test]
fn summary_only_prints_scene_overview() {
    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--assets")
        .arg(bundled_assets())
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains(
            "Loaded scene with 10 pyramids (1 directional, 4 point, 1 spot lights)",
        ))
        .stdout(contains("Pyramid mesh: 18 vertices, 32-byte stride"))
        .stdout(contains("Lighting program:"))
        .stdout(contains("Lamp program:"));
}

#[test]
fn custom_scene_and_texture_are_used() {
    let assets = scratch_assets();
    let scene = assets.path().join("small.xml");
    fs::write(
        &scene,
        "<scene><pyramid><position>0 0 0</position></pyramid><spot enabled=\"false\"/></scene>",
    )
    .expect("write scene");

    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--assets")
        .arg(assets.path())
        .arg("--scene")
        .arg(&scene)
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains(
            "Loaded scene with 1 pyramids (1 directional, 4 point, 0 spot lights)",
        ))
        .stdout(contains(": 4x2, 3 channels"));
}

#[test]
fn broken_fragment_shader_names_the_stage() {
    let assets = scratch_assets();
    fs::write(
        assets.path().join("shaders").join("lighting.frag.wgsl"),
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return missing; }",
    )
    .expect("break shader");

    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--assets").arg(assets.path()).arg("--summary-only");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("failed to build lighting program"))
        .stderr(contains("fragment stage failed"));
}

#[test]
fn grayscale_texture_is_rejected() {
    let assets = scratch_assets();
    let gray = assets.path().join("gray.png");
    image::GrayImage::from_pixel(2, 2, image::Luma([90]))
        .save(&gray)
        .expect("write gray texture");

    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--assets")
        .arg(assets.path())
        .arg("--texture")
        .arg(&gray)
        .arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("1 channel(s)"));
}

#[test]
fn unknown_flag_is_rejected() {
    let mut cmd = Command::cargo_bin("lit-pyramid").expect("binary exists");
    cmd.arg("--fullscreen");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"));
}
