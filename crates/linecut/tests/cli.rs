//! End-to-end runs of the `linecut` binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::{Command, Output};

fn linecut(args: &[&std::ffi::OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_linecut"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run linecut")
}

fn os<P: AsRef<std::ffi::OsStr> + ?Sized>(p: &P) -> &std::ffi::OsStr {
    p.as_ref()
}

fn write_png(path: &Path, width: u32, height: u32, f: impl Fn(u32, u32) -> u8) {
    image::GrayImage::from_fn(width, height, |x, y| image::Luma([f(x, y)]))
        .save(path)
        .unwrap();
}

#[test]
fn svg_to_gcode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("line.svg");
    let output = dir.path().join("line.nc");
    std::fs::write(
        &input,
        r#"<svg width="100" height="100"><line x1="10" y1="50" x2="90" y2="50"/></svg>"#,
    )
    .unwrap();

    let run = linecut(&[os(&input), os("-o"), os(&output)]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert!(run.stdout.is_empty());

    let gcode = std::fs::read_to_string(&output).unwrap();
    assert!(gcode.contains("(Source: line.svg)\n"));
    assert!(gcode.contains("G0 X10.0000 Y50.0000\n"));
    assert!(gcode.contains("G1 X90.0000 Y50.0000 F800\n"));
    assert!(gcode.ends_with("M2\n"));
}

#[test]
fn raster_with_preview() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bar.png");
    let output = dir.path().join("bar.nc");
    let preview = dir.path().join("bar.svg");
    write_png(&input, 40, 20, |x, y| {
        if (5..35).contains(&x) && (9..12).contains(&y) { 0 } else { 255 }
    });

    let run = linecut(&[
        os(&input),
        os("--output"),
        os(&output),
        os("--use-skeleton"),
        os("--units"),
        os("inch"),
        os("--material-width"),
        os("4"),
        os("--material-height"),
        os("2"),
        os("--cut-depth"),
        os("0.05"),
        os("--safe-height"),
        os("0.25"),
        os("--svg-preview"),
        os(&preview),
    ]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let gcode = std::fs::read_to_string(&output).unwrap();
    assert!(gcode.contains("G20\n"));
    assert_eq!(gcode.matches("G1 Z-0.0500").count(), 1);

    let svg = std::fs::read_to_string(&preview).unwrap();
    assert!(svg.contains(r#"viewBox="0 0 40 20""#));
    assert_eq!(svg.matches("<path").count(), 1);
    assert!(svg.contains("<title>bar.png</title>"));
}

#[test]
fn config_file_supplies_settings() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("drawing.svg");
    let output = dir.path().join("drawing.nc");
    let config = dir.path().join("machine.json");
    std::fs::write(
        &input,
        r#"<svg viewBox="0 0 10 10"><polyline points="0,0 10,10"/></svg>"#,
    )
    .unwrap();
    std::fs::write(
        &config,
        r#"{"machine": {"material_width": 20, "material_height": 20, "feed_rate": 1500}}"#,
    )
    .unwrap();

    let run = linecut(&[
        os(&input),
        os("-o"),
        os(&output),
        os("--config"),
        os(&config),
        os("--no-flip-y"),
    ]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    let gcode = std::fs::read_to_string(&output).unwrap();
    assert!(gcode.contains("G0 X0.0000 Y0.0000\nG1 Z-2.0000 F200\n"));
    assert!(gcode.contains("G1 X20.0000 Y20.0000 F1500\n"));
}

#[test]
fn explicit_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("drawing.txt");
    let output = dir.path().join("drawing.nc");
    std::fs::write(&input, r#"<svg width="5" height="5"><line x2="5" y2="5"/></svg>"#).unwrap();

    let as_raster = linecut(&[os(&input), os("-o"), os(&output)]);
    assert!(!as_raster.status.success());
    assert!(!output.exists());

    let as_svg = linecut(&[os(&input), os("-o"), os(&output), os("--format"), os("svg")]);
    assert!(as_svg.status.success(), "{}", String::from_utf8_lossy(&as_svg.stderr));
    assert!(output.exists());
}

#[test]
fn failure_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.png");
    let output = dir.path().join("broken.nc");
    std::fs::write(&input, b"not an image").unwrap();

    let run = linecut(&[os(&input), os("-o"), os(&output)]);
    assert!(!run.status.success());
    assert!(String::from_utf8_lossy(&run.stderr).contains("failed to decode image"));
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn failure_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.svg");
    let output = dir.path().join("empty.nc");
    std::fs::write(&input, "<svg/>").unwrap();
    std::fs::write(&output, "previous").unwrap();

    let run = linecut(&[os(&input), os("-o"), os(&output)]);
    assert!(!run.status.success());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn invalid_flag_value_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.png");
    let output = dir.path().join("blank.nc");
    write_png(&input, 8, 8, |_, _| 255);

    let run = linecut(&[os(&input), os("-o"), os(&output), os("--threshold"), os("256")]);
    assert!(!run.status.success());
    assert!(String::from_utf8_lossy(&run.stderr).contains("threshold"));
    assert!(!output.exists());
}

#[test]
fn blank_image_still_writes_a_program() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.png");
    let output = dir.path().join("blank.nc");
    write_png(&input, 16, 16, |_, _| 255);

    let run = linecut(&[os(&input), os("-o"), os(&output)]);
    assert!(run.status.success());
    assert!(String::from_utf8_lossy(&run.stderr).contains("no paths found"));

    let gcode = std::fs::read_to_string(&output).unwrap();
    assert!(!gcode.contains("G1 "));
    assert!(gcode.contains("M3 S18000\nM5\n"));
}
