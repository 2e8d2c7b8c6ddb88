use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_floodfx")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "floodfx.exe"
            } else {
                "floodfx"
            });
            p
        })
}

fn write_mask(path: &std::path::Path, size: u32) {
    let mut bytes = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let inside = (8..size - 8).contains(&x) && (12..size - 12).contains(&y);
            bytes.extend_from_slice(&[0, 0, 0, if inside { 255 } else { 0 }]);
        }
    }
    image::save_buffer_with_format(
        path,
        &bytes,
        size,
        size,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .unwrap();
}

#[test]
fn cli_effects_write_pngs() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let mask_path = dir.join("mask.png");
    write_mask(&mask_path, 48);
    let mask_arg = mask_path.to_string_lossy().to_string();

    let runs: [(&str, &[&str]); 4] = [
        ("distance", &["--signed", "--max", "16"]),
        ("skeleton", &["--params", r#"{"min_distance": 2.0}"#]),
        ("straight-skeleton", &["--parallel", "--threads", "2"]),
        ("bevel", &["--threshold", "0.25", "--variant", "one-plus-jfa"]),
    ];

    for (cmd, extra) in runs {
        let out_path = dir.join(format!("{cmd}.png"));
        let _ = std::fs::remove_file(&out_path);
        let out_arg = out_path.to_string_lossy().to_string();

        let status = std::process::Command::new(exe())
            .args([cmd, "--in", mask_arg.as_str(), "--out", out_arg.as_str()])
            .args(extra)
            .status()
            .unwrap();
        assert!(status.success(), "{cmd}");

        let img = image::open(&out_path).unwrap();
        assert_eq!((img.width(), img.height()), (48, 48), "{cmd}");
    }
}

#[test]
fn cli_rejects_unknown_params() {
    let dir = PathBuf::from("target").join("cli_smoke_err");
    std::fs::create_dir_all(&dir).unwrap();
    let mask_path = dir.join("mask.png");
    write_mask(&mask_path, 24);

    let status = std::process::Command::new(exe())
        .args(["skeleton", "--in"])
        .arg(&mask_path)
        .args(["--out"])
        .arg(dir.join("out.png"))
        .args(["--params", r#"{"no_such_option": 1}"#])
        .status()
        .unwrap();
    assert!(!status.success());
}
