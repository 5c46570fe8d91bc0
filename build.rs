use std::env;
use std::path::{Path, PathBuf};

fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if let Some(dir) = env::var_os("FFMPEG_DIR") {
        check_ffmpeg_dir(Path::new(&dir));
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        windows_hints();
    }
}

/// Warn early when FFMPEG_DIR points somewhere ffmpeg-sys-next cannot use.
fn check_ffmpeg_dir(dir: &Path) {
    for child in ["include", "lib"] {
        if !dir.join(child).is_dir() {
            println!(
                "cargo:warning=FFMPEG_DIR={} has no `{child}` directory; ffmpeg-sys-next will likely fail to link.",
                dir.display(),
            );
        }
    }
}

fn windows_hints() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set. On Windows, install FFmpeg via vcpkg (`ffmpeg[vpx]` for WebM export) and set VCPKG_ROOT + FFMPEG_DIR."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let installed = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if !installed.exists() {
        println!(
            "cargo:warning=VCPKG_ROOT is set but nothing is installed for {triplet} at {}.",
            installed.display(),
        );
        return;
    }

    println!(
        "cargo:warning=Found vcpkg FFmpeg at {}. Set FFMPEG_DIR to it to make discovery explicit.",
        installed.display(),
    );
    if !installed.join("include").join("vpx").is_dir() {
        println!(
            "cargo:warning=No libvpx headers under {}; WebM export will fall back to whatever encoder FFmpeg provides.",
            installed.display(),
        );
    }
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build.");
    }
}
