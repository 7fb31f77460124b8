use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::TesseractConfig;
use crate::paths::get_tesseract_dir;

/// Resolved locations of the Tesseract binary and its language data.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: Option<PathBuf>,
}

#[cfg(windows)]
const EXE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(not(windows))]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];
#[cfg(windows)]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

/// Locates Tesseract. Fails when no executable can be found; a missing
/// tessdata directory is left to Tesseract's own lookup.
pub fn locate_tesseract(config: &TesseractConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    let tessdata = find_tessdata_dir(config);
    info!(
        "Using Tesseract at {} (tessdata: {})",
        executable.display(),
        tessdata
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    Ok(TesseractPaths { executable, tessdata })
}

/// Finds the executable: configured path, then PATH, then our local dir,
/// then common install locations.
pub fn find_tesseract_executable(config: &TesseractConfig) -> Result<PathBuf> {
    if let Some(path) = &config.executable {
        if path.exists() {
            return Ok(path.clone());
        }
        debug!("Configured Tesseract path {} does not exist", path.display());
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let local_exe = get_tesseract_dir().join(EXE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    for dir in COMMON_INSTALL_DIRS {
        let p = Path::new(dir).join(EXE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR, add it to PATH, or set \
         tesseract.executable in config.json."
    ))
}

/// Finds a tessdata directory holding the configured language.
pub fn find_tessdata_dir(config: &TesseractConfig) -> Option<PathBuf> {
    let traineddata = format!("{}.traineddata", config.language);
    let has_language = |p: &Path| p.join(&traineddata).exists();

    if let Some(path) = &config.tessdata {
        if has_language(path) {
            return Some(path.clone());
        }
    }

    let local = get_tesseract_dir().join("tessdata");
    if has_language(&local) {
        return Some(local);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if has_language(&p) {
            return Some(p);
        }
        let p = p.join("tessdata");
        if has_language(&p) {
            return Some(p);
        }
    }

    SYSTEM_TESSDATA_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|p| has_language(p))
}
