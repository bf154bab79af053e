//! Native library location.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::PointerWidth;

/// Environment variable naming the directory holding the LibALAC builds.
pub const ENV_LIBRARY_DIR: &str = "LIBALAC_DIR";
/// Environment variable overriding the 32-bit library base name.
pub const ENV_LIBRARY_32: &str = "LIBALAC32_NAME";
/// Environment variable overriding the 64-bit library base name.
pub const ENV_LIBRARY_64: &str = "LIBALAC64_NAME";

/// Where to find the two LibALAC builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the libraries. `None` defers to the system loader
    /// search path.
    pub search_dir: Option<PathBuf>,
    /// Base name of the 32-bit build.
    pub library_32: String,
    /// Base name of the 64-bit build.
    pub library_64: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_dir: None,
            library_32: "LibALAC32".into(),
            library_64: "LibALAC64".into(),
        }
    }
}

impl LibraryConfig {
    /// Defaults overridden by `LIBALAC_DIR`, `LIBALAC32_NAME` and `LIBALAC64_NAME`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_LIBRARY_DIR) {
            if !dir.is_empty() {
                config.search_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(name) = std::env::var(ENV_LIBRARY_32) {
            if !name.is_empty() {
                config.library_32 = name;
            }
        }
        if let Ok(name) = std::env::var(ENV_LIBRARY_64) {
            if !name.is_empty() {
                config.library_64 = name;
            }
        }
        config
    }

    /// Platform file path of the build for `width`, e.g. `LibALAC64.dll` or
    /// `libLibALAC64.so`.
    pub fn library_path(&self, width: PointerWidth) -> PathBuf {
        let name = match width {
            PointerWidth::Bits32 => &self.library_32,
            PointerWidth::Bits64 => &self.library_64,
        };
        let file = libloading::library_filename(name);
        match &self.search_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }
}
