use std::{env, path::PathBuf};

use clap::Args;

/// Environment variable that overrides the library to load.
pub const LIBRARY_ENV: &str = "GEOPM_PROF_LIBRARY";

/// Where to find libgeopm.
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct LibraryConfig {
    /// The GEOPM profiling library to load: a path, or a file name to look up
    /// in the search path of the dynamic loader.
    #[arg(long = "geopm-library", env = LIBRARY_ENV, default_value_os_t = default_library())]
    pub geopm_library: PathBuf,
}

/// `libgeopm.so` on Linux.
pub fn default_library() -> PathBuf {
    PathBuf::from(libloading::library_filename("geopm"))
}

impl LibraryConfig {
    pub fn new(geopm_library: impl Into<PathBuf>) -> LibraryConfig {
        LibraryConfig {
            geopm_library: geopm_library.into(),
        }
    }

    /// Reads [`LIBRARY_ENV`], or uses the default library if it's unset or empty.
    pub fn from_env() -> LibraryConfig {
        match env::var_os(LIBRARY_ENV) {
            Some(path) if !path.is_empty() => LibraryConfig::new(path),
            _ => LibraryConfig::default(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig::new(default_library())
    }
}
