use std::{
    ffi::{c_char, c_int},
    path::{Path, PathBuf},
};

use libloading::{Library, Symbol};
use log::debug;

use crate::{GeopmProf, LibraryConfig, ProfError, Result};

type RegionFn = unsafe extern "C" fn(*const c_char, u64, *mut u64) -> c_int;
type RegionIdFn = unsafe extern "C" fn(u64) -> c_int;
type NoArgFn = unsafe extern "C" fn() -> c_int;
type TprofInitFn = unsafe extern "C" fn(u32) -> c_int;
type ErrorMessageFn = unsafe extern "C" fn(c_int, *mut c_char, usize);

/// libgeopm, opened at run time with `dlopen`.
///
/// All the entry points are resolved when the library is opened, so a missing
/// symbol is reported by [`DlGeopm::open`] and not at the first call.
pub struct DlGeopm {
    path: PathBuf,
    region: RegionFn,
    enter: RegionIdFn,
    exit: RegionIdFn,
    epoch: NoArgFn,
    shutdown: NoArgFn,
    tprof_init: TprofInitFn,
    tprof_post: NoArgFn,
    /// Defined in libgeopmd, which libgeopm depends on. May be missing with old versions.
    error_message: Option<ErrorMessageFn>,
    /// Keeps the function pointers above valid.
    _lib: Library,
}

impl DlGeopm {
    pub fn open(config: &LibraryConfig) -> Result<DlGeopm> {
        let path = config.geopm_library.as_path();

        // Safety: loading libgeopm runs its initializers, which is what linking against it would do.
        let lib = unsafe { Library::new(path) }.map_err(|e| load_error(path, e))?;
        debug!("loaded {path:?}");

        // Safety: the types match the declarations of geopm_prof.h and geopm_error.h
        let dl = unsafe {
            DlGeopm {
                path: path.to_path_buf(),
                region: symbol(&lib, path, b"geopm_prof_region\0")?,
                enter: symbol(&lib, path, b"geopm_prof_enter\0")?,
                exit: symbol(&lib, path, b"geopm_prof_exit\0")?,
                epoch: symbol(&lib, path, b"geopm_prof_epoch\0")?,
                shutdown: symbol(&lib, path, b"geopm_prof_shutdown\0")?,
                tprof_init: symbol(&lib, path, b"geopm_tprof_init\0")?,
                tprof_post: symbol(&lib, path, b"geopm_tprof_post\0")?,
                error_message: symbol(&lib, path, b"geopm_error_message\0").ok(),
                _lib: lib,
            }
        };
        if dl.error_message.is_none() {
            debug!("geopm_error_message not found from {path:?}, error messages will be generic");
        }
        Ok(dl)
    }

    /// The path that was given to `dlopen`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

unsafe fn symbol<T: Copy>(lib: &Library, path: &Path, name: &[u8]) -> Result<T> {
    let sym: Symbol<T> = lib.get(name).map_err(|e| load_error(path, e))?;
    Ok(*sym)
}

fn load_error(path: &Path, e: libloading::Error) -> ProfError {
    ProfError::Load {
        library: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl GeopmProf for DlGeopm {
    unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int {
        (self.region)(region_name, hint, region_id)
    }

    fn prof_enter(&self, region_id: u64) -> c_int {
        unsafe { (self.enter)(region_id) }
    }

    fn prof_exit(&self, region_id: u64) -> c_int {
        unsafe { (self.exit)(region_id) }
    }

    fn prof_epoch(&self) -> c_int {
        unsafe { (self.epoch)() }
    }

    fn prof_shutdown(&self) -> c_int {
        unsafe { (self.shutdown)() }
    }

    fn tprof_init(&self, num_work_unit: u32) -> c_int {
        unsafe { (self.tprof_init)(num_work_unit) }
    }

    fn tprof_post(&self) -> c_int {
        unsafe { (self.tprof_post)() }
    }

    unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
        if let Some(f) = self.error_message {
            f(err, msg, size)
        }
    }
}
