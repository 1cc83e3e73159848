use std::ffi::CString;

use log::warn;

use crate::error::{self, check, ProfError, Result};
use crate::{GeopmProf, RegionId};

/// The profiling interface of GEOPM, on top of some native backend.
///
/// Each method makes exactly one call to the backend and returns its outcome unchanged.
/// Nothing is tracked here: the order of the calls (enter before exit, epochs, shutdown)
/// is checked by the native library, if at all.
pub struct Profiler<B: GeopmProf> {
    backend: B,
}

impl<B: GeopmProf> Profiler<B> {
    pub fn new(backend: B) -> Profiler<B> {
        Profiler { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Registers a region and returns the id that the native library assigned to it.
    ///
    /// The name is copied to a temporary C string, which is freed as soon as
    /// `geopm_prof_region` returns, whatever its result.
    pub fn region(&self, region_name: &str, hint: impl Into<u64>) -> Result<RegionId> {
        let name = to_cstring(region_name)?;
        let mut region_id: u64 = 0;
        let status = unsafe { self.backend.prof_region(name.as_ptr(), hint.into(), &mut region_id) };
        drop(name);
        self.check("geopm_prof_region", status)?;
        Ok(RegionId(region_id))
    }

    /// Marks the beginning of the region.
    pub fn enter(&self, region_id: RegionId) -> Result<()> {
        let status = self.backend.prof_enter(region_id.0);
        self.check("geopm_prof_enter", status)
    }

    /// Marks the end of the region.
    pub fn exit(&self, region_id: RegionId) -> Result<()> {
        let status = self.backend.prof_exit(region_id.0);
        self.check("geopm_prof_exit", status)
    }

    /// Marks the beginning of a new iteration of the application's outer loop.
    pub fn epoch(&self) -> Result<()> {
        let status = self.backend.prof_epoch();
        self.check("geopm_prof_epoch", status)
    }

    pub fn shutdown(&self) -> Result<()> {
        let status = self.backend.prof_shutdown();
        self.check("geopm_prof_shutdown", status)
    }

    /// Starts tracking the progress of the calling thread in a loop of `num_work_unit` iterations.
    pub fn tprof_init(&self, num_work_unit: u32) -> Result<()> {
        let status = self.backend.tprof_init(num_work_unit);
        self.check("geopm_tprof_init", status)
    }

    /// Reports that the calling thread has completed one unit of work.
    pub fn tprof_post(&self) -> Result<()> {
        let status = self.backend.tprof_post();
        self.check("geopm_tprof_post", status)
    }

    /// Enters the region and returns a guard that exits it.
    ///
    /// ```no_run
    /// # fn main() -> geopm_prof::Result<()> {
    /// let profiler = geopm_prof::default_profiler()?;
    /// let id = profiler.region("io_phase", geopm_prof::RegionHint::Io)?;
    /// let scope = profiler.scope(id)?;
    /// // ... write some files
    /// scope.exit()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn scope(&self, region_id: RegionId) -> Result<RegionScope<'_, B>> {
        self.enter(region_id)?;
        Ok(RegionScope {
            profiler: self,
            region_id,
            active: true,
        })
    }

    fn check(&self, function: &'static str, status: std::ffi::c_int) -> Result<()> {
        check(function, status, |code| error::error_message(&self.backend, code))
    }
}

/// A region that has been entered, see [`Profiler::scope`].
///
/// Dropping the scope exits the region. Since `drop` cannot fail, a failure
/// of `geopm_prof_exit` is only logged: use [`RegionScope::exit`] to get it.
#[must_use = "the region is exited as soon as the scope is dropped"]
pub struct RegionScope<'a, B: GeopmProf> {
    profiler: &'a Profiler<B>,
    region_id: RegionId,
    active: bool,
}

impl<B: GeopmProf> RegionScope<'_, B> {
    pub fn region_id(&self) -> RegionId {
        self.region_id
    }

    pub fn exit(mut self) -> Result<()> {
        self.active = false;
        self.profiler.exit(self.region_id)
    }
}

impl<B: GeopmProf> Drop for RegionScope<'_, B> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.profiler.exit(self.region_id) {
                warn!("failed to exit region {}: {e}", self.region_id);
            }
        }
    }
}

pub(crate) fn to_cstring(region_name: &str) -> Result<CString> {
    CString::new(region_name).map_err(|e| ProfError::InvalidName {
        name: region_name.to_owned(),
        position: e.nul_position(),
    })
}
