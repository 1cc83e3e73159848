//! Profiling calls issued on behalf of another process.
//!
//! This is the interface that a collector running next to the monitored applications
//! (a sidecar) would use to talk to a GEOPM controller. libgeopm does not provide these
//! entry points yet: the only backend is [`Unavailable`], and [`SIDECAR_AVAILABLE`] is `false`.
//! Use [`crate::Profiler`] for in-process profiling.
use std::ffi::{c_char, c_int};

use libc::pid_t;

use crate::error::{check, fill_message, ProfError, Result};
use crate::profiler::to_cstring;
use crate::{GeopmErrorKind, RegionId};

/// Whether libgeopm implements the sidecar entry points.
pub const SIDECAR_AVAILABLE: bool = false;

/// The proposed C entry points, with an additional `app_pid` argument.
///
/// Region registration does not depend on the monitored process.
pub trait GeopmProfSidecar: Send + Sync {
    /// # Safety
    /// Same contract as [`crate::GeopmProf::prof_region`].
    unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int;
    fn prof_enter(&self, region_id: u64, app_pid: pid_t) -> c_int;
    fn prof_exit(&self, region_id: u64, app_pid: pid_t) -> c_int;
    fn prof_epoch(&self, app_pid: pid_t) -> c_int;
    fn prof_shutdown(&self, app_pid: pid_t) -> c_int;
    fn tprof_init(&self, num_work_unit: u32, app_pid: pid_t) -> c_int;
    fn tprof_post(&self, app_pid: pid_t) -> c_int;

    /// # Safety
    /// `msg` must be valid for writes of `size` bytes.
    unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
        let _ = (err, msg, size);
    }
}

/// Backend for the sidecar interface while libgeopm lacks it: every call fails
/// with `GEOPM_ERROR_NOT_IMPLEMENTED` and nothing is called in libgeopm.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

const NOT_IMPLEMENTED: c_int = GeopmErrorKind::NotImplemented.code();

impl GeopmProfSidecar for Unavailable {
    unsafe fn prof_region(&self, _region_name: *const c_char, _hint: u64, _region_id: *mut u64) -> c_int {
        NOT_IMPLEMENTED
    }
    fn prof_enter(&self, _region_id: u64, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
    fn prof_exit(&self, _region_id: u64, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
    fn prof_epoch(&self, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
    fn prof_shutdown(&self, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
    fn tprof_init(&self, _num_work_unit: u32, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
    fn tprof_post(&self, _app_pid: pid_t) -> c_int {
        NOT_IMPLEMENTED
    }
}

/// Same as [`crate::Profiler`], for the process `app_pid`.
///
/// A `GEOPM_ERROR_NOT_IMPLEMENTED` status is reported as [`ProfError::Unavailable`].
pub struct SidecarProfiler<B: GeopmProfSidecar> {
    backend: B,
}

impl SidecarProfiler<Unavailable> {
    pub fn unavailable() -> SidecarProfiler<Unavailable> {
        SidecarProfiler::new(Unavailable)
    }
}

impl<B: GeopmProfSidecar> SidecarProfiler<B> {
    pub fn new(backend: B) -> SidecarProfiler<B> {
        SidecarProfiler { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn region(&self, region_name: &str, hint: impl Into<u64>) -> Result<RegionId> {
        let name = to_cstring(region_name)?;
        let mut region_id: u64 = 0;
        let status = unsafe { self.backend.prof_region(name.as_ptr(), hint.into(), &mut region_id) };
        drop(name);
        self.check("geopm_prof_region", status)?;
        Ok(RegionId(region_id))
    }

    pub fn enter(&self, region_id: RegionId, app_pid: pid_t) -> Result<()> {
        let status = self.backend.prof_enter(region_id.0, app_pid);
        self.check("geopm_prof_enter", status)
    }

    pub fn exit(&self, region_id: RegionId, app_pid: pid_t) -> Result<()> {
        let status = self.backend.prof_exit(region_id.0, app_pid);
        self.check("geopm_prof_exit", status)
    }

    pub fn epoch(&self, app_pid: pid_t) -> Result<()> {
        let status = self.backend.prof_epoch(app_pid);
        self.check("geopm_prof_epoch", status)
    }

    pub fn shutdown(&self, app_pid: pid_t) -> Result<()> {
        let status = self.backend.prof_shutdown(app_pid);
        self.check("geopm_prof_shutdown", status)
    }

    pub fn tprof_init(&self, num_work_unit: u32, app_pid: pid_t) -> Result<()> {
        let status = self.backend.tprof_init(num_work_unit, app_pid);
        self.check("geopm_tprof_init", status)
    }

    pub fn tprof_post(&self, app_pid: pid_t) -> Result<()> {
        let status = self.backend.tprof_post(app_pid);
        self.check("geopm_tprof_post", status)
    }

    fn check(&self, function: &'static str, status: c_int) -> Result<()> {
        if status == GeopmErrorKind::NotImplemented.code() {
            return Err(ProfError::Unavailable { function });
        }
        check(function, status, |code| {
            // Safety: `fill_message` gives a buffer valid for `size` bytes.
            fill_message(code, |msg, size| unsafe { self.backend.error_message(code, msg, size) })
        })
    }
}
