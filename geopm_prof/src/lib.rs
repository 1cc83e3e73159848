//! Bindings to the GEOPM profiling interface (`geopm_prof.h`).
//!
//! Every operation is forwarded to libgeopm as-is: this crate only converts
//! region names to C strings, captures output parameters, and turns the native
//! status codes into [`ProfError`]s.
//!
//! ## Usage
//!
//! ```no_run
//! use geopm_prof::RegionHint;
//!
//! let region = geopm_prof::region("loop_body", RegionHint::Compute)?;
//! for _ in 0..10 {
//!     geopm_prof::epoch()?;
//!     geopm_prof::enter(region)?;
//!     // ... do some work
//!     geopm_prof::exit(region)?;
//! }
//! geopm_prof::shutdown()?;
//! # Ok::<(), geopm_prof::ProfError>(())
//! ```
use std::{
    ffi::{c_char, c_int},
    fmt::Display,
    sync::{Arc, OnceLock},
};

pub mod config;
pub mod dl;
pub mod error;
pub mod hint;
#[cfg(feature = "link")]
pub mod linked;
pub mod profiler;
#[cfg(feature = "sidecar")]
pub mod sidecar;

pub use config::LibraryConfig;
pub use dl::DlGeopm;
pub use error::{GeopmErrorKind, ProfError, Result};
pub use hint::RegionHint;
#[cfg(feature = "link")]
pub use linked::LinkedGeopm;
pub use profiler::{Profiler, RegionScope};

/// Identifier of a region, as assigned by `geopm_prof_region`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RegionId(pub u64);

impl Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<RegionId> for u64 {
    fn from(id: RegionId) -> u64 {
        id.0
    }
}

/// The C entry points of libgeopm's profiling interface, with their C signatures.
///
/// Each method returns the status of the native function: `0` on success, a negative
/// GEOPM error code or a positive `errno` on failure. Implementations must not add
/// any synchronization: thread-safety is whatever the native library guarantees.
pub trait GeopmProf: Send + Sync {
    /// `int geopm_prof_region(const char *region_name, uint64_t hint, uint64_t *region_id)`
    ///
    /// # Safety
    /// `region_name` must point to a nul-terminated string and `region_id` to a writable `u64`,
    /// both valid for the duration of the call.
    unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int;

    /// `int geopm_prof_enter(uint64_t region_id)`
    fn prof_enter(&self, region_id: u64) -> c_int;

    /// `int geopm_prof_exit(uint64_t region_id)`
    fn prof_exit(&self, region_id: u64) -> c_int;

    /// `int geopm_prof_epoch(void)`
    fn prof_epoch(&self) -> c_int;

    /// `int geopm_prof_shutdown(void)`
    fn prof_shutdown(&self) -> c_int;

    /// `int geopm_tprof_init(uint32_t num_work_unit)`
    fn tprof_init(&self, num_work_unit: u32) -> c_int;

    /// `int geopm_tprof_post(void)`
    fn tprof_post(&self) -> c_int;

    /// `void geopm_error_message(int err, char *msg, size_t size)`
    ///
    /// Optional, the default implementation writes nothing.
    ///
    /// # Safety
    /// `msg` must be valid for writes of `size` bytes.
    unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
        let _ = (err, msg, size);
    }
}

macro_rules! forward_geopm_prof {
    ($($ty:ty),*) => {$(
        impl<B: GeopmProf + ?Sized> GeopmProf for $ty {
            unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int {
                (**self).prof_region(region_name, hint, region_id)
            }
            fn prof_enter(&self, region_id: u64) -> c_int {
                (**self).prof_enter(region_id)
            }
            fn prof_exit(&self, region_id: u64) -> c_int {
                (**self).prof_exit(region_id)
            }
            fn prof_epoch(&self) -> c_int {
                (**self).prof_epoch()
            }
            fn prof_shutdown(&self) -> c_int {
                (**self).prof_shutdown()
            }
            fn tprof_init(&self, num_work_unit: u32) -> c_int {
                (**self).tprof_init(num_work_unit)
            }
            fn tprof_post(&self) -> c_int {
                (**self).tprof_post()
            }
            unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
                (**self).error_message(err, msg, size)
            }
        }
    )*};
}

forward_geopm_prof!(&B, Box<B>, Arc<B>);

/// The process-wide profiler used by the free functions of this crate.
///
/// libgeopm is loaded on first use, from [`LibraryConfig::from_env`].
/// If loading fails, every call returns the same error and loading is not retried.
pub fn default_profiler() -> Result<&'static Profiler<DlGeopm>> {
    static DEFAULT: OnceLock<Result<Profiler<DlGeopm>>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| DlGeopm::open(&LibraryConfig::from_env()).map(Profiler::new))
        .as_ref()
        .map_err(ProfError::clone)
}

/// Registers a region with the default profiler, see [`Profiler::region`].
pub fn region(region_name: &str, hint: impl Into<u64>) -> Result<RegionId> {
    default_profiler()?.region(region_name, hint)
}

/// See [`Profiler::enter`].
pub fn enter(region_id: RegionId) -> Result<()> {
    default_profiler()?.enter(region_id)
}

/// See [`Profiler::exit`].
pub fn exit(region_id: RegionId) -> Result<()> {
    default_profiler()?.exit(region_id)
}

/// See [`Profiler::epoch`].
pub fn epoch() -> Result<()> {
    default_profiler()?.epoch()
}

/// See [`Profiler::shutdown`].
pub fn shutdown() -> Result<()> {
    default_profiler()?.shutdown()
}

/// See [`Profiler::tprof_init`].
pub fn tprof_init(num_work_unit: u32) -> Result<()> {
    default_profiler()?.tprof_init(num_work_unit)
}

/// See [`Profiler::tprof_post`].
pub fn tprof_post() -> Result<()> {
    default_profiler()?.tprof_post()
}
