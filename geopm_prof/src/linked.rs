//! libgeopm linked at build time.
use std::ffi::{c_char, c_int};

use crate::GeopmProf;

/// Raw declarations from `geopm_prof.h` and `geopm_error.h`.
pub mod sys {
    use std::ffi::{c_char, c_int};

    #[link(name = "geopm")]
    extern "C" {
        pub fn geopm_prof_region(region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int;
        pub fn geopm_prof_enter(region_id: u64) -> c_int;
        pub fn geopm_prof_exit(region_id: u64) -> c_int;
        pub fn geopm_prof_epoch() -> c_int;
        pub fn geopm_prof_shutdown() -> c_int;
        pub fn geopm_tprof_init(num_work_unit: u32) -> c_int;
        pub fn geopm_tprof_post() -> c_int;
    }

    #[link(name = "geopmd")]
    extern "C" {
        pub fn geopm_error_message(err: c_int, msg: *mut c_char, size: usize);
    }
}

/// The libgeopm this program has been linked with.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkedGeopm;

impl GeopmProf for LinkedGeopm {
    unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int {
        sys::geopm_prof_region(region_name, hint, region_id)
    }

    fn prof_enter(&self, region_id: u64) -> c_int {
        unsafe { sys::geopm_prof_enter(region_id) }
    }

    fn prof_exit(&self, region_id: u64) -> c_int {
        unsafe { sys::geopm_prof_exit(region_id) }
    }

    fn prof_epoch(&self) -> c_int {
        unsafe { sys::geopm_prof_epoch() }
    }

    fn prof_shutdown(&self) -> c_int {
        unsafe { sys::geopm_prof_shutdown() }
    }

    fn tprof_init(&self, num_work_unit: u32) -> c_int {
        unsafe { sys::geopm_tprof_init(num_work_unit) }
    }

    fn tprof_post(&self) -> c_int {
        unsafe { sys::geopm_tprof_post() }
    }

    unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
        sys::geopm_error_message(err, msg, size)
    }
}
