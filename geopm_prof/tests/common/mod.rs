use std::ffi::{c_char, c_int, CStr};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Mutex;

use geopm_prof::GeopmProf;

/// A call received by [`StandIn`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Region {
        /// the bytes of the C string, including the terminating nul
        name: Vec<u8>,
        hint: u64,
        /// address of the C string
        name_addr: usize,
        /// the id written to the output parameter
        assigned: u64,
    },
    Enter(u64),
    Exit(u64),
    Epoch,
    Shutdown,
    TprofInit(u32),
    TprofPost,
}

/// Stand-in for libgeopm that records every call.
///
/// Region ids are assigned from a counter that starts at `first_id`.
/// Every call returns `status`, which can be changed at any time.
pub struct StandIn {
    pub calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    status: AtomicI32,
}

impl StandIn {
    pub fn new(first_id: u64) -> StandIn {
        StandIn {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(first_id),
            status: AtomicI32::new(0),
        }
    }

    pub fn fail_with(&self, status: c_int) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> c_int {
        self.calls.lock().unwrap().push(call);
        self.status.load(Ordering::SeqCst)
    }
}

impl GeopmProf for StandIn {
    unsafe fn prof_region(&self, region_name: *const c_char, hint: u64, region_id: *mut u64) -> c_int {
        let name = CStr::from_ptr(region_name).to_bytes_with_nul().to_vec();
        let assigned = self.next_id.fetch_add(1, Ordering::SeqCst);
        *region_id = assigned;
        self.record(Call::Region {
            name,
            hint,
            name_addr: region_name as usize,
            assigned,
        })
    }

    fn prof_enter(&self, region_id: u64) -> c_int {
        self.record(Call::Enter(region_id))
    }

    fn prof_exit(&self, region_id: u64) -> c_int {
        self.record(Call::Exit(region_id))
    }

    fn prof_epoch(&self) -> c_int {
        self.record(Call::Epoch)
    }

    fn prof_shutdown(&self) -> c_int {
        self.record(Call::Shutdown)
    }

    fn tprof_init(&self, num_work_unit: u32) -> c_int {
        self.record(Call::TprofInit(num_work_unit))
    }

    fn tprof_post(&self) -> c_int {
        self.record(Call::TprofPost)
    }

    unsafe fn error_message(&self, err: c_int, msg: *mut c_char, size: usize) {
        let text = format!("<stand-in> error {err}\0");
        let len = text.len().min(size);
        std::ptr::copy_nonoverlapping(text.as_ptr() as *const c_char, msg, len);
    }
}
