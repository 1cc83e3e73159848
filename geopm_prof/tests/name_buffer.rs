//! The C string built for `geopm_prof_region` must be freed when the call returns,
//! on success and on failure. Allocations are counted per thread so that the
//! test harness doesn't interfere.
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::{c_char, c_int, CStr};
use std::sync::Mutex;

use geopm_prof::{GeopmProf, Profiler, RegionHint, RegionId};

struct CountingAlloc;

thread_local! {
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

fn add_live(delta: isize) {
    let _ = LIVE_BYTES.try_with(|live| live.set(live.get() + delta));
}

fn live_bytes() -> isize {
    LIVE_BYTES.with(Cell::get)
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        add_live(layout.size() as isize);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        add_live(-(layout.size() as isize));
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAlloc = CountingAlloc;

/// Records how many bytes were live during the call.
struct Probe {
    status: c_int,
    live_during_call: Mutex<Option<isize>>,
}

impl Probe {
    fn new(status: c_int) -> Probe {
        Probe {
            status,
            live_during_call: Mutex::new(None),
        }
    }
}

impl GeopmProf for Probe {
    unsafe fn prof_region(&self, region_name: *const c_char, _hint: u64, region_id: *mut u64) -> c_int {
        assert!(!CStr::from_ptr(region_name).to_bytes().is_empty());
        *self.live_during_call.lock().unwrap() = Some(live_bytes());
        *region_id = 77;
        self.status
    }
    fn prof_enter(&self, _region_id: u64) -> c_int {
        self.status
    }
    fn prof_exit(&self, _region_id: u64) -> c_int {
        self.status
    }
    fn prof_epoch(&self) -> c_int {
        self.status
    }
    fn prof_shutdown(&self) -> c_int {
        self.status
    }
    fn tprof_init(&self, _num_work_unit: u32) -> c_int {
        self.status
    }
    fn tprof_post(&self) -> c_int {
        self.status
    }
}

#[test]
fn name_buffer_is_released() {
    let name = "a_region_with_a_rather_long_name_to_make_the_allocation_visible";

    // success
    let profiler = Profiler::new(Probe::new(0));
    let before = live_bytes();
    let id = profiler.region(name, RegionHint::Memory).unwrap();
    assert_eq!(live_bytes(), before);
    assert_eq!(id, RegionId(77));
    let during = profiler.backend().live_during_call.lock().unwrap().unwrap();
    assert!(during - before >= (name.len() + 1) as isize);

    // native failure: the error owns its message, nothing else may remain
    let profiler = Profiler::new(Probe::new(-1));
    let before = live_bytes();
    let err = profiler.region(name, RegionHint::Memory).unwrap_err();
    drop(err);
    assert_eq!(live_bytes(), before);

    // repeated calls don't accumulate anything
    let profiler = Profiler::new(Probe::new(0));
    let before = live_bytes();
    for _ in 0..1000 {
        profiler.region(name, 0u64).unwrap();
    }
    assert_eq!(live_bytes(), before);
}
