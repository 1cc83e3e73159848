use std::time::{Duration, Instant};

use anyhow::Context;
use geopm_prof::{GeopmProf, Profiler};
use log::{debug, info};

/// A loop that looks like a bulk-synchronous application: each iteration is an epoch,
/// and its work units are shared between worker threads that report their progress.
#[derive(Debug, Clone)]
pub struct Workload {
    pub region: String,
    pub hint: u64,
    pub iterations: u32,
    pub work_units: u32,
    pub threads: u32,
    pub unit_duration: Duration,
}

/// Number of calls made to libgeopm, per entry point.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCount {
    pub region: u64,
    pub enter: u64,
    pub exit: u64,
    pub epoch: u64,
    pub tprof_init: u64,
    pub tprof_post: u64,
    pub shutdown: u64,
}

impl Workload {
    /// Number of work units given to worker `thread` in each iteration.
    pub fn share_of(&self, thread: u32) -> u32 {
        let base = self.work_units / self.threads;
        let remainder = self.work_units % self.threads;
        base + u32::from(thread < remainder)
    }
}

pub fn run<B: GeopmProf>(profiler: &Profiler<B>, workload: &Workload) -> anyhow::Result<CallCount> {
    anyhow::ensure!(workload.threads > 0, "at least one worker thread is required");

    let mut count = CallCount::default();
    let region_id = profiler
        .region(&workload.region, workload.hint)
        .with_context(|| format!("failed to register region {}", workload.region))?;
    count.region += 1;
    info!("region {} registered with id {region_id}", workload.region);

    let start = Instant::now();
    for i in 0..workload.iterations {
        profiler.epoch()?;
        count.epoch += 1;

        let scope = profiler.scope(region_id)?;
        count.enter += 1;

        // each worker tracks its own share of the iteration
        let per_thread: Vec<(u64, u64)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workload.threads)
                .map(|t| workload.share_of(t))
                .filter(|share| *share > 0)
                .map(|share| s.spawn(move || work(profiler, share, workload.unit_duration)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<geopm_prof::Result<Vec<_>>>()
        })?;
        for (inits, posts) in per_thread {
            count.tprof_init += inits;
            count.tprof_post += posts;
        }

        scope.exit()?;
        count.exit += 1;
        debug!("iteration {i} done");
    }
    info!(
        "{} iterations done in {:?}",
        workload.iterations,
        start.elapsed()
    );

    profiler.shutdown()?;
    count.shutdown += 1;
    Ok(count)
}

/// Runs `share` units of work, posting after each one. Returns the number of init and post calls.
fn work<B: GeopmProf>(profiler: &Profiler<B>, share: u32, unit_duration: Duration) -> geopm_prof::Result<(u64, u64)> {
    profiler.tprof_init(share)?;
    for _ in 0..share {
        spin(unit_duration);
        profiler.tprof_post()?;
    }
    Ok((1, u64::from(share)))
}

/// Busy-waits, so that the work looks like computation to the profiler.
fn spin(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::{c_char, c_int};
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use geopm_prof::{GeopmProf, Profiler};

    use super::{run, CallCount, Workload};

    /// Counts the calls it receives.
    #[derive(Default)]
    struct Counter {
        region: AtomicU64,
        enter: AtomicU64,
        exit: AtomicU64,
        epoch: AtomicU64,
        tprof_init: AtomicU64,
        tprof_post: AtomicU64,
        shutdown: AtomicU64,
        fail_posts: bool,
        panic_posts: bool,
    }

    fn incr(counter: &AtomicU64) -> c_int {
        counter.fetch_add(1, Ordering::SeqCst);
        0
    }

    impl GeopmProf for Counter {
        unsafe fn prof_region(&self, _region_name: *const c_char, _hint: u64, region_id: *mut u64) -> c_int {
            *region_id = 1;
            incr(&self.region)
        }
        fn prof_enter(&self, _region_id: u64) -> c_int {
            incr(&self.enter)
        }
        fn prof_exit(&self, _region_id: u64) -> c_int {
            incr(&self.exit)
        }
        fn prof_epoch(&self) -> c_int {
            incr(&self.epoch)
        }
        fn prof_shutdown(&self) -> c_int {
            incr(&self.shutdown)
        }
        fn tprof_init(&self, _num_work_unit: u32) -> c_int {
            incr(&self.tprof_init)
        }
        fn tprof_post(&self) -> c_int {
            incr(&self.tprof_post);
            if self.panic_posts {
                panic!("tprof_post exploded");
            }
            if self.fail_posts {
                -1
            } else {
                0
            }
        }
    }

    impl Counter {
        fn snapshot(&self) -> CallCount {
            CallCount {
                region: self.region.load(Ordering::SeqCst),
                enter: self.enter.load(Ordering::SeqCst),
                exit: self.exit.load(Ordering::SeqCst),
                epoch: self.epoch.load(Ordering::SeqCst),
                tprof_init: self.tprof_init.load(Ordering::SeqCst),
                tprof_post: self.tprof_post.load(Ordering::SeqCst),
                shutdown: self.shutdown.load(Ordering::SeqCst),
            }
        }
    }

    fn workload(work_units: u32, threads: u32) -> Workload {
        Workload {
            region: "loop_body".to_owned(),
            hint: 2,
            iterations: 3,
            work_units,
            threads,
            unit_duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_share() {
        let w = workload(10, 4);
        let shares: Vec<u32> = (0..4).map(|t| w.share_of(t)).collect();
        assert_eq!(shares, vec![3, 3, 2, 2]);
        assert_eq!(shares.iter().sum::<u32>(), 10);

        let w = workload(2, 4);
        assert_eq!((0..4).map(|t| w.share_of(t)).collect::<Vec<_>>(), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_run() -> anyhow::Result<()> {
        let profiler = Profiler::new(Counter::default());
        let count = run(&profiler, &workload(8, 4))?;
        let expected = CallCount {
            region: 1,
            enter: 3,
            exit: 3,
            epoch: 3,
            tprof_init: 3 * 4,
            tprof_post: 3 * 8,
            shutdown: 1,
        };
        assert_eq!(count, expected);
        assert_eq!(profiler.backend().snapshot(), expected);

        // threads without work don't initialize their progress
        let profiler = Profiler::new(Counter::default());
        let count = run(&profiler, &workload(2, 4))?;
        assert_eq!(count.tprof_init, 3 * 2);
        assert_eq!(count.tprof_post, 3 * 2);
        Ok(())
    }

    #[test]
    fn test_run_stops_on_error() {
        let profiler = Profiler::new(Counter {
            fail_posts: true,
            ..Default::default()
        });
        assert!(run(&profiler, &workload(8, 1)).is_err());
        let calls = profiler.backend().snapshot();
        assert_eq!(calls.tprof_post, 1);
        // the region has been exited when the scope was dropped, and the profiler is not shut down
        assert_eq!(calls.exit, 1);
        assert_eq!(calls.shutdown, 0);
    }

    #[test]
    fn test_no_threads() {
        let profiler = Profiler::new(Counter::default());
        assert!(run(&profiler, &workload(8, 0)).is_err());
        assert_eq!(profiler.backend().snapshot(), CallCount::default());
    }

    #[test]
    fn test_worker_panic_is_propagated() {
        let profiler = Profiler::new(Counter {
            panic_posts: true,
            ..Default::default()
        });
        let payload = std::panic::catch_unwind(AssertUnwindSafe(|| run(&profiler, &workload(8, 2))))
            .expect_err("the worker panic should reach the caller");
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
        assert_eq!(message, Some("tprof_post exploded"));
    }
}
