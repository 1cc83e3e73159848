use std::time::Duration;

#[cfg(not(feature = "link"))]
use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use cli::{Cli, Commands, Operation};
#[cfg(not(feature = "link"))]
use geopm_prof::DlGeopm;
#[cfg(feature = "link")]
use geopm_prof::LinkedGeopm;
use geopm_prof::{error, GeopmErrorKind, GeopmProf, LibraryConfig, Profiler, RegionHint, RegionId};
use workload::Workload;

mod cli;
mod workload;

fn main() -> Result<(), anyhow::Error> {
    // initialize logger
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    // parse CLI arguments
    let cli = Cli::parse();

    // run the command
    match cli.command {
        Commands::Hints => {
            for hint in RegionHint::ALL {
                println!("{:>2}  {:<9} {}", u64::from(hint), hint, hint.c_name());
            }
        }
        Commands::Errors => {
            // the messages come from libgeopm, but the codes are known without it
            let backend = match open_backend(&cli.library) {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!("{e:#}, printing generic messages");
                    None
                }
            };
            for kind in GeopmErrorKind::ALL {
                let code = kind.code();
                let message = match &backend {
                    Some(b) => error::error_message(b.as_ref(), code),
                    None => error::fallback_message(code),
                };
                println!("{code:>3}  {kind:?}: {message}");
            }
        }
        Commands::Run {
            region,
            hint,
            iterations,
            work_units,
            threads,
            unit_us,
        } => {
            let profiler = Profiler::new(open_backend(&cli.library)?);
            let workload = Workload {
                region,
                hint: hint.value(),
                iterations,
                work_units,
                threads,
                unit_duration: Duration::from_micros(unit_us),
            };
            let count = workload::run(&profiler, &workload)?;
            info!("calls made to libgeopm: {count:?}");
        }
        Commands::Call {
            operation,
            #[cfg(feature = "sidecar")]
            app_pid,
        } => {
            #[cfg(feature = "sidecar")]
            if let Some(pid) = app_pid {
                return call_sidecar(&operation, pid);
            }
            let profiler = Profiler::new(open_backend(&cli.library)?);
            call(&profiler, &operation)?;
        }
    }

    Ok(())
}

/// Opens the libgeopm selected at build time (feature `link`) or at run time.
fn open_backend(config: &LibraryConfig) -> anyhow::Result<Box<dyn GeopmProf>> {
    #[cfg(feature = "link")]
    {
        let _ = config;
        info!("using the libgeopm linked at build time");
        Ok(Box::new(LinkedGeopm))
    }
    #[cfg(not(feature = "link"))]
    {
        let dl = DlGeopm::open(config).context("libgeopm is required, set --geopm-library or GEOPM_PROF_LIBRARY")?;
        info!("using {:?}", dl.path());
        Ok(Box::new(dl))
    }
}

fn call<B: GeopmProf>(profiler: &Profiler<B>, operation: &Operation) -> anyhow::Result<()> {
    match operation {
        Operation::Region { name, hint } => {
            let id = profiler.region(name, hint.value())?;
            println!("{id}");
        }
        Operation::Enter { region_id } => profiler.enter(RegionId(*region_id))?,
        Operation::Exit { region_id } => profiler.exit(RegionId(*region_id))?,
        Operation::Epoch => profiler.epoch()?,
        Operation::Shutdown => profiler.shutdown()?,
        Operation::TprofInit { num_work_unit } => profiler.tprof_init(*num_work_unit)?,
        Operation::TprofPost => profiler.tprof_post()?,
    }
    Ok(())
}

#[cfg(feature = "sidecar")]
fn call_sidecar(operation: &Operation, app_pid: i32) -> anyhow::Result<()> {
    use geopm_prof::sidecar::{SidecarProfiler, SIDECAR_AVAILABLE};

    if !SIDECAR_AVAILABLE {
        warn!("libgeopm does not support calls on behalf of another process yet");
    }
    let sidecar = SidecarProfiler::unavailable();
    match operation {
        Operation::Region { name, hint } => {
            let id = sidecar.region(name, hint.value())?;
            println!("{id}");
        }
        Operation::Enter { region_id } => sidecar.enter(RegionId(*region_id), app_pid)?,
        Operation::Exit { region_id } => sidecar.exit(RegionId(*region_id), app_pid)?,
        Operation::Epoch => sidecar.epoch(app_pid)?,
        Operation::Shutdown => sidecar.shutdown(app_pid)?,
        Operation::TprofInit { num_work_unit } => sidecar.tprof_init(*num_work_unit, app_pid)?,
        Operation::TprofPost => sidecar.tprof_post(app_pid)?,
    }
    Ok(())
}
