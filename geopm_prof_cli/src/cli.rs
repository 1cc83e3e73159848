use clap::{Parser, Subcommand};
use geopm_prof::{LibraryConfig, RegionHint};

#[derive(Parser)]
#[command(author, version)]
pub struct Cli {
    #[command(flatten)]
    pub library: LibraryConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a synthetic workload instrumented with a region, epochs and thread progress.
    Run {
        /// Name of the region that wraps each iteration.
        #[arg(short, long, default_value = "loop_body")]
        region: String,

        #[command(flatten)]
        hint: HintArgs,

        /// Number of iterations of the outer loop (one epoch per iteration).
        #[arg(short, long, default_value_t = 10)]
        iterations: u32,

        /// Units of work per iteration, shared between the threads.
        #[arg(short, long, default_value_t = 64)]
        work_units: u32,

        /// Number of worker threads.
        #[arg(short, long, default_value_t = 4)]
        threads: u32,

        /// Time spent on each unit of work, in microseconds.
        #[arg(long, default_value_t = 100)]
        unit_us: u64,
    },

    /// Make a single call to libgeopm and print its result.
    Call {
        #[command(subcommand)]
        operation: Operation,

        /// Issue the call on behalf of another process (not supported by libgeopm yet).
        #[cfg(feature = "sidecar")]
        #[arg(long, global = true)]
        app_pid: Option<i32>,
    },

    /// Print the GEOPM error codes and their messages.
    Errors,

    /// Print the region hints and their values.
    Hints,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Register a region and print its id.
    Region {
        name: String,

        #[command(flatten)]
        hint: HintArgs,
    },
    /// Enter a region.
    Enter {
        #[arg(value_parser = parse_region_id)]
        region_id: u64,
    },
    /// Exit a region.
    Exit {
        #[arg(value_parser = parse_region_id)]
        region_id: u64,
    },
    /// Mark an epoch.
    Epoch,
    /// Shut the profiler down.
    Shutdown,
    /// Start tracking the progress of this thread.
    TprofInit { num_work_unit: u32 },
    /// Report one unit of work.
    TprofPost,
}

#[derive(clap::Args, Clone, Debug, PartialEq, Eq)]
pub struct HintArgs {
    /// Hint given to GEOPM about the behavior of the region.
    #[arg(long, value_enum, default_value_t = RegionHint::Unknown)]
    pub hint: RegionHint,

    /// Raw hint value, forwarded as-is. Overrides --hint.
    #[arg(long)]
    pub raw_hint: Option<u64>,
}

impl HintArgs {
    pub fn value(&self) -> u64 {
        self.raw_hint.unwrap_or(self.hint.into())
    }
}

/// Parses a region id, in decimal or in hexadecimal with a `0x` prefix (as printed by `call region`).
pub fn parse_region_id(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid region id '{s}': {e}"))
}
