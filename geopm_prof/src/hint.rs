use std::fmt::Display;

use clap::ValueEnum;

/// Region hints understood by GEOPM (`enum geopm_region_hint_e` in `geopm_hint.h`).
///
/// The hint is only forwarded to the native library, which interprets it.
/// Any raw `u64` can be used instead of a variant, see [`crate::Profiler::region`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
#[repr(u64)]
pub enum RegionHint {
    /// no hint was given
    Unset = 0,
    /// the behavior of the region is unknown
    Unknown = 1,
    /// compute-bound
    Compute = 2,
    /// memory-bound
    Memory = 3,
    /// dominated by network traffic
    Network = 4,
    /// dominated by disk or file I/O
    Io = 5,
    /// executed by a single thread
    Serial = 6,
    /// executed by all threads
    Parallel = 7,
    /// should not be taken into account by the control policy
    Ignore = 8,
    /// the application is waiting, e.g. in a barrier
    Inactive = 9,
    /// busy-waiting
    Spin = 10,
}

impl RegionHint {
    pub const ALL: [RegionHint; 11] = [
        RegionHint::Unset,
        RegionHint::Unknown,
        RegionHint::Compute,
        RegionHint::Memory,
        RegionHint::Network,
        RegionHint::Io,
        RegionHint::Serial,
        RegionHint::Parallel,
        RegionHint::Ignore,
        RegionHint::Inactive,
        RegionHint::Spin,
    ];

    /// The name of the corresponding C enumerator.
    pub fn c_name(self) -> &'static str {
        match self {
            RegionHint::Unset => "GEOPM_REGION_HINT_UNSET",
            RegionHint::Unknown => "GEOPM_REGION_HINT_UNKNOWN",
            RegionHint::Compute => "GEOPM_REGION_HINT_COMPUTE",
            RegionHint::Memory => "GEOPM_REGION_HINT_MEMORY",
            RegionHint::Network => "GEOPM_REGION_HINT_NETWORK",
            RegionHint::Io => "GEOPM_REGION_HINT_IO",
            RegionHint::Serial => "GEOPM_REGION_HINT_SERIAL",
            RegionHint::Parallel => "GEOPM_REGION_HINT_PARALLEL",
            RegionHint::Ignore => "GEOPM_REGION_HINT_IGNORE",
            RegionHint::Inactive => "GEOPM_REGION_HINT_INACTIVE",
            RegionHint::Spin => "GEOPM_REGION_HINT_SPIN",
        }
    }
}

impl From<RegionHint> for u64 {
    fn from(hint: RegionHint) -> u64 {
        hint as u64
    }
}

/// Same name as on the command line.
impl Display for RegionHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.pad(value.get_name()),
            None => Ok(()),
        }
    }
}
