use std::ffi::{c_char, c_int, CStr};

use crate::GeopmProf;

/// Size of the buffer given to `geopm_error_message`, same as the other GEOPM bindings.
pub const ERROR_MESSAGE_MAX: usize = 4096;

pub type Result<T> = std::result::Result<T, ProfError>;

#[derive(Clone, Debug, thiserror::Error)]
pub enum ProfError {
    /// A native call returned a non-zero status. `code` is the status, untouched.
    #[error("{function}() failed: {message}")]
    Native {
        function: &'static str,
        code: c_int,
        message: String,
    },

    /// The region name cannot be turned into a C string. No native call was made.
    #[error("invalid region name {name:?}: contains a nul byte at position {position}")]
    InvalidName { name: String, position: usize },

    /// libgeopm (or one of its entry points) could not be loaded.
    #[error("failed to load {library}: {reason}")]
    Load { library: String, reason: String },

    /// The entry point exists in the binding but not (yet) in the native library.
    #[error("{function}() is not available in the native library")]
    Unavailable { function: &'static str },
}

impl ProfError {
    /// The raw status returned by the native library, if this error comes from a native call.
    pub fn code(&self) -> Option<c_int> {
        match self {
            ProfError::Native { code, .. } => Some(*code),
            ProfError::Unavailable { .. } => Some(GeopmErrorKind::NotImplemented.code()),
            _ => None,
        }
    }

    /// The GEOPM error kind, if the native status is one of the documented GEOPM codes.
    pub fn kind(&self) -> Option<GeopmErrorKind> {
        self.code().and_then(GeopmErrorKind::from_code)
    }
}

/// GEOPM error codes (`enum geopm_error_e` in `geopm_error.h`).
///
/// Negative statuses are GEOPM errors, positive statuses are `errno` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeopmErrorKind {
    Runtime,
    Logic,
    Invalid,
    FileParse,
    LevelRange,
    NotImplemented,
    PlatformUnsupported,
    MsrOpen,
    MsrRead,
    MsrWrite,
    AgentUnsupported,
    Affinity,
    NoAgent,
}

impl GeopmErrorKind {
    pub const ALL: [GeopmErrorKind; 13] = [
        GeopmErrorKind::Runtime,
        GeopmErrorKind::Logic,
        GeopmErrorKind::Invalid,
        GeopmErrorKind::FileParse,
        GeopmErrorKind::LevelRange,
        GeopmErrorKind::NotImplemented,
        GeopmErrorKind::PlatformUnsupported,
        GeopmErrorKind::MsrOpen,
        GeopmErrorKind::MsrRead,
        GeopmErrorKind::MsrWrite,
        GeopmErrorKind::AgentUnsupported,
        GeopmErrorKind::Affinity,
        GeopmErrorKind::NoAgent,
    ];

    pub const fn code(self) -> c_int {
        match self {
            GeopmErrorKind::Runtime => -1,
            GeopmErrorKind::Logic => -2,
            GeopmErrorKind::Invalid => -3,
            GeopmErrorKind::FileParse => -4,
            GeopmErrorKind::LevelRange => -5,
            GeopmErrorKind::NotImplemented => -6,
            GeopmErrorKind::PlatformUnsupported => -7,
            GeopmErrorKind::MsrOpen => -8,
            GeopmErrorKind::MsrRead => -9,
            GeopmErrorKind::MsrWrite => -10,
            GeopmErrorKind::AgentUnsupported => -11,
            GeopmErrorKind::Affinity => -12,
            GeopmErrorKind::NoAgent => -13,
        }
    }

    pub fn from_code(code: c_int) -> Option<GeopmErrorKind> {
        GeopmErrorKind::ALL.into_iter().find(|k| k.code() == code)
    }
}

/// Asks the backend for the message of an error code, with a generic fallback
/// if the backend has no `geopm_error_message`.
pub fn error_message<B: GeopmProf + ?Sized>(backend: &B, code: c_int) -> String {
    // Safety: `fill_message` gives a buffer valid for `size` bytes that outlives the call.
    fill_message(code, |msg, size| unsafe { backend.error_message(code, msg, size) })
}

/// Runs `fill` on a zeroed buffer of [`ERROR_MESSAGE_MAX`] bytes and reads the C string back.
pub(crate) fn fill_message(code: c_int, fill: impl FnOnce(*mut c_char, usize)) -> String {
    let mut buf = vec![0 as c_char; ERROR_MESSAGE_MAX];
    fill(buf.as_mut_ptr(), buf.len());

    // the native function may fill the whole buffer without a terminating nul
    buf[ERROR_MESSAGE_MAX - 1] = 0;
    let msg = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy();
    if msg.is_empty() {
        fallback_message(code)
    } else {
        msg.into_owned()
    }
}

/// The message used when libgeopm can't provide one.
pub fn fallback_message(code: c_int) -> String {
    match GeopmErrorKind::from_code(code) {
        Some(kind) => format!("<geopm> {kind:?} error (code {code})"),
        None if code > 0 => std::io::Error::from_raw_os_error(code).to_string(),
        None => format!("<geopm> unknown error (code {code})"),
    }
}

/// Turns a native status into a `Result`, fetching the message on failure.
pub(crate) fn check(function: &'static str, status: c_int, message: impl FnOnce(c_int) -> String) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        let message = message(status);
        log::debug!("{function}() returned {status}: {message}");
        Err(ProfError::Native {
            function,
            code: status,
            message,
        })
    }
}
