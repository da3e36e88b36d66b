use std::{io, path::PathBuf};

use thiserror::Error;

use crate::gpu_info::GpuVendor;

pub const USAGE_TEXT: &str =
    "usage: gpuclockctl PCI_ID DEVICE [get] [set CORE MEM [PERF_LEVEL]]]";

// Malformed command line input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Invalid GPU Vendor passed ({token:?})!")]
    InvalidVendor { token: String },
    #[error("Invalid GPU device passed ({token:?})!")]
    InvalidDevice { token: String },
    #[error("Invalid value passed ({token:?})!")]
    InvalidValue { token: String },
    #[error("Unknown mode {mode:?}")]
    UnknownMode { mode: String },
    #[error("Wrong number of arguments for {mode:?}: {count}")]
    WrongArity { mode: String, count: usize },
}

// Failure of the external process collaborator
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No command given")]
    EmptyCommand,
    #[error("Failed to spawn \"{program}\": {source}")]
    Spawn { program: String, source: io::Error },
    #[error("\"{program}\" did not finish within {secs} seconds")]
    Timeout { program: String, secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Terminates with the usage message
    Usage,
    // Backend I/O failure, exits non zero
    Backend,
    // Recognized condition with nothing to do, exits zero
    NoOp,
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("gpuclockctl must be run as root to set {} values", .vendor.name())]
    NotPrivileged { vendor: GpuVendor },

    #[error("Failed to run command for {address}: {source}")]
    Process {
        address: String,
        source: ProcessError,
    },
    #[error("Failed to {action} {address} (exit status {status})!")]
    ToolFailed {
        action: &'static str,
        address: String,
        status: i32,
    },
    #[error("Failed to parse output for \"{address}\" output was \"{output}\"!")]
    Unparseable { address: String, output: String },

    #[error("Could not open {} for write ({source})!", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("Could not write to {} ({source})!", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Could not close {} after writing ({source})!", .path.display())]
    Close { path: PathBuf, source: io::Error },

    #[error("Fetching GPU state on {} is currently unimplemented!", .vendor.name())]
    ReadUnsupported { vendor: GpuVendor },
    #[error("Currently unsupported GPU vendor {vendor}, doing nothing!")]
    Unsupported { vendor: GpuVendor },
}

impl ClockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClockError::Usage(_) | ClockError::NotPrivileged { .. } => {
                ErrorKind::Usage
            }
            ClockError::ReadUnsupported { .. }
            | ClockError::Unsupported { .. } => ErrorKind::NoOp,
            _ => ErrorKind::Backend,
        }
    }
}
