use std::fmt;

// PCI vendor identifiers of the recognized GPU vendors
pub const NVIDIA_VENDOR_ID: u16 = 0x10de;
pub const AMD_VENDOR_ID: u16 = 0x1002;
pub const INTEL_VENDOR_ID: u16 = 0x8086;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    // Recognized, but no clock control backend exists for it
    Intel,
}

impl GpuVendor {
    // Map a numeric vendor identifier to a recognized vendor
    pub fn from_id(id: i64) -> Option<Self> {
        match u16::try_from(id).ok()? {
            NVIDIA_VENDOR_ID => Some(GpuVendor::Nvidia),
            AMD_VENDOR_ID => Some(GpuVendor::Amd),
            INTEL_VENDOR_ID => Some(GpuVendor::Intel),
            _ => None,
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            GpuVendor::Nvidia => NVIDIA_VENDOR_ID,
            GpuVendor::Amd => AMD_VENDOR_ID,
            GpuVendor::Intel => INTEL_VENDOR_ID,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "Nvidia",
            GpuVendor::Amd => "AMD",
            GpuVendor::Intel => "Intel",
        }
    }
}

// Vendors are shown the way they are passed on the command line
impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.id())
    }
}

// The operation requested for this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Get,
    Set,
}

// Core and memory clock offsets
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockOffsets {
    pub core: i64,
    pub mem: i64,
}

impl From<(i64, i64)> for ClockOffsets {
    fn from(value: (i64, i64)) -> Self {
        Self {
            core: value.0,
            mem: value.1,
        }
    }
}

// Request and response record of a single invocation.
// For Get the offsets are filled in by the backend,
// for Set they are supplied on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub vendor: GpuVendor,
    pub device: u32,

    pub core: i64,
    pub mem: i64,

    // Only meaningful for Nvidia GPUs
    pub nv_perf_level: u32,
}

impl GpuInfo {
    pub fn new(vendor: GpuVendor, device: u32) -> Self {
        Self {
            vendor,
            device,
            core: 0,
            mem: 0,
            nv_perf_level: 0,
        }
    }

    pub fn offsets(&self) -> ClockOffsets {
        ClockOffsets {
            core: self.core,
            mem: self.mem,
        }
    }
}
