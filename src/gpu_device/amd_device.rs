use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    errors::ClockError,
    gpu_device::ClockControl,
    gpu_info::{ClockOffsets, GpuVendor},
    privilege::PrivilegeCheck,
};

// OverDrive control files of the amdgpu driver
pub const CORE_OVERDRIVE_FILE: &str = "pp_sclk_od";
pub const MEM_OVERDRIVE_FILE: &str = "pp_mclk_od";

// AMD clocks are controlled by writing to the amdgpu sysfs files
// "<drm root>/card<device>/device/pp_{s,m}clk_od", which only root can do
pub struct AmdDevice<P> {
    privilege: P,

    // Usually /sys/class/drm
    drm_root: PathBuf,
}

impl<P: PrivilegeCheck> AmdDevice<P> {
    pub fn new(privilege: P, drm_root: &Path) -> Self {
        Self {
            privilege,
            drm_root: drm_root.to_path_buf(),
        }
    }

    pub fn control_file(&self, device: u32, name: &str) -> PathBuf {
        self.drm_root
            .join(format!("card{device}"))
            .join("device")
            .join(name)
    }
}

impl<P: PrivilegeCheck> ClockControl for AmdDevice<P> {
    // Reading the OverDrive state back is not supported
    async fn get_clocks(
        &self,
        _device: u32,
        _perf_level: u32,
    ) -> Result<ClockOffsets, ClockError> {
        Err(ClockError::ReadUnsupported {
            vendor: GpuVendor::Amd,
        })
    }

    async fn set_clocks(
        &self,
        device: u32,
        offsets: ClockOffsets,
        _perf_level: u32,
    ) -> Result<(), ClockError> {
        if !self.privilege.is_superuser() {
            return Err(ClockError::NotPrivileged {
                vendor: GpuVendor::Amd,
            });
        }

        // A failed core write leaves the memory clock untouched
        write_control_file(
            &self.control_file(device, CORE_OVERDRIVE_FILE),
            offsets.core,
        )?;
        write_control_file(
            &self.control_file(device, MEM_OVERDRIVE_FILE),
            offsets.mem,
        )?;

        Ok(())
    }
}

// Truncate the file and write the value as decimal text
fn write_control_file(path: &Path, value: i64) -> Result<(), ClockError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| ClockError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    file.write_all(value.to_string().as_bytes())
        .map_err(|source| ClockError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    close(file).map_err(|source| ClockError::Close {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Wrote {} to {:?}", value, path);

    Ok(())
}

// Dropping a File discards close errors, close it explicitly instead
#[cfg(unix)]
fn close(file: File) -> io::Result<()> {
    use std::os::fd::IntoRawFd;

    nix::unistd::close(file.into_raw_fd()).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn close(file: File) -> io::Result<()> {
    file.sync_all()
}
