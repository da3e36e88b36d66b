use std::future::Future;

use crate::{
    config::Config,
    errors::ClockError,
    gpu_device::{amd_device::AmdDevice, nvidia_device::NvidiaDevice},
    gpu_info::{ClockOffsets, GpuVendor},
    privilege::PrivilegeCheck,
    process::ProcessRunner,
};

pub mod amd_device;
pub mod nvidia_device;

// Clock offset control of a GPU vendor
pub trait ClockControl {
    // Read the current core and memory clock offsets of a device
    fn get_clocks(
        &self,
        device: u32,
        perf_level: u32,
    ) -> impl Future<Output = Result<ClockOffsets, ClockError>>;

    // Apply the given core and memory clock offsets to a device.
    // The core offset is always applied before the memory offset
    fn set_clocks(
        &self,
        device: u32,
        offsets: ClockOffsets,
        perf_level: u32,
    ) -> impl Future<Output = Result<(), ClockError>>;
}

// The clock control backends, one per recognized vendor
pub enum GpuBackend<R, P> {
    Nvidia(NvidiaDevice<R>),
    Amd(AmdDevice<P>),
    // Recognized vendor with no way to control its clocks
    Unsupported(GpuVendor),
}

impl<R: ProcessRunner, P: PrivilegeCheck> GpuBackend<R, P> {
    // Select the backend matching the vendor
    pub fn new(
        vendor: GpuVendor,
        config: &Config,
        runner: R,
        privilege: P,
    ) -> Self {
        match vendor {
            GpuVendor::Nvidia => GpuBackend::Nvidia(NvidiaDevice::new(
                runner,
                &config.nvidia_settings,
            )),
            GpuVendor::Amd => {
                GpuBackend::Amd(AmdDevice::new(privilege, &config.drm_root))
            }
            GpuVendor::Intel => GpuBackend::Unsupported(vendor),
        }
    }
}

impl<R: ProcessRunner, P: PrivilegeCheck> ClockControl for GpuBackend<R, P> {
    async fn get_clocks(
        &self,
        device: u32,
        perf_level: u32,
    ) -> Result<ClockOffsets, ClockError> {
        match self {
            GpuBackend::Nvidia(nvidia) => {
                nvidia.get_clocks(device, perf_level).await
            }
            GpuBackend::Amd(amd) => amd.get_clocks(device, perf_level).await,
            GpuBackend::Unsupported(vendor) => {
                Err(ClockError::Unsupported { vendor: *vendor })
            }
        }
    }

    async fn set_clocks(
        &self,
        device: u32,
        offsets: ClockOffsets,
        perf_level: u32,
    ) -> Result<(), ClockError> {
        match self {
            GpuBackend::Nvidia(nvidia) => {
                nvidia.set_clocks(device, offsets, perf_level).await
            }
            GpuBackend::Amd(amd) => {
                amd.set_clocks(device, offsets, perf_level).await
            }
            GpuBackend::Unsupported(vendor) => {
                Err(ClockError::Unsupported { vendor: *vendor })
            }
        }
    }
}

// Stand-ins for the external collaborators
#[cfg(test)]
pub(crate) mod testing {
    use std::{cell::RefCell, collections::HashMap};

    use crate::{
        errors::ProcessError,
        privilege::PrivilegeCheck,
        process::{ProcessOutput, ProcessRunner},
    };

    // Fixed privilege level
    #[derive(Debug, Clone, Copy)]
    pub struct Privilege(pub bool);

    impl PrivilegeCheck for Privilege {
        fn is_superuser(&self) -> bool {
            self.0
        }
    }

    // Behaves like nvidia-settings: "-a" assigns attributes, "-q" reads them
    // back. Every invocation is recorded
    #[derive(Debug, Default)]
    pub struct FakeSettings {
        calls: RefCell<Vec<Vec<String>>>,
        attributes: RefCell<HashMap<String, String>>,
        default_output: String,
        failing: Option<String>,
    }

    impl FakeSettings {
        pub fn new() -> Self {
            Self {
                default_output: "0".to_string(),
                ..Default::default()
            }
        }

        // Output of queries for attributes that were never assigned
        pub fn with_output(mut self, output: &str) -> Self {
            self.default_output = output.to_string();
            self
        }

        pub fn with_attribute(self, address: &str, value: &str) -> Self {
            self.attributes
                .borrow_mut()
                .insert(address.to_string(), value.to_string());
            self
        }

        // Exit with status 1 for any address containing the pattern
        pub fn failing_on(mut self, pattern: &str) -> Self {
            self.failing = Some(pattern.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl ProcessRunner for FakeSettings {
        async fn run(
            &self,
            argv: &[String],
            capture: bool,
        ) -> Result<ProcessOutput, ProcessError> {
            self.calls.borrow_mut().push(argv.to_vec());

            let failed = |address: &str| {
                self.failing
                    .as_ref()
                    .is_some_and(|pattern| address.contains(pattern.as_str()))
            };
            let status = |output: String, address: &str| ProcessOutput {
                status: if failed(address) { 1 } else { 0 },
                output: if capture { output } else { String::new() },
            };

            match argv.get(1).map(String::as_str) {
                Some("-q") => {
                    let address = argv[2].as_str();
                    let value = self
                        .attributes
                        .borrow()
                        .get(address)
                        .cloned()
                        .unwrap_or_else(|| self.default_output.clone());

                    Ok(status(format!("{value}\n"), address))
                }
                Some("-a") => {
                    let assignment = argv[2].as_str();
                    if failed(assignment) {
                        return Ok(status(String::new(), assignment));
                    }

                    if let Some((address, value)) = assignment.split_once('=') {
                        self.attributes
                            .borrow_mut()
                            .insert(address.to_string(), value.to_string());
                    }

                    Ok(status(String::new(), assignment))
                }
                _ => Ok(ProcessOutput {
                    status: 2,
                    output: String::new(),
                }),
            }
        }
    }
}
