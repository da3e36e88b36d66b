use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    errors::ClockError,
    gpu_device::ClockControl,
    gpu_info::ClockOffsets,
    input::parse_long,
    process::ProcessRunner,
};

pub const CORE_OFFSET_ATTRIBUTE: &str = "GPUGraphicsClockOffset";
pub const MEM_OFFSET_ATTRIBUTE: &str = "GPUMemoryTransferRateOffset";

// Nvidia clocks are controlled through nvidia-settings, which talks to the
// driver over the X session. The offsets are addressed as
// "[gpu:<device>]/<attribute>[<performance level>]"
pub struct NvidiaDevice<R> {
    runner: R,

    // Path of the nvidia-settings executable
    nvidia_settings: PathBuf,
}

impl<R: ProcessRunner> NvidiaDevice<R> {
    pub fn new(runner: R, nvidia_settings: &Path) -> Self {
        Self {
            runner,
            nvidia_settings: nvidia_settings.to_path_buf(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    // Query one attribute and parse its value
    async fn query(&self, address: &str) -> Result<i64, ClockError> {
        let argv = self.command(&["-q", address, "-t"]);

        let output = self.runner.run(&argv, true).await.map_err(|source| {
            ClockError::Process {
                address: address.to_string(),
                source,
            }
        })?;

        if !output.success() {
            return Err(ClockError::ToolFailed {
                action: "query",
                address: address.to_string(),
                status: output.status,
            });
        }

        parse_long(&output.output, 10).ok_or_else(|| ClockError::Unparseable {
            address: address.to_string(),
            output: output.output.trim_end().to_string(),
        })
    }

    // Assign a value to one attribute
    async fn assign(&self, address: &str, value: i64) -> Result<(), ClockError> {
        let assignment = format!("{address}={value}");
        let argv = self.command(&["-a", assignment.as_str()]);

        let output = self.runner.run(&argv, false).await.map_err(|source| {
            ClockError::Process {
                address: assignment.clone(),
                source,
            }
        })?;

        if !output.success() {
            return Err(ClockError::ToolFailed {
                action: "set",
                address: assignment,
                status: output.status,
            });
        }

        debug!("Assigned {}", assignment);

        Ok(())
    }

    fn command(&self, args: &[&str]) -> Vec<String> {
        let mut argv = vec![self.nvidia_settings.to_string_lossy().into_owned()];
        argv.extend(args.iter().map(|arg| arg.to_string()));

        argv
    }
}

impl<R: ProcessRunner> ClockControl for NvidiaDevice<R> {
    async fn get_clocks(
        &self,
        device: u32,
        perf_level: u32,
    ) -> Result<ClockOffsets, ClockError> {
        if !session_available(&["DISPLAY"]) {
            warn!(
                "Getting Nvidia parameters requires DISPLAY to be set - will likely fail!"
            );
        }

        let core = self
            .query(&address(device, CORE_OFFSET_ATTRIBUTE, perf_level))
            .await?;
        let mem = self
            .query(&address(device, MEM_OFFSET_ATTRIBUTE, perf_level))
            .await?;

        Ok(ClockOffsets { core, mem })
    }

    async fn set_clocks(
        &self,
        device: u32,
        offsets: ClockOffsets,
        perf_level: u32,
    ) -> Result<(), ClockError> {
        if !session_available(&["DISPLAY", "XAUTHORITY"]) {
            warn!(
                "Setting Nvidia parameters requires DISPLAY and XAUTHORITY to be set - will likely fail!"
            );
        }

        self.assign(
            &address(device, CORE_OFFSET_ATTRIBUTE, perf_level),
            offsets.core,
        )
        .await?;
        self.assign(
            &address(device, MEM_OFFSET_ATTRIBUTE, perf_level),
            offsets.mem,
        )
        .await?;

        Ok(())
    }
}

pub fn address(device: u32, attribute: &str, perf_level: u32) -> String {
    format!("[gpu:{device}]/{attribute}[{perf_level}]")
}

// nvidia-settings needs a live display session
fn session_available(variables: &[&str]) -> bool {
    variables.iter().all(|var| env::var_os(var).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_device::testing::FakeSettings;

    const TOOL: &str = "/usr/bin/nvidia-settings";

    fn device(settings: FakeSettings) -> NvidiaDevice<FakeSettings> {
        NvidiaDevice::new(settings, Path::new(TOOL))
    }

    fn argv(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn attribute_address() {
        assert_eq!(
            address(1, CORE_OFFSET_ATTRIBUTE, 3),
            "[gpu:1]/GPUGraphicsClockOffset[3]"
        );
        assert_eq!(
            address(0, MEM_OFFSET_ATTRIBUTE, 0),
            "[gpu:0]/GPUMemoryTransferRateOffset[0]"
        );
    }

    #[tokio::test]
    async fn get_queries_core_then_mem() {
        let nvidia = device(
            FakeSettings::new()
                .with_attribute("[gpu:0]/GPUGraphicsClockOffset[2]", "100")
                .with_attribute("[gpu:0]/GPUMemoryTransferRateOffset[2]", "-200"),
        );

        let offsets = nvidia.get_clocks(0, 2).await.unwrap();
        assert_eq!(offsets, ClockOffsets { core: 100, mem: -200 });

        assert_eq!(
            nvidia.runner().calls(),
            vec![
                argv(&[TOOL, "-q", "[gpu:0]/GPUGraphicsClockOffset[2]", "-t"]),
                argv(&[TOOL, "-q", "[gpu:0]/GPUMemoryTransferRateOffset[2]", "-t"]),
            ]
        );
    }

    #[tokio::test]
    async fn both_queries_returning_42() {
        let nvidia = device(FakeSettings::new().with_output("42"));

        let offsets = nvidia.get_clocks(0, 0).await.unwrap();
        assert_eq!(offsets, ClockOffsets { core: 42, mem: 42 });
    }

    #[tokio::test]
    async fn unparseable_output_aborts_get() {
        let nvidia = device(
            FakeSettings::new()
                .with_attribute("[gpu:0]/GPUGraphicsClockOffset[0]", "ERROR: no display"),
        );

        let result = nvidia.get_clocks(0, 0).await;
        assert!(matches!(result, Err(ClockError::Unparseable { .. })));

        // The memory offset is never queried
        assert_eq!(nvidia.runner().calls().len(), 1);
    }

    #[tokio::test]
    async fn failing_mem_query_returns_no_partial_result() {
        let nvidia = device(
            FakeSettings::new()
                .with_output("10")
                .failing_on(MEM_OFFSET_ATTRIBUTE),
        );

        let result = nvidia.get_clocks(0, 0).await;
        assert!(matches!(
            result,
            Err(ClockError::ToolFailed { action: "query", status: 1, .. })
        ));
        assert_eq!(nvidia.runner().calls().len(), 2);
    }

    #[tokio::test]
    async fn set_assigns_core_then_mem() {
        let nvidia = device(FakeSettings::new());

        nvidia
            .set_clocks(1, ClockOffsets { core: 150, mem: 500 }, 3)
            .await
            .unwrap();

        assert_eq!(
            nvidia.runner().calls(),
            vec![
                argv(&[TOOL, "-a", "[gpu:1]/GPUGraphicsClockOffset[3]=150"]),
                argv(&[TOOL, "-a", "[gpu:1]/GPUMemoryTransferRateOffset[3]=500"]),
            ]
        );
    }

    #[tokio::test]
    async fn failing_core_assignment_skips_mem() {
        let nvidia = device(FakeSettings::new().failing_on(CORE_OFFSET_ATTRIBUTE));

        let result = nvidia
            .set_clocks(0, ClockOffsets { core: 150, mem: 500 }, 0)
            .await;

        match result {
            Err(ClockError::ToolFailed { action, address, .. }) => {
                assert_eq!(action, "set");
                assert_eq!(address, "[gpu:0]/GPUGraphicsClockOffset[0]=150");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(nvidia.runner().calls().len(), 1);
    }

    #[tokio::test]
    async fn get_set_get_round_trip() {
        let nvidia = device(
            FakeSettings::new()
                .with_attribute("[gpu:0]/GPUGraphicsClockOffset[1]", "75")
                .with_attribute("[gpu:0]/GPUMemoryTransferRateOffset[1]", "300"),
        );

        let before = nvidia.get_clocks(0, 1).await.unwrap();
        nvidia.set_clocks(0, before, 1).await.unwrap();
        let after = nvidia.get_clocks(0, 1).await.unwrap();

        assert_eq!(before, after);
        assert_eq!(after, ClockOffsets { core: 75, mem: 300 });
    }
}
