use std::io::{self, Write};

use tracing::info;

use crate::{
    errors::{ClockError, ErrorKind},
    gpu_device::ClockControl,
    gpu_info::{GpuInfo, GpuVendor, Mode},
};

// Result of a completed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    // Get succeeded, the record holds the offsets read from the device
    Read(GpuInfo),
    // Set succeeded
    Applied,
    // Nothing could be done for this vendor
    NoOp,
}

// Run one Get or Set request against the backend.
// Values and confirmations go to `out`, notices to `err`
pub async fn dispatch<B: ClockControl>(
    mode: Mode,
    mut info: GpuInfo,
    backend: &B,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<Outcome, ClockError> {
    match mode {
        Mode::Get => {
            let result =
                backend.get_clocks(info.device, info.nv_perf_level).await;

            match result {
                Ok(offsets) => {
                    info.core = offsets.core;
                    info.mem = offsets.mem;

                    write_line(out, format_args!("{} {}", info.core, info.mem))?;

                    Ok(Outcome::Read(info))
                }
                Err(e) => no_op(e, out, err),
            }
        }
        Mode::Set => {
            write_line(
                out,
                format_args!(
                    "gpuclockctl setting core:{} mem:{} on device:{} with vendor {}",
                    info.core, info.mem, info.device, info.vendor
                ),
            )?;

            if info.vendor == GpuVendor::Nvidia {
                write_line(
                    out,
                    format_args!("on Performance Level {}", info.nv_perf_level),
                )?;
            }

            // Get the confirmation out before touching the device
            out.flush().map_err(stream_error)?;

            let result = backend
                .set_clocks(info.device, info.offsets(), info.nv_perf_level)
                .await;

            match result {
                Ok(()) => {
                    info!(
                        "Applied core:{} mem:{} to device {}",
                        info.core, info.mem, info.device
                    );

                    Ok(Outcome::Applied)
                }
                Err(e) => no_op(e, out, err),
            }
        }
    }
}

// Report the recognized do-nothing conditions, pass every other error on
fn no_op(
    e: ClockError,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<Outcome, ClockError> {
    if e.kind() != ErrorKind::NoOp {
        return Err(e);
    }

    // Unknown vendors are reported on stdout, missing read support on stderr
    if matches!(e, ClockError::Unsupported { .. }) {
        write_line(out, format_args!("{e}"))?;
    } else {
        write_line(err, format_args!("{e}"))?;
    }

    Ok(Outcome::NoOp)
}

fn write_line(
    stream: &mut impl Write,
    line: std::fmt::Arguments<'_>,
) -> Result<(), ClockError> {
    writeln!(stream, "{line}").map_err(stream_error)
}

fn stream_error(source: io::Error) -> ClockError {
    ClockError::Write {
        path: "<output stream>".into(),
        source,
    }
}
