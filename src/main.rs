use std::{io, process::ExitCode};

use anyhow::Result;
use gpuclockctl::{
    arg_parser::ArgsOptions,
    config::Config,
    dispatcher::dispatch,
    errors::{ClockError, ErrorKind, USAGE_TEXT},
    gpu_device::GpuBackend,
    logger,
    privilege::EffectiveUser,
    process::ChildProcessRunner,
};
use tracing::{debug, error};

// One invocation handles exactly one request, no need for worker threads
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logger::init_logging();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            for e in err.chain() {
                error!("{e}");
            }

            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    // Parse the command line arguments
    let args_options = match ArgsOptions::parse() {
        Ok(options) => options,
        Err(0) => return Ok(ExitCode::SUCCESS),
        Err(_) => return Ok(usage_failure()),
    };

    let result = match args_options.request() {
        Ok((mode, info)) => {
            let config = Config::load_or_default(
                args_options.config_file_path.as_deref(),
            )?;

            debug!("{:?} request: {:?}", mode, info);

            let runner = ChildProcessRunner::new(config.process_timeout());
            let backend =
                GpuBackend::new(info.vendor, &config, runner, EffectiveUser);

            dispatch(mode, info, &backend, &mut io::stdout(), &mut io::stderr())
                .await
        }
        // Nothing touches the GPU before every argument is validated
        Err(e) => Err(ClockError::from(e)),
    };

    match result {
        Ok(outcome) => {
            debug!("Finished with {:?}", outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.kind() == ErrorKind::Usage => {
            error!("{e}");
            Ok(usage_failure())
        }
        Err(e) => Err(e.into()),
    }
}

fn usage_failure() -> ExitCode {
    eprintln!("{USAGE_TEXT}");
    ExitCode::FAILURE
}
