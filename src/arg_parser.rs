use std::{io::Write, path::PathBuf};

use argparse::{ArgumentParser, List, Print, Store, StoreOption};

use crate::{
    errors::UsageError,
    gpu_info::{GpuInfo, Mode},
    input::parse_request,
};

// Raw command line tokens, validated later by `request`
#[derive(Debug, Default)]
pub struct ArgsOptions {
    pub config_file_path: Option<PathBuf>,

    pub vendor: String,
    pub device: String,
    pub mode: String,
    pub operands: Vec<String>,
}

impl ArgsOptions {
    // Parse the process arguments.
    // On failure the argparse exit code is returned, 0 for --help and --version
    pub fn parse() -> Result<Self, i32> {
        Self::parse_from(
            std::env::args().collect(),
            &mut std::io::stdout(),
            &mut std::io::stderr(),
        )
    }

    pub fn parse_from(
        args: Vec<String>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Self, i32> {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();
            parser.set_description("Get or set the clock offsets of a GPU");

            // Configuration file path
            parser.refer(&mut options.config_file_path).add_option(
                &["-c", "--config"],
                StoreOption,
                "The file path of the Json configuration file",
            );

            // Show helper version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the helper version",
            );

            parser
                .refer(&mut options.vendor)
                .add_argument("vendor", Store, "PCI vendor id of the GPU")
                .required();
            parser
                .refer(&mut options.device)
                .add_argument("device", Store, "Index of the GPU")
                .required();
            parser
                .refer(&mut options.mode)
                .add_argument("mode", Store, "\"get\" or \"set\"")
                .required();
            parser.refer(&mut options.operands).add_argument(
                "operands",
                List,
                "CORE MEM [PERF_LEVEL] for set, [PERF_LEVEL] for get",
            );

            parser.parse(args, stdout, stderr)?;
        }

        Ok(options)
    }

    // Validate the positional arguments
    pub fn request(&self) -> Result<(Mode, GpuInfo), UsageError> {
        parse_request(&self.vendor, &self.device, &self.mode, &self.operands)
    }
}
