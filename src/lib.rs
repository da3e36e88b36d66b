pub mod arg_parser;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod gpu_device;
pub mod gpu_info;
pub mod input;
pub mod logger;
pub mod privilege;
pub mod process;
