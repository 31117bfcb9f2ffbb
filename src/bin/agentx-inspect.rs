#[macro_use]
extern crate log;

use agentx_codec::configuration::{parse_hex, Configuration, Parser};
use agentx_codec::inspect;

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let conf = Configuration::parse();
    if let Err(e) = conf.validate() {
        error!("Configuration is broken: {}", e);
        return ExitCode::from(2);
    }

    let bytes = match read_input(&conf) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Cannot read input: {}", e);
            return ExitCode::from(2);
        }
    };
    info!("Inspecting {} bytes", bytes.len());

    match inspect::decode_stream(&bytes, conf.strict) {
        Ok(report) => {
            report.print(conf.format);
            if report.error.is_some() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("Malformed PDU: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_input(conf: &Configuration) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match (&conf.hex, &conf.file) {
        (Some(hex), _) => Ok(parse_hex(hex)?),
        (None, Some(path)) => Ok(std::fs::read(path)?),
        (None, None) => Err("no input".into()),
    }
}
