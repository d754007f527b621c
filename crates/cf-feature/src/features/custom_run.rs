//! Run user-supplied transcoder arguments verbatim.
//!
//! Inputs and outputs are always supplied by the engine, so arguments that
//! try to name them are rejected. Arguments are split on whitespace; quoting
//! is not interpreted.

use cf_core::{Error, MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

const NAME: &str = "Custom Run";

#[derive(Debug, Clone, Copy)]
pub struct CustomRun;

impl Schema for CustomRun {
    type Settings = Vec<String>;
    const PATHS: &'static [&'static str] = &["CUSTOM_RUN"];

    fn parse(&self, config: &Configuration) -> Result<Vec<String>> {
        let args: Vec<String> = config
            .text("CUSTOM_RUN")?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if args.is_empty() {
            return Err(Error::configuration("CUSTOM_RUN", "no arguments given"));
        }
        Ok(args)
    }

    fn synthesize(&self, args: &Vec<String>) -> Result<CompiledCommand> {
        if let Some(arg) = args.iter().find(|a| *a == "-i" || *a == "-y" || *a == "-n") {
            return Err(Error::invariant(
                NAME,
                format!("`{arg}` is managed by the engine and cannot be overridden"),
            ));
        }
        Ok(CompiledCommand::new(args.iter().cloned()))
    }
}

pub(super) fn entry() -> FeatureEntry {
    let file_config = FileConfig::optional(MediaType::Video, &[MediaType::Audio, MediaType::Image]);

    FeatureEntry::new("CUSTOM_RUN", NAME, file_config, CustomRun)
        .description("Run your own ffmpeg arguments")
        .progress("Running Custom Command ...", "#F39C12")
        .ui("custom-run")
        .hidden()
}
