//! Keep only the segment between two timestamps.

use cf_core::{Error, MediaType, Result};

use super::seconds;
use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

const NAME: &str = "Trim";

#[derive(Debug, Clone, Copy)]
pub struct Trim;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSettings {
    pub start: f64,
    pub end: f64,
}

impl Schema for Trim {
    type Settings = TrimSettings;
    const PATHS: &'static [&'static str] = &["TRIM.START", "TRIM.END"];

    fn parse(&self, config: &Configuration) -> Result<TrimSettings> {
        Ok(TrimSettings {
            start: seconds(config, "TRIM.START")?,
            end: seconds(config, "TRIM.END")?,
        })
    }

    fn synthesize(&self, s: &TrimSettings) -> Result<CompiledCommand> {
        if s.start >= s.end {
            return Err(Error::invariant(
                NAME,
                format!("start {}s must be before end {}s", s.start, s.end),
            ));
        }
        Ok(CompiledCommand::new([
            "-ss".to_string(),
            s.start.to_string(),
            "-to".to_string(),
            s.end.to_string(),
        ]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new("TRIM", NAME, FileConfig::single(MediaType::Video), Trim)
        .description("Cut a video down to a time range")
        .progress("Trimming ...", "#BD3F71")
        .ui("trim")
}
