//! Scale audio volume by a linear factor.

use cf_core::{Error, MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

const MAX_LEVEL: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct Volume;

impl Schema for Volume {
    type Settings = f64;
    const PATHS: &'static [&'static str] = &["VOLUME.LEVEL"];

    fn parse(&self, config: &Configuration) -> Result<f64> {
        let level = config.number("VOLUME.LEVEL")?;
        if level <= 0.0 || level > MAX_LEVEL {
            return Err(Error::configuration(
                "VOLUME.LEVEL",
                format!("level must be in (0, {MAX_LEVEL}], got {level}"),
            ));
        }
        Ok(level)
    }

    fn synthesize(&self, level: &f64) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new([
            "-af".to_string(),
            format!("volume={level}"),
        ]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new(
        "VOLUME",
        "Change Volume",
        FileConfig::single(MediaType::Audio),
        Volume,
    )
    .description("Make an audio file louder or quieter")
    .progress("Adjusting Volume ...", "#16A085")
    .ui("volume")
}
