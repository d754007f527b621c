//! Drop every audio stream.

use cf_core::{MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

#[derive(Debug, Clone, Copy)]
pub struct RemoveAudio;

impl Schema for RemoveAudio {
    type Settings = ();
    const PATHS: &'static [&'static str] = &[];

    fn parse(&self, _config: &Configuration) -> Result<()> {
        Ok(())
    }

    fn synthesize(&self, _settings: &()) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new(["-c:v", "copy", "-an"]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new(
        "REMOVE_AUDIO",
        "Remove Audio",
        FileConfig::single(MediaType::Video),
        RemoveAudio,
    )
    .description("Strip the audio track from a video")
    .progress("Removing Audio ...", "#C0392B")
    .defaults(Configuration::new())
}
