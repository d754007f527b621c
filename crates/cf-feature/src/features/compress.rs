//! Re-encode with x264 at a constant rate factor.

use cf_core::{Error, MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

const MAX_CRF: u32 = 51;
const DEFAULT_PRESET: &str = "medium";
const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

#[derive(Debug, Clone, Copy)]
pub struct Compress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressSettings {
    pub crf: u32,
    pub preset: String,
}

impl Schema for Compress {
    type Settings = CompressSettings;
    const PATHS: &'static [&'static str] = &["COMPRESS.CRF", "COMPRESS.PRESET"];

    fn parse(&self, config: &Configuration) -> Result<CompressSettings> {
        let crf = config.integer("COMPRESS.CRF")?;
        if crf > MAX_CRF {
            return Err(Error::configuration(
                "COMPRESS.CRF",
                format!("CRF must be between 0 and {MAX_CRF}, got {crf}"),
            ));
        }
        let preset = config
            .optional_text("COMPRESS.PRESET")?
            .unwrap_or(DEFAULT_PRESET);
        if !PRESETS.contains(&preset) {
            return Err(Error::configuration(
                "COMPRESS.PRESET",
                format!("unknown preset `{preset}`"),
            ));
        }
        Ok(CompressSettings {
            crf,
            preset: preset.to_string(),
        })
    }

    fn synthesize(&self, s: &CompressSettings) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            s.crf.to_string(),
            "-preset".to_string(),
            s.preset.clone(),
        ]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    let mut defaults = Configuration::new();
    defaults.set("COMPRESS.CRF", 23);

    FeatureEntry::new("COMPRESS", "Compress", FileConfig::single(MediaType::Video), Compress)
        .description("Reduce file size by re-encoding with H.264")
        .progress("Compressing ...", "#3F71BD")
        .ui("compress")
        .defaults(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;

    #[test]
    fn preset_defaults_to_medium() {
        let mut cfg = Configuration::new();
        cfg.set("COMPRESS.CRF", 28);
        assert_eq!(
            Compress.compile(&cfg).unwrap().to_string(),
            "-c:v libx264 -crf 28 -preset medium"
        );
    }

    #[test]
    fn crf_out_of_range() {
        let mut cfg = Configuration::new();
        cfg.set("COMPRESS.CRF", 52);
        assert!(Compress.validate(&cfg).is_err());
    }

    #[test]
    fn unknown_preset() {
        let mut cfg = Configuration::new();
        cfg.set("COMPRESS.CRF", 20).set("COMPRESS.PRESET", "warp");
        let err = Compress.validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("warp"));
    }
}
