//! Input constraints declared by each feature.

use std::collections::BTreeMap;

use cf_core::{Error, MediaType, Result};
use serde::{Deserialize, Serialize};

/// Inclusive bounds on how many inputs of one media type a step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    /// Exactly one input.
    pub const ONE: CountRange = CountRange { min: 1, max: 1 };

    /// Whether `count` lies within `[min, max]`.
    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Accepted inputs of a single media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequirement {
    pub media_type: MediaType,
    pub count: CountRange,
}

impl FileRequirement {
    pub fn new(media_type: MediaType, min: u32, max: u32) -> Self {
        Self {
            media_type,
            count: CountRange { min, max },
        }
    }
}

/// The set of inputs a feature accepts, plus the primary type used for
/// compatibility checks with adjacent steps.
///
/// Invariants, enforced by [`FileConfig::new`] and on deserialization:
/// at least one requirement, `min <= max` for each, no media type listed
/// twice, and `primary_type` is one of the listed types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileConfig")]
pub struct FileConfig {
    types: Vec<FileRequirement>,
    primary_type: MediaType,
}

#[derive(Deserialize)]
struct RawFileConfig {
    types: Vec<FileRequirement>,
    primary_type: MediaType,
}

impl TryFrom<RawFileConfig> for FileConfig {
    type Error = Error;

    fn try_from(raw: RawFileConfig) -> Result<Self> {
        FileConfig::new(raw.types, raw.primary_type)
    }
}

impl FileConfig {
    /// Build a file config, checking its invariants.
    pub fn new(types: Vec<FileRequirement>, primary_type: MediaType) -> Result<Self> {
        if types.is_empty() {
            return Err(Error::Validation(
                "file config must declare at least one media type".into(),
            ));
        }
        for (i, req) in types.iter().enumerate() {
            if req.count.min > req.count.max {
                return Err(Error::Validation(format!(
                    "file config entry for {} has min {} > max {}",
                    req.media_type, req.count.min, req.count.max
                )));
            }
            if types[..i].iter().any(|r| r.media_type == req.media_type) {
                return Err(Error::Validation(format!(
                    "file config declares {} more than once",
                    req.media_type
                )));
            }
        }
        if !types.iter().any(|r| r.media_type == primary_type) {
            return Err(Error::Validation(format!(
                "primary type {primary_type} is not among the declared types"
            )));
        }
        Ok(Self {
            types,
            primary_type,
        })
    }

    /// Exactly one input of `media_type`, which is also the primary type.
    pub fn single(media_type: MediaType) -> Self {
        Self {
            types: vec![FileRequirement {
                media_type,
                count: CountRange::ONE,
            }],
            primary_type: media_type,
        }
    }

    /// Zero or one input of each listed type; `primary` comes first.
    /// Repeated types are ignored.
    pub fn optional(primary: MediaType, others: &[MediaType]) -> Self {
        let mut types = vec![FileRequirement::new(primary, 0, 1)];
        for media_type in others {
            if !types.iter().any(|r| r.media_type == *media_type) {
                types.push(FileRequirement::new(*media_type, 0, 1));
            }
        }
        Self {
            types,
            primary_type: primary,
        }
    }

    pub fn types(&self) -> &[FileRequirement] {
        &self.types
    }

    pub fn primary_type(&self) -> MediaType {
        self.primary_type
    }

    /// The requirement declared for `media_type`, if any.
    pub fn requirement(&self, media_type: MediaType) -> Option<&FileRequirement> {
        self.types.iter().find(|r| r.media_type == media_type)
    }

    /// Check `count` inputs of `media_type`, returning a description of the
    /// violated constraint on failure.
    pub fn check(&self, media_type: MediaType, count: u32) -> std::result::Result<(), String> {
        let Some(req) = self.requirement(media_type) else {
            return Err(format!("{media_type} input is not accepted"));
        };
        if !req.count.contains(count) {
            return Err(format!(
                "expected {}..={} {media_type} input(s), got {count}",
                req.count.min, req.count.max
            ));
        }
        Ok(())
    }

    /// Whether `count` inputs of `media_type` are acceptable.
    pub fn accepts(&self, media_type: MediaType, count: u32) -> bool {
        self.check(media_type, count).is_ok()
    }

    /// Check a whole input set: every input's type must be declared and every
    /// declared type's count must be within bounds (absent types count as 0).
    pub fn check_inputs(&self, inputs: &[MediaType]) -> std::result::Result<(), String> {
        let mut counts: BTreeMap<MediaType, u32> = BTreeMap::new();
        for media_type in inputs {
            *counts.entry(*media_type).or_default() += 1;
        }
        for (media_type, count) in &counts {
            self.check(*media_type, *count)?;
        }
        for req in &self.types {
            if !counts.contains_key(&req.media_type) && req.count.min > 0 {
                return Err(format!(
                    "expected {}..={} {} input(s), got 0",
                    req.count.min, req.count.max, req.media_type
                ));
            }
        }
        Ok(())
    }
}
