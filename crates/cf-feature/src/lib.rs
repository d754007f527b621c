//! # cf-feature
//!
//! The feature model: every media transformation is a [`Feature`] that turns
//! a [`Configuration`] tree into a [`CompiledCommand`] or a validation error.
//!
//! This crate provides:
//!
//! - **[`Configuration`]** -- nested field tree supplied by the user, with
//!   typed leaf accessors that fail with [`cf_core::Error::Configuration`].
//! - **[`FileConfig`]** -- declared input media types and counts.
//! - **[`Feature`]** trait -- `validate` / `compile`, implemented through the
//!   [`Schema`] parse-then-synthesize split by every built-in feature.
//! - **[`FeatureEntry`] / [`FeatureInstance`]** -- catalog metadata and the
//!   immutable, already-compiled instance built from it.
//! - **[`FeatureCatalog`]** -- the ordered set of built-in features.

pub mod catalog;
pub mod configuration;
pub mod feature;
pub mod features;
pub mod file_config;

pub use catalog::FeatureCatalog;
pub use configuration::{ConfigNode, ConfigValue, Configuration};
pub use feature::{
    CompiledCommand, Feature, FeatureEntry, FeatureInstance, ProgressDescriptor, Schema, UiHandle,
};
pub use file_config::{CountRange, FileConfig, FileRequirement};
