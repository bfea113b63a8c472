//! Output assembly for pagekiln.
//!
//! Turns the rendering engine's event stream into a deployable static tree:
//! one directory per route holding `index.html` and `content.json`, plus the
//! manifest, engine-generated files and copied assets.

pub mod assets;
pub mod builder;
pub mod document;
pub mod head;
pub mod manifest;
pub mod pipeline;
pub mod route;
pub mod writer;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use document::{DocumentConfig, DocumentRenderer, IconLink};
pub use pipeline::{BuildReport, Failure, Pipeline, PipelineError, PipelineState};
pub use writer::{OutputWriter, WriteError};
