//! Core build orchestration for specmerge.
//!
//! This crate ties together option validation, base structure normalization,
//! discovery, loading, conversion, and assembly into one end-to-end
//! workflow ([`pipeline::build`]).

pub mod assembler;
pub mod convert;
pub mod normalize;
pub mod options;
pub mod pipeline;

pub use assembler::{AssembleResult, DocumentBuilder, Overwrite, assemble};
pub use convert::{BoxError, Converter, ConverterRegistry, apply_converter, entries_from};
pub use normalize::{NormalizeOptions, normalize_base_structure};
pub use options::{BuildRequest, DiscoveryOptions, validate_discovery_options};
pub use pipeline::{
    BuildContext, BuildOutput, BuildProgress, BuildReport, CategoryReport, SilentProgress,
    SkipReason, SkippedFile, build, build_from_value,
};
