//! Conversion registry: a directed graph of single-hop converters.
//!
//! Edges are registered once through [`RegistryBuilder`] at startup; the
//! resulting [`ConversionRegistry`] is immutable and answers direct lookups
//! and shortest-chain searches with optional edge exclusion.

mod error;
mod graph;
mod types;

pub use error::RegistryError;
pub use graph::{ConversionRegistry, RegistryBuilder};
pub use types::{
    normalize_label, Chain, ChainStep, EdgeKey, FormatDescriptor, ReachableDescriptor,
    ReachableTarget, TargetDescriptor,
};
