//! Testing utilities: deterministic adapters and registry fixtures.
//!
//! These let registry, executor and service tests run without any real
//! format library or host binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use omniconvert_core::testing::{always_fails, marker};
//! use omniconvert_core::RegistryBuilder;
//!
//! let registry = RegistryBuilder::new()
//!     .with_edge("docx", "pdf", always_fails("renderer crashed"), None)
//!     .with_edge("docx", "txt", marker("txt"), None)
//!     .with_edge("txt", "pdf", marker("pdf"), None)
//!     .build();
//! ```

mod adapters;

pub use adapters::{always_fails, counting, echo, marker};

/// Prebuilt registries for common routing scenarios.
pub mod fixtures {
    use super::{always_fails, marker};
    use crate::registry::{ConversionRegistry, RegistryBuilder};

    /// `pptx -> txt -> pdf` with no direct `pptx -> pdf` edge.
    pub fn two_hop_registry() -> ConversionRegistry {
        RegistryBuilder::new()
            .with_edge("pptx", "txt", marker("txt"), Some("text only"))
            .with_edge("txt", "pdf", marker("pdf"), None)
            .build()
    }

    /// A failing direct `docx -> pdf` edge with a working `docx -> txt -> pdf`
    /// detour.
    pub fn failing_direct_registry() -> ConversionRegistry {
        RegistryBuilder::new()
            .with_edge("docx", "pdf", always_fails("renderer crashed"), None)
            .with_edge("docx", "txt", marker("txt"), None)
            .with_edge("txt", "pdf", marker("pdf"), None)
            .build()
    }
}
