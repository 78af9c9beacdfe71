use serde::Serialize;

use crate::converter::AdapterRef;

/// Directed edge identity: `(source_label, target_label)`.
pub type EdgeKey = (String, String);

/// Normalizes a format label: trimmed, lowercase, without a leading dot.
pub fn normalize_label(label: &str) -> String {
    label.trim().trim_start_matches('.').to_lowercase()
}

/// One hop of a conversion chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub source: String,
    pub target: String,
    pub adapter: AdapterRef,
}

impl ChainStep {
    pub fn edge(&self) -> EdgeKey {
        (self.source.clone(), self.target.clone())
    }
}

/// An ordered walk of edges. The empty chain means "same format".
///
/// Equality is structural: same hops with the same adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    steps: Vec<ChainStep>,
}

impl Chain {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<ChainStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Labels visited, including the starting label. Empty for the empty chain.
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            path.push(first.source.clone());
        }
        path.extend(self.steps.iter().map(|s| s.target.clone()));
        path
    }

    /// Human readable form, e.g. `pptx->txt->pdf`.
    pub fn describe(&self) -> String {
        self.path().join("->")
    }
}

/// A direct edge as listed by `describe()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub ext: String,
    pub note: Option<String>,
}

/// All direct edges leaving one source label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    pub source: String,
    pub targets: Vec<TargetDescriptor>,
}

/// A label reachable from a source, directly or through intermediate hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachableTarget {
    pub ext: String,
    pub direct: bool,
    pub via_chain: bool,
    pub chain_len: usize,
    pub path: Vec<String>,
    pub note: Option<String>,
}

/// Everything reachable from one source label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachableDescriptor {
    pub source: String,
    pub targets: Vec<ReachableTarget>,
}
