use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use super::error::RegistryError;
use super::types::{
    normalize_label, Chain, ChainStep, EdgeKey, FormatDescriptor, ReachableDescriptor,
    ReachableTarget, TargetDescriptor,
};
use crate::converter::AdapterRef;

#[derive(Debug, Clone)]
struct EdgeEntry {
    adapter: AdapterRef,
    note: Option<String>,
}

/// Collects edges before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    edges: HashMap<EdgeKey, EdgeEntry>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the edge `source -> target`.
    pub fn register(
        &mut self,
        source: &str,
        target: &str,
        adapter: AdapterRef,
        note: Option<&str>,
    ) -> &mut Self {
        let source = normalize_label(source);
        let target = normalize_label(target);

        self.adjacency
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.edges.insert(
            (source, target),
            EdgeEntry {
                adapter,
                note: note.map(str::to_string),
            },
        );
        self
    }

    /// Consuming form of [`register`](Self::register) for chained construction.
    pub fn with_edge(
        mut self,
        source: &str,
        target: &str,
        adapter: AdapterRef,
        note: Option<&str>,
    ) -> Self {
        self.register(source, target, adapter, note);
        self
    }

    pub fn build(self) -> ConversionRegistry {
        debug!(
            edges = self.edges.len(),
            sources = self.adjacency.len(),
            "Conversion registry built"
        );
        ConversionRegistry {
            edges: self.edges,
            adjacency: self.adjacency,
        }
    }
}

/// Immutable directed graph of converters keyed by format label.
///
/// Safe to share across tasks; all lookups take `&self`.
#[derive(Debug, Clone)]
pub struct ConversionRegistry {
    edges: HashMap<EdgeKey, EdgeEntry>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl ConversionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up the direct edge `source -> target`.
    pub fn resolve(&self, source: &str, target: &str) -> Result<AdapterRef, RegistryError> {
        let key = (normalize_label(source), normalize_label(target));
        self.edges
            .get(&key)
            .map(|entry| entry.adapter.clone())
            .ok_or_else(|| RegistryError::edge_not_found(key.0, key.1))
    }

    /// Shortest chain from `source` to `target`.
    pub fn find_chain(&self, source: &str, target: &str) -> Result<Chain, RegistryError> {
        self.find_chain_excluding(source, target, &HashSet::new())
    }

    /// Shortest chain that avoids every edge in `exclude`.
    ///
    /// Breadth-first with neighbours expanded in lexicographic order, so among
    /// equally short chains the first one discovered wins.
    pub fn find_chain_excluding(
        &self,
        source: &str,
        target: &str,
        exclude: &HashSet<EdgeKey>,
    ) -> Result<Chain, RegistryError> {
        let source = normalize_label(source);
        let target = normalize_label(target);
        if source == target {
            return Ok(Chain::empty());
        }

        let mut parents: HashMap<String, String> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::from([source.clone()]);
        let mut queue: VecDeque<String> = VecDeque::from([source.clone()]);

        while let Some(current) = queue.pop_front() {
            let Some(neighbours) = self.adjacency.get(&current) else {
                continue;
            };
            for next in neighbours {
                if exclude.contains(&(current.clone(), next.clone())) || visited.contains(next) {
                    continue;
                }
                visited.insert(next.clone());
                parents.insert(next.clone(), current.clone());
                if *next == target {
                    return Ok(self.rebuild_chain(&parents, &source, &target));
                }
                queue.push_back(next.clone());
            }
        }

        Err(RegistryError::path_not_found(source, target))
    }

    fn rebuild_chain(
        &self,
        parents: &HashMap<String, String>,
        source: &str,
        target: &str,
    ) -> Chain {
        let mut path = vec![target.to_string()];
        let mut cursor = target;
        while cursor != source {
            match parents.get(cursor) {
                Some(parent) => {
                    path.push(parent.clone());
                    cursor = parent.as_str();
                }
                None => break,
            }
        }
        path.reverse();

        let steps = path
            .windows(2)
            .filter_map(|pair| {
                let key = (pair[0].clone(), pair[1].clone());
                self.edges.get(&key).map(|entry| ChainStep {
                    source: key.0,
                    target: key.1,
                    adapter: entry.adapter.clone(),
                })
            })
            .collect();
        Chain::new(steps)
    }

    /// Direct edges, sorted by source then target.
    pub fn describe(&self) -> Vec<FormatDescriptor> {
        self.adjacency
            .iter()
            .map(|(source, targets)| FormatDescriptor {
                source: source.clone(),
                targets: targets
                    .iter()
                    .map(|target| TargetDescriptor {
                        ext: target.clone(),
                        note: self.note(source, target),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Every label reachable from each source that has outgoing edges.
    pub fn describe_reachable(&self) -> Vec<ReachableDescriptor> {
        self.adjacency
            .keys()
            .map(|source| {
                let targets = self
                    .shortest_paths_from(source)
                    .into_iter()
                    .map(|(target, path)| {
                        let chain_len = path.len().saturating_sub(1).max(1);
                        let key = (source.clone(), target.clone());
                        ReachableTarget {
                            direct: self.edges.contains_key(&key),
                            via_chain: chain_len > 1,
                            chain_len,
                            note: self.edges.get(&key).and_then(|e| e.note.clone()),
                            ext: target,
                            path,
                        }
                    })
                    .collect();
                ReachableDescriptor {
                    source: source.clone(),
                    targets,
                }
            })
            .collect()
    }

    /// BFS shortest label paths from `source` to every reachable label.
    fn shortest_paths_from(&self, source: &str) -> BTreeMap<String, Vec<String>> {
        let mut paths: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut visited: HashSet<&str> = HashSet::from([source]);
        let mut queue: VecDeque<Vec<String>> = VecDeque::from([vec![source.to_string()]]);

        while let Some(path) = queue.pop_front() {
            let Some(last) = path.last() else { continue };
            let Some(neighbours) = self.adjacency.get(last) else {
                continue;
            };
            for next in neighbours {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next.clone());
                paths.insert(next.clone(), extended.clone());
                queue.push_back(extended);
            }
        }

        paths
    }

    /// Note attached to a direct edge, if any.
    pub fn note(&self, source: &str, target: &str) -> Option<String> {
        self.edges
            .get(&(normalize_label(source), normalize_label(target)))
            .and_then(|entry| entry.note.clone())
    }

    /// Every label that appears on either end of an edge.
    pub fn labels(&self) -> BTreeSet<String> {
        let mut labels = BTreeSet::new();
        for (source, targets) in &self.adjacency {
            labels.insert(source.clone());
            labels.extend(targets.iter().cloned());
        }
        labels
    }

    pub fn has_label(&self, label: &str) -> bool {
        let label = normalize_label(label);
        self.adjacency.contains_key(&label)
            || self.adjacency.values().any(|targets| targets.contains(&label))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{always_fails, echo, marker};

    fn edge(source: &str, target: &str) -> EdgeKey {
        (source.to_string(), target.to_string())
    }

    fn diamond() -> ConversionRegistry {
        // a -> b -> d and a -> c -> d, plus a long way round a -> e -> f -> d
        RegistryBuilder::new()
            .with_edge("a", "b", marker("b"), None)
            .with_edge("a", "c", marker("c"), None)
            .with_edge("b", "d", marker("d"), None)
            .with_edge("c", "d", marker("d"), None)
            .with_edge("a", "e", marker("e"), None)
            .with_edge("e", "f", marker("f"), None)
            .with_edge("f", "d", marker("d"), None)
            .build()
    }

    #[test]
    fn test_resolve_returns_last_registered_adapter() {
        let first = echo();
        let second = marker("second");

        let mut builder = RegistryBuilder::new();
        builder.register("DOCX", "Pdf", first.clone(), Some("first"));
        builder.register("docx", "pdf", second.clone(), Some("second"));
        let registry = builder.build();

        let resolved = registry.resolve("docx", "pdf").unwrap();
        assert_eq!(resolved, second);
        assert_ne!(resolved, first);
        assert_eq!(registry.note("docx", "pdf").as_deref(), Some("second"));
        assert_eq!(registry.edge_count(), 1);
    }

    #[test]
    fn test_resolve_missing_edge() {
        let registry = diamond();
        let err = registry.resolve("a", "d").unwrap_err();
        assert_eq!(err, RegistryError::edge_not_found("a", "d"));
        assert_eq!(err.to_string(), "Conversion a->d not registered");
    }

    #[test]
    fn test_find_chain_same_label_is_empty() {
        let registry = diamond();
        let chain = registry.find_chain("a", "A").unwrap();
        assert!(chain.is_empty());
        assert!(chain.path().is_empty());
    }

    #[test]
    fn test_find_chain_is_shortest_with_sorted_tie_break() {
        let registry = diamond();
        let chain = registry.find_chain("a", "d").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.path(), vec!["a", "b", "d"]);
        assert_eq!(chain.describe(), "a->b->d");
    }

    #[test]
    fn test_find_chain_is_deterministic() {
        let registry = diamond();
        let first = registry.find_chain("a", "d").unwrap();
        for _ in 0..10 {
            assert_eq!(registry.find_chain("a", "d").unwrap(), first);
        }
    }

    #[test]
    fn test_find_chain_excluding_picks_alternate() {
        let registry = diamond();
        let exclude = HashSet::from([edge("a", "b")]);
        let chain = registry.find_chain_excluding("a", "d", &exclude).unwrap();
        assert_eq!(chain.path(), vec!["a", "c", "d"]);

        let exclude = HashSet::from([edge("a", "b"), edge("a", "c")]);
        let chain = registry.find_chain_excluding("a", "d", &exclude).unwrap();
        assert_eq!(chain.path(), vec!["a", "e", "f", "d"]);
    }

    #[test]
    fn test_find_chain_excluding_direct_edge_never_starts_with_it() {
        let registry = RegistryBuilder::new()
            .with_edge("docx", "pdf", always_fails("boom"), None)
            .with_edge("docx", "txt", echo(), None)
            .with_edge("txt", "pdf", echo(), None)
            .build();

        assert_eq!(registry.find_chain("docx", "pdf").unwrap().len(), 1);

        let exclude = HashSet::from([edge("docx", "pdf")]);
        let chain = registry.find_chain_excluding("docx", "pdf", &exclude).unwrap();
        assert_eq!(chain.path(), vec!["docx", "txt", "pdf"]);
        assert_ne!(chain.steps()[0].edge(), edge("docx", "pdf"));
    }

    #[test]
    fn test_find_chain_excluding_only_path_is_not_found() {
        let registry = RegistryBuilder::new()
            .with_edge("wav", "mp3", echo(), None)
            .build();
        let exclude = HashSet::from([edge("wav", "mp3")]);
        let err = registry
            .find_chain_excluding("wav", "mp3", &exclude)
            .unwrap_err();
        assert_eq!(err, RegistryError::path_not_found("wav", "mp3"));
    }

    #[test]
    fn test_find_chain_unknown_labels() {
        let registry = diamond();
        assert!(registry.find_chain("zzz", "a").is_err());
        assert!(registry.find_chain("d", "a").is_err());
    }

    #[test]
    fn test_chain_steps_carry_registered_adapters() {
        let to_txt = marker("txt");
        let to_pdf = marker("pdf");
        let registry = RegistryBuilder::new()
            .with_edge("pptx", "txt", to_txt.clone(), None)
            .with_edge("txt", "pdf", to_pdf.clone(), None)
            .build();

        let chain = registry.find_chain("pptx", "pdf").unwrap();
        assert_eq!(chain.steps()[0].adapter, to_txt);
        assert_eq!(chain.steps()[1].adapter, to_pdf);
        assert_eq!(chain.steps()[1].edge(), edge("txt", "pdf"));
    }

    #[test]
    fn test_describe_is_sorted_direct_edges() {
        let registry = RegistryBuilder::new()
            .with_edge("txt", "pdf", echo(), None)
            .with_edge("docx", "txt", echo(), Some("text only"))
            .with_edge("docx", "pdf", echo(), None)
            .build();

        let described = registry.describe();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].source, "docx");
        assert_eq!(
            described[0].targets,
            vec![
                TargetDescriptor {
                    ext: "pdf".to_string(),
                    note: None
                },
                TargetDescriptor {
                    ext: "txt".to_string(),
                    note: Some("text only".to_string())
                },
            ]
        );
        assert_eq!(described[1].source, "txt");
    }

    #[test]
    fn test_describe_reachable() {
        let registry = RegistryBuilder::new()
            .with_edge("pptx", "txt", echo(), Some("text only"))
            .with_edge("txt", "pdf", echo(), None)
            .build();

        let reachable = registry.describe_reachable();
        assert_eq!(reachable.len(), 2);

        let pptx = &reachable[0];
        assert_eq!(pptx.source, "pptx");
        assert_eq!(pptx.targets.len(), 2);

        let pdf = &pptx.targets[0];
        assert_eq!(pdf.ext, "pdf");
        assert!(!pdf.direct);
        assert!(pdf.via_chain);
        assert_eq!(pdf.chain_len, 2);
        assert_eq!(pdf.path, vec!["pptx", "txt", "pdf"]);
        assert_eq!(pdf.note, None);

        let txt = &pptx.targets[1];
        assert!(txt.direct);
        assert!(!txt.via_chain);
        assert_eq!(txt.chain_len, 1);
        assert_eq!(txt.note.as_deref(), Some("text only"));
    }

    #[test]
    fn test_labels() {
        let registry = diamond();
        let labels: Vec<String> = registry.labels().into_iter().collect();
        assert_eq!(labels, vec!["a", "b", "c", "d", "e", "f"]);
        assert!(registry.has_label("D"));
        assert!(!registry.has_label("z"));
    }
}
