//! Buffer-graph validation: every buffer must have at most one writer, and
//! the whole graph must be reachable from a single root producer, i.e. the
//! data flow forms an arborescence rooted at the one function with no
//! sources and no observe targets.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("buffer {buffer:?} has {count} writers, expected at most 1")]
    MultipleWriters { buffer: String, count: usize },

    #[error("expected exactly one root producer function (no sources, no observe targets, at least one sink); found {count}")]
    AmbiguousRoot { count: usize },

    #[error("root producer function {function:?} must have exactly one sink buffer, has {count}")]
    RootSinkCount { function: String, count: usize },

    #[error("buffer {buffer:?} is not reachable from root buffer {root:?}")]
    Unreachable { buffer: String, root: String },
}

/// A function's wiring into the buffer graph: which buffers it reads,
/// writes, and observes. Graph metadata only, not a live handle, so it is
/// named distinctly from the worker template types in `mimo-worker`.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
    pub observes: Vec<String>,
}

pub struct Topology;

impl Topology {
    /// Validates the buffer graph and returns the root buffer's name on
    /// success.
    pub fn validate_arborescence(buffers: &[String], functions: &[FunctionSpec]) -> Result<String, TopologyError> {
        let mut writer_counts: HashMap<&str, usize> = buffers.iter().map(|b| (b.as_str(), 0)).collect();
        let mut readers_of: HashMap<&str, Vec<&str>> = buffers.iter().map(|b| (b.as_str(), Vec::new())).collect();

        for function in functions {
            for sink in &function.sinks {
                *writer_counts.entry(sink.as_str()).or_insert(0) += 1;
            }
            for source in &function.sources {
                readers_of.entry(source.as_str()).or_default().push(function.name.as_str());
            }
        }

        for (buffer, count) in &writer_counts {
            if *count > 1 {
                return Err(TopologyError::MultipleWriters {
                    buffer: (*buffer).to_owned(),
                    count: *count,
                });
            }
        }

        let candidates: Vec<&FunctionSpec> = functions
            .iter()
            .filter(|f| f.sources.is_empty() && f.observes.is_empty() && !f.sinks.is_empty())
            .collect();
        if candidates.len() != 1 {
            return Err(TopologyError::AmbiguousRoot { count: candidates.len() });
        }
        let producer = candidates[0];
        if producer.sinks.len() != 1 {
            return Err(TopologyError::RootSinkCount {
                function: producer.name.clone(),
                count: producer.sinks.len(),
            });
        }
        let root = producer.sinks[0].clone();

        let mut reachable: HashSet<String> = HashSet::new();
        reachable.insert(root.clone());
        loop {
            let before = reachable.len();
            let frontier: Vec<String> = reachable.iter().cloned().collect();
            for buffer in &frontier {
                if let Some(reader_names) = readers_of.get(buffer.as_str()) {
                    for reader_name in reader_names {
                        if let Some(function) = functions.iter().find(|f| f.name == *reader_name) {
                            for sink in &function.sinks {
                                reachable.insert(sink.clone());
                            }
                        }
                    }
                }
            }
            if reachable.len() == before {
                break;
            }
        }

        let all: HashSet<&str> = buffers.iter().map(String::as_str).collect();
        if let Some(unreachable) = all.iter().find(|b| !reachable.contains(**b)) {
            return Err(TopologyError::Unreachable {
                buffer: (*unreachable).to_owned(),
                root,
            });
        }

        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, sources: &[&str], sinks: &[&str], observes: &[&str]) -> FunctionSpec {
        FunctionSpec {
            name: name.to_owned(),
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
            sinks: sinks.iter().map(|s| (*s).to_owned()).collect(),
            observes: observes.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn linear_chain_is_valid() {
        let buffers = vec!["raw".to_owned(), "filtered".to_owned()];
        let functions = vec![
            spec("importer", &[], &["raw"], &[]),
            spec("filter", &["raw"], &["filtered"], &[]),
            spec("exporter", &["filtered"], &[], &[]),
        ];
        let root = Topology::validate_arborescence(&buffers, &functions).unwrap();
        assert_eq!(root, "raw");
    }

    #[test]
    fn rejects_multiple_writers() {
        let buffers = vec!["raw".to_owned()];
        let functions = vec![
            spec("importer-a", &[], &["raw"], &[]),
            spec("importer-b", &[], &["raw"], &[]),
        ];
        assert!(matches!(
            Topology::validate_arborescence(&buffers, &functions),
            Err(TopologyError::MultipleWriters { .. })
        ));
    }

    #[test]
    fn rejects_unreachable_buffer() {
        let buffers = vec!["raw".to_owned(), "island".to_owned()];
        let functions = vec![spec("importer", &[], &["raw"], &[])];
        assert!(matches!(
            Topology::validate_arborescence(&buffers, &functions),
            Err(TopologyError::Unreachable { .. })
        ));
    }

    #[test]
    fn rejects_ambiguous_root() {
        let buffers = vec!["a".to_owned(), "b".to_owned()];
        let functions = vec![
            spec("importer-a", &[], &["a"], &[]),
            spec("importer-b", &[], &["b"], &[]),
        ];
        assert!(matches!(
            Topology::validate_arborescence(&buffers, &functions),
            Err(TopologyError::AmbiguousRoot { .. })
        ));
    }
}
