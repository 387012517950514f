//! Linear-history view over a manifest's `versionHistory`.
//!
//! The MVP keeps one parent per version (no merges), so ancestry is a simple
//! walk rather than a real DAG traversal. The type stays named `VersionGraph`
//! because multi-parent history is an open question for a later format
//! major, not because the structure is graph-shaped today.

use std::collections::{HashMap, HashSet};

use crate::domain::version::Version;
use crate::error::{JcfError, JcfResult};

pub struct VersionGraph<'a> {
    by_id: HashMap<&'a str, &'a Version>,
}

impl<'a> VersionGraph<'a> {
    pub fn build(versions: &'a [Version]) -> JcfResult<Self> {
        let mut by_id = HashMap::with_capacity(versions.len());
        for v in versions {
            by_id.insert(v.id.as_str(), v);
        }
        let graph = Self { by_id };
        graph.detect_cycle()?;
        Ok(graph)
    }

    /// Every ancestor of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: &str) -> JcfResult<Vec<String>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = self.parent_of(id)?;
        while let Some(pid) = cur {
            if !seen.insert(pid.clone()) {
                return Err(JcfError::BrokenChain(format!(
                    "cycle detected while walking ancestors of {id}"
                )));
            }
            out.push(pid.clone());
            cur = self.parent_of(&pid)?;
        }
        Ok(out)
    }

    /// The chain from `from` down to `to`, inclusive of both, nearest-first
    /// starting at `from`. Errors if `to` is not an ancestor of `from`.
    pub fn path(&self, from: &str, to: &str) -> JcfResult<Vec<String>> {
        if from == to {
            return Ok(vec![from.to_string()]);
        }
        let mut chain = vec![from.to_string()];
        chain.extend(self.ancestors(from)?);
        match chain.iter().position(|id| id == to) {
            Some(idx) => Ok(chain[..=idx].to_vec()),
            None => Err(JcfError::UnreachableVersion {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// Lowest common ancestor. Unused while history stays linear (every two
    /// versions are already comparable), kept for when branching lands.
    #[allow(dead_code)]
    pub fn lca(&self, a: &str, b: &str) -> Option<String> {
        let ancestors_a: HashSet<String> = std::iter::once(a.to_string())
            .chain(self.ancestors(a).ok()?)
            .collect();
        let mut cur = Some(b.to_string());
        while let Some(id) = cur {
            if ancestors_a.contains(&id) {
                return Some(id);
            }
            cur = self.parent_of(&id).ok().flatten();
        }
        None
    }

    fn parent_of(&self, id: &str) -> JcfResult<Option<String>> {
        let v = self
            .by_id
            .get(id)
            .ok_or_else(|| JcfError::BrokenChain(format!("unknown version {id}")))?;
        Ok(v.parent_id.clone())
    }

    fn detect_cycle(&self) -> JcfResult<()> {
        for id in self.by_id.keys() {
            let mut seen = HashSet::new();
            let mut cur = self.parent_of(id)?;
            while let Some(pid) = cur {
                if !seen.insert(pid.clone()) {
                    return Err(JcfError::BrokenChain(format!(
                        "cycle detected in version history at {pid}"
                    )));
                }
                cur = self.parent_of(&pid)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn v(id: &str, parent: Option<&str>) -> Version {
        Version {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: String::new(),
            author: "a".to_string(),
            file_states: Map::new(),
            tags: None,
            extra: None,
        }
    }

    #[test]
    fn ancestors_walk_linear_chain() {
        let versions = vec![v("v1", None), v("v2", Some("v1")), v("v3", Some("v2"))];
        let graph = VersionGraph::build(&versions).unwrap();
        assert_eq!(graph.ancestors("v3").unwrap(), vec!["v2", "v1"]);
    }

    #[test]
    fn path_includes_both_endpoints() {
        let versions = vec![v("v1", None), v("v2", Some("v1")), v("v3", Some("v2"))];
        let graph = VersionGraph::build(&versions).unwrap();
        assert_eq!(graph.path("v3", "v1").unwrap(), vec!["v3", "v2", "v1"]);
    }

    #[test]
    fn unreachable_version_errors() {
        let versions = vec![v("v1", None), v("v2", None)];
        let graph = VersionGraph::build(&versions).unwrap();
        assert!(matches!(
            graph.path("v1", "v2"),
            Err(JcfError::UnreachableVersion { .. })
        ));
    }

    #[test]
    fn cycle_detected_on_build() {
        let versions = vec![v("v1", Some("v2")), v("v2", Some("v1"))];
        assert!(matches!(
            VersionGraph::build(&versions),
            Err(JcfError::BrokenChain(_))
        ));
    }

    #[test]
    fn lca_of_shared_root() {
        let versions = vec![v("v1", None), v("v2", Some("v1")), v("v3", Some("v1"))];
        let graph = VersionGraph::build(&versions).unwrap();
        assert_eq!(graph.lca("v2", "v3"), Some("v1".to_string()));
    }
}
