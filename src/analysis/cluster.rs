// src/analysis/cluster.rs
//
// Network cluster reconstruction: bounded-depth breadth-first expansion over
// the "contacted the same destination" relation. Explicit frontier queue and
// visited-depth map; no recursion. The relation is dense enough to reach the
// whole population within two hops, so the depth bound is what keeps the
// work finite.

use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use tracing::{debug, warn};

use crate::analysis::partners::build_partners;
use crate::error::InvestigateError;
use crate::store::{SessionStore, SubjectDirectory};

/// One subject discovered during traversal. Depth 0 is the root; BFS order
/// guarantees the recorded depth is the minimum over all discovery paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub subject_id: String,
    pub display_name: String,
    pub suspicious: bool,
    pub depth: u32,
}

/// Shared-destination relation between two subjects. Directed from the side
/// expanded first, but semantically undirected; dedup treats the endpoint
/// pair as unordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
    pub shared_destination: IpAddr,
    /// Session count of the expanded side at the shared destination.
    pub strength: u64,
}

/// Deduplicated node/edge graph around one root subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkCluster {
    pub root: String,
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    /// Lookups that failed or resolved to nothing during expansion. The
    /// traversal degrades per-neighbor instead of aborting; this count is
    /// the caller's signal that the graph may be incomplete.
    pub skipped_lookups: u64,
}

impl NetworkCluster {
    /// Export as a petgraph for downstream layout or graph algorithms.
    /// Edges touching a subject that never produced a node (unresolved
    /// during traversal) are left out.
    pub fn to_graph(&self) -> DiGraph<NetworkNode, NetworkEdge> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for node in &self.nodes {
            index.insert(node.subject_id.clone(), graph.add_node(node.clone()));
        }
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(a, b, edge.clone());
            }
        }
        graph
    }
}

pub struct NetworkClusterBuilder<'a, S, D> {
    store: &'a S,
    directory: &'a D,
}

impl<'a, S, D> NetworkClusterBuilder<'a, S, D>
where
    S: SessionStore,
    D: SubjectDirectory,
{
    pub fn new(store: &'a S, directory: &'a D) -> Self {
        Self { store, directory }
    }

    /// Reconstruct the communication network around `root` out to
    /// `max_depth` hops. Negative depth is treated as 0: emit the root,
    /// expand nothing.
    ///
    /// A root the directory cannot resolve is a hard `SubjectNotFound`;
    /// every failure past the root is skip-and-continue.
    pub fn build(&self, root: &str, max_depth: i32) -> Result<NetworkCluster, InvestigateError> {
        let depth_cap = max_depth.max(0) as u32;

        let root_info = self
            .directory
            .resolve(root)?
            .ok_or_else(|| InvestigateError::SubjectNotFound(root.to_string()))?;

        let mut nodes: Vec<NetworkNode> = Vec::new();
        let mut edges: Vec<NetworkEdge> = Vec::new();
        let mut edge_keys: HashSet<(String, String, IpAddr)> = HashSet::new();
        let mut visited: HashMap<String, u32> = HashMap::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(String, u32)> = VecDeque::new();
        let mut skipped_lookups = 0u64;

        frontier.push_back((root.to_string(), 0));
        queued.insert(root.to_string());

        while let Some((subject, depth)) = frontier.pop_front() {
            // First discovery wins; BFS makes that the minimum depth.
            if visited.contains_key(&subject) {
                continue;
            }
            visited.insert(subject.clone(), depth);

            if subject == root {
                nodes.push(NetworkNode {
                    subject_id: root_info.subject_id.clone(),
                    display_name: root_info.display_name.clone(),
                    suspicious: root_info.flagged,
                    depth,
                });
            } else {
                match self.directory.resolve(&subject) {
                    Ok(Some(info)) => nodes.push(NetworkNode {
                        subject_id: info.subject_id,
                        display_name: info.display_name,
                        suspicious: info.flagged,
                        depth,
                    }),
                    Ok(None) => {
                        warn!(subject = %subject, "subject unresolved, node skipped");
                        skipped_lookups += 1;
                    }
                    Err(err) => {
                        warn!(subject = %subject, error = %err, "directory lookup failed, node skipped");
                        skipped_lookups += 1;
                    }
                }
            }

            if depth >= depth_cap {
                continue;
            }

            let sessions = match self.store.sessions_by_subject(&subject) {
                Ok(sessions) => sessions,
                Err(err) if subject == root => return Err(err.into()),
                Err(err) => {
                    warn!(subject = %subject, error = %err, "session lookup failed, expansion skipped");
                    skipped_lookups += 1;
                    continue;
                }
            };

            // Partner order (session count desc, address asc) plus sorted
            // neighbor sets keep the traversal deterministic.
            for partner in build_partners(&sessions) {
                let destination = partner.destination_ip;
                let cross_refs = match self.store.sessions_by_destination(&destination) {
                    Ok(records) => records,
                    Err(err) => {
                        warn!(%destination, error = %err, "cross-reference lookup failed, destination skipped");
                        skipped_lookups += 1;
                        continue;
                    }
                };

                let neighbors: BTreeSet<String> = cross_refs
                    .iter()
                    .filter(|r| r.subject_id != subject)
                    .map(|r| r.subject_id.clone())
                    .collect();

                for neighbor in neighbors {
                    if visited.contains_key(&neighbor) {
                        continue;
                    }

                    let key = edge_key(&subject, &neighbor, destination);
                    if edge_keys.insert(key) {
                        edges.push(NetworkEdge {
                            from: subject.clone(),
                            to: neighbor.clone(),
                            shared_destination: destination,
                            strength: partner.total_sessions,
                        });
                    }
                    if queued.insert(neighbor.clone()) {
                        frontier.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        debug!(
            root = %root,
            nodes = nodes.len(),
            edges = edges.len(),
            skipped = skipped_lookups,
            "cluster reconstruction finished"
        );

        Ok(NetworkCluster {
            root: root.to_string(),
            nodes,
            edges,
            skipped_lookups,
        })
    }
}

/// Canonical key for an undirected (pair, destination) edge.
fn edge_key(a: &str, b: &str, destination: IpAddr) -> (String, String, IpAddr) {
    if a <= b {
        (a.to_string(), b.to_string(), destination)
    } else {
        (b.to_string(), a.to_string(), destination)
    }
}
