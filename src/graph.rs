use std::collections::BTreeMap;

use crate::hash::stable_hash;
use crate::plan::{ContactId, ContactPlan, NodeId};

/// Index of a vertex in the contact graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct VertexId(usize);

impl VertexId {
    pub(crate) fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// What a graph vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VertexKind {
    /// A plan contact.
    Contact(ContactId),
    /// The synthetic start vertex of routing queries originating at a
    /// node.
    SourceNominal,
    /// The synthetic end vertex of routing queries destined to a node.
    DestinationNominal,
}

/// A vertex of the time-expanded graph. Nominal vertices span all of
/// virtual time and carry no delay, so they never constrain a search.
#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    pub(crate) kind: VertexKind,
    pub(crate) from_node: NodeId,
    pub(crate) to_node: NodeId,
    pub(crate) from_time: u64,
    pub(crate) to_time: u64,
    pub(crate) datarate: u64,
    pub(crate) delay: u64,
    /// Precomputed `(stable_hash(to_node), stable_hash(from_node))`
    /// tie-break key.
    pub(crate) tie_hash: (u64, u64),
}

/// A directed time-expanded graph over the contacts of a plan.
///
/// Vertices are the plan contacts plus a source-nominal and a
/// destination-nominal vertex per node id. An edge `c1 -> c2` exists
/// iff `c1.to_node == c2.from_node` and `c1.from_time + c1.delay <
/// c2.to_time` — the packet can plausibly arrive before `c2` closes.
/// The source nominal of node N feeds every contact leaving N; every
/// contact reaching N feeds the destination nominal of N.
///
/// Successor lists are sorted ascending by `(to_time,
/// stable_hash(to_node), stable_hash(from_node))`, letting the router
/// skip the expired prefix of a list in one step. The graph is
/// immutable after construction and shared across all routing queries.
#[derive(Debug)]
pub struct ContactGraph {
    vertices: Vec<Vertex>,
    successors: Vec<Vec<VertexId>>,
    source_nominals: BTreeMap<NodeId, VertexId>,
    destination_nominals: BTreeMap<NodeId, VertexId>,
    contact_count: usize,
}

impl ContactGraph {
    /// Builds the graph from a contact plan.
    pub fn new(plan: &ContactPlan) -> Self {
        let mut vertices = Vec::new();

        // Contact vertices first, in the plan's deterministic order.
        for (id, contact) in plan.sorted_contacts() {
            vertices.push(Vertex {
                kind: VertexKind::Contact(id),
                from_node: contact.from_node.clone(),
                to_node: contact.to_node.clone(),
                from_time: contact.from_time,
                to_time: contact.to_time,
                datarate: contact.datarate,
                delay: contact.delay,
                tie_hash: (
                    stable_hash(&contact.to_node),
                    stable_hash(&contact.from_node),
                ),
            });
        }
        let contact_count = vertices.len();

        // Then one source and one destination nominal per node id.
        let mut source_nominals = BTreeMap::new();
        let mut destination_nominals = BTreeMap::new();
        for node in plan.nodes() {
            let tie_hash = (stable_hash(node), stable_hash(node));
            source_nominals.insert(node.clone(), VertexId(vertices.len()));
            vertices.push(Vertex {
                kind: VertexKind::SourceNominal,
                from_node: node.clone(),
                to_node: node.clone(),
                from_time: 0,
                to_time: u64::MAX,
                datarate: u64::MAX,
                delay: 0,
                tie_hash,
            });
            destination_nominals.insert(node.clone(), VertexId(vertices.len()));
            vertices.push(Vertex {
                kind: VertexKind::DestinationNominal,
                from_node: node.clone(),
                to_node: node.clone(),
                from_time: 0,
                to_time: u64::MAX,
                datarate: u64::MAX,
                delay: 0,
                tie_hash,
            });
        }

        let mut successors: Vec<Vec<VertexId>> = vec![Vec::new(); vertices.len()];

        // Contact-to-contact edges. Quadratic, but built once per plan.
        for c1 in 0..contact_count {
            for c2 in 0..contact_count {
                if c1 == c2 {
                    continue;
                }
                let (v1, v2) = (&vertices[c1], &vertices[c2]);
                if v1.to_node == v2.from_node && v1.from_time + v1.delay < v2.to_time {
                    successors[c1].push(VertexId(c2));
                }
            }
        }

        // Nominal edges.
        for c in 0..contact_count {
            let (from_node, to_node) = {
                let v = &vertices[c];
                (v.from_node.clone(), v.to_node.clone())
            };
            if let Some(&source) = source_nominals.get(&from_node) {
                successors[source.index()].push(VertexId(c));
            }
            if let Some(&destination) = destination_nominals.get(&to_node) {
                successors[c].push(destination);
            }
        }

        for list in &mut successors {
            list.sort_by_key(|&v| {
                let vertex = &vertices[v.index()];
                (vertex.to_time, vertex.tie_hash, v)
            });
        }

        Self {
            vertices,
            successors,
            source_nominals,
            destination_nominals,
            contact_count,
        }
    }

    /// Number of contact vertices (nominals excluded).
    pub fn contact_count(&self) -> usize {
        self.contact_count
    }

    /// Number of distinct node ids represented by nominal vertices.
    pub fn node_count(&self) -> usize {
        self.source_nominals.len()
    }

    pub(crate) fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub(crate) fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub(crate) fn successors(&self, id: VertexId) -> &[VertexId] {
        &self.successors[id.index()]
    }

    pub(crate) fn source_nominal(&self, node: &NodeId) -> Option<VertexId> {
        self.source_nominals.get(node).copied()
    }

    pub(crate) fn destination_nominal(&self, node: &NodeId) -> Option<VertexId> {
        self.destination_nominals.get(node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> ContactPlan {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 0, 100_000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("b", "c", 0, 200_000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("b", "c", 350_000, 400_000, 10, 50)
            .expect("contact");
        plan
    }

    #[test]
    fn nominal_vertices_created_per_node() {
        let graph = ContactGraph::new(&plan());
        assert_eq!(graph.contact_count(), 3);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.vertex_count(), 3 + 2 * 3);
        for node in ["a", "b", "c"] {
            assert!(graph.source_nominal(&node.to_string()).is_some());
            assert!(graph.destination_nominal(&node.to_string()).is_some());
        }
    }

    #[test]
    fn contact_edges_respect_peer_and_timing() {
        let graph = ContactGraph::new(&plan());
        // Vertex 0 is a->b (sorted order puts it first).
        let ab = VertexId(0);
        assert_eq!(graph.vertex(ab).from_node, "a");
        let successor_nodes: Vec<(NodeId, u64)> = graph
            .successors(ab)
            .iter()
            .filter(|&&v| matches!(graph.vertex(v).kind, VertexKind::Contact(_)))
            .map(|&v| {
                let vertex = graph.vertex(v);
                (vertex.to_node.clone(), vertex.from_time)
            })
            .collect();
        // a->b connects to both b->c windows: 0 + 50 < 200_000 and
        // 0 + 50 < 400_000.
        assert_eq!(
            successor_nodes,
            vec![("c".to_string(), 0), ("c".to_string(), 350_000)]
        );
    }

    #[test]
    fn delay_boundary_excludes_unreachable_contact() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 1000, 2000, 10, 500)
            .expect("contact");
        // Closes exactly at a->b.from_time + delay: not reachable.
        plan.add_contact_directed("b", "c", 0, 1500, 10, 50)
            .expect("contact");
        // Closes one millisecond later: reachable.
        plan.add_contact_directed("b", "c", 0, 1501, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        let ab = (0..graph.contact_count())
            .map(VertexId)
            .find(|&v| graph.vertex(v).from_node == "a")
            .expect("a->b vertex");
        let reachable: Vec<u64> = graph
            .successors(ab)
            .iter()
            .filter(|&&v| matches!(graph.vertex(v).kind, VertexKind::Contact(_)))
            .map(|&v| graph.vertex(v).to_time)
            .collect();
        assert_eq!(reachable, vec![1501]);
    }

    #[test]
    fn source_nominal_feeds_outbound_contacts() {
        let graph = ContactGraph::new(&plan());
        let source_b = graph.source_nominal(&"b".to_string()).expect("nominal");
        let outbound: Vec<NodeId> = graph
            .successors(source_b)
            .iter()
            .map(|&v| graph.vertex(v).from_node.clone())
            .collect();
        assert_eq!(outbound, vec!["b".to_string(), "b".to_string()]);
    }

    #[test]
    fn successors_sorted_by_end_time() {
        let graph = ContactGraph::new(&plan());
        let source_a = graph.source_nominal(&"a".to_string()).expect("nominal");
        for list in [graph.successors(source_a), graph.successors(VertexId(0))] {
            let end_times: Vec<u64> = list.iter().map(|&v| graph.vertex(v).to_time).collect();
            let mut sorted = end_times.clone();
            sorted.sort_unstable();
            assert_eq!(end_times, sorted);
        }
    }
}
