//! Time-aware Dijkstra search over the contact graph.
//!
//! Vertex distance is the triple `(earliest_delivery_time, hop_count,
//! forwarding_time_to_first_hop)`, compared lexicographically with the
//! stable hash pair of the first hop appended as final tie-break. The
//! first extraction of the destination nominal is optimal under this
//! key.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use crate::graph::{ContactGraph, VertexId, VertexKind};
use crate::plan::{ContactId, NodeId};

/// Distance key of a vertex during the search.
type SearchKey = (u64, u32, u64, (u64, u64));

/// Finds the least-cost path from `source` to `destination`.
///
/// Returns the contact vertices of the path (nominals stripped) and the
/// best delivery time at the destination. `excluded_nodes` are treated
/// as already visited, `suppressed_contacts` are skipped entirely, and
/// `lookahead_cutoff` hides contacts starting after the given time.
pub(crate) fn best_route(
    graph: &ContactGraph,
    source: &NodeId,
    destination: &NodeId,
    current_time: u64,
    excluded_nodes: &[NodeId],
    suppressed_contacts: &[ContactId],
    lookahead_cutoff: Option<u64>,
) -> Option<(Vec<VertexId>, u64)> {
    if source == destination {
        return None;
    }
    let start = graph.source_nominal(source)?;
    let goal = graph.destination_nominal(destination)?;

    let vertex_count = graph.vertex_count();
    let mut best: Vec<Option<SearchKey>> = vec![None; vertex_count];
    let mut previous: Vec<Option<VertexId>> = vec![None; vertex_count];
    let mut visited_nodes: BTreeSet<&str> =
        excluded_nodes.iter().map(|node| node.as_str()).collect();
    let mut heap: BinaryHeap<Reverse<(u64, u32, u64, (u64, u64), usize)>> = BinaryHeap::new();

    let start_key: SearchKey = (current_time, 0, 0, (0, 0));
    best[start.index()] = Some(start_key);
    heap.push(Reverse((current_time, 0, 0, (0, 0), start.index())));

    let mut arrival = None;
    while let Some(Reverse((edt, hops, forwarding, tie, index))) = heap.pop() {
        if index == goal.index() {
            arrival = Some(edt);
            break;
        }
        // Skip stale queue entries for vertices relaxed again since.
        if best[index] != Some((edt, hops, forwarding, tie)) {
            continue;
        }
        let vertex = VertexId::from_index(index);
        visited_nodes.insert(graph.vertex(vertex).from_node.as_str());

        let successors = graph.successors(vertex);
        // Successors are sorted by end time; everything closing at or
        // before the current delivery time cannot carry the packet.
        let first_open = successors.partition_point(|&s| graph.vertex(s).to_time <= edt);
        for &succ in &successors[first_open..] {
            let succ_vertex = graph.vertex(succ);
            let candidate: SearchKey = match succ_vertex.kind {
                VertexKind::Contact(contact) => {
                    if suppressed_contacts.contains(&contact) {
                        continue;
                    }
                    if visited_nodes.contains(succ_vertex.to_node.as_str()) {
                        continue;
                    }
                    if let Some(cutoff) = lookahead_cutoff {
                        if succ_vertex.from_time > cutoff {
                            continue;
                        }
                    }
                    let arrival_at_succ = edt.max(succ_vertex.from_time) + succ_vertex.delay;
                    if arrival_at_succ >= succ_vertex.to_time {
                        continue;
                    }
                    // First-hop metrics propagate unchanged beyond the
                    // first relaxation.
                    if index == start.index() {
                        (arrival_at_succ, hops + 1, arrival_at_succ, succ_vertex.tie_hash)
                    } else {
                        (arrival_at_succ, hops + 1, forwarding, tie)
                    }
                }
                VertexKind::SourceNominal => continue,
                VertexKind::DestinationNominal => {
                    if succ != goal {
                        continue;
                    }
                    (edt, hops + 1, forwarding, tie)
                }
            };
            if best[succ.index()].map_or(true, |known| candidate < known) {
                best[succ.index()] = Some(candidate);
                previous[succ.index()] = Some(vertex);
                heap.push(Reverse((
                    candidate.0,
                    candidate.1,
                    candidate.2,
                    candidate.3,
                    succ.index(),
                )));
            }
        }
    }

    let arrival = arrival?;
    let mut path = Vec::new();
    let mut cursor = previous[goal.index()]?;
    while cursor != start {
        path.push(cursor);
        cursor = previous[cursor.index()]?;
    }
    path.reverse();
    Some((path, arrival))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ContactGraph;
    use crate::plan::ContactPlan;

    fn node(id: &str) -> NodeId {
        id.to_string()
    }

    fn contact_ids(graph: &ContactGraph, path: &[VertexId]) -> Vec<NodeId> {
        path.iter()
            .map(|&v| graph.vertex(v).to_node.clone())
            .collect()
    }

    #[test]
    fn direct_route_waits_for_contact_start() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 200, 1000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        let (path, bdt) =
            best_route(&graph, &node("a"), &node("b"), 0, &[], &[], None).expect("route");
        assert_eq!(path.len(), 1);
        // Wait until 200, then one delay.
        assert_eq!(bdt, 250);
    }

    #[test]
    fn delivery_time_chains_across_hops() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 0, 100_000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("b", "c", 0, 200_000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        let (path, bdt) =
            best_route(&graph, &node("a"), &node("c"), 10_000, &[], &[], None).expect("route");
        assert_eq!(contact_ids(&graph, &path), vec!["b", "c"]);
        // 10_000 + 50 at b, + 50 at c.
        assert_eq!(bdt, 10_100);
    }

    #[test]
    fn expired_contact_is_rejected() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 0, 1000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        assert!(best_route(&graph, &node("a"), &node("b"), 1000, &[], &[], None).is_none());
        // Arrival must be strictly inside the window.
        assert!(best_route(&graph, &node("a"), &node("b"), 950, &[], &[], None).is_none());
        assert!(best_route(&graph, &node("a"), &node("b"), 949, &[], &[], None).is_some());
    }

    #[test]
    fn excluded_node_blocks_the_only_route() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 0, 1000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("b", "c", 0, 1000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        assert!(best_route(&graph, &node("a"), &node("c"), 0, &[], &[], None).is_some());
        assert!(best_route(&graph, &node("a"), &node("c"), 0, &[node("b")], &[], None).is_none());
    }

    #[test]
    fn suppressed_contact_forces_the_alternative() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        let direct = plan
            .add_contact_directed("a", "b", 0, 1000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("a", "b", 500, 2000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        let (path, _) =
            best_route(&graph, &node("a"), &node("b"), 0, &[], &[direct], None).expect("route");
        assert_eq!(path.len(), 1);
        assert_eq!(graph.vertex(path[0]).from_time, 500);
    }

    #[test]
    fn lookahead_hides_late_contacts_until_fallback() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 500_000, 600_000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        assert!(best_route(&graph, &node("a"), &node("b"), 0, &[], &[], Some(8000)).is_none());
        assert!(best_route(&graph, &node("a"), &node("b"), 0, &[], &[], None).is_some());
    }

    #[test]
    fn fewer_hops_win_at_equal_delivery_time() {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("a", "b", 0, 1000, 10, 100)
            .expect("contact");
        plan.add_contact_directed("a", "x", 0, 1000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("x", "b", 0, 1000, 10, 50)
            .expect("contact");
        let graph = ContactGraph::new(&plan);
        // Both alternatives deliver at 100; the direct contact has
        // fewer hops.
        let (path, bdt) =
            best_route(&graph, &node("a"), &node("b"), 0, &[], &[], None).expect("route");
        assert_eq!(bdt, 100);
        assert_eq!(path.len(), 1);
        assert_eq!(graph.vertex(path[0]).delay, 100);
    }
}
