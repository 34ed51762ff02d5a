//! Contact Graph Routing.
//!
//! Routing queries run a time-aware Dijkstra over the shared contact
//! graph. Discovered routes are cached per destination in discovery
//! order: after each discovery the route's *limit contact* (the first
//! contact whose end time equals the route's end time) is suppressed,
//! so the next search yields the next-best alternative. The cache is
//! packet-independent; per-packet feasibility (window still open,
//! enough conservative capacity, first hop not excluded, first-hop
//! contact still bookable) is checked at selection time.

use std::collections::BTreeMap;

use tracing::trace;

use crate::contact::Contact;
use crate::graph::{ContactGraph, VertexId, VertexKind};
use crate::hash::sequence_hash;
use crate::plan::{ContactId, NodeId};

mod dijkstra;

/// Lookahead window used by the shortest flavor before any delivery
/// time has been observed for a destination.
const DEFAULT_LOOKAHEAD_WINDOW_MS: u64 = 8000;

/// The routing flavor a node dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// Eagerly enumerates all routes for a destination, then selects
    /// the best feasible one per packet.
    Basic,
    /// Like [`RouterKind::Basic`], but every returned route's first hop
    /// becomes an anchor excluded from subsequent searches, spreading
    /// consecutive packets over alternative first hops.
    Anchor,
    /// Lazily discovers routes on demand, bounding each search with a
    /// lookahead window derived from observed delivery times and
    /// falling back to an unbounded search when the window is too
    /// tight. Takes the same decisions as [`RouterKind::Basic`].
    Shortest,
}

/// A ranked route from a source node to a destination node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The contacts to traverse, in order.
    pub contacts: Vec<ContactId>,
    /// Earliest possible arrival at the destination (BDT), computed at
    /// discovery time.
    pub best_delivery_time: u64,
    /// Number of contacts on the route.
    pub hop_count: usize,
    /// Conservative route volume: the minimum over all contacts of
    /// `(to_time - latest start along the route) * datarate`.
    pub capacity: u64,
    /// The earliest end time among the route's contacts; the route is
    /// unusable from this time on.
    pub to_time: u64,
    /// The neighbor node the packet would be forwarded to.
    pub next_hop: NodeId,
    first_from_time: u64,
    sequence_hash: u64,
}

impl Route {
    /// Ranking key: `(BDT, hop count, first-hop start, sequence hash)`.
    /// Ties are broken by the full tuple; the sequence hash makes the
    /// order total and deterministic.
    fn ranking_key(&self) -> (u64, usize, u64, u64) {
        (
            self.best_delivery_time,
            self.hop_count,
            self.first_from_time,
            self.sequence_hash,
        )
    }
}

/// Per-destination route discovery state.
#[derive(Debug, Default)]
struct DestinationCache {
    /// Discovered routes, in discovery order.
    routes: Vec<Route>,
    /// Limit contacts suppressed by previous discoveries.
    suppressed: Vec<ContactId>,
    /// No further route exists beyond the cached ones.
    exhausted: bool,
    /// Running mean of observed `BDT - now` samples, for the lookahead
    /// window of the shortest flavor.
    mean_delivery_ms: u64,
    samples: u64,
    /// First-hop contacts anchored by the anchor flavor.
    anchors: Vec<ContactId>,
}

/// The routing-function value held by each node: a flavor plus its
/// per-destination caches.
#[derive(Debug)]
pub(crate) struct RouterState {
    kind: RouterKind,
    caches: BTreeMap<NodeId, DestinationCache>,
}

impl RouterState {
    pub(crate) fn new(kind: RouterKind) -> Self {
        Self {
            kind,
            caches: BTreeMap::new(),
        }
    }

    pub(crate) fn kind(&self) -> RouterKind {
        self.kind
    }

    /// Computes the route a packet of `size` bytes should take from
    /// `source` towards `destination`, or `None` when nothing feasible
    /// exists (the packet then belongs in the limbo).
    pub(crate) fn route(
        &mut self,
        graph: &ContactGraph,
        contacts: &BTreeMap<ContactId, Contact>,
        source: &NodeId,
        destination: &NodeId,
        now_ms: u64,
        size: u64,
        excluded_nodes: &[NodeId],
    ) -> Option<Route> {
        let decision = match self.kind {
            RouterKind::Basic => {
                self.route_basic(graph, contacts, source, destination, now_ms, size, excluded_nodes)
            }
            RouterKind::Shortest => self.route_shortest(
                graph,
                contacts,
                source,
                destination,
                now_ms,
                size,
                excluded_nodes,
            ),
            RouterKind::Anchor => self.route_anchor(
                graph,
                contacts,
                source,
                destination,
                now_ms,
                size,
                excluded_nodes,
            ),
        };
        trace!(
            %source,
            %destination,
            now_ms,
            size,
            next_hop = decision.as_ref().map(|r| r.next_hop.as_str()),
            "routing decision"
        );
        decision
    }

    #[allow(clippy::too_many_arguments)]
    fn route_basic(
        &mut self,
        graph: &ContactGraph,
        contacts: &BTreeMap<ContactId, Contact>,
        source: &NodeId,
        destination: &NodeId,
        now_ms: u64,
        size: u64,
        excluded_nodes: &[NodeId],
    ) -> Option<Route> {
        let cache = self.caches.entry(destination.clone()).or_default();
        while !cache.exhausted {
            match dijkstra::best_route(
                graph,
                source,
                destination,
                now_ms,
                &[],
                &cache.suppressed,
                None,
            ) {
                Some((path, bdt)) => {
                    let route = characterize(graph, &path, bdt);
                    cache.suppressed.push(limit_contact(graph, &path, route.to_time));
                    cache.routes.push(route);
                }
                None => cache.exhausted = true,
            }
        }
        cache
            .routes
            .iter()
            .filter(|route| route_feasible(route, contacts, now_ms, size, excluded_nodes))
            .min_by_key(|route| route.ranking_key())
            .cloned()
    }

    #[allow(clippy::too_many_arguments)]
    fn route_shortest(
        &mut self,
        graph: &ContactGraph,
        contacts: &BTreeMap<ContactId, Contact>,
        source: &NodeId,
        destination: &NodeId,
        now_ms: u64,
        size: u64,
        excluded_nodes: &[NodeId],
    ) -> Option<Route> {
        let cache = self.caches.entry(destination.clone()).or_default();
        let mut scan_from = 0;
        loop {
            if let Some(route) = cache.routes[scan_from..]
                .iter()
                .find(|route| route_feasible(route, contacts, now_ms, size, excluded_nodes))
            {
                return Some(route.clone());
            }
            scan_from = cache.routes.len();
            if cache.exhausted {
                return None;
            }

            let cutoff = if cache.samples == 0 {
                now_ms.saturating_add(DEFAULT_LOOKAHEAD_WINDOW_MS)
            } else {
                let window = cache.mean_delivery_ms + cache.mean_delivery_ms / 5;
                now_ms.saturating_add(window)
            };
            let discovered = dijkstra::best_route(
                graph,
                source,
                destination,
                now_ms,
                &[],
                &cache.suppressed,
                Some(cutoff),
            )
            .or_else(|| {
                // Nothing inside the window; retry without it. Both
                // branches return the identical best route whenever the
                // window was sufficient.
                dijkstra::best_route(
                    graph,
                    source,
                    destination,
                    now_ms,
                    &[],
                    &cache.suppressed,
                    None,
                )
            });
            match discovered {
                Some((path, bdt)) => {
                    cache.samples += 1;
                    let sample = (bdt - now_ms) as i64;
                    let mean = cache.mean_delivery_ms as i64;
                    cache.mean_delivery_ms =
                        (mean + (sample - mean) / cache.samples as i64).max(0) as u64;
                    let route = characterize(graph, &path, bdt);
                    cache.suppressed.push(limit_contact(graph, &path, route.to_time));
                    cache.routes.push(route);
                }
                None => {
                    cache.exhausted = true;
                    return None;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn route_anchor(
        &mut self,
        graph: &ContactGraph,
        contacts: &BTreeMap<ContactId, Contact>,
        source: &NodeId,
        destination: &NodeId,
        now_ms: u64,
        size: u64,
        excluded_nodes: &[NodeId],
    ) -> Option<Route> {
        let cache = self.caches.entry(destination.clone()).or_default();
        loop {
            let (path, bdt) = dijkstra::best_route(
                graph,
                source,
                destination,
                now_ms,
                excluded_nodes,
                &cache.anchors,
                None,
            )?;
            let route = characterize(graph, &path, bdt);
            let first = *route.contacts.first()?;
            cache.anchors.push(first);
            if route_feasible(&route, contacts, now_ms, size, excluded_nodes) {
                return Some(route);
            }
        }
    }
}

/// Per-packet feasibility of a cached route.
fn route_feasible(
    route: &Route,
    contacts: &BTreeMap<ContactId, Contact>,
    now_ms: u64,
    size: u64,
    excluded_nodes: &[NodeId],
) -> bool {
    if route.to_time <= now_ms {
        return false;
    }
    if route.capacity < size {
        return false;
    }
    if excluded_nodes.contains(&route.next_hop) {
        return false;
    }
    match route.contacts.first().and_then(|id| contacts.get(id)) {
        Some(first_hop) => first_hop.admits(now_ms, size),
        None => false,
    }
}

/// Computes the characteristics of a discovered path.
fn characterize(graph: &ContactGraph, path: &[VertexId], best_delivery_time: u64) -> Route {
    let mut latest_start = 0u64;
    let mut capacity = u64::MAX;
    let mut to_time = u64::MAX;
    let mut contacts = Vec::with_capacity(path.len());
    for &vertex_id in path {
        let vertex = graph.vertex(vertex_id);
        let VertexKind::Contact(id) = vertex.kind else {
            panic!("nominal vertex on a concrete route");
        };
        contacts.push(id);
        latest_start = latest_start.max(vertex.from_time);
        capacity = capacity.min((vertex.to_time - latest_start).saturating_mul(vertex.datarate));
        to_time = to_time.min(vertex.to_time);
    }
    let first = graph.vertex(*path.first().expect("a route has at least one contact"));
    Route {
        sequence_hash: sequence_hash(path.iter().map(|&v| graph.vertex(v).to_node.as_str())),
        next_hop: first.to_node.clone(),
        first_from_time: first.from_time,
        hop_count: contacts.len(),
        contacts,
        best_delivery_time,
        capacity,
        to_time,
    }
}

/// The first contact on the path whose end time equals the route's end
/// time; suppressing it forces the next discovery onto an alternative.
fn limit_contact(graph: &ContactGraph, path: &[VertexId], to_time: u64) -> ContactId {
    for &vertex_id in path {
        let vertex = graph.vertex(vertex_id);
        if vertex.to_time == to_time {
            if let VertexKind::Contact(id) = vertex.kind {
                return id;
            }
        }
    }
    panic!("route end time does not match any of its contacts");
}
