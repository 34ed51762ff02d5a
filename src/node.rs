use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::contact::Contact;
use crate::graph::ContactGraph;
use crate::packet::Packet;
use crate::plan::{ContactId, NodeId};
use crate::routing::{Route, RouterKind, RouterState};

/// A network node running CGR.
///
/// The node holds its routing-function value (flavor plus route
/// caches), a reference to the shared contact graph, the list of its
/// outbound contacts and the limbo FIFO for packets the router could
/// not schedule. Packets in the limbo are not retried automatically;
/// they are counted in the final statistics.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    outbound: Vec<ContactId>,
    graph: Arc<ContactGraph>,
    router: RouterState,
    limbo: VecDeque<Packet>,
    hotspots: Vec<NodeId>,
}

impl Node {
    /// Creates a node.
    ///
    /// `outbound` are the plan contacts originating at this node (the
    /// simulator validates this at registration). `hotspots` lists the
    /// congestion-junction nodes of the scenario; an empty list
    /// disables the hotspot anti-loop rule.
    pub fn new(
        id: NodeId,
        outbound: Vec<ContactId>,
        router: RouterKind,
        graph: Arc<ContactGraph>,
        hotspots: Vec<NodeId>,
    ) -> Self {
        Self {
            id,
            outbound,
            graph,
            router: RouterState::new(router),
            limbo: VecDeque::new(),
            hotspots,
        }
    }

    /// The node identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// The routing flavor this node dispatches to.
    pub fn router_kind(&self) -> RouterKind {
        self.router.kind()
    }

    /// The outbound contacts registered for this node.
    pub fn outbound_contacts(&self) -> &[ContactId] {
        &self.outbound
    }

    /// Packets for which no route could be found.
    pub fn limbo(&self) -> &VecDeque<Packet> {
        &self.limbo
    }

    /// Whether this node has a planned contact towards `peer`.
    pub fn is_connected_to(&self, peer: &NodeId, contacts: &BTreeMap<ContactId, Contact>) -> bool {
        self.outbound
            .iter()
            .filter_map(|id| contacts.get(id))
            .any(|contact| contact.to_node() == peer)
    }

    /// The nodes excluded as next hops for `packet` arriving here.
    ///
    /// Without the return-to-sender flag the previous hop is excluded;
    /// when a packet additionally crosses from one hotspot to another,
    /// all hotspots are excluded to break inter-hotspot loops.
    pub(crate) fn excluded_nodes(
        &self,
        packet: &Packet,
        contacts: &BTreeMap<ContactId, Contact>,
    ) -> Vec<NodeId> {
        if packet.return_to_sender() {
            return Vec::new();
        }
        let Some(last_hop) = packet.trace().last() else {
            return Vec::new();
        };
        let Some(previous) = contacts.get(&last_hop.contact).map(|c| c.from_node().clone())
        else {
            return Vec::new();
        };
        if self.hotspots.contains(&self.id) && self.hotspots.contains(&previous) {
            self.hotspots.clone()
        } else {
            vec![previous]
        }
    }

    /// Runs the node's router for `packet` at `now_ms`.
    pub(crate) fn route(
        &mut self,
        contacts: &BTreeMap<ContactId, Contact>,
        packet: &Packet,
        now_ms: u64,
        excluded_nodes: &[NodeId],
    ) -> Option<Route> {
        let graph = Arc::clone(&self.graph);
        self.router.route(
            &graph,
            contacts,
            &self.id,
            packet.destination(),
            now_ms,
            packet.size(),
            excluded_nodes,
        )
    }

    pub(crate) fn push_limbo(&mut self, packet: Packet) {
        self.limbo.push_back(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{HopRecord, PacketId};
    use crate::plan::ContactPlan;

    fn network() -> (ContactPlan, Arc<ContactGraph>, BTreeMap<ContactId, Contact>) {
        let mut plan = ContactPlan::new(10, 50).expect("plan");
        plan.add_contact_directed("h1", "h2", 0, 1000, 10, 50)
            .expect("contact");
        plan.add_contact_directed("h2", "h3", 0, 1000, 10, 50)
            .expect("contact");
        let graph = Arc::new(ContactGraph::new(&plan));
        let contacts = plan
            .sorted_contacts()
            .into_iter()
            .map(|(id, planned)| (id, Contact::new(id, planned)))
            .collect();
        (plan, graph, contacts)
    }

    fn arriving_packet(via: ContactId) -> Packet {
        let mut packet = Packet::new(PacketId(0), 100, "h1".to_string(), "h9".to_string(), 0);
        packet.record_hop(HopRecord {
            contact: via,
            departure_ms: 0,
            arrival_ms: 60,
        });
        packet
    }

    #[test]
    fn previous_hop_is_excluded() {
        let (plan, graph, contacts) = network();
        let node = Node::new(
            "h2".to_string(),
            plan.outbound_contacts(&"h2".to_string()),
            RouterKind::Basic,
            graph,
            Vec::new(),
        );
        let via = plan.outbound_contacts(&"h1".to_string())[0];
        let excluded = node.excluded_nodes(&arriving_packet(via), &contacts);
        assert_eq!(excluded, vec!["h1".to_string()]);
    }

    #[test]
    fn hotspot_to_hotspot_excludes_all_hotspots() {
        let (plan, graph, contacts) = network();
        let hotspots = vec!["h1".to_string(), "h2".to_string(), "h3".to_string()];
        let node = Node::new(
            "h2".to_string(),
            plan.outbound_contacts(&"h2".to_string()),
            RouterKind::Basic,
            graph,
            hotspots.clone(),
        );
        let via = plan.outbound_contacts(&"h1".to_string())[0];
        let excluded = node.excluded_nodes(&arriving_packet(via), &contacts);
        assert_eq!(excluded, hotspots);
    }

    #[test]
    fn return_to_sender_flag_disables_exclusions() {
        let (plan, graph, contacts) = network();
        let node = Node::new(
            "h2".to_string(),
            plan.outbound_contacts(&"h2".to_string()),
            RouterKind::Basic,
            graph,
            Vec::new(),
        );
        let via = plan.outbound_contacts(&"h1".to_string())[0];
        let packet = arriving_packet(via).with_return_to_sender();
        assert!(node.excluded_nodes(&packet, &contacts).is_empty());
    }

    #[test]
    fn connectivity_uses_outbound_contacts() {
        let (plan, graph, contacts) = network();
        let node = Node::new(
            "h1".to_string(),
            plan.outbound_contacts(&"h1".to_string()),
            RouterKind::Basic,
            graph,
            Vec::new(),
        );
        assert!(node.is_connected_to(&"h2".to_string(), &contacts));
        assert!(!node.is_connected_to(&"h3".to_string(), &contacts));
    }
}
