#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use dtnsim::{
    Contact, ContactGraph, ContactPlan, ContinuousPacketGenerator, HopRecord, Monitor, Node,
    NodeId, Packet, PacketGenerator, Route, RouterKind, Simulator,
};

/// Everything a recording monitor observed during a run.
#[derive(Debug, Default)]
pub struct Recording {
    /// One line per lifecycle callback, in callback order.
    pub events: Vec<String>,
    /// `(node, packet id, next hop)` per routing decision.
    pub decisions: Vec<(NodeId, u64, Option<NodeId>)>,
    /// Delivered packets with their traces.
    pub delivered: Vec<DeliveredPacket>,
}

#[derive(Debug)]
pub struct DeliveredPacket {
    pub id: u64,
    pub size: u64,
    pub time_ms: u64,
    pub trace: Vec<HopRecord>,
}

/// Monitor that records every callback into a shared log.
pub struct RecordingMonitor {
    log: Rc<RefCell<Recording>>,
}

impl RecordingMonitor {
    pub fn new() -> (Self, Rc<RefCell<Recording>>) {
        let log = Rc::new(RefCell::new(Recording::default()));
        (Self { log: Rc::clone(&log) }, log)
    }
}

impl Monitor for RecordingMonitor {
    fn on_packet_generated(&mut self, packet: &Packet, node: &NodeId) {
        self.log.borrow_mut().events.push(format!(
            "generated p{} at {} t={}",
            packet.id().0,
            node,
            packet.created_ms()
        ));
    }

    fn on_packet_injected(&mut self, packet: &Packet, node: &NodeId) {
        self.log
            .borrow_mut()
            .events
            .push(format!("injected p{} at {}", packet.id().0, node));
    }

    fn on_routing_decision(&mut self, node: &NodeId, packet: &Packet, route: Option<&Route>) {
        let mut log = self.log.borrow_mut();
        let next_hop = route.map(|r| r.next_hop.clone());
        log.events.push(format!(
            "decision at {} for p{} -> {}",
            node,
            packet.id().0,
            next_hop.as_deref().unwrap_or("limbo")
        ));
        log.decisions.push((node.clone(), packet.id().0, next_hop));
    }

    fn on_packet_routed(&mut self, packet: &Packet, node: &NodeId, route: &Route) {
        self.log.borrow_mut().events.push(format!(
            "routed p{} at {} via {} bdt={}",
            packet.id().0,
            node,
            route.next_hop,
            route.best_delivery_time
        ));
    }

    fn on_packet_delivered(&mut self, packet: &Packet, node: &NodeId, time_ms: u64) {
        let mut log = self.log.borrow_mut();
        log.events.push(format!(
            "delivered p{} at {} t={}",
            packet.id().0,
            node,
            time_ms
        ));
        log.delivered.push(DeliveredPacket {
            id: packet.id().0,
            size: packet.size(),
            time_ms,
            trace: packet.trace().to_vec(),
        });
    }

    fn on_packet_enqueued_limbo(&mut self, packet: &Packet, node: &NodeId) {
        self.log
            .borrow_mut()
            .events
            .push(format!("limbo p{} at {}", packet.id().0, node));
    }

    fn on_contact_started(&mut self, contact: &Contact, time_ms: u64) {
        self.log.borrow_mut().events.push(format!(
            "contact {}->{} [{},{}) started t={}",
            contact.from_node(),
            contact.to_node(),
            contact.from_time(),
            contact.to_time(),
            time_ms
        ));
    }

    fn on_contact_ended(&mut self, contact: &Contact, time_ms: u64) {
        self.log.borrow_mut().events.push(format!(
            "contact {}->{} ended t={}",
            contact.from_node(),
            contact.to_node(),
            time_ms
        ));
    }

    fn on_contact_capacity_exhausted(&mut self, contact: &Contact, packet: &Packet) {
        self.log.borrow_mut().events.push(format!(
            "overflow p{} on {}->{}",
            packet.id().0,
            contact.from_node(),
            contact.to_node()
        ));
    }
}

/// The getting-started topology: three nodes, five bidirectional
/// contact windows, 10 bytes/ms everywhere, 50 ms delay.
pub fn tutorial_plan() -> ContactPlan {
    let mut plan = ContactPlan::new(10, 50).expect("plan");
    plan.add_contact("node_a", "node_b", 0, 100_000).expect("contact");
    plan.add_contact("node_a", "node_b", 500_000, 750_000)
        .expect("contact");
    plan.add_contact("node_b", "node_c", 0, 200_000).expect("contact");
    plan.add_contact("node_b", "node_c", 350_000, 400_000)
        .expect("contact");
    plan.add_contact("node_b", "node_c", 950_000, 990_000)
        .expect("contact");
    plan
}

/// Registers contacts and nodes for `plan` on a fresh simulator.
pub fn simulator_for(plan: &ContactPlan, kind: RouterKind) -> Simulator {
    let graph = Arc::new(ContactGraph::new(plan));
    let mut sim = Simulator::new();
    for (id, planned) in plan.sorted_contacts() {
        sim.register_contact(Contact::new(id, planned))
            .expect("register contact");
    }
    for node in plan.nodes() {
        sim.register_node(Node::new(
            node.clone(),
            plan.outbound_contacts(node),
            kind,
            Arc::clone(&graph),
            Vec::new(),
        ))
        .expect("register node");
    }
    sim
}

/// The full getting-started scenario: tutorial topology plus the two
/// opposing continuous generators (10 bytes/ms, 100 kB packets, over
/// the first 1000 seconds).
pub fn tutorial_sim(kind: RouterKind) -> Simulator {
    let plan = tutorial_plan();
    let mut sim = simulator_for(&plan, kind);
    sim.register_generator(PacketGenerator::Continuous(
        ContinuousPacketGenerator::new(
            10,
            100_000,
            vec!["node_a".to_string()],
            vec!["node_c".to_string()],
            0,
            1_000_000,
        )
        .expect("generator"),
    ));
    sim.register_generator(PacketGenerator::Continuous(
        ContinuousPacketGenerator::new(
            10,
            100_000,
            vec!["node_c".to_string()],
            vec!["node_a".to_string()],
            0,
            1_000_000,
        )
        .expect("generator"),
    ));
    sim
}
