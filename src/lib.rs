//! # dtnsim
//!
//! A deterministic packet-level discrete-event simulator for
//! delay-tolerant networks (DTN).
//!
//! Communication opportunities between node pairs ("contacts") open and
//! close over virtual time with a bounded data rate; packets ("bundles")
//! are forwarded hop by hop along routes computed by Contact Graph
//! Routing (CGR) over a time-expanded graph of the contact plan.
//!
//! The simulation is fully deterministic: virtual time advances only by
//! executing events from a priority queue keyed by `(time, sequence)`,
//! where the insertion sequence is the sole tie-breaker for events at
//! equal times. Given identical inputs and identical registration order,
//! two runs produce identical event orders, routing decisions, monitor
//! streams and summary statistics.
//!
//! ## Example Usage
//!
//! ```rust
//! use dtnsim::{
//!     BatchPacketGenerator, Contact, ContactGraph, ContactPlan, Node,
//!     PacketGenerator, RouterKind, Simulator,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> dtnsim::SimulationResult<()> {
//! // One contact from node_a to node_b, open from 0s to 10s.
//! let mut plan = ContactPlan::new(1, 50)?;
//! plan.add_contact("node_a", "node_b", 0, 10_000)?;
//! let graph = Arc::new(ContactGraph::new(&plan));
//!
//! let mut sim = Simulator::new();
//! for (id, planned) in plan.sorted_contacts() {
//!     sim.register_contact(Contact::new(id, planned))?;
//! }
//! for node in plan.nodes() {
//!     sim.register_node(Node::new(
//!         node.clone(),
//!         plan.outbound_contacts(node),
//!         RouterKind::Basic,
//!         Arc::clone(&graph),
//!         Vec::new(),
//!     ))?;
//! }
//! sim.register_generator(PacketGenerator::Batch(BatchPacketGenerator::new(
//!     1,
//!     1000,
//!     vec!["node_a".to_string()],
//!     vec!["node_b".to_string()],
//!     vec![0],
//! )?));
//!
//! let stats = sim.run(20_000)?;
//! assert_eq!(stats.packets_delivered, 1);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Runtime contact objects with transmission queues and capacity state.
pub mod contact;
/// Error types and utilities for simulation operations.
pub mod error;
/// Event scheduling and processing for the simulation kernel.
pub mod events;
/// Packet generators injecting traffic over virtual time.
pub mod generator;
/// Time-expanded contact graph derived from a contact plan.
pub mod graph;
/// Stable hashing for deterministic tie-breaking.
mod hash;
/// Monitor trait and lifecycle-event relay.
pub mod monitor;
/// Network node behavior: forwarding, limbo and hotspot rules.
pub mod node;
/// Packet (bundle) representation and forwarding trace.
pub mod packet;
/// Contact plan: the human-oriented list of planned contacts.
pub mod plan;
/// Summary statistics of a simulation run.
pub mod report;
/// Contact Graph Routing: route discovery, caching and selection.
pub mod routing;
/// The simulator: registries, event loop and dispatch.
pub mod sim;

pub use contact::Contact;
pub use error::{SimulationError, SimulationResult};
pub use events::{Event, EventQueue, ScheduledEvent};
pub use generator::{BatchPacketGenerator, ContinuousPacketGenerator, PacketGenerator};
pub use graph::ContactGraph;
pub use monitor::{Monitor, MonitorNotifier};
pub use node::Node;
pub use packet::{HopRecord, Packet, PacketId};
pub use plan::{ContactId, ContactPlan, NodeId, PlanContact};
pub use report::SummaryStatistics;
pub use routing::{Route, RouterKind};
pub use sim::Simulator;
