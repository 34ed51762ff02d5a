use crate::contact::Contact;
use crate::packet::Packet;
use crate::plan::NodeId;
use crate::routing::Route;

/// Observer of simulation lifecycle events.
///
/// All methods default to no-ops; implementors override what they care
/// about. Observers receive shared references only and must not mutate
/// simulator state — they may freely mutate themselves (counters,
/// event logs).
pub trait Monitor {
    /// A generator created a packet.
    fn on_packet_generated(&mut self, _packet: &Packet, _node: &NodeId) {}

    /// A packet entered the network at its source node.
    fn on_packet_injected(&mut self, _packet: &Packet, _node: &NodeId) {}

    /// A node asked its router for a route; `route` is the outcome.
    fn on_routing_decision(&mut self, _node: &NodeId, _packet: &Packet, _route: Option<&Route>) {}

    /// A packet was booked onto the first contact of the given route.
    fn on_packet_routed(&mut self, _packet: &Packet, _node: &NodeId, _route: &Route) {}

    /// A packet reached its destination and is destroyed.
    fn on_packet_delivered(&mut self, _packet: &Packet, _node: &NodeId, _time_ms: u64) {}

    /// No feasible route existed; the packet went to the node's limbo.
    fn on_packet_enqueued_limbo(&mut self, _packet: &Packet, _node: &NodeId) {}

    /// A contact reached its start time and activated.
    fn on_contact_started(&mut self, _contact: &Contact, _time_ms: u64) {}

    /// A contact reached its end time and deactivated.
    fn on_contact_ended(&mut self, _contact: &Contact, _time_ms: u64) {}

    /// A booked packet could not finish transmission inside the
    /// contact window and was dropped to the contact's overflow.
    fn on_contact_capacity_exhausted(&mut self, _contact: &Contact, _packet: &Packet) {}
}

/// Relays lifecycle callbacks to all registered monitors, in
/// registration order.
#[derive(Default)]
pub struct MonitorNotifier {
    subscribers: Vec<Box<dyn Monitor>>,
}

impl std::fmt::Debug for MonitorNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorNotifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl MonitorNotifier {
    /// Creates a notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a monitor. Relative order of registration is the
    /// relay order.
    pub fn add_subscriber(&mut self, subscriber: Box<dyn Monitor>) {
        self.subscribers.push(subscriber);
    }

    /// Number of registered monitors.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn packet_generated(&mut self, packet: &Packet, node: &NodeId) {
        for subscriber in &mut self.subscribers {
            subscriber.on_packet_generated(packet, node);
        }
    }

    pub(crate) fn packet_injected(&mut self, packet: &Packet, node: &NodeId) {
        for subscriber in &mut self.subscribers {
            subscriber.on_packet_injected(packet, node);
        }
    }

    pub(crate) fn routing_decision(&mut self, node: &NodeId, packet: &Packet, route: Option<&Route>) {
        for subscriber in &mut self.subscribers {
            subscriber.on_routing_decision(node, packet, route);
        }
    }

    pub(crate) fn packet_routed(&mut self, packet: &Packet, node: &NodeId, route: &Route) {
        for subscriber in &mut self.subscribers {
            subscriber.on_packet_routed(packet, node, route);
        }
    }

    pub(crate) fn packet_delivered(&mut self, packet: &Packet, node: &NodeId, time_ms: u64) {
        for subscriber in &mut self.subscribers {
            subscriber.on_packet_delivered(packet, node, time_ms);
        }
    }

    pub(crate) fn packet_enqueued_limbo(&mut self, packet: &Packet, node: &NodeId) {
        for subscriber in &mut self.subscribers {
            subscriber.on_packet_enqueued_limbo(packet, node);
        }
    }

    pub(crate) fn contact_started(&mut self, contact: &Contact, time_ms: u64) {
        for subscriber in &mut self.subscribers {
            subscriber.on_contact_started(contact, time_ms);
        }
    }

    pub(crate) fn contact_ended(&mut self, contact: &Contact, time_ms: u64) {
        for subscriber in &mut self.subscribers {
            subscriber.on_contact_ended(contact, time_ms);
        }
    }

    pub(crate) fn contact_capacity_exhausted(&mut self, contact: &Contact, packet: &Packet) {
        for subscriber in &mut self.subscribers {
            subscriber.on_contact_capacity_exhausted(contact, packet);
        }
    }
}
