use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use crate::contact::Contact;
use crate::error::{SimulationError, SimulationResult};
use crate::events::{Event, EventQueue, ScheduledEvent};
use crate::generator::PacketGenerator;
use crate::monitor::{Monitor, MonitorNotifier};
use crate::node::Node;
use crate::packet::{HopRecord, Packet, PacketId};
use crate::plan::{ContactId, NodeId};
use crate::report::SummaryStatistics;

/// The central simulation coordinator.
///
/// The simulator owns every piece of mutable simulation state — the
/// event queue, the node and contact registries, the generators and
/// the monitor notifier — and resolves all cross-references by
/// identity (node ids, contact ids) rather than owning pointers.
/// Virtual time advances only by executing time-ordered events; a
/// callback always runs to completion before the next event is
/// considered, so no locking is needed anywhere.
///
/// Multiple simulators can coexist; nothing here is ambient global
/// state.
#[derive(Debug)]
pub struct Simulator {
    now_ms: u64,
    queue: EventQueue,
    next_sequence: u64,
    started: bool,
    nodes: BTreeMap<NodeId, Node>,
    contacts: BTreeMap<ContactId, Contact>,
    /// Contact registration order, used for event seeding.
    contact_order: Vec<ContactId>,
    generators: Vec<PacketGenerator>,
    notifier: MonitorNotifier,
    next_packet_id: u64,
    manually_injected: u64,
    delivered: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates an empty simulation environment at time zero.
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            queue: EventQueue::new(),
            next_sequence: 0,
            started: false,
            nodes: BTreeMap::new(),
            contacts: BTreeMap::new(),
            contact_order: Vec::new(),
            generators: Vec::new(),
            notifier: MonitorNotifier::new(),
            next_packet_id: 0,
            manually_injected: 0,
            delivered: 0,
        }
    }

    /// The current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Number of events waiting in the queue.
    pub fn pending_event_count(&self) -> usize {
        self.queue.len()
    }

    /// Looks up a registered node.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a registered runtime contact.
    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.get(&id)
    }

    /// Registers a runtime contact. Contacts with identical
    /// characteristics are fine; the same plan entry twice is not.
    pub fn register_contact(&mut self, contact: Contact) -> SimulationResult<()> {
        let id = contact.id();
        if self.contacts.contains_key(&id) {
            return Err(SimulationError::DuplicateContact(id));
        }
        self.contact_order.push(id);
        self.contacts.insert(id, contact);
        Ok(())
    }

    /// Registers a node, validating that all of its outbound contacts
    /// exist and originate at it.
    pub fn register_node(&mut self, node: Node) -> SimulationResult<()> {
        if self.nodes.contains_key(node.id()) {
            return Err(SimulationError::DuplicateNode(node.id().clone()));
        }
        for &contact_id in node.outbound_contacts() {
            match self.contacts.get(&contact_id) {
                None => return Err(SimulationError::UnknownContact(contact_id)),
                Some(contact) if contact.from_node() != node.id() => {
                    return Err(SimulationError::ContactNodeMismatch {
                        contact: contact_id,
                        node: node.id().clone(),
                    });
                }
                Some(_) => {}
            }
        }
        self.nodes.insert(node.id().clone(), node);
        Ok(())
    }

    /// Registers a packet generator. Generators fire in registration
    /// order when scheduled for the same instant.
    pub fn register_generator(&mut self, generator: PacketGenerator) {
        self.generators.push(generator);
    }

    /// Registers a monitor with the notifier.
    pub fn register_monitor(&mut self, monitor: Box<dyn Monitor>) {
        self.notifier.add_subscriber(monitor);
    }

    /// Schedules an event at an absolute time.
    ///
    /// Fails with [`SimulationError::ScheduleInPast`] when `time_ms`
    /// lies before the current virtual time; that error is fatal and
    /// aborts the run that encounters it.
    pub fn schedule_at(&mut self, time_ms: u64, event: Event) -> SimulationResult<()> {
        if time_ms < self.now_ms {
            return Err(SimulationError::ScheduleInPast {
                scheduled_ms: time_ms,
                now_ms: self.now_ms,
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue
            .schedule(ScheduledEvent::new(time_ms, event, sequence));
        Ok(())
    }

    /// Creates a packet at the current time and routes it at `source`.
    ///
    /// This is the manual-injection path; generator-driven injection
    /// goes through the same routing below.
    pub fn inject_packet(
        &mut self,
        source: &NodeId,
        destination: impl Into<NodeId>,
        size: u64,
    ) -> SimulationResult<PacketId> {
        if !self.nodes.contains_key(source) {
            return Err(SimulationError::UnknownNode(source.clone()));
        }
        let id = PacketId(self.next_packet_id);
        self.next_packet_id += 1;
        self.manually_injected += 1;
        let packet = Packet::new(id, size, source.clone(), destination.into(), self.now_ms);
        self.notifier.packet_injected(&packet, source);
        self.route_packet(source, packet)?;
        Ok(id)
    }

    /// Runs the simulation up to (but excluding) `until_ms`.
    ///
    /// The horizon is hard and half-open: an event scheduled exactly at
    /// `until_ms` does not execute, and a contact starting there never
    /// activates. The first call seeds the start events of every
    /// registered contact and generator, in registration order.
    #[instrument(skip(self))]
    pub fn run(&mut self, until_ms: u64) -> SimulationResult<SummaryStatistics> {
        if !self.started {
            self.started = true;
            self.seed_events()?;
        }
        debug!(until_ms, pending = self.queue.len(), "running simulation");
        loop {
            let time = match self.queue.peek_earliest() {
                Some(event) if event.time_ms() < until_ms => event.time_ms(),
                _ => break,
            };
            let Some(event) = self.queue.pop_earliest() else {
                break;
            };
            self.now_ms = time;
            trace!(time, event = ?event.event(), "dispatching event");
            self.dispatch(event.into_event())?;
        }
        if until_ms > self.now_ms {
            self.now_ms = until_ms;
        }
        Ok(self.statistics())
    }

    /// Computes the summary statistics of the current state.
    ///
    /// Per-contact utilizations are reported in the plan's
    /// deterministic contact order.
    pub fn statistics(&self) -> SummaryStatistics {
        let packets_generated = self.manually_injected
            + self
                .generators
                .iter()
                .map(PacketGenerator::generated)
                .sum::<u64>();
        let packets_in_limbos = self.nodes.values().map(|n| n.limbo().len() as u64).sum();
        let packets_in_contacts = self
            .contacts
            .values()
            .map(|c| c.queued_packets() as u64)
            .sum();
        let packets_lost_capacity = self
            .contacts
            .values()
            .map(|c| c.overflow_packets() as u64)
            .sum();

        let mut ordered: Vec<&Contact> = self.contacts.values().collect();
        ordered.sort_by(|a, b| {
            (a.from_time(), a.from_node(), a.to_node(), a.to_time())
                .cmp(&(b.from_time(), b.from_node(), b.to_node(), b.to_time()))
        });
        let contact_utilizations: Vec<f64> = ordered
            .iter()
            .map(|contact| {
                let total = contact.capacity();
                let percent = contact.utilization() as f64 / total as f64 * 100.0;
                (percent * 100.0).round() / 100.0
            })
            .collect();
        let average_contact_utilization = if contact_utilizations.is_empty() {
            0.0
        } else {
            let sum: f64 = contact_utilizations.iter().sum();
            (sum / contact_utilizations.len() as f64 * 100.0).round() / 100.0
        };

        SummaryStatistics {
            packets_generated,
            packets_delivered: self.delivered,
            packets_in_limbos,
            packets_in_contacts,
            packets_lost_capacity,
            average_contact_utilization,
            contact_utilizations,
        }
    }

    /// Schedules the initial events: contact activations first, then
    /// generator firings, both in registration order. Also refuses to
    /// start when a generator references an unregistered node.
    fn seed_events(&mut self) -> SimulationResult<()> {
        for generator in &self.generators {
            for node in generator.referenced_nodes() {
                if !self.nodes.contains_key(node) {
                    return Err(SimulationError::UnknownNode(node.clone()));
                }
            }
        }
        for id in self.contact_order.clone() {
            let Some(from_time) = self.contacts.get(&id).map(Contact::from_time) else {
                continue;
            };
            self.schedule_at(from_time, Event::ContactStart { contact: id })?;
        }
        for index in 0..self.generators.len() {
            if let Some(time) = self.generators[index].start() {
                self.schedule_at(time, Event::GeneratorFire { generator: index })?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> SimulationResult<()> {
        match event {
            Event::GeneratorFire { generator } => self.fire_generator(generator),
            Event::ContactStart { contact } => self.contact_start(contact),
            Event::ContactDrain { contact } => self.contact_drain(contact),
            Event::ContactHandover { contact } => self.contact_handover(contact),
            Event::ContactEnd { contact } => self.contact_end(contact),
        }
    }

    fn fire_generator(&mut self, index: usize) -> SimulationResult<()> {
        let now = self.now_ms;
        let (emissions, next) = match self.generators.get_mut(index) {
            Some(generator) => generator.fire(now),
            None => return Ok(()),
        };
        for (source, destination, size) in emissions {
            let id = PacketId(self.next_packet_id);
            self.next_packet_id += 1;
            let packet = Packet::new(id, size, source.clone(), destination, now);
            self.notifier.packet_generated(&packet, &source);
            self.notifier.packet_injected(&packet, &source);
            self.route_packet(&source, packet)?;
        }
        if let Some(time) = next {
            self.schedule_at(time, Event::GeneratorFire { generator: index })?;
        }
        Ok(())
    }

    fn contact_start(&mut self, id: ContactId) -> SimulationResult<()> {
        let now = self.now_ms;
        let mut to_time = 0;
        let mut kick = false;
        match self.contacts.get_mut(&id) {
            Some(contact) => {
                contact.set_active(true);
                to_time = contact.to_time();
                kick = contact.queued_packets() > 0;
                if kick {
                    contact.set_draining(true);
                }
                self.notifier.contact_started(&*contact, now);
            }
            None => return Ok(()),
        }
        self.schedule_at(to_time, Event::ContactEnd { contact: id })?;
        if kick {
            self.schedule_at(now, Event::ContactDrain { contact: id })?;
        }
        Ok(())
    }

    fn contact_end(&mut self, id: ContactId) -> SimulationResult<()> {
        let now = self.now_ms;
        if let Some(contact) = self.contacts.get_mut(&id) {
            contact.set_active(false);
            contact.set_draining(false);
            self.notifier.contact_ended(&*contact, now);
        }
        Ok(())
    }

    /// One drain step: examine the head of the FIFO and either start
    /// its transmission or drop it to the overflow when it cannot
    /// finish inside the window.
    fn contact_drain(&mut self, id: ContactId) -> SimulationResult<()> {
        let now = self.now_ms;
        let Some(contact) = self.contacts.get_mut(&id) else {
            return Ok(());
        };
        if !contact.is_active() || now >= contact.to_time() {
            contact.set_draining(false);
            return Ok(());
        }
        let size = match contact.queue_front_mut() {
            Some(head) => head.size(),
            None => {
                // Queue drained; a later booking re-kicks the drain.
                contact.set_draining(false);
                return Ok(());
            }
        };
        let duration = contact.transmission_duration(size);
        let delay = contact.delay();
        if now + duration > contact.to_time() {
            let Some(packet) = contact.queue_pop_front() else {
                return Ok(());
            };
            contact.set_draining(false);
            debug!(
                contact = ?id,
                packet = packet.id().0,
                "packet cannot finish inside the contact window"
            );
            self.notifier.contact_capacity_exhausted(&*contact, &packet);
            contact.push_overflow(packet);
            return Ok(());
        }
        if let Some(head) = contact.queue_front_mut() {
            head.record_hop(HopRecord {
                contact: id,
                departure_ms: now,
                arrival_ms: now + duration + delay,
            });
        }
        // A zero-size packet transmits instantly but still costs one
        // scheduled step; the handover is scheduled before the next
        // drain so it pops first at equal times.
        self.schedule_at(now + duration, Event::ContactHandover { contact: id })?;
        self.schedule_at(now + duration, Event::ContactDrain { contact: id })?;
        Ok(())
    }

    /// Transmission end: pop the head packet and hand it to the peer
    /// node. Propagation delay is accounted for in routing arithmetic
    /// and in the recorded trace, not in the handover time.
    fn contact_handover(&mut self, id: ContactId) -> SimulationResult<()> {
        let (packet, peer) = {
            let Some(contact) = self.contacts.get_mut(&id) else {
                return Ok(());
            };
            let Some(mut packet) = contact.queue_pop_front() else {
                panic!("handover fired for contact {id:?} with an empty queue");
            };
            let peer = contact.to_node().clone();
            packet.set_owner(peer.clone());
            (packet, peer)
        };
        trace!(contact = ?id, packet = packet.id().0, %peer, "packet handed over");
        if !self.nodes.contains_key(&peer) {
            return Err(SimulationError::UnknownNode(peer));
        }
        self.route_packet(&peer, packet)
    }

    /// Delivers the packet here, or asks the router for a next hop and
    /// either books the packet onto the chosen contact or parks it in
    /// the limbo.
    fn route_packet(&mut self, node_id: &NodeId, mut packet: Packet) -> SimulationResult<()> {
        let now = self.now_ms;
        if packet.destination() == node_id {
            self.delivered += 1;
            debug!(packet = packet.id().0, node = %node_id, time = now, "packet delivered");
            self.notifier.packet_delivered(&packet, node_id, now);
            return Ok(());
        }

        let decision = {
            let Some(node) = self.nodes.get_mut(node_id) else {
                return Err(SimulationError::UnknownNode(node_id.clone()));
            };
            let excluded = node.excluded_nodes(&packet, &self.contacts);
            node.route(&self.contacts, &packet, now, &excluded)
        };
        self.notifier.routing_decision(node_id, &packet, decision.as_ref());

        match decision {
            Some(route) => {
                let Some(&first) = route.contacts.first() else {
                    panic!("selected route has no hops");
                };
                packet.record_planned_route(route.contacts.clone());
                let Some(contact) = self.contacts.get_mut(&first) else {
                    return Err(SimulationError::UnknownContact(first));
                };
                self.notifier.packet_routed(&packet, node_id, &route);
                let kick = contact.is_active() && !contact.is_draining();
                if kick {
                    contact.set_draining(true);
                }
                contact.book(now, packet);
                if kick {
                    self.schedule_at(now, Event::ContactDrain { contact: first })?;
                }
            }
            None => {
                debug!(packet = packet.id().0, node = %node_id, "no route, packet goes to limbo");
                self.notifier.packet_enqueued_limbo(&packet, node_id);
                let Some(node) = self.nodes.get_mut(node_id) else {
                    return Err(SimulationError::UnknownNode(node_id.clone()));
                };
                node.push_limbo(packet);
            }
        }
        Ok(())
    }
}
