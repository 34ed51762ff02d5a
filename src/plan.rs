use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{SimulationError, SimulationResult};

/// Identifier of a network node. Nodes are referenced by identity
/// through the simulator's central registry, never by owning pointers.
pub type NodeId = String;

/// Identifier of a planned contact: its insertion index in the contact
/// plan. Stable for the lifetime of the plan and everything derived
/// from it (graph, runtime contacts, routes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ContactId(usize);

impl ContactId {
    /// The position of the contact in plan insertion order.
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// An immutable plan entry: one unidirectional communication window.
///
/// The window is half-open: the contact is usable in
/// `[from_time, to_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanContact {
    /// Transmitting node.
    pub from_node: NodeId,
    /// Receiving node.
    pub to_node: NodeId,
    /// Window start in milliseconds.
    pub from_time: u64,
    /// Window end in milliseconds (exclusive).
    pub to_time: u64,
    /// Data rate in bytes per millisecond.
    pub datarate: u64,
    /// Propagation delay in milliseconds. Zero delay is forbidden as it
    /// allows zero-duration forwarding loops.
    pub delay: u64,
}

impl PlanContact {
    /// Creates a validated plan contact.
    pub fn new(
        from_node: impl Into<NodeId>,
        to_node: impl Into<NodeId>,
        from_time: u64,
        to_time: u64,
        datarate: u64,
        delay: u64,
    ) -> SimulationResult<Self> {
        let from_node = from_node.into();
        let to_node = to_node.into();
        let invalid = |reason: &str| SimulationError::InvalidContact {
            from_node: from_node.clone(),
            to_node: to_node.clone(),
            reason: reason.to_string(),
        };
        if from_time >= to_time {
            return Err(invalid("from_time must be before to_time"));
        }
        if datarate == 0 {
            return Err(invalid("datarate must be positive"));
        }
        if delay == 0 {
            return Err(invalid("delay must be positive"));
        }
        Ok(Self {
            from_node,
            to_node,
            from_time,
            to_time,
            datarate,
            delay,
        })
    }

    /// Total transferable volume of the window, in bytes.
    pub fn capacity(&self) -> u64 {
        (self.to_time - self.from_time) * self.datarate
    }

    /// Key used for the plan's deterministic contact order.
    fn sort_key(&self) -> (u64, &NodeId, &NodeId, u64) {
        (self.from_time, &self.from_node, &self.to_node, self.to_time)
    }
}

/// A contact plan: the set of planned contacts plus defaults for data
/// rate and delay.
///
/// The plan is filled manually; topology file loading belongs to
/// external collaborators and is out of scope here. Iteration orders
/// exposed by this type are explicit and deterministic — nothing
/// depends on hash-table iteration.
#[derive(Debug, Clone)]
pub struct ContactPlan {
    default_datarate: u64,
    default_delay: u64,
    contacts: Vec<PlanContact>,
    nodes: BTreeSet<NodeId>,
}

impl ContactPlan {
    /// Creates an empty plan with the given defaults.
    ///
    /// The defaults are validated up front: a default delay of zero
    /// would silently produce contacts that can form zero-duration
    /// forwarding loops.
    pub fn new(default_datarate: u64, default_delay: u64) -> SimulationResult<Self> {
        if default_datarate == 0 {
            return Err(SimulationError::InvalidPlan(
                "default datarate must be positive".to_string(),
            ));
        }
        if default_delay == 0 {
            return Err(SimulationError::InvalidPlan(
                "default delay must be positive".to_string(),
            ));
        }
        Ok(Self {
            default_datarate,
            default_delay,
            contacts: Vec::new(),
            nodes: BTreeSet::new(),
        })
    }

    /// The data rate used when none is provided explicitly.
    pub fn default_datarate(&self) -> u64 {
        self.default_datarate
    }

    /// The propagation delay used when none is provided explicitly.
    pub fn default_delay(&self) -> u64 {
        self.default_delay
    }

    /// Adds a bidirectional contact using the plan defaults, returning
    /// the identifiers of both directions.
    ///
    /// Duplicate windows between the same nodes are allowed; a plan may
    /// legitimately contain several contacts with identical
    /// characteristics.
    pub fn add_contact(
        &mut self,
        node_a: impl Into<NodeId>,
        node_b: impl Into<NodeId>,
        from_time: u64,
        to_time: u64,
    ) -> SimulationResult<(ContactId, ContactId)> {
        let node_a = node_a.into();
        let node_b = node_b.into();
        let forward = self.add_contact_directed(
            node_a.clone(),
            node_b.clone(),
            from_time,
            to_time,
            self.default_datarate,
            self.default_delay,
        )?;
        let backward = self.add_contact_directed(
            node_b,
            node_a,
            from_time,
            to_time,
            self.default_datarate,
            self.default_delay,
        )?;
        Ok((forward, backward))
    }

    /// Adds a single unidirectional contact with explicit
    /// characteristics.
    pub fn add_contact_directed(
        &mut self,
        from_node: impl Into<NodeId>,
        to_node: impl Into<NodeId>,
        from_time: u64,
        to_time: u64,
        datarate: u64,
        delay: u64,
    ) -> SimulationResult<ContactId> {
        let contact = PlanContact::new(from_node, to_node, from_time, to_time, datarate, delay)?;
        self.nodes.insert(contact.from_node.clone());
        self.nodes.insert(contact.to_node.clone());
        let id = ContactId(self.contacts.len());
        self.contacts.push(contact);
        Ok(id)
    }

    /// Adds an isolated node to the plan. A node already mentioned by a
    /// contact keeps its contacts.
    pub fn add_node(&mut self, node: impl Into<NodeId>) {
        self.nodes.insert(node.into());
    }

    /// All node identifiers mentioned in the plan, in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Looks up a plan contact by identifier.
    pub fn contact(&self, id: ContactId) -> Option<&PlanContact> {
        self.contacts.get(id.0)
    }

    /// Number of contacts in the plan.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the plan contains no contacts.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// All contacts in the plan's deterministic order, sorted by
    /// `(from_time, from_node, to_node, to_time)`.
    pub fn sorted_contacts(&self) -> Vec<(ContactId, &PlanContact)> {
        let mut contacts: Vec<(ContactId, &PlanContact)> = self
            .contacts
            .iter()
            .enumerate()
            .map(|(index, contact)| (ContactId(index), contact))
            .collect();
        contacts.sort_by(|(_, a), (_, b)| a.sort_key().cmp(&b.sort_key()));
        contacts
    }

    /// All contacts originating at `node`, in the plan's deterministic
    /// order.
    pub fn outbound_contacts(&self, node: &NodeId) -> Vec<ContactId> {
        self.sorted_contacts()
            .into_iter()
            .filter(|(_, contact)| &contact.from_node == node)
            .map(|(id, _)| id)
            .collect()
    }
}
