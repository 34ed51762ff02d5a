use thiserror::Error;

use crate::plan::{ContactId, NodeId};

/// Errors that can occur while configuring or running a simulation.
///
/// Routing infeasibility is deliberately *not* an error: a packet for
/// which no route exists goes to its node's limbo and is reflected in
/// the final statistics. Likewise, a packet that cannot finish
/// transmission inside its contact window is recorded as lost to
/// capacity exhaustion, not raised as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// A contact violates the plan invariants (`from_time < to_time`,
    /// `datarate > 0`, `delay > 0`).
    #[error("invalid contact {from_node} -> {to_node}: {reason}")]
    InvalidContact {
        /// Source node of the offending contact.
        from_node: NodeId,
        /// Destination node of the offending contact.
        to_node: NodeId,
        /// Which invariant was violated.
        reason: String,
    },
    /// A contact plan was configured with impossible defaults.
    #[error("invalid contact plan: {0}")]
    InvalidPlan(String),
    /// A packet generator was configured with impossible parameters.
    #[error("invalid packet generator: {0}")]
    InvalidGenerator(String),
    /// A node with the same identifier already exists in the simulation.
    #[error("node '{0}' already exists in the simulation")]
    DuplicateNode(NodeId),
    /// A contact with the same identifier was already registered.
    #[error("contact {0:?} was already registered")]
    DuplicateContact(ContactId),
    /// An operation referenced a node that is not registered.
    #[error("node '{0}' is not registered in the simulation")]
    UnknownNode(NodeId),
    /// An operation referenced a contact that is not registered.
    #[error("contact {0:?} is not registered in the simulation")]
    UnknownContact(ContactId),
    /// A node was registered with an outbound contact that does not
    /// originate at it.
    #[error("contact {contact:?} does not originate at node '{node}'")]
    ContactNodeMismatch {
        /// The offending contact.
        contact: ContactId,
        /// The node the contact was attached to.
        node: NodeId,
    },
    /// An event was scheduled before the current virtual time. This is
    /// fatal and aborts the run.
    #[error("event scheduled at {scheduled_ms} ms, before current time {now_ms} ms")]
    ScheduleInPast {
        /// The requested event time.
        scheduled_ms: u64,
        /// The simulation time at the moment of scheduling.
        now_ms: u64,
    },
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
