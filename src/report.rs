use std::fmt;

use serde::Serialize;

/// Summary statistics of a simulation run.
///
/// All counters derive from integer simulation state; the utilization
/// percentages are computed from integer byte counts at reporting time
/// and are therefore identical across identical runs. Per-contact
/// utilizations are listed in the plan's deterministic contact order
/// `(from_time, from_node, to_node, to_time)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    /// Packets created by all registered generators plus manual
    /// injections.
    pub packets_generated: u64,
    /// Packets that reached their destination.
    pub packets_delivered: u64,
    /// Packets sitting in node limbos because no route was found.
    pub packets_in_limbos: u64,
    /// Packets still booked in contact queues when the run ended.
    pub packets_in_contacts: u64,
    /// Packets dropped because they could not finish transmission
    /// inside their contact window.
    pub packets_lost_capacity: u64,
    /// Arithmetic mean of the per-contact utilizations, in percent.
    pub average_contact_utilization: f64,
    /// Utilization of every contact in percent, rounded to two
    /// decimals.
    pub contact_utilizations: Vec<f64>,
}

impl SummaryStatistics {
    /// Conservation check over the packet counters: everything
    /// generated is delivered, stuck in a limbo, still enqueued, or
    /// lost to capacity exhaustion.
    pub fn is_conserved(&self) -> bool {
        self.packets_generated
            == self.packets_delivered
                + self.packets_in_limbos
                + self.packets_in_contacts
                + self.packets_lost_capacity
    }
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Results ===")?;
        writeln!(
            f,
            "- total number of packets generated: {}",
            self.packets_generated
        )?;
        writeln!(
            f,
            "- total number of packets delivered: {}",
            self.packets_delivered
        )?;
        writeln!(
            f,
            "- total number of packets enqueued in limbos: {}",
            self.packets_in_limbos
        )?;
        writeln!(
            f,
            "- total number of packets enqueued in contacts: {}",
            self.packets_in_contacts
        )?;
        writeln!(
            f,
            "- total number of packets lost to capacity exhaustion: {}",
            self.packets_lost_capacity
        )?;
        writeln!(
            f,
            "- average contact capacity utilization: {:.2} %",
            self.average_contact_utilization
        )?;
        Ok(())
    }
}
