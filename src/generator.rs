use crate::error::{SimulationError, SimulationResult};
use crate::plan::NodeId;

/// A single packet emission requested by a generator: source,
/// destination and size in bytes.
pub(crate) type Emission = (NodeId, NodeId, u64);

/// Packet generators drive traffic injection over virtual time.
///
/// Both variants share the generator capability: `start` yields the
/// first firing time, each firing injects packets and yields the next
/// firing time. The simulator owns the generators, so registering the
/// same generator twice is unrepresentable.
#[derive(Debug)]
pub enum PacketGenerator {
    /// Emits packets at a fixed data-generation rate.
    Continuous(ContinuousPacketGenerator),
    /// Emits bursts of packets at fixed points in time.
    Batch(BatchPacketGenerator),
}

impl PacketGenerator {
    /// Number of packets injected so far.
    pub fn generated(&self) -> u64 {
        match self {
            PacketGenerator::Continuous(generator) => generator.generated,
            PacketGenerator::Batch(generator) => generator.generated,
        }
    }

    /// The nodes this generator will inject at or address, used to
    /// validate the configuration before the simulation starts.
    pub(crate) fn referenced_nodes(&self) -> impl Iterator<Item = &NodeId> {
        let (sources, destinations) = match self {
            PacketGenerator::Continuous(generator) => {
                (&generator.sources, &generator.destinations)
            }
            PacketGenerator::Batch(generator) => (&generator.sources, &generator.destinations),
        };
        sources.iter().chain(destinations.iter())
    }

    /// The first firing time, or `None` for a generator that never
    /// fires.
    pub(crate) fn start(&self) -> Option<u64> {
        match self {
            PacketGenerator::Continuous(generator) => {
                Some(generator.start_ms + generator.interval_ms)
            }
            PacketGenerator::Batch(generator) => generator.times.first().copied(),
        }
    }

    /// Fires at `now_ms`: returns the packets to inject and the next
    /// firing time, if any.
    pub(crate) fn fire(&mut self, now_ms: u64) -> (Vec<Emission>, Option<u64>) {
        match self {
            PacketGenerator::Continuous(generator) => generator.fire(now_ms),
            PacketGenerator::Batch(generator) => generator.fire(now_ms),
        }
    }
}

/// Injects one packet per `(source, destination)` pair every
/// `packet_size / generation_rate` milliseconds, from `start_ms`
/// (exclusive, the first packet completes one generation interval
/// after the start) until `end_ms` (exclusive).
#[derive(Debug)]
pub struct ContinuousPacketGenerator {
    packet_size: u64,
    sources: Vec<NodeId>,
    destinations: Vec<NodeId>,
    start_ms: u64,
    end_ms: u64,
    interval_ms: u64,
    generated: u64,
}

impl ContinuousPacketGenerator {
    /// Creates a continuous generator.
    ///
    /// `generation_rate` is in bytes per millisecond; a packet is
    /// emitted whenever a full packet's worth of data has accumulated.
    pub fn new(
        generation_rate: u64,
        packet_size: u64,
        sources: Vec<NodeId>,
        destinations: Vec<NodeId>,
        start_ms: u64,
        end_ms: u64,
    ) -> SimulationResult<Self> {
        if generation_rate == 0 {
            return Err(SimulationError::InvalidGenerator(
                "generation rate must be positive".to_string(),
            ));
        }
        if start_ms > end_ms {
            return Err(SimulationError::InvalidGenerator(
                "generation must not start after it ends".to_string(),
            ));
        }
        let interval_ms = packet_size.div_ceil(generation_rate).max(1);
        Ok(Self {
            packet_size,
            sources,
            destinations,
            start_ms,
            end_ms,
            interval_ms,
            generated: 0,
        })
    }

    fn fire(&mut self, now_ms: u64) -> (Vec<Emission>, Option<u64>) {
        let mut emissions = Vec::new();
        // An empty generation window produces nothing: the firing one
        // interval past the end is a no-op.
        if now_ms < self.end_ms {
            for source in &self.sources {
                for destination in &self.destinations {
                    emissions.push((source.clone(), destination.clone(), self.packet_size));
                }
            }
            self.generated += emissions.len() as u64;
        }
        let next = now_ms + self.interval_ms;
        let next = (next < self.end_ms).then_some(next);
        (emissions, next)
    }
}

/// Injects a fixed number of packets per `(source, destination)` pair
/// at each of a list of points in time.
#[derive(Debug)]
pub struct BatchPacketGenerator {
    packet_count: u64,
    packet_size: u64,
    sources: Vec<NodeId>,
    destinations: Vec<NodeId>,
    times: Vec<u64>,
    cursor: usize,
    generated: u64,
}

impl BatchPacketGenerator {
    /// Creates a batch generator. Injection times are sorted ascending.
    pub fn new(
        packet_count: u64,
        packet_size: u64,
        sources: Vec<NodeId>,
        destinations: Vec<NodeId>,
        mut times: Vec<u64>,
    ) -> SimulationResult<Self> {
        if packet_count == 0 {
            return Err(SimulationError::InvalidGenerator(
                "batch size must be positive".to_string(),
            ));
        }
        times.sort_unstable();
        Ok(Self {
            packet_count,
            packet_size,
            sources,
            destinations,
            times,
            cursor: 0,
            generated: 0,
        })
    }

    fn fire(&mut self, _now_ms: u64) -> (Vec<Emission>, Option<u64>) {
        let mut emissions = Vec::new();
        for source in &self.sources {
            for destination in &self.destinations {
                for _ in 0..self.packet_count {
                    emissions.push((source.clone(), destination.clone(), self.packet_size));
                }
            }
        }
        self.generated += emissions.len() as u64;
        self.cursor += 1;
        (emissions, self.times.get(self.cursor).copied())
    }
}
