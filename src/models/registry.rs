use crate::collectors::multipath::Topology;
use crate::models::device::{BlockDevice, IoMetrics, MapperDevice};
use std::collections::HashMap;

/// Every mapper and path discovered at start-up, plus the metrics of the
/// current cycle. The device set never changes after construction.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    mappers: Vec<MapperDevice>,
    paths:   Vec<BlockDevice>,
}

impl DeviceRegistry {
    /// Build the registry from a parsed topology. All metrics start at zero.
    pub fn initialize(topology: Topology) -> Self {
        let mut reg = Self { mappers: topology.mappers, paths: topology.paths };
        reg.reset_all();
        reg
    }

    pub fn mappers(&self) -> &[MapperDevice] { &self.mappers }

    /// Paths belonging to `mapper_id`, in discovery order.
    pub fn paths_of<'a>(&'a self, mapper_id: &'a str) -> impl Iterator<Item = &'a BlockDevice> + 'a {
        self.paths.iter().filter(move |p| p.parent_id == mapper_id)
    }

    /// Zero the metrics of every known device.
    pub fn reset_all(&mut self) {
        for m in &mut self.mappers { m.metrics = IoMetrics::default(); }
        for p in &mut self.paths   { p.metrics = IoMetrics::default(); }
    }

    /// Replace the metrics of each device present in `sample`. Returns how
    /// many devices were updated.
    pub fn apply_sample(&mut self, sample: &HashMap<String, IoMetrics>) -> usize {
        let mut updated = 0;
        for m in &mut self.mappers {
            if let Some(io) = sample.get(&m.id) {
                m.metrics = *io;
                updated += 1;
            }
        }
        for p in &mut self.paths {
            if let Some(io) = sample.get(&p.id) {
                p.metrics = *io;
                updated += 1;
            }
        }
        updated
    }
}
