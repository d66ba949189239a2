pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;
pub mod network;

use anyhow::Result;
use hostmon_common::types::Metrics;

/// A built-in metric source. Collectors are stateful (several keep previous
/// readings to compute deltas) and run on demand, once per fetch.
pub trait Collector: Send + Sync {
    fn id(&self) -> &str;
    fn collect(&mut self) -> Result<Metrics>;
}

/// The default set of built-in collectors.
pub fn builtins() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(cpu::CpuCollector::new()),
        Box::new(memory::MemoryCollector::new()),
        Box::new(disk::DiskCollector::new()),
        Box::new(network::NetworkCollector::new()),
        Box::new(load::LoadCollector::new()),
    ]
}
