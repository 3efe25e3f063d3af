//! One dashboard session: both regions attached, plus the throughput
//! baseline seeded from them.

use crate::config::RefreshDelay;
use crate::telemetry::{
    snapshot_connections, RegionAttacher, RegionKind, RegionView, ThroughputAggregator,
};
use crate::tui::renderer;
use anyhow::Result;
use std::io::{self, Write};

#[derive(Debug)]
pub struct Dashboard {
    connections: RegionView,
    histories: RegionView,
    throughput: ThroughputAggregator,
}

impl Dashboard {
    /// Attach both regions of `instance_id` and seed the baseline.
    pub fn attach(attacher: &RegionAttacher, instance_id: u32) -> Result<Self> {
        let connections = attacher.attach(RegionKind::Connections, instance_id)?;
        let histories = attacher.attach(RegionKind::CounterHistory, instance_id)?;
        let throughput = ThroughputAggregator::seed(*attacher.layout(), histories.bytes());

        Ok(Self {
            connections,
            histories,
            throughput,
        })
    }

    /// Read both regions and draw a frame. `interval` is the time the
    /// counters had to advance since the previous call.
    pub fn refresh<W: Write>(&mut self, out: &mut W, interval: RefreshDelay) -> io::Result<()> {
        let connections = snapshot_connections(self.connections.bytes());
        let report = self.throughput.sample(self.histories.bytes(), interval);
        renderer::render(out, &connections, &report)
    }

    pub fn detach(self, attacher: &RegionAttacher) {
        attacher.detach(self.connections);
        attacher.detach(self.histories);
    }
}
