//! Frame rendering
//!
//! Plain fixed-width text: connections first, then per-worker task rates
//! and their total.

use crate::telemetry::{ConnectionRecord, ThroughputReport};
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

/// Clear the screen and draw one frame.
pub fn render<W: Write>(
    out: &mut W,
    connections: &[ConnectionRecord],
    report: &ThroughputReport,
) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    for conn in connections {
        writeln!(
            out,
            "lcore {:2} conn {:3} T:{:<8} I:{} ({})",
            conn.worker_id,
            conn.conn_id,
            conn.target_name,
            conn.initiator_name,
            conn.initiator_addr
        )?;
    }
    writeln!(out)?;

    writeln!(out, "lcore   tasks")?;
    writeln!(out, "=============")?;
    for worker in &report.workers {
        writeln!(out, "{:5} {:7}", worker.worker_id, worker.tasks_per_sec)?;
    }
    writeln!(out, "Total {:7}", report.total_per_sec)?;

    out.flush()
}
