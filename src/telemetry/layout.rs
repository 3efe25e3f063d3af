//! Producer region layout
//!
//! Fixed binary layout of the two regions the server exports. Offsets are
//! native endian and must match the producer's build exactly; capacities
//! come from its build configuration and may be overridden in the config
//! file.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Bytes per connection slot.
pub const CONN_SLOT_SIZE: usize = 400;

pub const CONN_WORKER_OFFSET: usize = 0;
pub const CONN_ID_OFFSET: usize = 4;
pub const CONN_VALID_OFFSET: usize = 8;
pub const CONN_TARGET_OFFSET: usize = 16;
pub const CONN_INITIATOR_OFFSET: usize = 80;
pub const CONN_ADDR_OFFSET: usize = 336;

pub const TARGET_NAME_LEN: usize = 64;
pub const INITIATOR_NAME_LEN: usize = 256;
pub const INITIATOR_ADDR_LEN: usize = 64;

/// Which of the two exported regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Connections,
    CounterHistory,
}

impl RegionKind {
    /// Region name for a producer instance, without the leading slash.
    pub fn name(&self, instance_id: u32) -> String {
        match self {
            RegionKind::Connections => format!("spdk_iscsi_conns.{}", instance_id),
            RegionKind::CounterHistory => format!("iscsi_trace.{}", instance_id),
        }
    }
}

/// Capacities baked into the producer at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    /// Slots in the connection table
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Records in the counter-history table
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Counters per worker record
    #[serde(default = "default_tpoint_ids")]
    pub tpoint_ids: usize,

    /// Tracepoint id counting completed tasks
    #[serde(default = "default_task_done_tpoint")]
    pub task_done_tpoint: usize,
}

fn default_max_connections() -> usize {
    1024
}

fn default_max_workers() -> usize {
    128
}

fn default_tpoint_ids() -> usize {
    64
}

fn default_task_done_tpoint() -> usize {
    1
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_workers: default_max_workers(),
            tpoint_ids: default_tpoint_ids(),
            task_done_tpoint: default_task_done_tpoint(),
        }
    }
}

impl RegionLayout {
    /// Reject capacities that cannot describe a real producer build.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            bail!("layout.max_connections must be at least 1");
        }
        if self.max_workers == 0 {
            bail!("layout.max_workers must be at least 1");
        }
        if self.task_done_tpoint >= self.tpoint_ids {
            bail!(
                "layout.task_done_tpoint ({}) must be below layout.tpoint_ids ({})",
                self.task_done_tpoint,
                self.tpoint_ids
            );
        }
        Ok(())
    }

    pub fn history_record_size(&self) -> usize {
        8 + 8 * self.tpoint_ids
    }

    /// Minimum mapped size for a region of the given kind.
    pub fn region_size(&self, kind: RegionKind) -> usize {
        match kind {
            RegionKind::Connections => CONN_SLOT_SIZE * self.max_connections,
            RegionKind::CounterHistory => self.history_record_size() * self.max_workers,
        }
    }

    /// Byte offset of the task-done counter inside a history record.
    pub fn task_done_offset(&self) -> usize {
        8 + 8 * self.task_done_tpoint
    }
}

/// One live connection, copied out of the shared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub worker_id: i32,
    pub conn_id: i32,
    pub target_name: String,
    pub initiator_name: String,
    pub initiator_addr: String,
}

impl ConnectionRecord {
    /// Decode one slot; `None` when the slot is not valid.
    ///
    /// The producer may be rewriting the slot while we copy it, so the
    /// strings can come back torn. That is tolerated.
    pub fn decode(slot: &[u8]) -> Option<Self> {
        if read_u32(slot, CONN_VALID_OFFSET) == 0 {
            return None;
        }

        Some(Self {
            worker_id: read_u32(slot, CONN_WORKER_OFFSET) as i32,
            conn_id: read_u32(slot, CONN_ID_OFFSET) as i32,
            target_name: read_cstr(slot, CONN_TARGET_OFFSET, TARGET_NAME_LEN),
            initiator_name: read_cstr(slot, CONN_INITIATOR_OFFSET, INITIATOR_NAME_LEN),
            initiator_addr: read_cstr(slot, CONN_ADDR_OFFSET, INITIATOR_ADDR_LEN),
        })
    }

    /// Encode into a slot buffer the way the producer lays it out.
    #[cfg(test)]
    pub(crate) fn encode_into(&self, slot: &mut [u8]) {
        slot[..CONN_SLOT_SIZE].fill(0);
        slot[CONN_WORKER_OFFSET..CONN_WORKER_OFFSET + 4]
            .copy_from_slice(&self.worker_id.to_ne_bytes());
        slot[CONN_ID_OFFSET..CONN_ID_OFFSET + 4].copy_from_slice(&self.conn_id.to_ne_bytes());
        slot[CONN_VALID_OFFSET..CONN_VALID_OFFSET + 4].copy_from_slice(&1u32.to_ne_bytes());
        write_cstr(slot, CONN_TARGET_OFFSET, TARGET_NAME_LEN, &self.target_name);
        write_cstr(slot, CONN_INITIATOR_OFFSET, INITIATOR_NAME_LEN, &self.initiator_name);
        write_cstr(slot, CONN_ADDR_OFFSET, INITIATOR_ADDR_LEN, &self.initiator_addr);
    }
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(raw)
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_ne_bytes(raw)
}

fn read_cstr(buf: &[u8], offset: usize, len: usize) -> String {
    let field = &buf[offset..offset + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

// Truncates so the field always keeps a terminating NUL.
#[cfg(test)]
fn write_cstr(buf: &mut [u8], offset: usize, len: usize, value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len - 1);
    buf[offset..offset + n].copy_from_slice(&bytes[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(worker_id: i32, conn_id: i32) -> ConnectionRecord {
        ConnectionRecord {
            worker_id,
            conn_id,
            target_name: "disk1".to_string(),
            initiator_name: "iqn.2016-06.io.spdk:init".to_string(),
            initiator_addr: "10.0.0.7".to_string(),
        }
    }

    #[test]
    fn test_region_names() {
        assert_eq!(RegionKind::Connections.name(0), "spdk_iscsi_conns.0");
        assert_eq!(RegionKind::CounterHistory.name(3), "iscsi_trace.3");
    }

    #[test]
    fn test_region_sizes() {
        let layout = RegionLayout::default();
        assert_eq!(layout.region_size(RegionKind::Connections), 400 * 1024);
        assert_eq!(layout.history_record_size(), 8 + 8 * 64);
        assert_eq!(
            layout.region_size(RegionKind::CounterHistory),
            (8 + 8 * 64) * 128
        );
        assert_eq!(layout.task_done_offset(), 16);
    }

    #[test]
    fn test_default_layout_is_valid() {
        RegionLayout::default().validate().unwrap();
    }

    #[test]
    fn test_task_done_tpoint_must_fit_record() {
        let layout = RegionLayout {
            tpoint_ids: 4,
            task_done_tpoint: 4,
            ..RegionLayout::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("task_done_tpoint"));

        let layout = RegionLayout {
            tpoint_ids: 4,
            task_done_tpoint: 3,
            ..RegionLayout::default()
        };
        layout.validate().unwrap();
    }

    #[test]
    fn test_empty_tables_are_rejected() {
        let no_conns = RegionLayout {
            max_connections: 0,
            ..RegionLayout::default()
        };
        assert!(no_conns.validate().is_err());

        let no_workers = RegionLayout {
            max_workers: 0,
            ..RegionLayout::default()
        };
        assert!(no_workers.validate().is_err());
    }

    #[test]
    fn test_invalid_slot_is_skipped() {
        let slot = [0u8; CONN_SLOT_SIZE];
        assert!(ConnectionRecord::decode(&slot).is_none());
    }

    #[test]
    fn test_slot_decodes_fields() {
        let mut slot = [0u8; CONN_SLOT_SIZE];
        record(2, 17).encode_into(&mut slot);
        assert_eq!(ConnectionRecord::decode(&slot), Some(record(2, 17)));
    }

    #[test]
    fn test_unterminated_name_is_bounded() {
        let mut slot = [0u8; CONN_SLOT_SIZE];
        record(0, 0).encode_into(&mut slot);
        slot[CONN_TARGET_OFFSET..CONN_TARGET_OFFSET + TARGET_NAME_LEN].fill(b'x');

        let decoded = ConnectionRecord::decode(&slot).unwrap();
        assert_eq!(decoded.target_name.len(), TARGET_NAME_LEN);
        assert_eq!(decoded.initiator_name, "iqn.2016-06.io.spdk:init");
    }
}
