//! Connection table snapshots

use super::layout::{ConnectionRecord, CONN_SLOT_SIZE};

/// Copy out every valid connection, ordered by worker then connection id.
///
/// The sort is stable: slots sharing a (worker, id) pair keep their table
/// order, so a refresh never reorders them. `table` holds whole slots; a
/// trailing partial slot is ignored.
pub fn snapshot_connections(table: &[u8]) -> Vec<ConnectionRecord> {
    let mut conns: Vec<ConnectionRecord> = table
        .chunks_exact(CONN_SLOT_SIZE)
        .filter_map(ConnectionRecord::decode)
        .collect();

    conns.sort_by_key(|c| (c.worker_id, c.conn_id));
    conns
}
