//! Fake producer: writes both regions as files in a temp directory the way
//! a running target would export them.

#![allow(dead_code)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use iscsi_top::telemetry::layout::{
    CONN_ADDR_OFFSET, CONN_ID_OFFSET, CONN_INITIATOR_OFFSET, CONN_SLOT_SIZE, CONN_TARGET_OFFSET,
    CONN_VALID_OFFSET, CONN_WORKER_OFFSET, INITIATOR_ADDR_LEN, INITIATOR_NAME_LEN,
    TARGET_NAME_LEN,
};
use iscsi_top::telemetry::{RegionKind, RegionLayout};
use memmap2::MmapMut;
use tempfile::TempDir;

pub struct Producer {
    dir: TempDir,
    layout: RegionLayout,
    instance_id: u32,
    conns: MmapMut,
    histories: MmapMut,
}

impl Producer {
    pub fn new(layout: RegionLayout, instance_id: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let conns = create_region(dir.path(), RegionKind::Connections, &layout, instance_id);
        let histories = create_region(dir.path(), RegionKind::CounterHistory, &layout, instance_id);

        let mut producer = Self {
            dir,
            layout,
            instance_id,
            conns,
            histories,
        };
        for slot in 0..layout.max_workers {
            producer.set_worker_id(slot, slot as u64);
        }
        producer
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> RegionLayout {
        self.layout
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn open_connection(&mut self, slot: usize, worker_id: i32, conn_id: i32) {
        let at = slot * CONN_SLOT_SIZE;
        let buf = &mut self.conns[at..at + CONN_SLOT_SIZE];
        buf.fill(0);
        buf[CONN_WORKER_OFFSET..CONN_WORKER_OFFSET + 4].copy_from_slice(&worker_id.to_ne_bytes());
        buf[CONN_ID_OFFSET..CONN_ID_OFFSET + 4].copy_from_slice(&conn_id.to_ne_bytes());
        buf[CONN_VALID_OFFSET..CONN_VALID_OFFSET + 4].copy_from_slice(&1u32.to_ne_bytes());
        put_cstr(buf, CONN_TARGET_OFFSET, TARGET_NAME_LEN, &format!("disk{}", conn_id));
        put_cstr(buf, CONN_INITIATOR_OFFSET, INITIATOR_NAME_LEN, "iqn.2016-06.io.spdk:host");
        put_cstr(buf, CONN_ADDR_OFFSET, INITIATOR_ADDR_LEN, "10.0.0.2");
    }

    pub fn close_connection(&mut self, slot: usize) {
        let at = slot * CONN_SLOT_SIZE;
        self.conns[at..at + CONN_SLOT_SIZE].fill(0);
    }

    pub fn set_worker_id(&mut self, slot: usize, worker_id: u64) {
        let at = slot * self.layout.history_record_size();
        self.histories[at..at + 8].copy_from_slice(&worker_id.to_ne_bytes());
    }

    pub fn set_tasks_done(&mut self, slot: usize, count: u64) {
        let at = slot * self.layout.history_record_size() + self.layout.task_done_offset();
        self.histories[at..at + 8].copy_from_slice(&count.to_ne_bytes());
    }

    /// Config file pointing the dashboard at this producer's directory.
    pub fn write_config(&self) -> PathBuf {
        let path = self.dir.path().join("iscsi_top.toml");
        let contents = format!(
            "shm_dir = {:?}\n\n[layout]\nmax_connections = {}\nmax_workers = {}\ntpoint_ids = {}\ntask_done_tpoint = {}\n",
            self.dir.path().display().to_string(),
            self.layout.max_connections,
            self.layout.max_workers,
            self.layout.tpoint_ids,
            self.layout.task_done_tpoint,
        );
        std::fs::write(&path, contents).unwrap();
        path
    }
}

// Leaves at least one trailing NUL in the field.
fn put_cstr(buf: &mut [u8], offset: usize, len: usize, value: &str) {
    let n = value.len().min(len - 1);
    buf[offset..offset + n].copy_from_slice(&value.as_bytes()[..n]);
}

fn create_region(dir: &Path, kind: RegionKind, layout: &RegionLayout, instance_id: u32) -> MmapMut {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(dir.join(kind.name(instance_id)))
        .unwrap();
    file.set_len(layout.region_size(kind) as u64).unwrap();
    unsafe { MmapMut::map_mut(&file).unwrap() }
}

pub fn small_layout() -> RegionLayout {
    RegionLayout {
        max_connections: 128,
        max_workers: 8,
        tpoint_ids: 16,
        task_done_tpoint: 3,
    }
}
