use serde::Serialize;

/// Rates for one device over one sampling window, as reported by iostat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IoMetrics {
    pub reads:              f64,
    pub writes:             f64,
    pub kb_read_per_sec:    f64,
    pub kb_written_per_sec: f64,
    pub await_ms:           f64,
}

impl IoMetrics {
    /// True when the device completed at least one read or write this window.
    pub fn is_active(&self) -> bool {
        self.reads > 0.0 || self.writes > 0.0
    }
}

/// One device-mapper multipath device (`mpatha` / `dm-3`).
#[derive(Debug, Clone, PartialEq)]
pub struct MapperDevice {
    pub id:           String,   // kernel name, e.g. "dm-3"
    pub display_name: String,   // alias, e.g. "mpatha"
    pub metrics:      IoMetrics,
}

impl MapperDevice {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), metrics: IoMetrics::default() }
    }
}

/// One path (SCSI block device) underneath a mapper device.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDevice {
    pub id:        String,   // e.g. "sdcl"
    pub parent_id: String,   // MapperDevice::id
    pub metrics:   IoMetrics,
}

impl BlockDevice {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self { id: id.into(), parent_id: parent_id.into(), metrics: IoMetrics::default() }
    }
}
