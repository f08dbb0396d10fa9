use crate::models::device::IoMetrics;
use crate::models::registry::DeviceRegistry;
use serde_json::{json, Value};
use std::io::{self, Write};

const NAME_WIDTH: usize = 43;
const PATH_MARKER: &str = "|- ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

pub fn header() -> String {
    format!(
        "{:<43}  {:<8}  {:<8}  {:<9}  {:<9}  {:<8}",
        "Device Name", "Reads", "Writes", "KBytesR/S", "KBytesW/S", "Await"
    )
}

fn row(label: &str, width: usize, io: &IoMetrics) -> String {
    format!(
        "{:<width$}  {:<8.2}  {:<8.2}  {:<9.2}  {:<9.2}  {:<8.2}",
        label, io.reads, io.writes, io.kb_read_per_sec, io.kb_written_per_sec, io.await_ms,
        width = width,
    )
}

/// Table rows for the current cycle, header first. Idle mappers (no reads
/// and no writes) are left out together with their paths.
pub fn render(reg: &DeviceRegistry) -> Vec<String> {
    let mut rows = vec![header()];
    for m in reg.mappers().iter().filter(|m| m.metrics.is_active()) {
        rows.push(row(&m.display_name, NAME_WIDTH, &m.metrics));
        for p in reg.paths_of(&m.id) {
            let label = format!("{}{:<w$}", PATH_MARKER, p.id, w = NAME_WIDTH - PATH_MARKER.len());
            rows.push(row(&label, NAME_WIDTH, &p.metrics));
        }
    }
    rows
}

/// Same content as [`render`] as one JSON object.
pub fn render_json(reg: &DeviceRegistry, timestamp: Option<&str>) -> Value {
    let mappers: Vec<Value> = reg.mappers().iter()
        .filter(|m| m.metrics.is_active())
        .map(|m| {
            let paths: Vec<Value> = reg.paths_of(&m.id)
                .map(|p| json!({ "name": p.id, "metrics": p.metrics }))
                .collect();
            json!({
                "name":    m.display_name,
                "id":      m.id,
                "metrics": m.metrics,
                "paths":   paths,
            })
        })
        .collect();

    json!({
        "timestamp": timestamp,
        "mappers":   mappers,
    })
}

/// Write one cycle's report to `out`.
pub fn write_report<W: Write>(
    out:       &mut W,
    reg:       &DeviceRegistry,
    format:    ReportFormat,
    timestamp: Option<&str>,
) -> io::Result<()> {
    match format {
        ReportFormat::Text => {
            if let Some(ts) = timestamp {
                writeln!(out, "{}", ts)?;
            }
            for line in render(reg) {
                writeln!(out, "{}", line)?;
            }
            writeln!(out)?;
        }
        ReportFormat::Json => {
            writeln!(out, "{}", render_json(reg, timestamp))?;
        }
    }
    out.flush()
}
