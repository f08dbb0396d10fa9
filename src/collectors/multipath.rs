use crate::collectors::{read_capture, run_command, SourceError};
use crate::models::device::{BlockDevice, MapperDevice};
use std::path::Path;
use tracing::{debug, info, warn};

/// Mapper devices and their paths, in the order `multipath -ll` listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub mappers: Vec<MapperDevice>,
    pub paths:   Vec<BlockDevice>,
}

/// Run the topology command (normally `multipath -ll`) and parse its output.
pub fn discover(argv: &[String], mapper_marker: &str) -> Result<Topology, SourceError> {
    let text = run_command("topology", argv)?;
    Ok(parse_logged(&text, mapper_marker))
}

/// Parse topology previously captured to a file.
pub fn discover_from_file(path: &Path, mapper_marker: &str) -> Result<Topology, SourceError> {
    let text = read_capture(path)?;
    Ok(parse_logged(&text, mapper_marker))
}

fn parse_logged(text: &str, mapper_marker: &str) -> Topology {
    let topo = parse(text, mapper_marker);
    if topo.mappers.is_empty() {
        warn!("topology lists no multipath devices; nothing will be reported");
    } else {
        info!(mappers = topo.mappers.len(), paths = topo.paths.len(), "topology discovered");
    }
    topo
}

/// Parse `multipath -ll` output.
///
/// ```text
/// mpatha (3600508b4000156d700012000000b0000) dm-3 HP,HSV210
/// size=10G features='1 queue_if_no_path' hwhandler='0' wp=rw
/// |-+- policy='service-time 0' prio=50 status=active
/// | |- 1:0:0:1 sdcl 69:80  active ready running
/// | `- 2:0:0:1 sdfy 130:224 active ready running
/// `-+- policy='service-time 0' prio=10 status=enabled
///   `- 3:0:0:1 sdava 67:32 active ready running
/// ```
///
/// Path lines belong to the most recent mapper line; paths seen before any
/// mapper are dropped.
pub fn parse(text: &str, mapper_marker: &str) -> Topology {
    let mut topo = Topology::default();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() { continue; }

        if let Some(dev) = path_device(&tokens) {
            let parent = match &current {
                Some(p) => p,
                None    => {
                    debug!(device = dev, "path listed before any mapper device, dropped");
                    continue;
                }
            };
            if topo.paths.iter().any(|p| p.id == dev) {
                debug!(device = dev, "path listed twice, keeping first parent");
                continue;
            }
            topo.paths.push(BlockDevice::new(dev, parent.as_str()));
        } else if let Some((id, name)) = mapper_ids(&tokens, mapper_marker) {
            if !topo.mappers.iter().any(|m| m.id == id) {
                topo.mappers.push(MapperDevice::new(id, name));
            }
            current = Some(id.to_string());
        }
    }
    topo
}

/// Block device name from a tree line such as `| |- 1:0:0:1 sdcl 69:80 active ready running`.
fn path_device<'a>(tokens: &[&'a str]) -> Option<&'a str> {
    // Skip "|" columns drawn for enclosing path groups.
    let branch = tokens.iter().position(|t| *t != "|")?;
    if tokens[branch] != "|-" && tokens[branch] != "`-" {
        return None;
    }
    let idx = tokens.len().checked_sub(5)?;
    if idx <= branch { return None; }
    Some(tokens[idx])
}

/// `(kernel name, alias)` from a mapper header line.
fn mapper_ids<'a>(tokens: &[&'a str], marker: &str) -> Option<(&'a str, &'a str)> {
    if marker.is_empty() {
        return None;
    }
    match tokens {
        [name, _, id, ..] if id.starts_with(marker) => Some((*id, *name)),
        // No user_friendly_names: "<wwid> dm-3 VENDOR,PRODUCT"
        [name, id, ..] if id.starts_with(marker) => Some((*id, *name)),
        _ => None,
    }
}
