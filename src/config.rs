use crate::collectors::iostat::{ColumnLayout, Markers};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub columns: ColumnLayout,

    #[serde(default)]
    pub markers: Markers,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Command printing the multipath topology
    pub topology_command: Vec<String>,
    /// iostat command without the trailing `<interval> 1`
    pub stats_command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Length of one sampling window in seconds
    pub interval_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            topology_command: vec!["multipath".into(), "-ll".into()],
            stats_command:    vec!["iostat".into(), "-xkyz".into()],
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_secs: 1 }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Some(p) => p,
            None    => return Config::default(),
        };
        match Self::load_from(&path) {
            Ok(c)  => c,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("ignoring {}: {:#}", path.display(), e);
                } else {
                    // Write defaults on first run (best-effort)
                    let _ = write_defaults(&path);
                }
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mpathstat").join("mpathstat.toml"))
    }
}

fn write_defaults(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# mpathstat configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_tools() {
        let cfg = Config::default();
        assert_eq!(cfg.sources.topology_command, ["multipath", "-ll"]);
        assert_eq!(cfg.sources.stats_command, ["iostat", "-xkyz"]);
        assert_eq!(cfg.sampling.interval_secs, 1);
        assert_eq!(cfg.columns, ColumnLayout::default());
        assert_eq!(cfg.markers.block_marker, "sd");
        assert_eq!(cfg.markers.mapper_marker, "dm-");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpathstat.toml");
        fs::write(&path, "[sampling]\ninterval_secs = 5\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.sampling.interval_secs, 5);
        assert_eq!(cfg.sources, SourcesConfig::default());
    }

    #[test]
    fn written_defaults_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mpathstat.toml");
        write_defaults(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpathstat.toml");
        fs::write(&path, "[columns]\nreads = \"three\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
