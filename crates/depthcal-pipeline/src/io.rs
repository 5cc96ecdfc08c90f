//! JSON file helpers shared by the CLI and tests.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::PipelineConfig;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Load a pipeline config, falling back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => load_json(p),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CalibrationState;
    use tempfile::NamedTempFile;

    #[test]
    fn state_survives_a_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut state = CalibrationState::default();
        state.result.scale = 0.25;
        state.fitted_frames = 3;
        save_json(&state, file.path()).unwrap();
        let back: CalibrationState = load_json(file.path()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_json::<PipelineConfig>(Path::new("/nonexistent/cfg.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/cfg.json"));
    }
}
