//! Configuration loading functionality.
//!
//! This module provides the [`StandardLoader`] type for loading engine
//! settings and per-bureau staffing standards from YAML files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{EngineSettings, StaffingStandard};

/// Loads and provides access to staffing standards.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── engine.yaml          # Engine settings (optional, defaults if absent)
/// └── standards/
///     └── beijing.yaml     # One staffing standard per bureau
/// ```
///
/// # Example
///
/// ```no_run
/// use crew_staffing_engine::config::StandardLoader;
///
/// let loader = StandardLoader::load("./config").unwrap();
/// let standard = loader.get_standard("beijing").unwrap();
/// println!("Loaded {} high-speed rules", standard.high_speed_rules.len());
/// ```
#[derive(Debug, Clone)]
pub struct StandardLoader {
    settings: EngineSettings,
    standards: BTreeMap<String, StaffingStandard>,
}

impl StandardLoader {
    /// Loads settings and standards from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `StandardLoader` on success, or an error if:
    /// - The `standards` directory is missing or holds no YAML files
    /// - Any file contains invalid YAML
    /// - Any standard fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings_path = path.join("engine.yaml");
        let settings = if settings_path.exists() {
            Self::load_yaml::<EngineSettings>(&settings_path)?
        } else {
            EngineSettings::default()
        };

        let standards = Self::load_standards(&path.join("standards"))?;
        Self::from_parts(settings, standards)
    }

    /// Builds a loader from already-constructed parts, validating each standard.
    pub fn from_parts(
        settings: EngineSettings,
        standards: impl IntoIterator<Item = StaffingStandard>,
    ) -> EngineResult<Self> {
        let mut by_bureau = BTreeMap::new();
        for standard in standards {
            standard.validate()?;
            by_bureau.insert(standard.bureau.clone(), standard);
        }
        Ok(Self {
            settings,
            standards: by_bureau,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all standard files from the standards directory.
    fn load_standards(standards_dir: &Path) -> EngineResult<Vec<StaffingStandard>> {
        let dir_str = standards_dir.display().to_string();

        let entries = fs::read_dir(standards_dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no standard files found)", dir_str),
            });
        }

        paths
            .iter()
            .map(|p| Self::load_yaml::<StaffingStandard>(p))
            .collect()
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the bureaus that have a standard, in name order.
    pub fn bureaus(&self) -> impl Iterator<Item = &str> {
        self.standards.keys().map(String::as_str)
    }

    /// Gets the staffing standard of a bureau.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use crew_staffing_engine::config::StandardLoader;
    ///
    /// let loader = StandardLoader::load("./config")?;
    /// let standard = loader.get_standard("beijing")?;
    /// # Ok::<(), crew_staffing_engine::error::EngineError>(())
    /// ```
    pub fn get_standard(&self, bureau: &str) -> EngineResult<&StaffingStandard> {
        self.standards
            .get(bureau)
            .ok_or_else(|| EngineError::StandardNotFound {
                bureau: bureau.to_string(),
            })
    }
}
