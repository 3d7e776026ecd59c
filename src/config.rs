//! Project configuration for the scaffold tracker.
//!
//! Settings are read from `.scaffold/scaffold.toml`. Every section is optional
//! and falls back to defaults, so a project without the file behaves exactly
//! like one with an empty file.
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! name = "my-app"
//!
//! [scaffold_options]
//! skip_phases = [6]
//! instructions_dir = "phases"
//!
//! [smoke_test]
//! command = "./scripts/smoke-test.sh"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::phase::{get_phase, phase_count};

/// Directory holding all scaffold bookkeeping inside a project.
pub const SCAFFOLD_DIR: &str = ".scaffold";
/// Config file name inside [`SCAFFOLD_DIR`].
pub const CONFIG_FILE: &str = "scaffold.toml";
/// State file name inside [`SCAFFOLD_DIR`].
pub const STATE_FILE: &str = "state.json";

/// Environment variable that overrides `smoke_test.command`.
pub const SMOKE_TEST_CMD_ENV: &str = "SCAFFOLD_SMOKE_TEST_CMD";
/// Environment variable that overrides the project directory.
pub const PROJECT_DIR_ENV: &str = "SCAFFOLD_PROJECT_DIR";

/// Project-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name recorded in the state file when it is first created
    #[serde(default)]
    pub name: Option<String>,
}

/// Options controlling which phases run and where their instructions live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldOptions {
    /// Phases to bypass. Applied lazily the first time resume reaches them.
    #[serde(default)]
    pub skip_phases: Vec<u32>,
    /// Directory, relative to the project, containing the phase documents
    #[serde(default = "default_instructions_dir")]
    pub instructions_dir: String,
}

fn default_instructions_dir() -> String {
    "phases".to_string()
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            skip_phases: Vec::new(),
            instructions_dir: default_instructions_dir(),
        }
    }
}

/// The external smoke test run once no phase is left to do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmokeTestConfig {
    #[serde(default)]
    pub command: Option<String>,
}

/// The complete scaffold.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldToml {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scaffold_options: ScaffoldOptions,
    #[serde(default)]
    pub smoke_test: SmokeTestConfig,
}

impl ScaffoldToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `scaffold.toml` from the scaffold directory.
    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(scaffold_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = scaffold_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Skip list with out-of-range and duplicate entries removed, in phase order.
    pub fn skip_phases(&self) -> Vec<u32> {
        let mut phases: Vec<u32> = self
            .scaffold_options
            .skip_phases
            .iter()
            .copied()
            .filter(|n| get_phase(*n).is_some())
            .collect();
        phases.sort_unstable();
        phases.dedup();
        phases
    }

    /// Smoke test command (env → file → default).
    pub fn smoke_test_cmd(&self) -> String {
        std::env::var(SMOKE_TEST_CMD_ENV)
            .ok()
            .filter(|cmd| !cmd.trim().is_empty())
            .or_else(|| self.smoke_test.command.clone())
            .unwrap_or_else(|| "./scripts/smoke-test.sh".to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for phase in &self.scaffold_options.skip_phases {
            if get_phase(*phase).is_none() {
                warnings.push(format!(
                    "Ignoring skip_phases entry {}: phases are numbered 1 to {}",
                    phase,
                    phase_count()
                ));
            }
        }

        if self.scaffold_options.instructions_dir.trim().is_empty() {
            warnings.push("instructions_dir is empty; using the project root".to_string());
        }

        warnings
    }
}

/// Resolved configuration for one project directory.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .scaffold directory
    pub scaffold_dir: PathBuf,
    /// Parsed scaffold.toml
    pub toml: ScaffoldToml,
}

impl ScaffoldConfig {
    /// Resolve configuration for `project_dir`, reading scaffold.toml if present.
    pub fn new(project_dir: PathBuf) -> Result<Self, ConfigError> {
        let scaffold_dir = project_dir.join(SCAFFOLD_DIR);
        let toml = ScaffoldToml::load_or_default(&scaffold_dir)?;

        Ok(Self {
            project_dir,
            scaffold_dir,
            toml,
        })
    }

    /// Build a configuration from an already-parsed file, without touching disk.
    pub fn from_toml(project_dir: PathBuf, toml: ScaffoldToml) -> Self {
        let scaffold_dir = project_dir.join(SCAFFOLD_DIR);
        Self {
            project_dir,
            scaffold_dir,
            toml,
        }
    }

    /// Get path to the state file.
    pub fn state_file(&self) -> PathBuf {
        self.scaffold_dir.join(STATE_FILE)
    }

    /// Get path to scaffold.toml.
    pub fn config_file(&self) -> PathBuf {
        self.scaffold_dir.join(CONFIG_FILE)
    }

    pub fn project_name(&self) -> Option<String> {
        self.toml.project.name.clone()
    }

    pub fn skip_phases(&self) -> Vec<u32> {
        self.toml.skip_phases()
    }

    /// Instruction document path for a phase, relative to the project directory.
    pub fn instruction_path(&self, instruction_file: &str) -> PathBuf {
        let dir = self.toml.scaffold_options.instructions_dir.trim();
        if dir.is_empty() {
            PathBuf::from(instruction_file)
        } else {
            Path::new(dir).join(instruction_file)
        }
    }

    pub fn smoke_test_cmd(&self) -> String {
        self.toml.smoke_test_cmd()
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let toml = ScaffoldToml::parse(
            r#"
            [project]
            name = "my-app"

            [scaffold_options]
            skip_phases = [6, 7]
            instructions_dir = "docs/phases"

            [smoke_test]
            command = "make smoke"
            "#,
        )
        .unwrap();

        assert_eq!(toml.project.name.as_deref(), Some("my-app"));
        assert_eq!(toml.scaffold_options.skip_phases, vec![6, 7]);
        assert_eq!(toml.scaffold_options.instructions_dir, "docs/phases");
        assert_eq!(toml.smoke_test.command.as_deref(), Some("make smoke"));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let toml = ScaffoldToml::parse("").unwrap();
        assert_eq!(toml, ScaffoldToml::default());
        assert!(toml.project.name.is_none());
        assert!(toml.scaffold_options.skip_phases.is_empty());
        assert_eq!(toml.scaffold_options.instructions_dir, "phases");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = ScaffoldToml::parse("[scaffold_options]\nskip_phases = [2]\n").unwrap();
        assert_eq!(toml.scaffold_options.skip_phases, vec![2]);
        assert_eq!(toml.scaffold_options.instructions_dir, "phases");
    }

    #[test]
    fn test_skip_phases_filters_invalid_and_duplicates() {
        let mut toml = ScaffoldToml::default();
        toml.scaffold_options.skip_phases = vec![7, 0, 2, 42, 7];
        assert_eq!(toml.skip_phases(), vec![2, 7]);
    }

    #[test]
    fn test_validate_reports_out_of_range_skip_phases() {
        let mut toml = ScaffoldToml::default();
        toml.scaffold_options.skip_phases = vec![3, 99];
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("99"));
    }

    #[test]
    fn test_validate_clean_config() {
        assert!(ScaffoldToml::default().validate().is_empty());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = ScaffoldToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml, ScaffoldToml::default());
    }

    #[test]
    fn test_load_invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[project\nname = ").unwrap();

        let err = ScaffoldToml::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_scaffold_config_paths() {
        let dir = tempdir().unwrap();
        let scaffold_dir = dir.path().join(SCAFFOLD_DIR);
        fs::create_dir_all(&scaffold_dir).unwrap();
        fs::write(
            scaffold_dir.join(CONFIG_FILE),
            "[project]\nname = \"demo\"\n",
        )
        .unwrap();

        let config = ScaffoldConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(config.state_file(), scaffold_dir.join(STATE_FILE));
        assert_eq!(config.config_file(), scaffold_dir.join(CONFIG_FILE));
        assert_eq!(config.project_name().as_deref(), Some("demo"));
    }

    #[test]
    fn test_instruction_path() {
        let config = ScaffoldConfig::from_toml(PathBuf::from("/p"), ScaffoldToml::default());
        assert_eq!(
            config.instruction_path("01-PROJECT-SETUP.md"),
            PathBuf::from("phases/01-PROJECT-SETUP.md")
        );

        let mut toml = ScaffoldToml::default();
        toml.scaffold_options.instructions_dir = String::new();
        let config = ScaffoldConfig::from_toml(PathBuf::from("/p"), toml);
        assert_eq!(
            config.instruction_path("01-PROJECT-SETUP.md"),
            PathBuf::from("01-PROJECT-SETUP.md")
        );
    }

    #[test]
    fn test_smoke_test_cmd_from_file() {
        // Only meaningful when the override is not set in the test environment.
        if std::env::var(SMOKE_TEST_CMD_ENV).is_ok() {
            return;
        }
        let mut toml = ScaffoldToml::default();
        assert_eq!(toml.smoke_test_cmd(), "./scripts/smoke-test.sh");
        toml.smoke_test.command = Some("make smoke".to_string());
        assert_eq!(toml.smoke_test_cmd(), "make smoke");
    }
}
