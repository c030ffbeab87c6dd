use anyhow::{Context, Result, bail};
use converge::{ConvergenceMode, FactsProvider};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Document formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => bail!(
                "Unsupported file type: {} (expected .json or .toml)",
                path.display()
            ),
        }
    }

    pub fn parse(self, content: &str) -> Result<Value> {
        match self {
            Self::Json => serde_json::from_str(content).context("Invalid JSON format"),
            Self::Toml => toml::from_str(content).context("Invalid TOML format"),
        }
    }

    pub fn render(self, value: &Value) -> Result<String> {
        match self {
            Self::Json => {
                serde_json::to_string_pretty(value).context("Failed to serialize JSON")
            }
            Self::Toml => toml::to_string_pretty(value).context("Failed to serialize TOML"),
        }
    }
}

/// Load a JSON or TOML document
pub fn load_document(path: &Path) -> Result<Value> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    format
        .parse(&content)
        .with_context(|| format!("Could not parse {}", path.display()))
}

/// Load the desired configuration; no file means an empty document
pub fn load_desired(path: Option<&Path>) -> Result<Value> {
    path.map_or(Ok(Value::Null), load_document)
}

// ============================================================================
// Facts
// ============================================================================

/// Current configuration of every resource, kept in one file
///
/// The file maps resource names to their configuration. A missing file means
/// nothing is configured.
#[derive(Debug, Clone)]
pub struct JsonFileFacts {
    path: PathBuf,
    facts: Map<String, Value>,
}

impl JsonFileFacts {
    pub fn load(path: &Path) -> Result<Self> {
        let facts = if path.exists() {
            match load_document(path)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => bail!(
                    "Facts file {} must map resource names to configuration",
                    path.display()
                ),
            }
        } else {
            log::debug!("No facts file at {}, starting empty", path.display());
            Map::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            facts,
        })
    }

    /// Record the configuration a resource holds after a push
    pub fn update(&mut self, resource: &str, config: Value) {
        self.facts.insert(resource.to_string(), config);
    }

    pub fn save(&self) -> Result<()> {
        let format = ConfigFormat::from_path(&self.path)?;
        let content = format.render(&Value::Object(self.facts.clone()))?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Could not write {}", self.path.display()))
    }
}

impl FactsProvider for JsonFileFacts {
    fn facts(&self, resource: &str) -> Result<Value> {
        Ok(self.facts.get(resource).cloned().unwrap_or(Value::Null))
    }
}

// ============================================================================
// Playbooks
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Playbook {
    /// Facts file for tasks that do not name their own
    #[serde(default)]
    pub facts_file: Option<PathBuf>,
    pub tasks: Vec<PlaybookTask>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybookTask {
    pub resource: String,
    #[serde(default = "default_state")]
    pub state: ConvergenceMode,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    #[serde(default)]
    pub facts_file: Option<PathBuf>,
}

fn default_state() -> ConvergenceMode {
    ConvergenceMode::Merged
}

impl Playbook {
    /// Load a playbook; relative paths inside it are resolved against its
    /// directory
    pub fn load(path: &Path) -> Result<Self> {
        let value = load_document(path)?;
        let mut playbook: Self = serde_json::from_value(value)
            .with_context(|| format!("Invalid playbook {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let resolve = |p: &mut Option<PathBuf>| {
            if let Some(p) = p
                && p.is_relative()
            {
                *p = base.join(&*p);
            }
        };
        resolve(&mut playbook.facts_file);
        for task in &mut playbook.tasks {
            resolve(&mut task.config_file);
            resolve(&mut task.facts_file);
        }
        Ok(playbook)
    }
}

impl PlaybookTask {
    /// The desired configuration, inline or from its file
    pub fn desired(&self) -> Result<Value> {
        match (&self.config, &self.config_file) {
            (Some(_), Some(_)) => bail!(
                "Task for '{}' sets both config and config_file",
                self.resource
            ),
            (Some(config), None) => Ok(config.clone()),
            (None, file) => load_desired(file.as_deref()),
        }
    }
}
