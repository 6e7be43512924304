use crate::Result;
use crate::candidate::SourceTag;
use crate::users::classify::{Classifier, ClassifierRule};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// The default configuration YAML content, embedded from `default_config.yml`.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../default_config.yml");

/// Config file names searched, in order, when none is given explicitly.
const DEFAULT_CONFIG_NAMES: [&str; 4] = ["inventory.toml", "inventory.yml", "inventory.yaml", "inventory.json"];

const LOG_TARGET: &str = "    config";

fn default_source_priority() -> Vec<SourceTag> {
    vec![
        SourceTag::LfEnergyLandscape,
        SourceTag::OpenSustainTech,
        SourceTag::GPst,
        SourceTag::Manual,
    ]
}

fn default_manual_list() -> PathBuf {
    PathBuf::from("manual_esm_list.csv")
}

fn default_exclusions() -> PathBuf {
    PathBuf::from("exclusions.csv")
}

const fn default_stats_cache_ttl() -> u64 {
    7
}

fn default_classifier_rules() -> Vec<ClassifierRule> {
    let rule = |pattern: &str, label: &str| ClassifierRule {
        pattern: pattern.to_string(),
        label: label.to_string(),
    };

    vec![
        rule(
            r"univ|hochschule|polytech|institut|college|academy|school of|\.edu\b|\.ac\.[a-z]{2}\b|professor|lecturer|postdoc|ph\.?d|doctoral|student|research (center|centre|group|fellow)",
            "academia",
        ),
        rule(
            r"ministry|government|federal|agency|authority|commission|national (laboratory|lab|renewable)|\bnrel\b|\bpnnl\b",
            "public-sector",
        ),
        rule(r"foundation|non-?profit|\be\.?v\.?\b|association|initiative|\bngo\b", "nonprofit"),
        rule(
            r"gmbh|\binc\.?\b|\bltd\.?\b|\bllc\b|\bcorp\.?\b|\bsas\b|\bbv\b|\bag\b|consult|utility|software|technologies",
            "industry",
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Tie-break order among inventories when names or URLs collide,
    /// highest priority first. Must name every source exactly once.
    #[serde(default = "default_source_priority")]
    pub source_priority: Vec<SourceTag>,

    /// Manually curated tool list CSV (column: `source_url`).
    #[serde(default = "default_manual_list")]
    pub manual_list: PathBuf,

    /// Manual exclusions CSV (columns: `id`, `reason`).
    #[serde(default = "default_exclusions")]
    pub exclusions: PathBuf,

    /// Optional category assignment CSV (columns: `id`, `category`).
    #[serde(default)]
    pub category_mappings: Option<PathBuf>,

    /// Days before a cached ecosyste.ms repository record is re-fetched.
    #[serde(default = "default_stats_cache_ttl")]
    pub stats_cache_ttl: u64,

    /// Ordered affiliation rules; first matching pattern wins.
    #[serde(default = "default_classifier_rules")]
    pub classifier_rules: Vec<ClassifierRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_priority: default_source_priority(),
            manual_list: default_manual_list(),
            exclusions: default_exclusions(),
            category_mappings: None,
            stats_cache_ttl: default_stats_cache_ttl(),
            classifier_rules: default_classifier_rules(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit` when given, otherwise from the
    /// first default config file found in the working directory, otherwise
    /// the built-in defaults. A broken config file is a fatal error, not a
    /// silent fallback.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("config file '{}' does not exist", path.display());
                }
                Some(path.to_path_buf())
            }
            None => DEFAULT_CONFIG_NAMES.iter().map(PathBuf::from).find(|p| p.exists()),
        };

        let config = match path {
            Some(path) => {
                log::info!(target: LOG_TARGET, "Loading configuration from '{}'", path.display());
                Self::from_file(&path)?
            }
            None => {
                log::debug!(target: LOG_TARGET, "No config file found, using built-in defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("unable to read config file '{}'", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match extension {
            "toml" => toml::from_str(&text).into_app_err_with(|| format!("unable to parse config file '{}'", path.display())),
            "yml" | "yaml" | "json" => {
                serde_yaml::from_str(&text).into_app_err_with(|| format!("unable to parse config file '{}'", path.display()))
            }
            _ => bail!("unsupported config file extension '{extension}' for '{}'", path.display()),
        }
    }

    /// Reject configurations that would make a stage misbehave, before any
    /// output is written.
    pub fn validate(&self) -> Result<()> {
        let unique: HashSet<_> = self.source_priority.iter().copied().collect();
        if unique.len() != self.source_priority.len() {
            bail!("source_priority contains duplicate entries");
        }
        for tag in SourceTag::all() {
            if !unique.contains(&tag) {
                bail!("source_priority is missing '{tag}'");
            }
        }

        if self.stats_cache_ttl == 0 {
            bail!("stats_cache_ttl must be at least one day");
        }

        // Compiling the rules surfaces bad patterns now rather than at the
        // classification stage.
        let _ = Classifier::new(&self.classifier_rules)?;

        Ok(())
    }
}
