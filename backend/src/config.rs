//! # Configuration
//!
//! Static settings of the household ledger, read from one YAML file:
//!
//! ```yaml
//! allowed_emails:
//!   - nir@example.com
//!   - dana@example.com
//! members: [nir, dana]
//! window_size: 3
//! catalog_start_year: 2024
//! large_expense_threshold: 1000
//! currency_symbol: "₪"
//! data_directory: /var/lib/family-expenses
//! ```
//!
//! Every field is optional. The file is looked up in this order: an explicit
//! path, the `FAMILY_EXPENSES_CONFIG` environment variable, then
//! `<config dir>/family-expenses/config.yaml`. With none of them present the
//! defaults apply.

use serde::{Deserialize, Serialize};
use shared::TransactionType;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::access_gate::AccessGate;
use crate::domain::aggregation::AggregationEngine;
use crate::domain::catalog::{
    CategoryCatalog, DEFAULT_EXPENSE_CATEGORIES, DEFAULT_INCOME_CATEGORIES,
};

pub const CONFIG_ENV_VAR: &str = "FAMILY_EXPENSES_CONFIG";
const APP_DIRECTORY: &str = "family-expenses";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("window_size must be at least 1")]
    EmptyWindow,
    #[error("{0} catalog is empty")]
    EmptyCatalog(TransactionType),
    #[error("blank entry in {0}")]
    BlankEntry(&'static str),
    #[error("categories listed as both expense and income: {}", .0.join(", "))]
    OverlappingCategories(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub allowed_emails: Vec<String>,
    /// Household members shown even in months they logged nothing
    pub members: Vec<String>,
    pub expense_categories: Vec<String>,
    pub income_categories: Vec<String>,
    /// Number of months in the analytics window
    pub window_size: usize,
    pub catalog_start_year: i32,
    pub large_expense_threshold: f64,
    pub currency_symbol: String,
    pub data_directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_emails: vec!["nir@example.com".to_string(), "dana@example.com".to_string()],
            members: vec!["nir".to_string(), "dana".to_string()],
            expense_categories: DEFAULT_EXPENSE_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            income_categories: DEFAULT_INCOME_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            window_size: 3,
            catalog_start_year: 2024,
            large_expense_threshold: 1000.0,
            currency_symbol: "₪".to_string(),
            data_directory: None,
        }
    }
}

impl AppConfig {
    /// Load and validate the configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_from(explicit, from_env, Self::default_config_path())
    }

    fn load_from(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
        default_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let path = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => path,
            None => match default_path.filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    info!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let yaml = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = if yaml.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?
        };
        config.validate()?;
        debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if self.expense_categories.is_empty() {
            return Err(ConfigError::EmptyCatalog(TransactionType::Expense));
        }
        if self.income_categories.is_empty() {
            return Err(ConfigError::EmptyCatalog(TransactionType::Income));
        }
        let lists: [(&'static str, &Vec<String>); 4] = [
            ("allowed_emails", &self.allowed_emails),
            ("members", &self.members),
            ("expense_categories", &self.expense_categories),
            ("income_categories", &self.income_categories),
        ];
        for (field, entries) in lists {
            if entries.iter().any(|e| e.trim().is_empty()) {
                return Err(ConfigError::BlankEntry(field));
            }
        }
        let overlapping: Vec<String> = self
            .catalog()
            .overlapping()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !overlapping.is_empty() {
            return Err(ConfigError::OverlappingCategories(overlapping));
        }
        Ok(())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIRECTORY).join("config.yaml"))
    }

    /// Where the CSV store keeps its files
    pub fn data_directory(&self) -> PathBuf {
        self.data_directory
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIRECTORY)))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Member keys as stored: trimmed and lower-cased
    pub fn member_keys(&self) -> Vec<String> {
        self.members.iter().map(|m| m.trim().to_lowercase()).collect()
    }

    pub fn catalog(&self) -> CategoryCatalog {
        CategoryCatalog::new(self.expense_categories.clone(), self.income_categories.clone())
    }

    pub fn access_gate(&self) -> AccessGate {
        AccessGate::new(&self.allowed_emails)
    }

    pub fn engine(&self) -> AggregationEngine {
        AggregationEngine::new(
            self.member_keys(),
            self.expense_categories.clone(),
            self.large_expense_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = AppConfig::from_yaml_str("window_size: 6\ncurrency_symbol: \"$\"\n").unwrap();
        assert_eq!(config.window_size, 6);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.catalog_start_year, 2024);
        assert_eq!(config.expense_categories.len(), 10);
        assert_eq!(config.members, vec!["nir", "dana"]);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(AppConfig::from_yaml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            AppConfig::from_yaml_str("window_size: 0"),
            Err(ConfigError::EmptyWindow)
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("income_categories: [Salary, Groceries]"),
            Err(ConfigError::OverlappingCategories(ref c)) if c == &vec!["Groceries".to_string()]
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("members: [nir, \" \"]"),
            Err(ConfigError::BlankEntry("members"))
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("expense_categories: []"),
            Err(ConfigError::EmptyCatalog(TransactionType::Expense))
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("window_size: [1"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_lookup_order() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("explicit.yaml");
        let from_env = temp_dir.path().join("env.yaml");
        let default_path = temp_dir.path().join("default.yaml");
        fs::write(&explicit, "window_size: 1").unwrap();
        fs::write(&from_env, "window_size: 2").unwrap();
        fs::write(&default_path, "window_size: 4").unwrap();

        let pick = |explicit: Option<&Path>, env: Option<PathBuf>| {
            AppConfig::load_from(explicit, env, Some(default_path.clone()))
                .unwrap()
                .window_size
        };
        assert_eq!(pick(Some(explicit.as_path()), Some(from_env.clone())), 1);
        assert_eq!(pick(None, Some(from_env.clone())), 2);
        assert_eq!(pick(None, None), 4);

        let missing_default =
            AppConfig::load_from(None, None, Some(temp_dir.path().join("none.yaml")));
        assert_eq!(missing_default.unwrap(), AppConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.yaml");
        assert!(matches!(
            AppConfig::load_from(Some(missing.as_path()), None, None),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_derived_components() {
        let config = AppConfig::from_yaml_str(
            "allowed_emails: [Dana@Example.com]\n\
             members: [Dana, Nir]\n\
             data_directory: /tmp/ledger\n",
        )
        .unwrap();
        assert!(config.access_gate().is_authorized("dana@example.com"));
        assert_eq!(config.engine().members(), &["dana".to_string(), "nir".to_string()]);
        assert_eq!(config.data_directory(), PathBuf::from("/tmp/ledger"));
    }
}
