use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::{DEFAULT_TREE_DEPTH, ExploreConfig};
use crate::exam::{DEFAULT_CANDIDATES, DEFAULT_EXAMINERS};
use crate::simulation::policy::{RETRY_WEIGHT, SUCCESS_WEIGHT};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimConfig {
    /// 随机种子；缺省时由程序随机生成。
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
    #[serde(default)]
    pub state_limit: Option<usize>,
    #[serde(default = "default_candidates")]
    pub candidates: u64,
    #[serde(default = "default_examiners")]
    pub examiners: u64,
    #[serde(default = "default_success_weight")]
    pub success_weight: f64,
    #[serde(default = "default_retry_weight")]
    pub retry_weight: f64,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tree_depth: default_tree_depth(),
            state_limit: None,
            candidates: default_candidates(),
            examiners: default_examiners(),
            success_weight: default_success_weight(),
            retry_weight: default_retry_weight(),
            max_steps: default_max_steps(),
        }
    }
}

impl SimConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("success_weight", self.success_weight),
            ("retry_weight", self.retry_weight),
        ] {
            ensure!(
                weight.is_finite() && weight > 0.0,
                "{} must be a positive number, got {}",
                name,
                weight
            );
        }
        Ok(())
    }

    pub fn explore_config(&self) -> ExploreConfig {
        ExploreConfig {
            state_limit: self.state_limit,
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

fn default_candidates() -> u64 {
    DEFAULT_CANDIDATES
}

fn default_examiners() -> u64 {
    DEFAULT_EXAMINERS
}

fn default_success_weight() -> f64 {
    SUCCESS_WEIGHT
}

fn default_retry_weight() -> f64 {
    RETRY_WEIGHT
}

fn default_max_steps() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = SimConfig::load_from_file("/nonexistent/petri-exam.toml").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.tree_depth, 10);
        assert_eq!(config.candidates, 4);
        assert_eq!(config.examiners, 1);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = SimConfig::from_toml("seed = 42\nstate_limit = 100\ncandidates = 2\n").unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.explore_config().state_limit, Some(100));
        assert_eq!(config.candidates, 2);
        assert_eq!(config.success_weight, 0.7);
        assert_eq!(config.max_steps, 1000);
    }

    #[test]
    fn non_positive_weight_is_rejected() {
        assert!(SimConfig::from_toml("retry_weight = 0.0").is_err());
        assert!(SimConfig::from_toml("success_weight = -1.0").is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(SimConfig::from_toml("tree_depth = \"deep\"").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("petri-exam-config-{}.toml", std::process::id()));
        fs::write(&path, "tree_depth = 3\nmax_steps = 50\n").unwrap();
        let config = SimConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.tree_depth, 3);
        assert_eq!(config.max_steps, 50);
    }
}
