use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::HeatmapError;

const ENV_ADMIN_PASSWORD: &str = "HEATMAP_ADMIN_PASSWORD";
const DEFAULT_SECRET: &str = "changeme";

const DEFAULT_ROSTER: [&str; 20] = [
    "Adeola",
    "Baridule",
    "Barisuka",
    "Bisoye",
    "Christabel",
    "Dorathy",
    "Esther Chioma",
    "Esther Etang",
    "El",
    "Faith",
    "Gloria",
    "Joy",
    "Moyin",
    "Oyinkan",
    "Peace",
    "Reme",
    "Shirley",
    "Tiaraoluwa",
    "Tolani",
    "Oyinade",
];

const DEFAULT_ALIASES: [(&str, &str); 12] = [
    ("Funmi", "Gloria"),
    ("Anu", "Moyin"),
    ("Faithy", "Faith"),
    ("Oyinade Priscilla", "Oyinade"),
    ("Dora", "Dorathy"),
    ("Barisuka Goodluck", "Barisuka"),
    ("Bee\u{2764}\u{fe0f}", "Bisoye"),
    ("joy387115", "Joy"),
    ("Princess Esther Etang", "Esther Etang"),
    ("~MJ", "Reme"),
    ("El\u{1f451}", "El"),
    ("~\u{202f}M&J Wears", "Baridule"),
];

/// Roster, alias table and write-gate secret for one dashboard.
///
/// Every field falls back to the built-in dashboard when absent from the
/// JSON file, so a config may override just the secret or just the roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub roster: Vec<String>,
    pub aliases: BTreeMap<String, String>,
    pub auth_secret: String,
    /// How many of the latest dates are preselected when none are chosen.
    pub preselect_last: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|name| name.to_string()).collect(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
            auth_secret: DEFAULT_SECRET.to_string(),
            preselect_last: 5,
        }
    }
}

impl HeatmapConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<HeatmapConfig>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => HeatmapConfig::default(),
        };

        if let Some(secret) = secret_from_env() {
            config.auth_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HeatmapError> {
        if self.roster.is_empty() {
            return Err(HeatmapError::InvalidConfig("roster is empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for name in &self.roster {
            if !seen.insert(name.as_str()) {
                return Err(HeatmapError::InvalidConfig(format!(
                    "duplicate roster name {name:?}"
                )));
            }
        }

        for (raw, canonical) in &self.aliases {
            if !seen.contains(canonical.as_str()) {
                return Err(HeatmapError::InvalidConfig(format!(
                    "alias {raw:?} points at {canonical:?}, which is not on the roster"
                )));
            }
        }

        Ok(())
    }

    pub fn is_on_roster(&self, name: &str) -> bool {
        self.roster.iter().any(|candidate| candidate == name)
    }

    /// Gate for every action that writes a snapshot.
    pub fn authorize(&self, password: &str) -> Result<(), HeatmapError> {
        if password == self.auth_secret {
            Ok(())
        } else {
            Err(HeatmapError::Unauthorized)
        }
    }
}

fn secret_from_env() -> Option<String> {
    std::env::var(ENV_ADMIN_PASSWORD)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
