//! File-backed configuration of the layout and analytics engines.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    analytics::AnalyticsConfig, error::Result, graph::DuplicateEdges, layout::LayoutConfig,
};

/// The complete configuration. Every field, and every field of the sections, can be left out of
/// the file in favour of its default.
///
/// # Examples
///
/// ```
/// use coexnet::config::Config;
///
/// let config = Config::from_json(r#"{ "layout": { "charge_strength": -120.0 } }"#).unwrap();
///
/// assert_eq!(config.layout.charge_strength, -120.0);
/// assert_eq!(config.layout.link_distance, 50.0);
/// assert_eq!(config.analytics.page_rank_damping, 0.85);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub analytics: AnalyticsConfig,
    /// How rows joining the same pair of vertices are ingested.
    pub duplicates: DuplicateEdges,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
