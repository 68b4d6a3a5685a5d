//! Registry configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// How structural edits are ordered against a rebuild in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditPolicy {
	/// Edits only wait for the publish swap. An edit applied while a rebuild is
	/// loading sources is superseded when that rebuild publishes.
	#[default]
	Concurrent,
	/// A rebuild holds the edit section for its whole duration, so edits issued
	/// meanwhile wait and then apply on top of the rebuilt snapshot.
	Serialized,
}

/// Tunables for a [`LayerRegistry`](crate::LayerRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegistryConfig {
	pub edit_policy: EditPolicy,
	/// Refresh flag passed to [`LayerSource::layers`](crate::LayerSource::layers) on rebuild.
	pub refresh_on_reload: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			edit_policy: EditPolicy::default(),
			refresh_on_reload: true,
		}
	}
}

impl RegistryConfig {
	/// Parses a config from TOML. Missing keys take their defaults.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(content)?)
	}

	/// Reads and parses a TOML config file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}
}
