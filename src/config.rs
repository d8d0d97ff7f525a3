//! Viewer configuration.
//!
//! Every field has a default; a page may override any subset by embedding
//! JSON in `<script id="viewer-config" type="application/json">`.

use serde::Deserialize;

/// Top-level viewer configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
	/// Base URL of the SBOM backend. Empty means same origin.
	pub api_base: String,
	/// Canvas theme name, see [`crate::theme::Theme::by_name`].
	pub theme: String,
	pub cluster: ClusterConfig,
	pub sizing: SizingConfig,
	pub layout: LayoutConfig,
}

/// When and how large SBOMs collapse into cluster nodes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
	pub enabled: bool,
	/// SBOMs with more components than this are clustered.
	pub threshold: usize,
	/// Components with more incident links than this stay individual.
	pub degree_threshold: usize,
}

/// Node radius parameters, in world units.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
	pub base_radius: f64,
	pub max_radius: f64,
	pub cluster_radius: f64,
	pub cluster_max_radius: f64,
	/// Radius added per incident link in `Connections` mode.
	pub connection_weight: f64,
	/// Radius added per byte in `FileSize` mode.
	pub size_weight: f64,
	/// Radius added per containing SBOM in `Shared` mode.
	pub shared_weight: f64,
}

/// Force simulation parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	pub charge: f32,
	pub spring: f32,
	pub max_force: f32,
	pub node_speed: f32,
	pub damping: f32,
	/// Fraction of the centroid offset removed per tick.
	pub center_strength: f64,
	/// Extra spacing kept between node rims.
	pub collision_padding: f64,
	/// Fraction of an overlap resolved per tick.
	pub collision_strength: f64,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
}

impl Default for ViewerConfig {
	fn default() -> Self {
		Self {
			api_base: String::new(),
			theme: "default".to_string(),
			cluster: ClusterConfig::default(),
			sizing: SizingConfig::default(),
			layout: LayoutConfig::default(),
		}
	}
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			threshold: 30,
			degree_threshold: 5,
		}
	}
}

impl Default for SizingConfig {
	fn default() -> Self {
		Self {
			base_radius: 15.0,
			max_radius: 45.0,
			cluster_radius: 25.0,
			cluster_max_radius: 60.0,
			connection_weight: 2.0,
			size_weight: 1e-4,
			shared_weight: 5.0,
		}
	}
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			charge: 150.0,
			spring: 0.05,
			max_force: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
			center_strength: 0.1,
			collision_padding: 2.0,
			collision_strength: 0.7,
			alpha_min,
			// Cools from 1.0 to alpha_min in roughly 300 ticks.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			drag_alpha_target: 0.3,
		}
	}
}

impl ViewerConfig {
	/// Parses a (possibly partial) JSON override on top of the defaults.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}
}
