//! Error types shared across the viewer.

use thiserror::Error;

/// Failures while clustering or expanding the working graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
	/// A synthesized cluster identifier collides with a real component or
	/// with another cluster.
	#[error("cluster id `{0}` is not unique")]
	IdCollision(String),
	/// No node with this identifier is in the working set.
	#[error("no node `{0}` in the current graph")]
	UnknownNode(String),
	/// The node exists but is a regular component.
	#[error("node `{0}` is not a cluster")]
	NotACluster(String),
}

/// Failures of the force simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
	/// Positions became non-finite again after a rebuild from scratch.
	#[error("force simulation diverged after a rebuild from scratch")]
	Diverged,
}

/// Fatal setup failures of the canvas component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
	/// Not running inside a browser window.
	#[error("no browser window available")]
	NoWindow,
	/// The canvas element was not mounted.
	#[error("graph container element is missing")]
	NoCanvas,
	/// The browser refused a 2d rendering context.
	#[error("canvas 2d context is unavailable")]
	NoContext,
}

/// Failures talking to the SBOM backend.
#[derive(Debug, Error)]
pub enum ApiError {
	/// Not running inside a browser window.
	#[error("no browser window available")]
	NoWindow,
	/// The request never produced a response.
	#[error("request failed: {0}")]
	Network(String),
	/// Non-success HTTP status without a structured error body.
	#[error("server responded with status {status}")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// The backend answered with `{ "error": ... }`.
	#[error("{0}")]
	Backend(String),
	/// The body was not the expected JSON shape.
	#[error("invalid response body: {0}")]
	Decode(#[from] serde_json::Error),
}

impl ApiError {
	/// Wraps a rejected JS promise or thrown exception.
	pub fn from_js(value: wasm_bindgen::JsValue) -> Self {
		let message = value
			.as_string()
			.unwrap_or_else(|| format!("{:?}", value));
		ApiError::Network(message)
	}
}
