//! sbom-graph: interactive dependency-graph viewer for Software Bills of Materials.
//!
//! This crate provides a WASM client that loads SBOM component graphs from a
//! backend, collapses oversized SBOMs into cluster nodes, and renders the result
//! with a physics-based layout, SBOM coloring, filters and a detail panel.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod graph;
pub mod session;
pub mod theme;

pub use components::force_graph::ForceGraphCanvas;
pub use config::ViewerConfig;
pub use graph::{GraphPayload, GraphState};
pub use session::Session;

use components::panels::{
	DetailPanel, SbomLegend, StatsBar, StatusBanner, TypeFilter, UploadForm, ViewControls,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("sbom-graph: logging initialized");
}

/// The script element with the given id.
fn script_element(id: &str) -> Option<HtmlScriptElement> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	element.dyn_into().ok()
}

/// Load viewer configuration from a script element with id="viewer-config".
/// A `data-api-base` attribute on the element overrides the backend URL.
fn load_viewer_config() -> ViewerConfig {
	let Some(script) = script_element("viewer-config") else {
		return ViewerConfig::default();
	};
	let text = script.text().ok().filter(|t| !t.trim().is_empty());
	let mut config = match text.map(|t| ViewerConfig::from_json(&t)) {
		Some(Ok(config)) => config,
		Some(Err(e)) => {
			warn!("sbom-graph: invalid viewer config, using defaults: {}", e);
			ViewerConfig::default()
		}
		None => ViewerConfig::default(),
	};
	if let Some(base) = script.get_attribute("data-api-base") {
		config.api_base = base;
	}
	config
}

/// Load an initial graph from a script element with id="graph-data".
/// Expected format: the `GET /graph` payload.
fn load_graph_data() -> Option<GraphPayload> {
	let json_text = script_element("graph-data")?.text().ok()?;
	match serde_json::from_str::<GraphPayload>(&json_text) {
		Ok(data) => {
			info!(
				"sbom-graph: embedded graph with {} nodes, {} links",
				data.nodes.len(),
				data.links.len()
			);
			Some(data)
		}
		Err(e) => {
			warn!("sbom-graph: failed to parse embedded graph data: {}", e);
			None
		}
	}
}

/// Main application component.
/// Uses embedded graph data when present, otherwise loads from the backend.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let session = Session::new(GraphState::new(load_viewer_config()));
	match load_graph_data() {
		Some(payload) => session.apply(payload, &[]),
		None => session.refresh(),
	}

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="SBOM Dependency Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="app">
			<aside class="sidebar">
				<h1>"SBOM Graph"</h1>
				<StatusBanner session=session />
				<UploadForm session=session />
				<StatsBar session=session />
				<ViewControls session=session />
				<SbomLegend session=session />
				<TypeFilter session=session />
			</aside>
			<main class="graph-pane">
				<ForceGraphCanvas state=session.state />
				<DetailPanel session=session />
				<p class="graph-hint">
					"Click a node for details. Drag nodes to reposition. Scroll to zoom. Drag background to pan."
				</p>
			</main>
		</div>
	}
}
