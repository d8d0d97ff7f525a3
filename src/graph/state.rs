//! Session state of the graph view.
//!
//! `GraphState` is the single owner of the working node/link set, the
//! original (un-clustered) set, the per-SBOM color and visibility
//! bookkeeping and the view parameters. It lives inside a Leptos signal;
//! every mutation goes through the methods below.

use std::collections::{HashMap, HashSet};

use log::{info, warn};

use crate::config::ViewerConfig;
use crate::error::ClusterError;
use crate::theme::{Color, NodePalette};

use super::cluster;
use super::ingest::{self, IngestReport};
use super::types::{Component, GraphPayload, Link, SbomMeta};

/// How regular node radii are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeMode {
	#[default]
	Fixed,
	Connections,
	FileSize,
	Shared,
}

impl SizeMode {
	pub const ALL: [SizeMode; 4] = [
		SizeMode::Fixed,
		SizeMode::Connections,
		SizeMode::FileSize,
		SizeMode::Shared,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			SizeMode::Fixed => "fixed",
			SizeMode::Connections => "connections",
			SizeMode::FileSize => "file-size",
			SizeMode::Shared => "shared",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			SizeMode::Fixed => "Fixed size",
			SizeMode::Connections => "Connections",
			SizeMode::FileSize => "File size",
			SizeMode::Shared => "Shared count",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|m| m.as_str() == value)
	}
}

/// What a state change requires from the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
	/// Nothing visible changed.
	None,
	/// Repaint only; the simulation is unaffected.
	Paint,
	/// Node radii changed; collision radii must be refreshed.
	Layout,
}

/// SBOM colors and names.
///
/// Colors are handed out in registration order and never reassigned; the
/// registration counter survives deletions so a returning SBOM gets a
/// fresh color.
#[derive(Clone, Debug)]
pub struct SbomRegistry {
	palette: NodePalette,
	colors: HashMap<String, Color>,
	names: HashMap<String, String>,
	order: Vec<String>,
	assigned: usize,
}

impl SbomRegistry {
	pub fn new(palette: NodePalette) -> Self {
		Self {
			palette,
			colors: HashMap::new(),
			names: HashMap::new(),
			order: Vec::new(),
			assigned: 0,
		}
	}

	/// Registers `sbom` if new. Returns whether it was new.
	pub fn register(&mut self, sbom: &str) -> bool {
		if self.colors.contains_key(sbom) {
			return false;
		}
		let color = self.palette.get(self.assigned);
		self.assigned += 1;
		self.colors.insert(sbom.to_string(), color);
		self.order.push(sbom.to_string());
		true
	}

	pub fn color(&self, sbom: &str) -> Option<Color> {
		self.colors.get(sbom).copied()
	}

	pub fn set_name(&mut self, sbom: &str, name: &str) {
		self.names.insert(sbom.to_string(), name.to_string());
	}

	/// Human-readable name, `"SBOM <id>"` when none was recorded.
	pub fn name(&self, sbom: &str) -> String {
		self.names
			.get(sbom)
			.cloned()
			.unwrap_or_else(|| format!("SBOM {}", sbom))
	}

	/// Registered SBOM ids in registration order.
	pub fn ids(&self) -> &[String] {
		&self.order
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	fn forget(&mut self, sbom: &str) -> bool {
		self.names.remove(sbom);
		self.order.retain(|s| s != sbom);
		self.colors.remove(sbom).is_some()
	}
}

/// One row of the SBOM legend.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
	pub id: String,
	pub name: String,
	pub color: Color,
	pub visible: bool,
}

/// Aggregate counts for the status bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
	pub nodes: usize,
	pub links: usize,
	pub sboms: usize,
}

/// Result of expanding a cluster in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpansionReport {
	pub restored: usize,
	pub links: usize,
}

/// Graph view state. See the module docs.
pub struct GraphState {
	nodes: Vec<Component>,
	links: Vec<Link>,
	original_nodes: Vec<Component>,
	original_links: Vec<Link>,
	registry: SbomRegistry,
	visible_sboms: HashSet<String>,
	hidden_types: HashSet<String>,
	size_mode: SizeMode,
	highlight_common: bool,
	selected: Option<String>,
	config: ViewerConfig,
	layout_revision: u64,
	style_revision: u64,
}

impl Default for GraphState {
	fn default() -> Self {
		Self::new(ViewerConfig::default())
	}
}

impl GraphState {
	pub fn new(config: ViewerConfig) -> Self {
		Self {
			nodes: Vec::new(),
			links: Vec::new(),
			original_nodes: Vec::new(),
			original_links: Vec::new(),
			registry: SbomRegistry::new(NodePalette::category10()),
			visible_sboms: HashSet::new(),
			hidden_types: HashSet::new(),
			size_mode: SizeMode::default(),
			highlight_common: false,
			selected: None,
			config,
			layout_revision: 0,
			style_revision: 0,
		}
	}

	/// Replaces the working set with a freshly ingested payload.
	///
	/// Clustering runs before SBOM color/visibility bookkeeping; both the
	/// registry and the visibility set only ever grow here.
	pub fn update_data(&mut self, payload: GraphPayload) -> IngestReport {
		let GraphPayload {
			nodes,
			links,
			sboms,
			malformed_nodes,
			malformed_links,
		} = payload;
		if malformed_nodes > 0 || malformed_links > 0 {
			warn!(
				"sbom-graph: skipped {} unreadable nodes and {} unreadable links",
				malformed_nodes, malformed_links
			);
		}
		let normalized = ingest::normalize(nodes, links);
		self.original_nodes = normalized.nodes;
		self.original_links = normalized.links;

		let clusters = self.rebuild_working_set();
		let new_sboms =
			ingest::register_sboms(&self.nodes, &mut self.registry, &mut self.visible_sboms);
		if let Some(meta) = sboms {
			self.record_sbom_names(&meta);
		}
		self.drop_stale_selection();

		let report = IngestReport {
			nodes: self.nodes.len(),
			links: self.links.len(),
			sboms: self.registry.len(),
			new_sboms,
			clusters,
			duplicate_nodes: normalized.duplicate_nodes,
			dangling_links: normalized.dangling_links,
			malformed_nodes,
			malformed_links,
		};
		info!(
			"sbom-graph: {} nodes, {} links, {} sboms ({} clusters)",
			report.nodes, report.links, report.sboms, report.clusters
		);
		report
	}

	/// Records display names for SBOMs, registered or not.
	pub fn record_sbom_names(&mut self, sboms: &[SbomMeta]) {
		for meta in sboms {
			if let Some(name) = meta.name.as_deref().filter(|n| !n.is_empty()) {
				self.registry.set_name(&meta.id, name);
			}
		}
	}

	/// Recomputes the working set from the originals. Falls back to the
	/// untouched originals when clustering fails. Returns the cluster count.
	fn rebuild_working_set(&mut self) -> usize {
		let clusters = match cluster::cluster(
			&self.original_nodes,
			&self.original_links,
			&self.config.cluster,
		) {
			Ok(out) => {
				self.nodes = out.nodes;
				self.links = out.links;
				out.clusters
			}
			Err(e) => {
				warn!("sbom-graph: clustering failed, showing all components: {}", e);
				self.nodes = self.original_nodes.clone();
				self.links = self.original_links.clone();
				0
			}
		};
		self.prune_dangling_links();
		self.layout_revision += 1;
		clusters
	}

	/// Drops links whose endpoints are not in the working node set.
	pub fn prune_dangling_links(&mut self) -> usize {
		let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		let before = self.links.len();
		self.links
			.retain(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()));
		let dropped = before - self.links.len();
		if dropped > 0 {
			warn!("sbom-graph: dropped {} links with missing endpoints", dropped);
		}
		dropped
	}

	fn drop_stale_selection(&mut self) {
		if let Some(id) = &self.selected {
			if self.node(id).is_none() {
				self.selected = None;
			}
		}
	}

	/// Expands the cluster `id` in place.
	pub fn expand_cluster(&mut self, id: &str) -> Result<ExpansionReport, ClusterError> {
		let out = cluster::expand(
			&self.nodes,
			&self.links,
			&self.original_nodes,
			&self.original_links,
			id,
		)?;
		let before = self.links.len();
		self.nodes = out.nodes;
		self.links = out.links;
		self.prune_dangling_links();
		self.drop_stale_selection();
		self.layout_revision += 1;
		info!("sbom-graph: expanded {} into {} components", id, out.restored);
		Ok(ExpansionReport {
			restored: out.restored,
			links: self.links.len().saturating_sub(before),
		})
	}

	/// Turns clustering on or off and rebuilds the working set.
	pub fn set_clustering(&mut self, enabled: bool) -> Invalidation {
		if self.config.cluster.enabled == enabled {
			return Invalidation::None;
		}
		self.config.cluster.enabled = enabled;
		self.rebuild_working_set();
		self.drop_stale_selection();
		Invalidation::Layout
	}

	/// Changes the clustering threshold and rebuilds the working set.
	pub fn set_cluster_threshold(&mut self, threshold: usize) -> Invalidation {
		if self.config.cluster.threshold == threshold {
			return Invalidation::None;
		}
		self.config.cluster.threshold = threshold;
		self.rebuild_working_set();
		self.drop_stale_selection();
		Invalidation::Layout
	}

	pub fn set_node_size_by(&mut self, mode: SizeMode) -> Invalidation {
		if self.size_mode == mode {
			return Invalidation::None;
		}
		self.size_mode = mode;
		self.style_revision += 1;
		Invalidation::Layout
	}

	pub fn set_highlight_common(&mut self, enabled: bool) -> Invalidation {
		if self.highlight_common == enabled {
			return Invalidation::None;
		}
		self.highlight_common = enabled;
		self.style_revision += 1;
		Invalidation::Layout
	}

	/// Shows or hides one SBOM. Only the visibility filter is affected.
	pub fn toggle_sbom_visibility(&mut self, id: &str, visible: bool) -> Invalidation {
		let changed = if visible {
			self.visible_sboms.insert(id.to_string())
		} else {
			self.visible_sboms.remove(id)
		};
		if changed {
			Invalidation::Paint
		} else {
			Invalidation::None
		}
	}

	/// Hides or shows every node of the given type.
	pub fn set_type_hidden(&mut self, kind: &str, hidden: bool) -> Invalidation {
		let changed = if hidden {
			self.hidden_types.insert(kind.to_string())
		} else {
			self.hidden_types.remove(kind)
		};
		if changed {
			Invalidation::Paint
		} else {
			Invalidation::None
		}
	}

	/// Selects `id`, or clears the selection when `id` is already selected
	/// or not in the working set.
	pub fn select_node(&mut self, id: &str) -> Invalidation {
		if self.selected.as_deref() == Some(id) || self.node(id).is_none() {
			self.selected = None;
		} else {
			self.selected = Some(id.to_string());
		}
		Invalidation::Paint
	}

	pub fn clear_selection(&mut self) -> Invalidation {
		match self.selected.take() {
			Some(_) => Invalidation::Paint,
			None => Invalidation::None,
		}
	}

	/// Forgets a deleted SBOM ahead of the re-fetch.
	pub fn forget_sbom(&mut self, id: &str) -> bool {
		self.visible_sboms.remove(id);
		self.registry.forget(id)
	}

	pub fn stats(&self) -> GraphStats {
		GraphStats {
			nodes: self.nodes.len(),
			links: self.links.len(),
			sboms: self.registry.len(),
		}
	}

	/// Legend rows in registration order.
	pub fn sbom_legend(&self) -> Vec<LegendEntry> {
		self.registry
			.ids()
			.iter()
			.map(|id| LegendEntry {
				id: id.clone(),
				name: self.registry.name(id),
				color: self.registry.color(id).unwrap_or(crate::theme::DEFAULT_NODE),
				visible: self.is_sbom_visible(id),
			})
			.collect()
	}

	/// Distinct type tags of the working set, sorted.
	pub fn node_types(&self) -> Vec<String> {
		let mut types: Vec<String> = self
			.nodes
			.iter()
			.map(|n| n.type_tag().to_string())
			.collect::<HashSet<_>>()
			.into_iter()
			.collect();
		types.sort();
		types
	}

	/// Whether `id` passes the visibility filter. An empty visibility set
	/// means every SBOM is visible.
	pub fn is_sbom_visible(&self, id: &str) -> bool {
		self.visible_sboms.is_empty() || self.visible_sboms.contains(id)
	}

	pub fn shows_all_sboms(&self) -> bool {
		self.visible_sboms.is_empty()
	}

	pub fn is_type_hidden(&self, kind: &str) -> bool {
		self.hidden_types.contains(kind)
	}

	pub fn has_type_filter(&self) -> bool {
		!self.hidden_types.is_empty()
	}

	pub fn nodes(&self) -> &[Component] {
		&self.nodes
	}

	pub fn links(&self) -> &[Link] {
		&self.links
	}

	pub fn original_nodes(&self) -> &[Component] {
		&self.original_nodes
	}

	pub fn original_links(&self) -> &[Link] {
		&self.original_links
	}

	pub fn node(&self, id: &str) -> Option<&Component> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn registry(&self) -> &SbomRegistry {
		&self.registry
	}

	pub fn sbom_color(&self, id: &str) -> Option<Color> {
		self.registry.color(id)
	}

	pub fn sbom_name(&self, id: &str) -> String {
		self.registry.name(id)
	}

	pub fn visible_sboms(&self) -> &HashSet<String> {
		&self.visible_sboms
	}

	pub fn size_mode(&self) -> SizeMode {
		self.size_mode
	}

	pub fn highlight_common(&self) -> bool {
		self.highlight_common
	}

	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	pub fn config(&self) -> &ViewerConfig {
		&self.config
	}

	/// Bumped whenever the working node/link arrays are replaced.
	pub fn layout_revision(&self) -> u64 {
		self.layout_revision
	}

	/// Bumped whenever node radii may have changed.
	pub fn style_revision(&self) -> u64 {
		self.style_revision
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::RawLink;

	fn node(id: &str, sbom: &str) -> Component {
		Component::new(id, Some(sbom))
	}

	fn payload(nodes: Vec<Component>, links: Vec<RawLink>) -> GraphPayload {
		GraphPayload::new(nodes, links)
	}

	#[test]
	fn test_update_replaces_arrays_and_keeps_colors() {
		let mut state = GraphState::default();
		state.update_data(payload(vec![node("a", "1"), node("b", "2")], vec![]));
		let first = state.sbom_color("1");
		let second = state.sbom_color("2");
		let revision = state.layout_revision();

		let report = state.update_data(payload(vec![node("c", "2"), node("d", "3")], vec![]));
		assert_eq!(report.nodes, 2);
		assert_eq!(report.new_sboms, 1);
		assert_eq!(report.sboms, 3);
		assert!(state.node("a").is_none());
		assert_eq!(state.sbom_color("1"), first);
		assert_eq!(state.sbom_color("2"), second);
		assert!(state.layout_revision() > revision);
	}

	#[test]
	fn test_sbom_names_recorded() {
		let mut state = GraphState::default();
		state.update_data(GraphPayload {
			nodes: vec![node("a", "1"), node("b", "2")],
			links: vec![],
			sboms: Some(vec![SbomMeta {
				id: "1".into(),
				name: Some("firmware".into()),
			}]),
			..GraphPayload::default()
		});
		assert_eq!(state.sbom_name("1"), "firmware");
		assert_eq!(state.sbom_name("2"), "SBOM 2");
		let legend = state.sbom_legend();
		assert_eq!(legend.len(), 2);
		assert_eq!(legend[0].name, "firmware");
		assert!(legend.iter().all(|e| e.visible));
	}

	#[test]
	fn test_visibility_toggle_and_empty_sentinel() {
		let mut state = GraphState::default();
		state.update_data(payload(vec![node("a", "1"), node("b", "2")], vec![]));

		assert_eq!(state.toggle_sbom_visibility("1", false), Invalidation::Paint);
		assert!(!state.is_sbom_visible("1"));
		assert!(state.is_sbom_visible("2"));
		assert_eq!(state.toggle_sbom_visibility("1", false), Invalidation::None);

		state.toggle_sbom_visibility("2", false);
		assert!(state.shows_all_sboms());
		assert!(state.is_sbom_visible("1"));
		assert!(state.is_sbom_visible("2"));
	}

	#[test]
	fn test_select_toggles() {
		let mut state = GraphState::default();
		state.update_data(payload(vec![node("a", "1")], vec![]));
		state.select_node("a");
		assert_eq!(state.selected(), Some("a"));
		state.select_node("a");
		assert_eq!(state.selected(), None);
		state.select_node("missing");
		assert_eq!(state.selected(), None);
	}

	#[test]
	fn test_selection_cleared_when_node_disappears() {
		let mut state = GraphState::default();
		state.update_data(payload(vec![node("a", "1")], vec![]));
		state.select_node("a");
		state.update_data(payload(vec![node("b", "1")], vec![]));
		assert_eq!(state.selected(), None);
	}

	#[test]
	fn test_view_mode_changes_bump_style_revision() {
		let mut state = GraphState::default();
		assert_eq!(state.set_node_size_by(SizeMode::Fixed), Invalidation::None);
		assert_eq!(state.set_node_size_by(SizeMode::Shared), Invalidation::Layout);
		assert_eq!(state.set_highlight_common(true), Invalidation::Layout);
		assert_eq!(state.style_revision(), 2);
		assert_eq!(SizeMode::parse("file-size"), Some(SizeMode::FileSize));
		assert_eq!(SizeMode::parse("bogus"), None);
	}

	#[test]
	fn test_clustering_toggle_and_expand() {
		let nodes: Vec<Component> = (0..40)
			.map(|i| Component {
				kind: Some("library".into()),
				..node(&format!("n{}", i), "1")
			})
			.collect();
		let mut state = GraphState::default();
		let report = state.update_data(payload(nodes, vec![]));
		assert_eq!(report.clusters, 1);
		assert_eq!(state.stats().nodes, 1);
		assert_eq!(state.sbom_legend().len(), 1);

		let expansion = state.expand_cluster("cluster-1-library").unwrap();
		assert_eq!(expansion.restored, 40);
		assert_eq!(state.stats().nodes, 40);

		state.set_clustering(false);
		assert_eq!(state.stats().nodes, 40);
		state.set_clustering(true);
		assert_eq!(state.stats().nodes, 1);
		state.set_cluster_threshold(50);
		assert_eq!(state.stats().nodes, 40);
	}

	#[test]
	fn test_cluster_failure_falls_back_to_originals() {
		let mut nodes: Vec<Component> = (0..40).map(|i| node(&format!("n{}", i), "1")).collect();
		nodes.push(node("cluster-1-unknown", "2"));
		let mut state = GraphState::default();
		let report = state.update_data(payload(nodes, vec![]));
		assert_eq!(report.clusters, 0);
		assert_eq!(report.nodes, 41);
	}

	#[test]
	fn test_ambiguous_cluster_ids_keep_every_component() {
		let mut nodes: Vec<Component> = (0..31)
			.map(|i| Component {
				kind: Some("c".into()),
				..node(&format!("ab-{}", i), "a-b")
			})
			.collect();
		nodes.extend((0..31).map(|i| Component {
			kind: Some("b-c".into()),
			..node(&format!("a-{}", i), "a")
		}));
		let mut state = GraphState::default();
		let report = state.update_data(payload(nodes, vec![]));
		assert_eq!(report.clusters, 0);
		assert_eq!(report.nodes, 62);
		assert!(state.expand_cluster("cluster-a-b-c").is_err());
		assert_eq!(state.nodes().len(), 62);
	}

	#[test]
	fn test_forget_sbom() {
		let mut state = GraphState::default();
		state.update_data(payload(vec![node("a", "1"), node("b", "2")], vec![]));
		assert!(state.forget_sbom("1"));
		assert!(!state.forget_sbom("1"));
		assert_eq!(state.sbom_color("1"), None);
		assert_eq!(state.stats().sboms, 1);

		// Re-registering after deletion takes the next palette slot.
		state.update_data(payload(vec![node("a", "1")], vec![]));
		assert_eq!(state.sbom_color("1"), Some(NodePalette::category10().get(2)));
	}

	#[test]
	fn test_type_filter() {
		let mut state = GraphState::default();
		assert_eq!(state.set_type_hidden("file", true), Invalidation::Paint);
		assert!(state.has_type_filter());
		assert!(state.is_type_hidden("file"));
		assert_eq!(state.set_type_hidden("file", false), Invalidation::Paint);
		assert!(!state.has_type_filter());
	}
}
