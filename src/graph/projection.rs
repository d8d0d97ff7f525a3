//! Mapping of nodes and links to their visual attributes.
//!
//! A [`Projection`] borrows the current [`GraphState`] and precomputes the
//! per-node link counts once; every method is then a pure lookup. Missing
//! optional fields degrade to defaults (no size means the base radius, an
//! unknown SBOM means the default color).

use std::collections::HashMap;

use crate::config::SizingConfig;
use crate::theme::{Color, DEFAULT_NODE, SHARED_HIGHLIGHT, Theme};

use super::format::truncate_label;
use super::state::{GraphState, SizeMode};
use super::types::{Component, Link};

/// Link opacity without a selection.
pub const LINK_OPACITY: f64 = 0.6;
/// Opacity of links touching the selected node.
pub const LINK_OPACITY_SELECTED: f64 = 0.8;
/// Opacity of every other link while a node is selected.
pub const LINK_OPACITY_DIMMED: f64 = 0.2;

/// Node outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
	pub color: Color,
	pub width: f64,
}

/// Everything needed to draw one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeStyle {
	pub radius: f64,
	pub fill: Color,
	pub stroke: Stroke,
	pub label: String,
	pub class: String,
	pub visible: bool,
}

/// Full display name: display name, then name, then id, then `"Unknown"`.
pub fn display_name(node: &Component) -> &str {
	[
		node.display_name.as_deref(),
		node.name.as_deref(),
		Some(node.id.as_str()),
	]
	.into_iter()
	.flatten()
	.find(|s| !s.is_empty())
	.unwrap_or("Unknown")
}

/// Label drawn next to a node.
pub fn label_text(node: &Component) -> String {
	truncate_label(display_name(node))
}

/// Space-separated display classes: `node`, plus `cluster`, `shared` and
/// `selected` where they apply.
pub fn display_class(node: &Component, selected: bool) -> String {
	let mut class = String::from("node");
	if node.is_cluster {
		class.push_str(" cluster");
	}
	if node.is_shared() {
		class.push_str(" shared");
	}
	if selected {
		class.push_str(" selected");
	}
	class
}

/// Visual projection of a [`GraphState`].
pub struct Projection<'a> {
	state: &'a GraphState,
	theme: &'a Theme,
	sizing: &'a SizingConfig,
	degree: HashMap<&'a str, usize>,
	by_id: HashMap<&'a str, &'a Component>,
}

impl<'a> Projection<'a> {
	pub fn new(state: &'a GraphState, theme: &'a Theme) -> Self {
		let mut degree: HashMap<&str, usize> = HashMap::new();
		for link in state.links() {
			*degree.entry(link.source.as_str()).or_insert(0) += 1;
			*degree.entry(link.target.as_str()).or_insert(0) += 1;
		}
		let by_id = state.nodes().iter().map(|n| (n.id.as_str(), n)).collect();
		Self {
			state,
			theme,
			sizing: &state.config().sizing,
			degree,
			by_id,
		}
	}

	/// Number of links touching `id` in the working set.
	pub fn degree(&self, id: &str) -> usize {
		self.degree.get(id).copied().unwrap_or(0)
	}

	pub fn node(&self, id: &str) -> Option<&'a Component> {
		self.by_id.get(id).copied()
	}

	pub fn node_radius(&self, node: &Component) -> f64 {
		let s = self.sizing;
		if node.is_cluster {
			let count = node
				.component_count
				.or_else(|| node.components.as_ref().map(Vec::len))
				.unwrap_or(0);
			return (s.cluster_radius + (count as f64).sqrt() * 2.0).min(s.cluster_max_radius);
		}

		let base = s.base_radius;
		let extra = match self.state.size_mode() {
			SizeMode::Fixed => return base,
			SizeMode::Connections => s.connection_weight * self.degree(&node.id) as f64,
			SizeMode::FileSize => s.size_weight * node.size_bytes(),
			SizeMode::Shared => {
				s.shared_weight * node.shared_in.as_ref().map_or(0, Vec::len) as f64
			}
		};
		(base + extra).min(s.max_radius).max(base)
	}

	pub fn node_color(&self, node: &Component) -> Color {
		if node.is_shared() {
			if self.state.highlight_common() {
				return SHARED_HIGHLIGHT;
			}
			return node
				.shared_in
				.as_ref()
				.and_then(|list| list.first())
				.and_then(|sbom| self.state.sbom_color(sbom))
				.unwrap_or(DEFAULT_NODE);
		}
		node.sbom_id
			.as_deref()
			.and_then(|sbom| self.state.sbom_color(sbom))
			.unwrap_or(DEFAULT_NODE)
	}

	pub fn node_stroke(&self, node: &Component) -> Stroke {
		let style = &self.theme.node;
		if self.state.selected() == Some(node.id.as_str()) {
			Stroke {
				color: style.selected_border_color,
				width: 3.0,
			}
		} else if node.is_cluster {
			Stroke {
				color: style.cluster_border_color,
				width: 2.5,
			}
		} else if node.is_shared() && self.state.highlight_common() {
			Stroke {
				color: SHARED_HIGHLIGHT.darken(0.3),
				width: 2.0,
			}
		} else {
			Stroke {
				color: style.border_color,
				width: 1.0,
			}
		}
	}

	pub fn link_opacity(&self, link: &Link) -> f64 {
		match self.state.selected() {
			Some(id) if link.touches(id) => LINK_OPACITY_SELECTED,
			Some(_) => LINK_OPACITY_DIMMED,
			None => LINK_OPACITY,
		}
	}

	/// Whether the node passes the SBOM and type filters.
	pub fn node_visible(&self, node: &Component) -> bool {
		let sbom_visible = self.state.shows_all_sboms()
			|| node
				.sbom_id
				.iter()
				.chain(node.shared_in.iter().flatten())
				.any(|sbom| self.state.is_sbom_visible(sbom));
		sbom_visible && !self.state.is_type_hidden(node.type_tag())
	}

	/// Whether the link passes the SBOM and type filters.
	///
	/// The link's own SBOM decides, independent of its endpoints' SBOMs; a
	/// link without one is visible only while every SBOM is shown. Under an
	/// active type filter both endpoints must also be of a shown type.
	pub fn link_visible(&self, link: &Link) -> bool {
		let sbom_visible = match link.sbom_id.as_deref() {
			Some(sbom) => self.state.is_sbom_visible(sbom),
			None => self.state.shows_all_sboms(),
		};
		if !sbom_visible {
			return false;
		}
		if !self.state.has_type_filter() {
			return true;
		}
		[&link.source, &link.target].into_iter().all(|id| {
			self.node(id)
				.is_some_and(|n| !self.state.is_type_hidden(n.type_tag()))
		})
	}

	pub fn node_style(&self, node: &Component) -> NodeStyle {
		NodeStyle {
			radius: self.node_radius(node),
			fill: self.node_color(node),
			stroke: self.node_stroke(node),
			label: label_text(node),
			class: display_class(node, self.state.selected() == Some(node.id.as_str())),
			visible: self.node_visible(node),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::{GraphPayload, RawLink};
	use crate::theme::NodePalette;

	fn node(id: &str, sbom: &str) -> Component {
		Component::new(id, Some(sbom))
	}

	fn shared(id: &str, sbom: &str, sboms: &[&str]) -> Component {
		Component {
			shared_in: Some(sboms.iter().map(|s| s.to_string()).collect()),
			..node(id, sbom)
		}
	}

	fn loaded(nodes: Vec<Component>, links: Vec<RawLink>) -> GraphState {
		let mut state = GraphState::default();
		state.update_data(GraphPayload::new(nodes, links));
		state
	}

	fn scenario() -> GraphState {
		loaded(
			vec![node("A", "1"), node("B", "1"), shared("C", "2", &["1", "2"])],
			vec![RawLink::new("A", "C", Some("1")), RawLink::new("B", "C", Some("1"))],
		)
	}

	#[test]
	fn test_shared_scenario_colors() {
		let mut state = scenario();
		let stats = state.stats();
		assert_eq!((stats.nodes, stats.links, stats.sboms), (3, 2, 2));

		state.set_highlight_common(true);
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		let c = state.node("C").unwrap();
		assert_eq!(p.node_color(c), SHARED_HIGHLIGHT);
		assert_eq!(p.node_color(state.node("A").unwrap()), NodePalette::category10().get(0));
	}

	#[test]
	fn test_shared_without_highlight_uses_first_sbom() {
		let state = scenario();
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		assert_eq!(
			p.node_color(state.node("C").unwrap()),
			state.sbom_color("1").unwrap()
		);
		assert_eq!(p.node_color(&node("x", "never-seen")), DEFAULT_NODE);
	}

	#[test]
	fn test_fixed_radius_is_constant() {
		let state = scenario();
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		let mut big = shared("big", "1", &["1", "2", "3"]);
		big.size = Some(1e9);
		assert_eq!(p.node_radius(&big), 15.0);
		assert_eq!(p.node_radius(state.node("C").unwrap()), 15.0);
	}

	#[test]
	fn test_mode_radii_clamp() {
		let mut state = scenario();
		let theme = Theme::default();

		state.set_node_size_by(SizeMode::Connections);
		let p = Projection::new(&state, &theme);
		assert_eq!(p.node_radius(state.node("C").unwrap()), 19.0);
		assert_eq!(p.node_radius(state.node("A").unwrap()), 17.0);

		state.set_node_size_by(SizeMode::FileSize);
		let p = Projection::new(&state, &theme);
		let mut heavy = node("h", "1");
		heavy.size = Some(50_000.0);
		assert!((p.node_radius(&heavy) - 20.0).abs() < 1e-9);
		heavy.size = Some(1e9);
		assert_eq!(p.node_radius(&heavy), 45.0);
		assert_eq!(p.node_radius(&node("none", "1")), 15.0);

		state.set_node_size_by(SizeMode::Shared);
		let p = Projection::new(&state, &theme);
		assert_eq!(p.node_radius(state.node("C").unwrap()), 25.0);
	}

	#[test]
	fn test_cluster_radius() {
		let state = GraphState::default();
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		let mut c = node("c", "1");
		c.is_cluster = true;
		c.component_count = Some(49);
		assert_eq!(p.node_radius(&c), 39.0);
		c.component_count = Some(10_000);
		assert_eq!(p.node_radius(&c), 60.0);
	}

	#[test]
	fn test_link_opacity_follows_selection() {
		let mut state = loaded(
			vec![node("A", "1"), node("B", "1"), node("D", "1")],
			vec![RawLink::new("A", "B", None), RawLink::new("B", "D", None)],
		);
		let theme = Theme::default();
		{
			let p = Projection::new(&state, &theme);
			assert!(state.links().iter().all(|l| p.link_opacity(l) == LINK_OPACITY));
		}
		state.select_node("A");
		let p = Projection::new(&state, &theme);
		let opacities: Vec<f64> = state.links().iter().map(|l| p.link_opacity(l)).collect();
		assert_eq!(opacities, vec![LINK_OPACITY_SELECTED, LINK_OPACITY_DIMMED]);
	}

	#[test]
	fn test_visibility_filter() {
		let mut state = loaded(
			vec![node("a", "1"), node("b", "2"), shared("c", "3", &["2", "3"])],
			vec![RawLink::new("a", "b", Some("1")), RawLink::new("b", "c", Some("2"))],
		);
		let theme = Theme::default();

		state.toggle_sbom_visibility("1", false);
		state.toggle_sbom_visibility("3", false);
		let p = Projection::new(&state, &theme);
		let visible: Vec<&str> = state
			.nodes()
			.iter()
			.filter(|n| p.node_visible(n))
			.map(|n| n.id.as_str())
			.collect();
		assert_eq!(visible, vec!["b", "c"]);
		let links: Vec<bool> = state.links().iter().map(|l| p.link_visible(l)).collect();
		assert_eq!(links, vec![false, true]);

		// Hiding the last SBOM empties the set, which shows everything.
		state.toggle_sbom_visibility("2", false);
		let p = Projection::new(&state, &theme);
		assert!(state.nodes().iter().all(|n| p.node_visible(n)));
		assert!(state.links().iter().all(|l| p.link_visible(l)));
	}

	#[test]
	fn test_link_follows_its_own_sbom() {
		let mut state = loaded(
			vec![node("a", "1"), node("b", "2"), node("c", "1")],
			vec![RawLink::new("a", "b", Some("1")), RawLink::new("a", "c", None)],
		);
		let theme = Theme::default();
		{
			let p = Projection::new(&state, &theme);
			assert!(state.links().iter().all(|l| p.link_visible(l)));
		}

		state.toggle_sbom_visibility("2", false);
		let p = Projection::new(&state, &theme);
		assert!(!p.node_visible(state.node("b").unwrap()));
		let owned = state.links().iter().find(|l| l.target == "b").unwrap();
		assert!(p.link_visible(owned));
		let unowned = state.links().iter().find(|l| l.target == "c").unwrap();
		assert!(!p.link_visible(unowned));
	}

	#[test]
	fn test_type_filter_hides_nodes_and_links() {
		let mut a = node("a", "1");
		a.kind = Some("library".into());
		let mut b = node("b", "1");
		b.kind = Some("file".into());
		let mut state = loaded(vec![a, b], vec![RawLink::new("a", "b", Some("1"))]);
		state.set_type_hidden("file", true);
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		assert!(p.node_visible(state.node("a").unwrap()));
		assert!(!p.node_visible(state.node("b").unwrap()));
		assert!(!p.link_visible(&state.links()[0]));
	}

	#[test]
	fn test_labels_and_classes() {
		let mut n = node("pkg:generic/some-very-long-identifier", "1");
		assert_eq!(label_text(&n), "pkg:generic/some-...");
		n.name = Some("zlib".into());
		assert_eq!(label_text(&n), "zlib");
		n.display_name = Some("zlib 1.3".into());
		assert_eq!(label_text(&n), "zlib 1.3");
		assert_eq!(label_text(&Component::default()), "Unknown");

		let mut c = shared("c", "1", &["1", "2"]);
		assert_eq!(display_class(&c, false), "node shared");
		c.is_cluster = true;
		assert_eq!(display_class(&c, true), "node cluster shared selected");
	}

	#[test]
	fn test_selected_stroke() {
		let mut state = scenario();
		state.select_node("A");
		let theme = Theme::default();
		let p = Projection::new(&state, &theme);
		let style = p.node_style(state.node("A").unwrap());
		assert_eq!(style.stroke.width, 3.0);
		assert!(style.class.ends_with("selected"));
		assert!(style.visible);
	}
}
