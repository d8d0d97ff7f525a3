//! Side-panel detail view of the selected node.

use super::format::format_file_size;
use super::projection::display_name;
use super::state::GraphState;
use super::types::Component;

const NOT_AVAILABLE: &str = "N/A";

/// Details of a regular component.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentDetails {
	pub id: String,
	pub name: String,
	pub version: String,
	pub vendor: String,
	pub uuid: String,
	pub file_name: String,
	pub size: String,
	pub kind: String,
	pub sbom: String,
	/// Number of SBOMs the component appears in.
	pub shared_count: usize,
	/// Outgoing links.
	pub dependencies: usize,
	/// Incoming links.
	pub dependents: usize,
}

/// Details of a cluster node.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDetails {
	pub id: String,
	pub name: String,
	pub kind: String,
	pub sbom: String,
	pub component_count: usize,
	pub size: String,
	pub incoming: usize,
	pub outgoing: usize,
}

/// Detail view for one node.
#[derive(Clone, Debug, PartialEq)]
pub enum Details {
	Component(ComponentDetails),
	Cluster(ClusterDetails),
}

fn text(value: &Option<String>) -> String {
	match value.as_deref() {
		Some(v) if !v.is_empty() => v.to_string(),
		_ => NOT_AVAILABLE.to_string(),
	}
}

fn sbom_label(state: &GraphState, node: &Component) -> String {
	node.sbom_id
		.as_deref()
		.map(|id| state.sbom_name(id))
		.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Builds the detail view for `id`, if it is in the working set.
pub fn details(state: &GraphState, id: &str) -> Option<Details> {
	let node = state.node(id)?;
	let outgoing = state.links().iter().filter(|l| l.source == id).count();
	let incoming = state.links().iter().filter(|l| l.target == id).count();

	if node.is_cluster {
		return Some(Details::Cluster(ClusterDetails {
			id: node.id.clone(),
			name: display_name(node).to_string(),
			kind: node.type_tag().to_string(),
			sbom: sbom_label(state, node),
			component_count: node
				.component_count
				.or_else(|| node.components.as_ref().map(Vec::len))
				.unwrap_or(0),
			size: format_file_size(node.size_bytes()),
			incoming,
			outgoing,
		}));
	}

	Some(Details::Component(ComponentDetails {
		id: node.id.clone(),
		name: display_name(node).to_string(),
		version: text(&node.version),
		vendor: text(&node.vendor),
		uuid: node.uuid.clone().unwrap_or_else(|| node.id.clone()),
		file_name: text(&node.file_name),
		size: format_file_size(node.size_bytes()),
		kind: node.type_tag().to_string(),
		sbom: sbom_label(state, node),
		shared_count: node.shared_count().max(1),
		dependencies: outgoing,
		dependents: incoming,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::types::{GraphPayload, RawLink, SbomMeta};

	fn state() -> GraphState {
		let mut zlib = Component::new("z", Some("1"));
		zlib.name = Some("zlib".into());
		zlib.version = Some("1.3".into());
		zlib.size = Some(1536.0);
		zlib.shared_in = Some(vec!["1".into(), "2".into()]);

		let nodes: Vec<Component> = std::iter::once(zlib)
			.chain((0..3).map(|i| Component::new(format!("app{}", i), Some("1"))))
			.collect();
		let links = vec![
			RawLink::new("app0", "z", None),
			RawLink::new("app1", "z", None),
			RawLink::new("z", "app2", None),
		];
		let mut state = GraphState::default();
		state.update_data(GraphPayload {
			nodes,
			links,
			sboms: Some(vec![SbomMeta {
				id: "1".into(),
				name: Some("router-fw".into()),
			}]),
			..GraphPayload::default()
		});
		state
	}

	#[test]
	fn test_component_details() {
		let state = state();
		let Some(Details::Component(d)) = details(&state, "z") else {
			panic!("expected component details");
		};
		assert_eq!(d.name, "zlib");
		assert_eq!(d.version, "1.3");
		assert_eq!(d.vendor, "N/A");
		assert_eq!(d.size, "1.5 KB");
		assert_eq!(d.kind, "unknown");
		assert_eq!(d.sbom, "router-fw");
		assert_eq!(d.shared_count, 2);
		assert_eq!(d.dependencies, 1);
		assert_eq!(d.dependents, 2);
	}

	#[test]
	fn test_cluster_details() {
		let nodes: Vec<Component> = (0..31)
			.map(|i| Component {
				kind: Some("file".into()),
				size: Some(1024.0),
				..Component::new(format!("f{}", i), Some("9"))
			})
			.collect();
		let mut state = GraphState::default();
		state.update_data(GraphPayload::new(nodes, vec![]));

		let Some(Details::Cluster(d)) = details(&state, "cluster-9-file") else {
			panic!("expected cluster details");
		};
		assert_eq!(d.component_count, 31);
		assert_eq!(d.kind, "file");
		assert_eq!(d.size, "31 KB");
		assert_eq!(d.sbom, "SBOM 9");
		assert_eq!((d.incoming, d.outgoing), (0, 0));
	}

	#[test]
	fn test_unknown_node_has_no_details() {
		assert!(details(&state(), "missing").is_none());
	}
}
