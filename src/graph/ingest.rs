//! Payload validation and normalization.
//!
//! Ingestion never fails: duplicate nodes and dangling links are dropped
//! and counted, and every other anomaly falls back to a default.

use std::collections::{HashMap, HashSet};

use log::warn;

use super::state::SbomRegistry;
use super::types::{Component, Link, LinkKind, RawLink};

/// Deduplicated nodes and resolved links.
#[derive(Clone, Debug, Default)]
pub struct Normalized {
	pub nodes: Vec<Component>,
	pub links: Vec<Link>,
	/// Nodes discarded because their id was already taken.
	pub duplicate_nodes: usize,
	/// Links discarded because an endpoint did not resolve.
	pub dangling_links: usize,
}

/// Counts reported after a payload is applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
	pub nodes: usize,
	pub links: usize,
	pub sboms: usize,
	pub new_sboms: usize,
	pub clusters: usize,
	pub duplicate_nodes: usize,
	pub dangling_links: usize,
	/// Node records that could not be read at all.
	pub malformed_nodes: usize,
	/// Link records that could not be read at all.
	pub malformed_links: usize,
}

/// Deduplicates nodes (first occurrence wins) and keeps only links whose
/// endpoints both resolve to surviving node ids.
///
/// A discarded duplicate from another SBOM is folded into the survivor's
/// `shared_in`.
pub fn normalize(raw_nodes: Vec<Component>, raw_links: Vec<RawLink>) -> Normalized {
	let mut index: HashMap<String, usize> = HashMap::with_capacity(raw_nodes.len());
	let mut nodes: Vec<Component> = Vec::with_capacity(raw_nodes.len());
	let mut duplicate_nodes = 0;

	for node in raw_nodes {
		match index.get(&node.id) {
			Some(&i) => {
				duplicate_nodes += 1;
				merge_sharing(&mut nodes[i], node.sbom_id.as_deref());
			}
			None => {
				index.insert(node.id.clone(), nodes.len());
				nodes.push(node);
			}
		}
	}

	let mut links = Vec::with_capacity(raw_links.len());
	let mut dangling_links = 0;
	for raw in raw_links {
		match (raw.source.into_id(), raw.target.into_id()) {
			(Some(source), Some(target))
				if index.contains_key(&source) && index.contains_key(&target) =>
			{
				links.push(Link::new(
					source,
					target,
					raw.sbom_id,
					LinkKind::declared(raw.kind),
				));
			}
			_ => dangling_links += 1,
		}
	}

	if duplicate_nodes > 0 || dangling_links > 0 {
		warn!(
			"sbom-graph: discarded {} duplicate nodes and {} dangling links",
			duplicate_nodes, dangling_links
		);
	}

	Normalized {
		nodes,
		links,
		duplicate_nodes,
		dangling_links,
	}
}

fn merge_sharing(survivor: &mut Component, other_sbom: Option<&str>) {
	let Some(other) = other_sbom else {
		return;
	};
	if survivor.sbom_id.as_deref() == Some(other) {
		return;
	}
	let seed: Vec<String> = survivor.sbom_id.iter().cloned().collect();
	let shared = survivor.shared_in.get_or_insert(seed);
	if !shared.iter().any(|s| s == other) {
		shared.push(other.to_string());
	}
}

/// Registers every SBOM referenced by `nodes` that has not been seen
/// before, giving it the next palette color and making it visible.
/// Returns how many SBOMs were new.
pub fn register_sboms(
	nodes: &[Component],
	registry: &mut SbomRegistry,
	visible: &mut HashSet<String>,
) -> usize {
	let mut added = 0;
	for sbom in nodes.iter().filter_map(|n| n.sbom_id.as_deref()) {
		if registry.register(sbom) {
			visible.insert(sbom.to_string());
			added += 1;
		}
	}
	added
}
