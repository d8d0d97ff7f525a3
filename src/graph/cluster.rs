//! Collapsing large SBOMs into per-type cluster nodes, and expanding them
//! back on demand.
//!
//! For every SBOM with more components than the configured threshold, the
//! components that matter for cross-SBOM reading stay individual:
//!
//! - shared components (listed in more than one SBOM),
//! - endpoints of links between two different SBOMs,
//! - components with more incident links than the degree threshold.
//!
//! Everything else is bucketed by type, and each bucket becomes a single
//! synthetic node with id `cluster-<sbom>-<type>`. Links are rewritten so that
//! connectivity to the individual components survives.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::ClusterConfig;
use crate::error::ClusterError;

use super::types::{Component, Link, LinkKind};

/// Working set produced by [`cluster`].
#[derive(Clone, Debug, Default)]
pub struct Clustered {
	pub nodes: Vec<Component>,
	pub links: Vec<Link>,
	/// Number of cluster nodes synthesized.
	pub clusters: usize,
}

/// Working set produced by [`expand`].
#[derive(Clone, Debug, Default)]
pub struct Expansion {
	pub nodes: Vec<Component>,
	pub links: Vec<Link>,
	/// Member components put back into the working set.
	pub restored: usize,
}

/// Identifier of the cluster holding `kind` components of `sbom`.
pub fn cluster_id(sbom: &str, kind: &str) -> String {
	format!("cluster-{}-{}", sbom, kind)
}

/// Clusters every oversized SBOM in `nodes`.
///
/// SBOMs at or under the threshold and components without an SBOM pass
/// through untouched, as do links between unclustered components.
pub fn cluster(
	nodes: &[Component],
	links: &[Link],
	config: &ClusterConfig,
) -> Result<Clustered, ClusterError> {
	let passthrough = || Clustered {
		nodes: nodes.to_vec(),
		links: links.to_vec(),
		clusters: 0,
	};
	if !config.enabled {
		return Ok(passthrough());
	}

	let mut per_sbom: HashMap<&str, usize> = HashMap::new();
	for sbom in nodes.iter().filter_map(|n| n.sbom_id.as_deref()) {
		*per_sbom.entry(sbom).or_insert(0) += 1;
	}
	let oversized: HashSet<&str> = per_sbom
		.into_iter()
		.filter(|&(_, count)| count > config.threshold)
		.map(|(sbom, _)| sbom)
		.collect();
	if oversized.is_empty() {
		return Ok(passthrough());
	}

	let sbom_of = sbom_index(nodes);
	let important = important_nodes(nodes, links, &sbom_of, config.degree_threshold);

	let mut kept = Vec::with_capacity(nodes.len());
	let mut buckets: BTreeMap<(&str, &str), Vec<&Component>> = BTreeMap::new();
	for node in nodes {
		match node.sbom_id.as_deref() {
			Some(sbom) if oversized.contains(sbom) && !important.contains(node.id.as_str()) => {
				buckets
					.entry((sbom, node.type_tag()))
					.or_default()
					.push(node);
			}
			_ => kept.push(node.clone()),
		}
	}

	let mut folded: HashMap<&str, String> = HashMap::new();
	let mut emitted: HashSet<String> = HashSet::new();
	let clusters = buckets.len();
	for ((sbom, kind), members) in buckets {
		let id = cluster_id(sbom, kind);
		// `cluster-a-b-c` is both (a-b, c) and (a, b-c).
		if sbom_of.contains_key(id.as_str()) || !emitted.insert(id.clone()) {
			return Err(ClusterError::IdCollision(id));
		}
		for member in &members {
			folded.insert(member.id.as_str(), id.clone());
		}
		kept.push(cluster_node(id, sbom, kind, &members));
	}

	let mut rewritten = HashSet::new();
	let mut out_links = Vec::with_capacity(links.len());
	for link in links {
		let (source, target) = (folded.get(link.source.as_str()), folded.get(link.target.as_str()));
		if source.is_none() && target.is_none() {
			out_links.push(link.clone());
			continue;
		}
		if let Some(new_link) = rewrite_link(link, source, target, &sbom_of) {
			if rewritten.insert(new_link.clone()) {
				out_links.push(new_link);
			}
		}
	}

	Ok(Clustered {
		nodes: kept,
		links: out_links,
		clusters,
	})
}

fn sbom_index(nodes: &[Component]) -> HashMap<&str, Option<&str>> {
	nodes
		.iter()
		.map(|n| (n.id.as_str(), n.sbom_id.as_deref()))
		.collect()
}

/// Ids exempt from clustering: shared, cross-SBOM linked or high degree.
fn important_nodes<'a>(
	nodes: &'a [Component],
	links: &'a [Link],
	sbom_of: &HashMap<&str, Option<&str>>,
	degree_threshold: usize,
) -> HashSet<&'a str> {
	let mut important: HashSet<&str> = nodes
		.iter()
		.filter(|n| n.is_shared())
		.map(|n| n.id.as_str())
		.collect();

	let mut degree: HashMap<&str, usize> = HashMap::new();
	for link in links {
		*degree.entry(link.source.as_str()).or_insert(0) += 1;
		*degree.entry(link.target.as_str()).or_insert(0) += 1;

		let source_sbom = sbom_of.get(link.source.as_str()).copied().flatten();
		let target_sbom = sbom_of.get(link.target.as_str()).copied().flatten();
		if crosses_sboms(source_sbom, target_sbom) {
			important.insert(link.source.as_str());
			important.insert(link.target.as_str());
		}
	}

	important.extend(
		degree
			.into_iter()
			.filter(|&(_, d)| d > degree_threshold)
			.map(|(id, _)| id),
	);
	important
}

fn crosses_sboms(a: Option<&str>, b: Option<&str>) -> bool {
	matches!((a, b), (Some(a), Some(b)) if a != b)
}

fn cluster_node(id: String, sbom: &str, kind: &str, members: &[&Component]) -> Component {
	Component {
		name: Some(format!("{} {} components", members.len(), kind)),
		size: Some(members.iter().map(|m| m.size_bytes()).sum()),
		kind: Some(kind.to_string()),
		is_cluster: true,
		component_count: Some(members.len()),
		cluster_type: Some(kind.to_string()),
		components: Some(members.iter().map(|m| m.id.clone()).collect()),
		..Component::new(id, Some(sbom))
	}
}

/// Rewrites a link with at least one folded endpoint. Links inside a
/// single cluster are absorbed and yield `None`.
fn rewrite_link(
	link: &Link,
	source_cluster: Option<&String>,
	target_cluster: Option<&String>,
	sbom_of: &HashMap<&str, Option<&str>>,
) -> Option<Link> {
	if source_cluster.is_some() && source_cluster == target_cluster {
		return None;
	}

	let source = source_cluster.unwrap_or(&link.source).clone();
	let target = target_cluster.unwrap_or(&link.target).clone();
	let source_sbom = sbom_of.get(link.source.as_str()).copied().flatten();
	let target_sbom = sbom_of.get(link.target.as_str()).copied().flatten();

	if crosses_sboms(source_sbom, target_sbom) {
		return Some(Link {
			source_sbom: source_sbom.map(str::to_string),
			target_sbom: target_sbom.map(str::to_string),
			..Link::new(source, target, link.sbom_id.clone(), LinkKind::CrossSbom)
		});
	}

	let kind = match (source_cluster.is_some(), target_cluster.is_some()) {
		(true, true) => LinkKind::ClusterToCluster,
		(true, false) => LinkKind::ClusterToNode,
		_ => LinkKind::NodeToCluster,
	};
	let sbom_id = link
		.sbom_id
		.clone()
		.or_else(|| source_sbom.map(str::to_string));
	Some(Link::new(source, target, sbom_id, kind))
}

/// Replaces the cluster `cluster_id` with its member components.
///
/// Restores exactly the ids recorded in the cluster's `components`, the
/// original links among them, and the original links from them to nodes
/// currently present. A link to a component folded into another present
/// cluster is re-attached to that cluster. Other clusters stay collapsed.
pub fn expand(
	current_nodes: &[Component],
	current_links: &[Link],
	original_nodes: &[Component],
	original_links: &[Link],
	cluster_id: &str,
) -> Result<Expansion, ClusterError> {
	let cluster = current_nodes
		.iter()
		.find(|n| n.id == cluster_id)
		.ok_or_else(|| ClusterError::UnknownNode(cluster_id.to_string()))?;
	if !cluster.is_cluster {
		return Err(ClusterError::NotACluster(cluster_id.to_string()));
	}

	let mut nodes: Vec<Component> = current_nodes
		.iter()
		.filter(|n| n.id != cluster_id)
		.cloned()
		.collect();
	let present: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();

	let mut folded: HashMap<&str, &str> = HashMap::new();
	for other in current_nodes.iter().filter(|n| n.is_cluster && n.id != cluster_id) {
		for member in other.components.iter().flatten() {
			folded.insert(member.as_str(), other.id.as_str());
		}
	}

	let originals: HashMap<&str, &Component> =
		original_nodes.iter().map(|n| (n.id.as_str(), n)).collect();
	let mut restored: HashSet<&str> = HashSet::new();
	for member in cluster.components.iter().flatten() {
		if present.contains(member) || restored.contains(member.as_str()) {
			continue;
		}
		if let Some(original) = originals.get(member.as_str()) {
			nodes.push((*original).clone());
			restored.insert(member.as_str());
		}
	}

	let mut links: Vec<Link> = current_links
		.iter()
		.filter(|l| !l.touches(cluster_id))
		.cloned()
		.collect();
	let mut seen: HashSet<Link> = links.iter().cloned().collect();
	let mut push = |link: Link| {
		if seen.insert(link.clone()) {
			links.push(link);
		}
	};

	for link in original_links {
		let source_in = restored.contains(link.source.as_str());
		let target_in = restored.contains(link.target.as_str());
		if !source_in && !target_in {
			continue;
		}
		let other = if source_in { &link.target } else { &link.source };
		if (source_in && target_in) || present.contains(other) {
			push(link.clone());
		} else if let Some(&owner) = folded.get(other.as_str()) {
			let (source, target, kind) = if source_in {
				(link.source.clone(), owner.to_string(), LinkKind::NodeToCluster)
			} else {
				(owner.to_string(), link.target.clone(), LinkKind::ClusterToNode)
			};
			push(Link::new(source, target, link.sbom_id.clone(), kind));
		}
	}

	Ok(Expansion {
		nodes,
		links,
		restored: restored.len(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn component(id: &str, sbom: &str, kind: &str) -> Component {
		Component {
			kind: Some(kind.to_string()),
			size: Some(100.0),
			..Component::new(id, Some(sbom))
		}
	}

	fn link(source: &str, target: &str) -> Link {
		Link::new(source, target, None, LinkKind::declared(None))
	}

	fn config() -> ClusterConfig {
		ClusterConfig::default()
	}

	fn libraries(sbom: &str, count: usize) -> Vec<Component> {
		(0..count)
			.map(|i| component(&format!("{}-lib-{}", sbom, i), sbom, "library"))
			.collect()
	}

	#[test]
	fn test_fifty_regular_libraries_become_one_cluster() {
		let nodes = libraries("1", 50);
		let out = cluster(&nodes, &[], &config()).unwrap();

		assert_eq!(out.clusters, 1);
		assert_eq!(out.nodes.len(), 1);
		let c = &out.nodes[0];
		assert!(c.is_cluster);
		assert_eq!(c.id, "cluster-1-library");
		assert_eq!(c.component_count, Some(50));
		assert_eq!(c.name.as_deref(), Some("50 library components"));
		assert_eq!(c.size, Some(5000.0));
		assert_eq!(c.sbom_id.as_deref(), Some("1"));
	}

	#[test]
	fn test_at_threshold_is_untouched() {
		let nodes = libraries("1", 30);
		let links = vec![link("1-lib-0", "1-lib-1")];
		let out = cluster(&nodes, &links, &config()).unwrap();
		assert_eq!(out.clusters, 0);
		assert_eq!(out.nodes, nodes);
		assert_eq!(out.links, links);
	}

	#[test]
	fn test_disabled_is_untouched() {
		let nodes = libraries("1", 80);
		let disabled = ClusterConfig {
			enabled: false,
			..config()
		};
		let out = cluster(&nodes, &[], &disabled).unwrap();
		assert_eq!(out.nodes.len(), 80);
	}

	#[test]
	fn test_important_nodes_stay_and_rest_is_partitioned() {
		let mut nodes = libraries("1", 20);
		nodes.extend((0..15).map(|i| component(&format!("1-file-{}", i), "1", "file")));
		nodes.push(component("1-untyped", "1", ""));

		let mut shared = component("1-shared", "1", "library");
		shared.shared_in = Some(vec!["1".into(), "2".into()]);
		nodes.push(shared);
		nodes.push(component("1-hub", "1", "library"));
		nodes.push(component("1-bridge", "1", "library"));
		nodes.push(component("2-a", "2", "library"));

		let mut links: Vec<Link> = (0..6).map(|i| link("1-hub", &format!("1-file-{}", i))).collect();
		links.push(link("1-bridge", "2-a"));

		let out = cluster(&nodes, &links, &config()).unwrap();

		let individual: HashSet<&str> = out
			.nodes
			.iter()
			.filter(|n| !n.is_cluster)
			.map(|n| n.id.as_str())
			.collect();
		let expected: HashSet<&str> = ["1-shared", "1-hub", "1-bridge", "2-a"].into_iter().collect();
		assert_eq!(individual, expected);

		let mut members: Vec<&str> = out
			.nodes
			.iter()
			.filter(|n| n.is_cluster)
			.flat_map(|n| n.components.iter().flatten().map(String::as_str))
			.collect();
		let total = members.len();
		members.sort_unstable();
		members.dedup();
		assert_eq!(total, members.len(), "member listed twice");
		assert_eq!(total, 36);

		let cluster_ids: Vec<&str> = out
			.nodes
			.iter()
			.filter(|n| n.is_cluster)
			.map(|n| n.id.as_str())
			.collect();
		assert_eq!(
			cluster_ids,
			vec!["cluster-1-file", "cluster-1-library", "cluster-1-unknown"]
		);
	}

	#[test]
	fn test_links_rewritten_to_clusters() {
		let mut nodes = libraries("1", 31);
		nodes.push(component("hub", "1", "file"));
		nodes.push(component("other-file", "1", "file"));

		let mut links: Vec<Link> = (0..6).map(|i| link(&format!("1-lib-{}", i), "hub")).collect();
		links.push(link("1-lib-0", "1-lib-1"));
		links.push(link("1-lib-2", "other-file"));

		let out = cluster(&nodes, &links, &config()).unwrap();

		let kinds: Vec<(&str, &str, &str)> = out
			.links
			.iter()
			.map(|l| (l.source.as_str(), l.target.as_str(), l.kind.as_str()))
			.collect();
		assert_eq!(
			kinds,
			vec![
				("cluster-1-library", "hub", "cluster-to-node"),
				("cluster-1-library", "cluster-1-file", "cluster-to-cluster"),
			]
		);
	}

	#[test]
	fn test_cross_sbom_rewrite_tags_both_sboms() {
		let nodes = vec![component("a", "1", "library"), component("b", "2", "library")];
		let sbom_of = sbom_index(&nodes);
		let cluster = "cluster-1-library".to_string();

		let out = rewrite_link(&link("a", "b"), Some(&cluster), None, &sbom_of).unwrap();
		assert_eq!(out.kind, LinkKind::CrossSbom);
		assert_eq!(out.source, "cluster-1-library");
		assert_eq!(out.target, "b");
		assert_eq!(out.source_sbom.as_deref(), Some("1"));
		assert_eq!(out.target_sbom.as_deref(), Some("2"));

		assert!(rewrite_link(&link("a", "a"), Some(&cluster), Some(&cluster), &sbom_of).is_none());
	}

	#[test]
	fn test_id_collision_is_an_error() {
		let mut nodes = libraries("1", 40);
		nodes.push(component("cluster-1-library", "2", "library"));
		let err = cluster(&nodes, &[], &config()).unwrap_err();
		assert_eq!(err, ClusterError::IdCollision("cluster-1-library".into()));
	}

	#[test]
	fn test_ambiguous_cluster_ids_are_an_error() {
		let mut nodes: Vec<Component> = (0..31)
			.map(|i| component(&format!("ab-{}", i), "a-b", "c"))
			.collect();
		nodes.extend((0..31).map(|i| component(&format!("a-{}", i), "a", "b-c")));
		let err = cluster(&nodes, &[], &config()).unwrap_err();
		assert_eq!(err, ClusterError::IdCollision("cluster-a-b-c".into()));
	}

	#[test]
	fn test_expand_restores_exactly_members() {
		let mut nodes = libraries("1", 35);
		nodes.push(component("hub", "1", "file"));
		let mut links: Vec<Link> = (0..6).map(|i| link(&format!("1-lib-{}", i), "hub")).collect();
		links.push(link("1-lib-10", "1-lib-11"));

		let clustered = cluster(&nodes, &links, &config()).unwrap();
		let target = clustered
			.nodes
			.iter()
			.find(|n| n.id == "cluster-1-library")
			.unwrap();
		let recorded: HashSet<String> = target.components.clone().unwrap().into_iter().collect();

		let out = expand(&clustered.nodes, &clustered.links, &nodes, &links, "cluster-1-library").unwrap();

		assert_eq!(out.restored, recorded.len());
		assert!(out.nodes.iter().all(|n| n.id != "cluster-1-library"));
		let ids: HashSet<String> = out.nodes.iter().map(|n| n.id.clone()).collect();
		let expected: HashSet<String> = recorded.iter().cloned().chain(["hub".to_string()]).collect();
		assert_eq!(ids, expected);

		assert!(out.links.iter().all(|l| !l.touches("cluster-1-library")));
		assert!(out.links.contains(&link("1-lib-10", "1-lib-11")));
		assert_eq!(out.links.iter().filter(|l| l.target == "hub").count(), 6);
	}

	#[test]
	fn test_expand_reattaches_to_other_cluster() {
		let mut nodes = libraries("1", 20);
		nodes.extend((0..20).map(|i| component(&format!("1-file-{}", i), "1", "file")));
		let links = vec![link("1-lib-0", "1-file-0")];

		let clustered = cluster(&nodes, &links, &config()).unwrap();
		assert_eq!(clustered.clusters, 2);

		let out = expand(&clustered.nodes, &clustered.links, &nodes, &links, "cluster-1-library").unwrap();
		assert_eq!(out.restored, 20);
		assert!(out.nodes.iter().any(|n| n.id == "cluster-1-file"));
		assert_eq!(
			out.links,
			vec![Link::new("1-lib-0", "cluster-1-file", None, LinkKind::NodeToCluster)]
		);
	}

	#[test]
	fn test_expand_rejects_non_clusters() {
		let nodes = vec![component("a", "1", "library")];
		assert_eq!(
			expand(&nodes, &[], &nodes, &[], "a").unwrap_err(),
			ClusterError::NotACluster("a".into())
		);
		assert_eq!(
			expand(&nodes, &[], &nodes, &[], "zzz").unwrap_err(),
			ClusterError::UnknownNode("zzz".into())
		);
	}
}
