//! Wire and working-set data structures for SBOM graphs.

use std::collections::HashSet;
use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Identifier text for a wire value: strings as-is, numbers in decimal.
/// Any other shape has no identifier.
fn wire_id(value: Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s),
		Value::Number(n) => Some(number_text(&n)),
		_ => None,
	}
}

fn number_text(n: &Number) -> String {
	match (n.as_i64(), n.as_u64(), n.as_f64()) {
		(Some(i), _, _) => i.to_string(),
		(_, Some(u), _) => u.to_string(),
		(_, _, Some(f)) => f.to_string(),
		_ => n.to_string(),
	}
}

pub(crate) fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
	wire_id(Value::deserialize(d)?)
		.ok_or_else(|| D::Error::custom("expected a string or number id"))
}

pub(crate) fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
	Ok(Option::<Value>::deserialize(d)?.and_then(wire_id))
}

/// Id list; entries that are not ids are skipped, a non-list is absent.
fn de_id_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
	Ok(match Option::<Value>::deserialize(d)? {
		Some(Value::Array(items)) => Some(items.into_iter().filter_map(wire_id).collect()),
		_ => None,
	})
}

/// Optional text. Numbers are kept as their decimal text, any other shape
/// is treated as absent.
fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
	de_opt_id(d)
}

/// Optional field of type `T`; a value of the wrong shape is treated as
/// absent.
fn de_lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	Ok(Option::<Value>::deserialize(d)?.and_then(|v| serde_json::from_value(v).ok()))
}

/// Byte size as a number or numeric string.
fn de_size<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
	Ok(match Option::<Value>::deserialize(d)? {
		Some(Value::Number(n)) => n.as_f64(),
		Some(Value::String(s)) => s.trim().parse().ok(),
		_ => None,
	})
}

/// Only a literal `true` sets the flag.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
	Ok(matches!(Option::<Value>::deserialize(d)?, Some(Value::Bool(true))))
}

/// A software component (graph node).
///
/// Regular components come from the backend; cluster nodes are synthesized
/// by the cluster engine and carry `component_count`, `cluster_type` and
/// `components`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Component {
	#[serde(deserialize_with = "de_id")]
	pub id: String,
	#[serde(default, deserialize_with = "de_text")]
	pub name: Option<String>,
	#[serde(default, rename = "displayName", deserialize_with = "de_text")]
	pub display_name: Option<String>,
	#[serde(default, deserialize_with = "de_text")]
	pub version: Option<String>,
	#[serde(default, deserialize_with = "de_text")]
	pub vendor: Option<String>,
	#[serde(default, rename = "UUID", alias = "uuid", deserialize_with = "de_text")]
	pub uuid: Option<String>,
	#[serde(default, rename = "fileName", deserialize_with = "de_text")]
	pub file_name: Option<String>,
	/// Size in bytes.
	#[serde(default, deserialize_with = "de_size")]
	pub size: Option<f64>,
	#[serde(default, rename = "type", deserialize_with = "de_text")]
	pub kind: Option<String>,
	/// Owning SBOM.
	#[serde(
		default,
		alias = "sbom",
		alias = "sbomId",
		deserialize_with = "de_opt_id"
	)]
	pub sbom_id: Option<String>,
	/// Every SBOM this component appears in, in first-seen order.
	#[serde(default, deserialize_with = "de_id_list")]
	pub shared_in: Option<Vec<String>>,
	#[serde(default, rename = "isCluster", deserialize_with = "de_flag")]
	pub is_cluster: bool,
	#[serde(default, rename = "componentCount", deserialize_with = "de_lenient")]
	pub component_count: Option<usize>,
	#[serde(default, rename = "clusterType", deserialize_with = "de_text")]
	pub cluster_type: Option<String>,
	/// Member component ids of a cluster node.
	#[serde(default, deserialize_with = "de_id_list")]
	pub components: Option<Vec<String>>,
}

impl Component {
	/// Creates a bare component owned by `sbom_id`.
	pub fn new(id: impl Into<String>, sbom_id: Option<&str>) -> Self {
		Self {
			id: id.into(),
			sbom_id: sbom_id.map(str::to_string),
			..Self::default()
		}
	}

	/// Number of distinct SBOMs listed in `shared_in`.
	pub fn shared_count(&self) -> usize {
		self.shared_in
			.as_ref()
			.map(|list| list.iter().collect::<HashSet<_>>().len())
			.unwrap_or(0)
	}

	/// Whether the component appears in more than one SBOM.
	pub fn is_shared(&self) -> bool {
		self.shared_count() > 1
	}

	/// Type used for bucketing and filtering: the cluster type for cluster
	/// nodes, otherwise the component type, `"unknown"` when absent.
	pub fn type_tag(&self) -> &str {
		let tag = if self.is_cluster {
			self.cluster_type.as_deref().or(self.kind.as_deref())
		} else {
			self.kind.as_deref()
		};
		match tag {
			Some(t) if !t.is_empty() => t,
			_ => UNKNOWN_TYPE,
		}
	}

	/// Size in bytes; missing, negative or non-finite sizes count as zero.
	pub fn size_bytes(&self) -> f64 {
		match self.size {
			Some(s) if s.is_finite() && s > 0.0 => s,
			_ => 0.0,
		}
	}

	/// Whether `sbom` owns this component or lists it in `shared_in`.
	pub fn belongs_to(&self, sbom: &str) -> bool {
		self.sbom_id.as_deref() == Some(sbom)
			|| self
				.shared_in
				.as_ref()
				.is_some_and(|list| list.iter().any(|s| s == sbom))
	}
}

/// Fallback type tag for components and links without one.
pub const UNKNOWN_TYPE: &str = "unknown";

/// A link endpoint as sent by the backend: a bare id or an already
/// hydrated node object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
	Id(String),
	Number(i64),
	Float(f64),
	Node(EndpointNode),
}

/// Hydrated node reference; only the id is read.
#[derive(Clone, Debug, Deserialize)]
pub struct EndpointNode {
	#[serde(deserialize_with = "de_id")]
	pub id: String,
}

impl Endpoint {
	/// Resolves to a bare identifier. Empty ids resolve to nothing.
	pub fn into_id(self) -> Option<String> {
		let id = match self {
			Endpoint::Id(id) => id,
			Endpoint::Number(n) => n.to_string(),
			Endpoint::Float(f) => f.to_string(),
			Endpoint::Node(node) => node.id,
		};
		(!id.is_empty()).then_some(id)
	}
}

impl From<&str> for Endpoint {
	fn from(id: &str) -> Self {
		Endpoint::Id(id.to_string())
	}
}

/// A dependency edge exactly as received.
#[derive(Clone, Debug, Deserialize)]
pub struct RawLink {
	pub source: Endpoint,
	pub target: Endpoint,
	#[serde(
		default,
		alias = "sbom",
		alias = "sbomId",
		deserialize_with = "de_opt_id"
	)]
	pub sbom_id: Option<String>,
	#[serde(
		default,
		rename = "type",
		alias = "relationship",
		deserialize_with = "de_text"
	)]
	pub kind: Option<String>,
}

impl RawLink {
	/// Creates a link between two bare ids.
	pub fn new(source: &str, target: &str, sbom_id: Option<&str>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			sbom_id: sbom_id.map(str::to_string),
			kind: None,
		}
	}
}

/// SBOM metadata attached to a graph payload.
#[derive(Clone, Debug, Deserialize)]
pub struct SbomMeta {
	#[serde(deserialize_with = "de_id")]
	pub id: String,
	#[serde(default, deserialize_with = "de_text")]
	pub name: Option<String>,
}

/// Complete payload from `GET /graph`.
///
/// Records are decoded one by one: a node, link or SBOM entry that cannot
/// be read (no usable id or endpoint) is skipped and counted, the rest of
/// the payload still loads.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "WirePayload")]
pub struct GraphPayload {
	pub nodes: Vec<Component>,
	pub links: Vec<RawLink>,
	pub sboms: Option<Vec<SbomMeta>>,
	/// Node records skipped while decoding.
	pub malformed_nodes: usize,
	/// Link records skipped while decoding.
	pub malformed_links: usize,
}

impl GraphPayload {
	pub fn new(nodes: Vec<Component>, links: Vec<RawLink>) -> Self {
		Self {
			nodes,
			links,
			..Self::default()
		}
	}
}

#[derive(Deserialize)]
struct WirePayload {
	#[serde(default)]
	nodes: Value,
	#[serde(default)]
	links: Value,
	#[serde(default)]
	sboms: Value,
}

impl From<WirePayload> for GraphPayload {
	fn from(wire: WirePayload) -> Self {
		let (nodes, malformed_nodes) = decode_records(wire.nodes);
		let (links, malformed_links) = decode_records(wire.links);
		let sboms = match wire.sboms {
			Value::Null => None,
			other => Some(decode_records(other).0),
		};
		Self {
			nodes,
			links,
			sboms,
			malformed_nodes,
			malformed_links,
		}
	}
}

/// Decodes each element of a JSON array, returning the readable records and
/// how many were skipped. Anything but an array yields no records.
fn decode_records<T: DeserializeOwned>(value: Value) -> (Vec<T>, usize) {
	let Value::Array(items) = value else {
		return (Vec::new(), 0);
	};
	let total = items.len();
	let records: Vec<T> = items
		.into_iter()
		.filter_map(|item| serde_json::from_value(item).ok())
		.collect();
	let skipped = total - records.len();
	(records, skipped)
}

/// Kind of a working-set link.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
	/// Relationship declared by the SBOM (`"unknown"` when absent).
	Declared(String),
	ClusterToNode,
	NodeToCluster,
	ClusterToCluster,
	CrossSbom,
}

impl LinkKind {
	/// Normalizes an optional wire tag.
	pub fn declared(tag: Option<String>) -> Self {
		match tag {
			Some(t) if !t.is_empty() => LinkKind::Declared(t),
			_ => LinkKind::Declared(UNKNOWN_TYPE.to_string()),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			LinkKind::Declared(tag) => tag,
			LinkKind::ClusterToNode => "cluster-to-node",
			LinkKind::NodeToCluster => "node-to-cluster",
			LinkKind::ClusterToCluster => "cluster-to-cluster",
			LinkKind::CrossSbom => "cross-sbom",
		}
	}
}

impl fmt::Display for LinkKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated link whose endpoints are node ids in the working set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
	pub source: String,
	pub target: String,
	pub sbom_id: Option<String>,
	pub kind: LinkKind,
	/// Set on cross-SBOM links only.
	pub source_sbom: Option<String>,
	/// Set on cross-SBOM links only.
	pub target_sbom: Option<String>,
}

impl Link {
	pub fn new(
		source: impl Into<String>,
		target: impl Into<String>,
		sbom_id: Option<String>,
		kind: LinkKind,
	) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			sbom_id,
			kind,
			source_sbom: None,
			target_sbom: None,
		}
	}

	/// Whether either endpoint is `id`.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_component_accepts_numeric_ids_and_aliases() {
		let node: Component = serde_json::from_str(
			r#"{"id": 7, "name": "zlib", "sbom": 2, "shared_in": [1, "2"], "type": "library"}"#,
		)
		.unwrap();
		assert_eq!(node.id, "7");
		assert_eq!(node.sbom_id.as_deref(), Some("2"));
		assert_eq!(node.shared_in, Some(vec!["1".to_string(), "2".to_string()]));
		assert_eq!(node.type_tag(), "library");
		assert!(node.is_shared());
	}

	#[test]
	fn test_cluster_fields_deserialize() {
		let node: Component = serde_json::from_str(
			r#"{"id": "c", "isCluster": true, "componentCount": 3, "clusterType": "file", "components": ["a", "b", "d"]}"#,
		)
		.unwrap();
		assert!(node.is_cluster);
		assert_eq!(node.component_count, Some(3));
		assert_eq!(node.type_tag(), "file");
	}

	#[test]
	fn test_endpoint_shapes_resolve_to_ids() {
		let link: RawLink =
			serde_json::from_str(r#"{"source": {"id": "a", "x": 1.5}, "target": 12}"#).unwrap();
		assert_eq!(link.source.into_id().as_deref(), Some("a"));
		assert_eq!(link.target.into_id().as_deref(), Some("12"));
		assert_eq!(Endpoint::from("").into_id(), None);
	}

	#[test]
	fn test_wrong_typed_optional_fields_fall_back() {
		let node: Component = serde_json::from_str(
			r#"{"id": "a", "sbom_id": 1, "version": 1.2, "vendor": ["Acme"], "size": {"bytes": 3},
			"isCluster": null, "componentCount": "many", "name": false, "shared_in": "1"}"#,
		)
		.unwrap();
		assert_eq!(node.version.as_deref(), Some("1.2"));
		assert_eq!(node.vendor, None);
		assert_eq!(node.size, None);
		assert!(!node.is_cluster);
		assert_eq!(node.component_count, None);
		assert_eq!(node.name, None);
		assert_eq!(node.shared_in, None);
		assert_eq!(node.sbom_id.as_deref(), Some("1"));

		let node: Component = serde_json::from_str(r#"{"id": "b", "size": "1024"}"#).unwrap();
		assert_eq!(node.size_bytes(), 1024.0);
	}

	#[test]
	fn test_float_endpoint_resolves() {
		let link: RawLink = serde_json::from_str(r#"{"source": 1.5, "target": 2.0}"#).unwrap();
		assert_eq!(link.source.into_id().as_deref(), Some("1.5"));
		assert_eq!(link.target.into_id().as_deref(), Some("2"));
	}

	#[test]
	fn test_unreadable_records_are_skipped_and_counted() {
		let payload: GraphPayload = serde_json::from_str(
			r#"{
				"nodes": [{"id": "a"}, {"name": "no id"}, {"id": null}, "junk", {"id": "b"}],
				"links": [{"source": "a", "target": "b"}, {"source": null, "target": "b"}, {"target": "a"}],
				"sboms": [{"id": 1, "name": "fw"}, {"name": "orphan"}]
			}"#,
		)
		.unwrap();
		let ids: Vec<&str> = payload.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b"]);
		assert_eq!(payload.malformed_nodes, 3);
		assert_eq!(payload.links.len(), 1);
		assert_eq!(payload.malformed_links, 2);
		assert_eq!(payload.sboms.map(|s| s.len()), Some(1));
	}

	#[test]
	fn test_missing_or_odd_sections_are_empty() {
		let payload: GraphPayload = serde_json::from_str(r#"{"nodes": {"a": 1}}"#).unwrap();
		assert!(payload.nodes.is_empty());
		assert!(payload.links.is_empty());
		assert!(payload.sboms.is_none());
		assert_eq!(payload.malformed_nodes, 0);
	}

	#[test]
	fn test_shared_count_ignores_repeats() {
		let mut node = Component::new("x", Some("1"));
		node.shared_in = Some(vec!["1".into(), "1".into()]);
		assert_eq!(node.shared_count(), 1);
		assert!(!node.is_shared());
		assert!(node.belongs_to("1"));
		assert!(!node.belongs_to("2"));
	}

	#[test]
	fn test_size_defaults_to_zero() {
		let mut node = Component::new("x", None);
		assert_eq!(node.size_bytes(), 0.0);
		node.size = Some(f64::NAN);
		assert_eq!(node.size_bytes(), 0.0);
		node.size = Some(2048.0);
		assert_eq!(node.size_bytes(), 2048.0);
	}

	#[test]
	fn test_link_kind_tags() {
		assert_eq!(LinkKind::declared(None).as_str(), "unknown");
		assert_eq!(LinkKind::declared(Some("CONTAINS".into())).as_str(), "CONTAINS");
		assert_eq!(LinkKind::CrossSbom.to_string(), "cross-sbom");
	}
}
