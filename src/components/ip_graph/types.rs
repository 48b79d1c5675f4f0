use std::fmt;

use log::debug;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Node labels longer than this are cut and suffixed with an ellipsis.
pub const LABEL_MAX_CHARS: usize = 15;
const TOOLTIP_OWNER_CHARS: usize = 10;

/// Position or velocity in graph coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
	/// Horizontal component.
	pub x: f64,
	/// Vertical component.
	pub y: f64,
}

impl Point {
	/// Point at (`x`, `y`).
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance.
	pub fn distance(self, other: Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}
}

/// Why a node is part of the graph. Drives radius and fill color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
	/// The queried asset.
	Root,
	/// An asset the root is derived from.
	Parent,
	/// An asset derived from the root.
	Child,
	/// Derived from a related asset.
	Derivative,
}

impl NodeRole {
	/// Every role, in legend order.
	pub const ALL: [NodeRole; 4] = [
		NodeRole::Root,
		NodeRole::Parent,
		NodeRole::Child,
		NodeRole::Derivative,
	];

	/// Base radius in px.
	pub fn radius(self) -> f64 {
		match self {
			NodeRole::Root => 22.0,
			NodeRole::Parent => 18.0,
			NodeRole::Child => 16.0,
			NodeRole::Derivative => 14.0,
		}
	}

	/// Fill color.
	pub fn color(self) -> &'static str {
		match self {
			NodeRole::Root => "#667eea",
			NodeRole::Parent => "#10b981",
			NodeRole::Child => "#f59e0b",
			NodeRole::Derivative => "#ef4444",
		}
	}

	/// Lowercase name as shown in tooltips.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeRole::Root => "root",
			NodeRole::Parent => "parent",
			NodeRole::Child => "child",
			NodeRole::Derivative => "derivative",
		}
	}
}

impl fmt::Display for NodeRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Styling class of an edge. Unknown relationship tags render as `License`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
	/// `parent` records.
	Parent,
	/// `derivative` records.
	Derivative,
	/// License and any unknown record type.
	License,
}

impl EdgeKind {
	/// Every kind, in legend order.
	pub const ALL: [EdgeKind; 3] = [EdgeKind::Parent, EdgeKind::Derivative, EdgeKind::License];

	/// Kind for a relationship `type` tag.
	pub fn from_tag(tag: &str) -> Self {
		match tag {
			"parent" => EdgeKind::Parent,
			"derivative" => EdgeKind::Derivative,
			_ => EdgeKind::License,
		}
	}

	/// Stroke color.
	pub fn color(self) -> &'static str {
		match self {
			EdgeKind::Parent => "#10b981",
			EdgeKind::Derivative => "#ef4444",
			EdgeKind::License => "#3b82f6",
		}
	}

	/// Lowercase name.
	pub fn as_str(self) -> &'static str {
		match self {
			EdgeKind::Parent => "parent",
			EdgeKind::Derivative => "derivative",
			EdgeKind::License => "license",
		}
	}
}

/// Metadata for the queried asset. Every field may be missing upstream.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RootData {
	/// Display name.
	#[serde(default, deserialize_with = "lenient_text")]
	pub name: Option<String>,
	/// Owner address.
	#[serde(default, deserialize_with = "lenient_text")]
	pub owner: Option<String>,
	/// Revenue; invalid amounts become zero.
	#[serde(default, deserialize_with = "lenient_number")]
	pub revenue: Option<f64>,
}

impl RootData {
	/// Root data with only a name.
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}
}

/// One relationship as delivered by whichever upstream client produced it.
///
/// `type`, `source` and `target` are required in principle; a missing or
/// non-string value decodes to an empty string and the record is skipped
/// during graph building. Numeric fields accept numbers or numeric strings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RelationshipRecord {
	/// Relationship type tag (`parent`, `derivative`, `license`, ...).
	#[serde(rename = "type", default, deserialize_with = "lenient_id")]
	pub kind: String,
	/// Id the relationship starts at.
	#[serde(default, deserialize_with = "lenient_id")]
	pub source: String,
	/// Id the relationship points to.
	#[serde(default, deserialize_with = "lenient_id")]
	pub target: String,
	/// Display name of the related asset.
	#[serde(default, deserialize_with = "lenient_text")]
	pub name: Option<String>,
	/// Owner of the related asset.
	#[serde(default, deserialize_with = "lenient_text")]
	pub owner: Option<String>,
	/// Revenue on this relationship.
	#[serde(default, deserialize_with = "lenient_number")]
	pub revenue: Option<f64>,
	/// Derivative count of the related asset.
	#[serde(default, deserialize_with = "lenient_number")]
	pub derivatives: Option<f64>,
}

impl RelationshipRecord {
	/// Record with only the required fields.
	pub fn new(kind: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			source: source.into(),
			target: target.into(),
			..Self::default()
		}
	}

	/// Set `name`.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Set `owner`.
	pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
		self.owner = Some(owner.into());
		self
	}

	/// Set `revenue`.
	pub fn with_revenue(mut self, revenue: f64) -> Self {
		self.revenue = Some(revenue);
		self
	}

	/// Set `derivatives`.
	pub fn with_derivatives(mut self, derivatives: f64) -> Self {
		self.derivatives = Some(derivatives);
		self
	}

	/// Whether this record is a `derivative` relationship.
	pub fn is_derivative(&self) -> bool {
		self.kind == "derivative"
	}
}

/// A relationship array as received from upstream. Entries that are not
/// records at all (`null`, numbers, strings) are skipped.
#[derive(Clone, Debug, Default)]
pub struct RelationshipList(pub Vec<RelationshipRecord>);

impl<'de> Deserialize<'de> for RelationshipList {
	fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Entry {
			Record(RelationshipRecord),
			Other(IgnoredAny),
		}

		let entries = Vec::<Entry>::deserialize(de)?;
		let total = entries.len();
		let records: Vec<_> = entries
			.into_iter()
			.filter_map(|entry| match entry {
				Entry::Record(record) => Some(record),
				Entry::Other(_) => None,
			})
			.collect();
		if records.len() < total {
			debug!("skipped {} relationship entries that are not records", total - records.len());
		}
		Ok(Self(records))
	}
}

/// An asset on the canvas.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	/// Asset id, unique within a graph.
	pub id: String,
	/// Full name; labels truncate it.
	pub display_name: String,
	/// Why the node is shown.
	pub role: NodeRole,
	/// Owner address or "Unknown".
	pub owner: String,
	/// Always finite and non-negative; zero when unknown.
	pub revenue: f64,
	/// Number of derivatives of this asset.
	pub derivative_count: u32,
	/// Written by the layout engine only.
	pub position: Point,
	/// Per-tick velocity, owned by the layout.
	#[serde(skip)]
	pub velocity: Point,
	/// Set while the node is dragged; the layout never moves a pinned node.
	pub pinned: Option<Point>,
}

impl GraphNode {
	/// Node at the origin with zero revenue.
	pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: NodeRole) -> Self {
		Self {
			id: id.into(),
			display_name: display_name.into(),
			role,
			owner: "Unknown".into(),
			revenue: 0.0,
			derivative_count: 0,
			position: Point::default(),
			velocity: Point::default(),
			pinned: None,
		}
	}

	/// Radius for its role.
	pub fn radius(&self) -> f64 {
		self.role.radius()
	}

	/// Canvas label.
	pub fn label(&self) -> String {
		truncate(&self.display_name, LABEL_MAX_CHARS)
	}

	/// Revenue text, only for positive revenue.
	pub fn revenue_label(&self) -> Option<String> {
		(self.revenue > 0.0).then(|| format!("${:.1}", self.revenue))
	}

	/// Multi-line hover tooltip.
	pub fn tooltip(&self) -> String {
		let name = if self.display_name.is_empty() {
			self.id.as_str()
		} else {
			self.display_name.as_str()
		};
		format!(
			"{}\nOwner: {}\nType: {}\nRevenue: ${}\nDerivatives: {}",
			name,
			truncate(&self.owner, TOOLTIP_OWNER_CHARS),
			self.role,
			self.revenue,
			self.derivative_count,
		)
	}
}

/// A relationship between two nodes.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
	/// Id of the source node.
	pub source_id: String,
	/// Id of the target node.
	pub target_id: String,
	/// Styling class.
	pub kind: EdgeKind,
	/// Relationship type exactly as received, shown in tooltips.
	pub tag: String,
	/// Revenue carried by the relationship.
	pub weight: f64,
}

impl GraphEdge {
	/// Thinnest stroke in px.
	pub const MIN_WIDTH: f64 = 1.0;
	/// Thickest stroke in px.
	pub const MAX_WIDTH: f64 = 6.0;

	/// Stroke width from the weight.
	pub fn stroke_width(&self) -> f64 {
		(self.weight / 20.0).clamp(Self::MIN_WIDTH, Self::MAX_WIDTH)
	}

	/// Whether `id` is either endpoint.
	pub fn touches(&self, id: &str) -> bool {
		self.source_id == id || self.target_id == id
	}
}

/// Nodes and edges of one build. The root is always `nodes[0]`.
#[derive(Clone, Debug, Default)]
pub struct GraphData {
	/// Deduplicated nodes.
	pub nodes: Vec<GraphNode>,
	/// Edges between existing nodes.
	pub edges: Vec<GraphEdge>,
}

impl GraphData {
	/// Node with `id`.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// The root node.
	pub fn root(&self) -> Option<&GraphNode> {
		self.nodes.iter().find(|node| node.role == NodeRole::Root)
	}

	/// Counts and revenue totals.
	pub fn summary(&self) -> GraphSummary {
		let mut summary = GraphSummary {
			edges: self.edges.len(),
			..GraphSummary::default()
		};
		for node in &self.nodes {
			match node.role {
				NodeRole::Root => summary.roots += 1,
				NodeRole::Parent => summary.parents += 1,
				NodeRole::Child => summary.children += 1,
				NodeRole::Derivative => summary.derivatives += 1,
			}
			summary.total_revenue += node.revenue;
		}
		summary
	}
}

/// Aggregate counts for details panels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
	/// Root nodes.
	pub roots: usize,
	/// Parent nodes.
	pub parents: usize,
	/// Child nodes.
	pub children: usize,
	/// Derivative nodes.
	pub derivatives: usize,
	/// Edges.
	pub edges: usize,
	/// Revenue summed over all nodes.
	pub total_revenue: f64,
}

/// Clamp an upstream amount to a finite, non-negative value.
pub fn sanitize_amount(value: Option<f64>) -> f64 {
	value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

/// Cut `text` to `max_chars` characters, adding an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() > max_chars {
		let head: String = text.chars().take(max_chars).collect();
		format!("{head}...")
	} else {
		text.to_string()
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
	Number(f64),
	Text(String),
	Other(IgnoredAny),
}

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
	Ok(match Loose::deserialize(de)? {
		Loose::Number(n) => Some(n),
		Loose::Text(s) => s.trim().parse().ok(),
		Loose::Other(_) => None,
	})
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
	Ok(match Loose::deserialize(de)? {
		Loose::Number(n) => Some(n.to_string()),
		Loose::Text(s) => Some(s),
		Loose::Other(_) => None,
	})
}

fn lenient_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
	lenient_text(de).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn label_truncates_long_names() {
		let node = GraphNode::new("0x1", "A very long asset name indeed", NodeRole::Child);
		assert_eq!(node.label(), "A very long ass...");

		let short = GraphNode::new("0x2", "Short", NodeRole::Child);
		assert_eq!(short.label(), "Short");
	}

	#[test]
	fn truncate_counts_chars_not_bytes() {
		assert_eq!(truncate("ééééé", 3), "ééé...");
	}

	#[test]
	fn tooltip_is_never_empty() {
		let mut node = GraphNode::new("0xabc", "", NodeRole::Parent);
		node.owner = "0x1234567890abcdef".into();
		node.revenue = 12.5;
		node.derivative_count = 2;

		let tooltip = node.tooltip();
		assert!(tooltip.starts_with("0xabc\n"));
		assert!(tooltip.contains("Owner: 0x12345678..."));
		assert!(tooltip.contains("Type: parent"));
		assert!(tooltip.contains("Revenue: $12.5"));
		assert!(tooltip.contains("Derivatives: 2"));
	}

	#[test]
	fn revenue_label_only_when_positive() {
		let mut node = GraphNode::new("0x1", "n", NodeRole::Root);
		assert_eq!(node.revenue_label(), None);
		node.revenue = 3.14159;
		assert_eq!(node.revenue_label().as_deref(), Some("$3.1"));
	}

	#[test]
	fn stroke_width_is_clamped() {
		let mut edge = GraphEdge {
			source_id: "a".into(),
			target_id: "b".into(),
			kind: EdgeKind::License,
			tag: "license".into(),
			weight: 0.0,
		};
		assert_eq!(edge.stroke_width(), GraphEdge::MIN_WIDTH);
		edge.weight = 60.0;
		assert_eq!(edge.stroke_width(), 3.0);
		edge.weight = 10_000.0;
		assert_eq!(edge.stroke_width(), GraphEdge::MAX_WIDTH);
	}

	#[test]
	fn unknown_tags_style_as_license() {
		assert_eq!(EdgeKind::from_tag("parent"), EdgeKind::Parent);
		assert_eq!(EdgeKind::from_tag("derivative"), EdgeKind::Derivative);
		assert_eq!(EdgeKind::from_tag("remix"), EdgeKind::License);
	}

	#[test]
	fn sanitize_amount_rejects_invalid() {
		assert_eq!(sanitize_amount(None), 0.0);
		assert_eq!(sanitize_amount(Some(-4.0)), 0.0);
		assert_eq!(sanitize_amount(Some(f64::NAN)), 0.0);
		assert_eq!(sanitize_amount(Some(f64::INFINITY)), 0.0);
		assert_eq!(sanitize_amount(Some(7.5)), 7.5);
	}

	#[test]
	fn summary_counts_roles() {
		let mut root = GraphNode::new("r", "Root", NodeRole::Root);
		root.revenue = 10.0;
		let mut child = GraphNode::new("c", "Child", NodeRole::Child);
		child.revenue = 5.0;
		let data = GraphData {
			nodes: vec![root, child, GraphNode::new("p", "Parent", NodeRole::Parent)],
			edges: Vec::new(),
		};

		let summary = data.summary();
		assert_eq!(summary.roots, 1);
		assert_eq!(summary.parents, 1);
		assert_eq!(summary.children, 1);
		assert_eq!(summary.derivatives, 0);
		assert_eq!(summary.total_revenue, 15.0);
	}

	#[test]
	fn list_skips_entries_that_are_not_records() {
		let list: RelationshipList = serde_json::from_str(
			r#"[null, 7, "0xabc", {"type": "derivative", "source": "0xroot", "target": "0xkid"}]"#,
		)
		.unwrap();

		assert_eq!(list.0.len(), 1);
		assert_eq!(list.0[0].target, "0xkid");
		assert!(list.0[0].is_derivative());
	}

	#[test]
	fn records_decode_leniently() {
		let records: Vec<RelationshipRecord> = serde_json::from_str(
			r#"[
				{"type": "derivative", "source": "0xa", "target": "0xb", "revenue": "12.5", "derivatives": 2},
				{"type": "parent", "source": null, "target": "0xa", "revenue": {"usd": 3}, "name": 42},
				{"source": "0xa", "target": "0xc"}
			]"#,
		)
		.unwrap();

		assert_eq!(records[0].revenue, Some(12.5));
		assert_eq!(records[0].derivatives, Some(2.0));
		assert!(records[0].is_derivative());
		assert_eq!(records[1].source, "");
		assert_eq!(records[1].revenue, None);
		assert_eq!(records[1].name.as_deref(), Some("42"));
		assert_eq!(records[2].kind, "");
	}

	#[test]
	fn root_data_tolerates_missing_fields() {
		let root: RootData = serde_json::from_str(r#"{"name": "Song", "revenue": -3}"#).unwrap();
		assert_eq!(root.name.as_deref(), Some("Song"));
		assert_eq!(root.owner, None);
		assert_eq!(sanitize_amount(root.revenue), 0.0);
	}
}
