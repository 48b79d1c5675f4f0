//! Turns a root asset plus its relationship records into a deduplicated
//! node/edge set.

use std::collections::HashSet;

use log::{debug, info};

use super::error::GraphError;
use super::types::{
	EdgeKind, GraphData, GraphEdge, GraphNode, NodeRole, RelationshipRecord, RootData,
	sanitize_amount,
};

const DEMO_DERIVATIVES: usize = 3;

/// Build a fresh graph for `root_id`.
///
/// The first record mentioning an id creates its node; later records only
/// contribute edges. Edges whose endpoints never became nodes are dropped.
/// When no related node survives, a small demo subgraph is attached so the
/// root is never rendered alone.
pub fn build_graph(
	root_id: &str,
	root: &RootData,
	relationships: &[RelationshipRecord],
) -> Result<GraphData, GraphError> {
	if root_id.trim().is_empty() {
		return Err(GraphError::EmptyRootId);
	}

	let mut root_node = GraphNode::new(
		root_id,
		non_empty(root.name.as_deref()).unwrap_or("Root IP"),
		NodeRole::Root,
	);
	root_node.owner = non_empty(root.owner.as_deref()).unwrap_or("Unknown").to_string();
	root_node.revenue = sanitize_amount(root.revenue);
	root_node.derivative_count = relationships.iter().filter(|r| r.is_derivative()).count() as u32;

	let mut known: HashSet<&str> = HashSet::from([root_id]);
	let mut nodes = vec![root_node];
	let mut linked = Vec::with_capacity(relationships.len());

	for record in relationships {
		if record.source.is_empty() || record.target.is_empty() {
			debug!("skipping relationship without endpoints: {:?}", record);
			continue;
		}
		let other = if record.target != root_id {
			record.target.as_str()
		} else {
			record.source.as_str()
		};
		if other == root_id {
			debug!("skipping self relationship on {}", root_id);
			continue;
		}
		if known.insert(other) {
			nodes.push(related_node(other, record));
		}
		linked.push(record);
	}

	let mut edges = Vec::with_capacity(linked.len());
	for record in linked {
		let (source, target) = (record.source.as_str(), record.target.as_str());
		if source == target || !known.contains(source) || !known.contains(target) {
			debug!("dropping edge {} -> {}: unresolved endpoint", source, target);
			continue;
		}
		edges.push(GraphEdge {
			source_id: source.to_string(),
			target_id: target.to_string(),
			kind: EdgeKind::from_tag(&record.kind),
			tag: record.kind.clone(),
			weight: sanitize_amount(record.revenue),
		});
	}

	let mut graph = GraphData { nodes, edges };
	if graph.nodes.len() == 1 {
		info!("no relationships for {}, attaching demo subgraph", root_id);
		append_demo_nodes(&mut graph, root_id);
	}
	debug!(
		"built graph for {}: {} nodes, {} edges",
		root_id,
		graph.nodes.len(),
		graph.edges.len()
	);
	Ok(graph)
}

fn related_node(id: &str, record: &RelationshipRecord) -> GraphNode {
	let role = if record.is_derivative() {
		NodeRole::Child
	} else {
		NodeRole::Parent
	};
	let name = match non_empty(record.name.as_deref()) {
		Some(name) => name.to_string(),
		None => format!("IP {}...", id.chars().take(8).collect::<String>()),
	};

	let mut node = GraphNode::new(id, name, role);
	if let Some(owner) = non_empty(record.owner.as_deref()) {
		node.owner = owner.to_string();
	}
	node.revenue = sanitize_amount(record.revenue);
	node.derivative_count = sanitize_amount(record.derivatives).floor() as u32;
	node
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

/// Deterministic sequence seeded from the root id, so the same asset always
/// gets the same placeholder neighbourhood.
struct DemoRng(u64);

impl DemoRng {
	const MODULUS: u64 = 233_280;

	fn seeded(text: &str) -> Self {
		let seed = text
			.bytes()
			.fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
		Self(seed % Self::MODULUS)
	}

	fn next(&mut self) -> f64 {
		self.0 = (self.0 * 9301 + 49297) % Self::MODULUS;
		self.0 as f64 / Self::MODULUS as f64
	}

	fn hex_id(&mut self) -> String {
		let digits: String = (0..40)
			.map(|_| {
				let nibble = (self.next() * 16.0) as u32 % 16;
				char::from_digit(nibble, 16).unwrap_or('0')
			})
			.collect();
		format!("0x{digits}")
	}

	fn fresh_id(&mut self, graph: &GraphData) -> String {
		loop {
			let id = self.hex_id();
			if graph.node(&id).is_none() {
				return id;
			}
		}
	}
}

fn append_demo_nodes(graph: &mut GraphData, root_id: &str) {
	let mut rng = DemoRng::seeded(root_id);

	let parent_id = rng.fresh_id(graph);
	let mut parent = GraphNode::new(parent_id.clone(), "Parent IP Asset", NodeRole::Parent);
	parent.owner = "0x1234...5678".into();
	parent.revenue = 150.0;
	parent.derivative_count = 3;
	graph.nodes.push(parent);
	graph.edges.push(GraphEdge {
		source_id: parent_id,
		target_id: root_id.to_string(),
		kind: EdgeKind::Parent,
		tag: "parent".into(),
		weight: 25.0,
	});

	for i in 0..DEMO_DERIVATIVES {
		let id = rng.fresh_id(graph);
		let mut derivative = GraphNode::new(id.clone(), format!("Derivative {}", i + 1), NodeRole::Child);
		derivative.owner = format!("0xabcd...{}", i.to_string().repeat(4));
		derivative.revenue = rng.next() * 50.0;
		derivative.derivative_count = (rng.next() * 3.0).floor() as u32;
		graph.nodes.push(derivative);
		graph.edges.push(GraphEdge {
			source_id: root_id.to_string(),
			target_id: id,
			kind: EdgeKind::Derivative,
			tag: "derivative".into(),
			weight: rng.next() * 20.0,
		});
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	fn derivative(source: &str, target: &str) -> RelationshipRecord {
		RelationshipRecord::new("derivative", source, target)
	}

	fn ids(graph: &GraphData) -> Vec<&str> {
		graph.nodes.iter().map(|n| n.id.as_str()).collect()
	}

	fn assert_edges_resolve(graph: &GraphData) {
		for edge in &graph.edges {
			assert!(graph.node(&edge.source_id).is_some(), "{} missing", edge.source_id);
			assert!(graph.node(&edge.target_id).is_some(), "{} missing", edge.target_id);
		}
	}

	#[test]
	fn empty_root_id_is_rejected() {
		assert_eq!(
			build_graph("", &RootData::default(), &[]).unwrap_err(),
			GraphError::EmptyRootId
		);
		assert_eq!(
			build_graph("   ", &RootData::default(), &[]).unwrap_err(),
			GraphError::EmptyRootId
		);
	}

	#[test]
	fn duplicate_ids_create_one_node() {
		let records = vec![
			derivative("0xroot", "0xb").with_name("First"),
			derivative("0xroot", "0xb").with_name("Second"),
			RelationshipRecord::new("parent", "0xb", "0xroot"),
			RelationshipRecord::new("license", "0xc", "0xroot"),
		];
		let graph = build_graph("0xroot", &RootData::default(), &records).unwrap();

		let unique: HashSet<_> = ids(&graph).into_iter().collect();
		assert_eq!(unique.len(), graph.nodes.len());
		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.node("0xb").unwrap().display_name, "First");
		assert_eq!(graph.edges.len(), 4);
		assert_edges_resolve(&graph);
	}

	#[test]
	fn root_is_first_and_unique() {
		let records = vec![derivative("0xroot", "0xa"), derivative("0xroot", "0xb")];
		let graph = build_graph("0xroot", &RootData::named("My Song"), &records).unwrap();

		let roots: Vec<_> = graph.nodes.iter().filter(|n| n.role == NodeRole::Root).collect();
		assert_eq!(roots.len(), 1);
		assert_eq!(graph.nodes[0].id, "0xroot");
		assert_eq!(graph.nodes[0].display_name, "My Song");
		assert_eq!(graph.nodes[0].derivative_count, 2);
	}

	#[test]
	fn empty_input_gets_demo_subgraph() {
		let graph = build_graph("0xroot", &RootData::default(), &[]).unwrap();

		assert_eq!(graph.nodes[0].role, NodeRole::Root);
		assert_eq!(graph.nodes[0].display_name, "Root IP");
		assert_eq!(graph.nodes.iter().filter(|n| n.role == NodeRole::Root).count(), 1);
		assert!(graph.nodes.len() >= 2);
		assert!(!graph.edges.is_empty());
		assert!(graph.nodes.iter().any(|n| n.role == NodeRole::Parent));
		assert!(graph.nodes.iter().any(|n| n.role == NodeRole::Child));
		assert_edges_resolve(&graph);

		let unique: HashSet<_> = ids(&graph).into_iter().collect();
		assert_eq!(unique.len(), graph.nodes.len());
	}

	#[test]
	fn demo_subgraph_is_stable_per_root() {
		let first = build_graph("0xroot", &RootData::default(), &[]).unwrap();
		let again = build_graph("0xroot", &RootData::default(), &[]).unwrap();
		assert_eq!(ids(&first), ids(&again));

		let other = build_graph("0xother", &RootData::default(), &[]).unwrap();
		assert_ne!(ids(&first)[1..], ids(&other)[1..]);
	}

	#[test]
	fn records_touching_only_root_fall_back_to_demo() {
		let records = vec![derivative("0xroot", "0xroot")];
		let graph = build_graph("0xroot", &RootData::default(), &records).unwrap();
		assert!(graph.nodes.len() > 1);
		assert!(graph.edges.iter().all(|e| e.source_id != e.target_id));
	}

	#[test]
	fn revenue_is_never_negative_or_nan() {
		let records = vec![
			derivative("0xroot", "0xa").with_revenue(-10.0),
			derivative("0xroot", "0xb").with_revenue(f64::NAN),
			derivative("0xroot", "0xc").with_revenue(42.0).with_derivatives(-2.0),
		];
		let root = RootData {
			revenue: Some(f64::NEG_INFINITY),
			..RootData::default()
		};
		let graph = build_graph("0xroot", &root, &records).unwrap();

		for node in &graph.nodes {
			assert!(node.revenue.is_finite() && node.revenue >= 0.0, "{:?}", node);
		}
		assert_eq!(graph.node("0xc").unwrap().revenue, 42.0);
		assert_eq!(graph.node("0xc").unwrap().derivative_count, 0);
		for edge in &graph.edges {
			assert!(edge.weight.is_finite() && edge.weight >= 0.0);
		}
	}

	#[test]
	fn linear_chain_keeps_multi_hop_edges() {
		let records = vec![derivative("A", "B"), derivative("B", "C")];
		let graph = build_graph("A", &RootData::default(), &records).unwrap();

		assert_eq!(ids(&graph), vec!["A", "B", "C"]);
		assert_eq!(graph.edges.len(), 2);
		assert_eq!(graph.edges[1].source_id, "B");
		assert_eq!(graph.edges[1].target_id, "C");
		assert_edges_resolve(&graph);
	}

	#[test]
	fn multi_hop_order_does_not_matter() {
		let records = vec![derivative("B", "C"), derivative("A", "B")];
		let graph = build_graph("A", &RootData::default(), &records).unwrap();
		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.edges.len(), 2);
	}

	#[test]
	fn unresolved_endpoints_drop_only_the_edge() {
		let records = vec![
			derivative("0xroot", "0xa"),
			RelationshipRecord::new("parent", "0xghost", "0xb"),
			RelationshipRecord::new("license", "", "0xroot"),
		];
		let graph = build_graph("0xroot", &RootData::default(), &records).unwrap();

		assert!(graph.node("0xb").is_some());
		assert!(graph.node("0xghost").is_none());
		assert_eq!(graph.edges.len(), 1);
		assert_edges_resolve(&graph);
	}

	#[test]
	fn roles_and_kinds_follow_record_type() {
		let records = vec![
			derivative("0xroot", "0xkid"),
			RelationshipRecord::new("parent", "0xmom", "0xroot"),
			RelationshipRecord::new("remix", "0xroot", "0xodd"),
		];
		let graph = build_graph("0xroot", &RootData::default(), &records).unwrap();

		assert_eq!(graph.node("0xkid").unwrap().role, NodeRole::Child);
		assert_eq!(graph.node("0xmom").unwrap().role, NodeRole::Parent);
		assert_eq!(graph.node("0xodd").unwrap().role, NodeRole::Parent);

		let odd = graph.edges.iter().find(|e| e.target_id == "0xodd").unwrap();
		assert_eq!(odd.kind, EdgeKind::License);
		assert_eq!(odd.tag, "remix");
	}

	#[test]
	fn missing_names_are_synthesized_from_id() {
		let records = vec![derivative("0xroot", "0x1234567890abcdef").with_owner("alice")];
		let graph = build_graph("0xroot", &RootData::default(), &records).unwrap();

		let node = graph.node("0x1234567890abcdef").unwrap();
		assert_eq!(node.display_name, "IP 0x123456...");
		assert_eq!(node.owner, "alice");
	}
}
