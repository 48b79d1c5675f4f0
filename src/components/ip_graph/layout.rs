//! Continuous force-directed layout.
//!
//! Each [`ForceLayout::tick`] applies, in order: link springs, pairwise
//! charge repulsion, centering, collision separation and a weak pull toward
//! the viewport center, then integrates velocities. The simulation cools by
//! `alpha`; once `alpha` drops under `alpha_min` ticking is a no-op until the
//! layout is reheated. Graphs here are small (tens of nodes), so the charge
//! force is computed pairwise without a spatial index.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::debug;

use super::types::{GraphData, GraphNode, Point};

/// Duration of one simulation step at 60 fps.
pub const FRAME_MS: f64 = 1000.0 / 60.0;
const MAX_STEPS_PER_ADVANCE: usize = 4;
const INITIAL_RADIUS: f64 = 10.0;

/// Force parameters for [`ForceLayout`].
#[derive(Clone, Debug)]
pub struct LayoutConfig {
	/// Rest length of a link.
	pub link_distance: f64,
	/// Stiffness of a link, 0..=1.
	pub link_strength: f64,
	/// Negative values repel.
	pub charge_strength: f64,
	/// Added to the node radius to get the collision radius.
	pub collision_padding: f64,
	/// How hard overlapping nodes are pushed apart, 0..=1.
	pub collision_strength: f64,
	/// Pull toward the center along each axis.
	pub position_strength: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// The simulation stops once alpha falls below this.
	pub alpha_min: f64,
	/// Per-tick alpha cooling rate.
	pub alpha_decay: f64,
	/// Alpha target held while a node is being dragged.
	pub drag_alpha_target: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			link_distance: 100.0,
			link_strength: 0.8,
			charge_strength: -400.0,
			collision_padding: 15.0,
			collision_strength: 0.7,
			position_strength: 0.1,
			velocity_decay: 0.4,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			drag_alpha_target: 0.3,
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct Link {
	source: usize,
	target: usize,
	/// Share of the correction applied to the target end.
	bias: f64,
}

/// Force-directed positions for one graph.
///
/// Owns the graph for the duration of a rendering session; `seed` replaces it.
pub struct ForceLayout {
	config: LayoutConfig,
	graph: GraphData,
	links: Vec<Link>,
	index: HashMap<String, usize>,
	center: Point,
	alpha: f64,
	alpha_target: f64,
}

impl ForceLayout {
	/// Empty layout centered in a `width` x `height` area.
	pub fn new(config: LayoutConfig, width: f64, height: f64) -> Self {
		Self {
			config,
			graph: GraphData::default(),
			links: Vec::new(),
			index: HashMap::new(),
			center: Point::new(width / 2.0, height / 2.0),
			alpha: 0.0,
			alpha_target: 0.0,
		}
	}

	/// Replace the simulated graph and restart from full heat.
	pub fn seed(&mut self, mut graph: GraphData) {
		for (i, node) in graph.nodes.iter_mut().enumerate() {
			// Phyllotaxis spiral around the center.
			let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
			let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
			node.position = Point::new(
				self.center.x + radius * angle.cos(),
				self.center.y + radius * angle.sin(),
			);
			node.velocity = Point::default();
			node.pinned = None;
		}

		self.index = graph
			.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (node.id.clone(), i))
			.collect();

		let mut degree = vec![0usize; graph.nodes.len()];
		let mut pairs = Vec::with_capacity(graph.edges.len());
		for edge in &graph.edges {
			match (self.index.get(&edge.source_id), self.index.get(&edge.target_id)) {
				(Some(&source), Some(&target)) if source != target => {
					degree[source] += 1;
					degree[target] += 1;
					pairs.push((source, target));
				}
				_ => debug!(
					"layout ignoring edge {} -> {}",
					edge.source_id, edge.target_id
				),
			}
		}
		self.links = pairs
			.into_iter()
			.map(|(source, target)| Link {
				source,
				target,
				bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
			})
			.collect();

		self.graph = graph;
		self.alpha = 1.0;
		self.alpha_target = 0.0;
		debug!(
			"layout seeded with {} nodes, {} links",
			self.graph.nodes.len(),
			self.links.len()
		);
	}

	/// Drop the graph and stop.
	pub fn clear(&mut self) {
		self.graph = GraphData::default();
		self.links.clear();
		self.index.clear();
		self.alpha = 0.0;
		self.alpha_target = 0.0;
	}

	/// The graph being laid out.
	pub fn graph(&self) -> &GraphData {
		&self.graph
	}

	/// Nodes in insertion order, root first.
	pub fn nodes(&self) -> &[GraphNode] {
		&self.graph.nodes
	}

	/// Index of the node with `id`.
	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Point the centering forces pull toward.
	pub fn center(&self) -> Point {
		self.center
	}

	/// Current simulation heat.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Active parameters.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// True once alpha has cooled below `alpha_min` and no alpha target holds it up.
	pub fn is_settled(&self) -> bool {
		self.alpha < self.config.alpha_min
	}

	/// Fix a node at `at`. Returns false for unknown ids.
	pub fn pin(&mut self, id: &str, at: Point) -> bool {
		let Some(i) = self.index_of(id) else {
			return false;
		};
		let node = &mut self.graph.nodes[i];
		node.pinned = Some(at);
		node.position = at;
		node.velocity = Point::default();
		true
	}

	/// Let a pinned node move again. Returns false for unknown ids.
	pub fn unpin(&mut self, id: &str) -> bool {
		let Some(i) = self.index_of(id) else {
			return false;
		};
		self.graph.nodes[i].pinned = None;
		true
	}

	/// Alpha the simulation cools toward instead of zero.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
	}

	/// Raise alpha so the layout moves again.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
	}

	/// Move the center target and restart convergence.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.center = Point::new(width / 2.0, height / 2.0);
		self.reheat(1.0);
	}

	/// Run as many steps as `elapsed_ms` covers (at least one, at most a
	/// few so a stalled frame cannot block input). Returns whether the
	/// layout is still moving.
	pub fn advance(&mut self, elapsed_ms: f64) -> bool {
		let steps = ((elapsed_ms / FRAME_MS).round() as usize).clamp(1, MAX_STEPS_PER_ADVANCE);
		for _ in 0..steps {
			if self.is_settled() && self.alpha_target < self.config.alpha_min {
				break;
			}
			self.tick();
		}
		!self.is_settled()
	}

	/// One simulation step over every force.
	pub fn tick(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		self.apply_links(alpha);
		self.apply_charge(alpha);
		self.apply_centering();
		self.apply_collision();
		self.apply_positioning(alpha);
		self.integrate();
	}

	fn apply_links(&mut self, alpha: f64) {
		let strength = self.config.link_strength;
		let distance = self.config.link_distance;
		let nodes = &mut self.graph.nodes;

		for (n, link) in self.links.iter().enumerate() {
			let (s, t) = (&nodes[link.source], &nodes[link.target]);
			let mut dx = t.position.x + t.velocity.x - s.position.x - s.velocity.x;
			let mut dy = t.position.y + t.velocity.y - s.position.y - s.velocity.y;
			if dx == 0.0 {
				dx = jiggle(n);
			}
			if dy == 0.0 {
				dy = jiggle(n + 1);
			}
			let length = (dx * dx + dy * dy).sqrt();
			let scale = (length - distance) / length * alpha * strength;
			let (dx, dy) = (dx * scale, dy * scale);

			let target = &mut nodes[link.target];
			target.velocity.x -= dx * link.bias;
			target.velocity.y -= dy * link.bias;
			let source = &mut nodes[link.source];
			source.velocity.x += dx * (1.0 - link.bias);
			source.velocity.y += dy * (1.0 - link.bias);
		}
	}

	fn apply_charge(&mut self, alpha: f64) {
		let strength = self.config.charge_strength;
		let nodes = &mut self.graph.nodes;
		let positions: Vec<Point> = nodes.iter().map(|node| node.position).collect();

		for (i, node) in nodes.iter_mut().enumerate() {
			for (j, other) in positions.iter().enumerate() {
				if i == j {
					continue;
				}
				let mut dx = other.x - positions[i].x;
				let mut dy = other.y - positions[i].y;
				let mut l = dx * dx + dy * dy;
				if dx == 0.0 {
					dx = jiggle(i * 31 + j);
					l += dx * dx;
				}
				if dy == 0.0 {
					dy = jiggle(j * 31 + i);
					l += dy * dy;
				}
				if l < 1.0 {
					l = l.sqrt();
				}
				let w = strength * alpha / l;
				node.velocity.x += dx * w;
				node.velocity.y += dy * w;
			}
		}
	}

	fn apply_centering(&mut self) {
		let nodes = &mut self.graph.nodes;
		if nodes.is_empty() {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.position.x, sy + node.position.y));
		let (shift_x, shift_y) = (self.center.x - sx / n, self.center.y - sy / n);
		for node in nodes.iter_mut() {
			node.position.x += shift_x;
			node.position.y += shift_y;
		}
	}

	fn apply_collision(&mut self) {
		let padding = self.config.collision_padding;
		let strength = self.config.collision_strength;
		let nodes = &mut self.graph.nodes;

		for i in 0..nodes.len() {
			let ri = nodes[i].radius() + padding;
			let ri2 = ri * ri;
			for j in (i + 1)..nodes.len() {
				let (a, b) = (&nodes[i], &nodes[j]);
				let rj = b.radius() + padding;
				let r = ri + rj;
				let mut x = a.position.x + a.velocity.x - b.position.x - b.velocity.x;
				let mut y = a.position.y + a.velocity.y - b.position.y - b.velocity.y;
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 {
					x = jiggle(i * 17 + j);
					l += x * x;
				}
				if y == 0.0 {
					y = jiggle(j * 17 + i);
					l += y * y;
				}
				let l = l.sqrt();
				let push = (r - l) / l * strength;
				let (x, y) = (x * push, y * push);
				let share = (rj * rj) / (ri2 + rj * rj);

				let a = &mut nodes[i];
				a.velocity.x += x * share;
				a.velocity.y += y * share;
				let b = &mut nodes[j];
				b.velocity.x -= x * (1.0 - share);
				b.velocity.y -= y * (1.0 - share);
			}
		}
	}

	fn apply_positioning(&mut self, alpha: f64) {
		let k = self.config.position_strength * alpha;
		let center = self.center;
		for node in &mut self.graph.nodes {
			node.velocity.x += (center.x - node.position.x) * k;
			node.velocity.y += (center.y - node.position.y) * k;
		}
	}

	fn integrate(&mut self) {
		let retain = 1.0 - self.config.velocity_decay;
		for node in &mut self.graph.nodes {
			if let Some(pinned) = node.pinned {
				node.position = pinned;
				node.velocity = Point::default();
			} else {
				node.velocity.x *= retain;
				node.velocity.y *= retain;
				node.position.x += node.velocity.x;
				node.position.y += node.velocity.y;
			}
		}
	}
}

/// Tiny deterministic offset that separates coincident nodes.
fn jiggle(seed: usize) -> f64 {
	((seed as f64 * 0.618_034).fract() - 0.5) * 1e-6
}
