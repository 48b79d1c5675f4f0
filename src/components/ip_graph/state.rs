use std::collections::HashSet;

use log::{debug, error, info};

use super::error::GraphError;
use super::layout::{ForceLayout, LayoutConfig};
use super::model::build_graph;
use super::types::{GraphEdge, GraphNode, Point, RelationshipRecord, RootData};

/// Scale applied to a fully hovered node.
pub const HOVER_GROWTH: f64 = 0.2;

/// Instance-level settings for a visualizer.
#[derive(Clone, Debug)]
pub struct VisualizerConfig {
	/// Used when the container measures zero in either dimension.
	pub fallback_width: f64,
	/// See `fallback_width`.
	pub fallback_height: f64,
	/// Smallest zoom factor.
	pub min_zoom: f64,
	/// Largest zoom factor.
	pub max_zoom: f64,
	/// Pointer travel (screen px) beyond which a press is no longer a click.
	pub click_threshold: f64,
	/// Seconds for the hover emphasis to fade in or out.
	pub hover_duration: f64,
	/// Force parameters.
	pub layout: LayoutConfig,
}

impl Default for VisualizerConfig {
	fn default() -> Self {
		Self {
			fallback_width: 360.0,
			fallback_height: 280.0,
			min_zoom: 0.1,
			max_zoom: 4.0,
			click_threshold: 3.0,
			hover_duration: 0.2,
			layout: LayoutConfig::default(),
		}
	}
}

/// Pan and zoom applied to graph coordinates: `screen = graph * k + (x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal pan in screen px.
	pub x: f64,
	/// Vertical pan in screen px.
	pub y: f64,
	/// Zoom factor.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

/// What the canvas currently shows.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneContent {
	/// Empty-state prompt.
	Placeholder,
	/// The laid out graph.
	Graph,
	/// Inline error message.
	Error(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Gesture {
	Idle,
	Dragging {
		id: String,
		index: usize,
		origin: Point,
		node_start: Point,
		moved: bool,
	},
	Panning {
		origin: Point,
		transform_start: Point,
		moved: bool,
	},
}

/// Externally visible interaction state.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionMode {
	/// No gesture and identity zoom.
	Idle,
	/// Dragging the node with this id.
	Dragging(String),
	/// Dragging the background.
	Panning,
	/// No gesture, zoomed to this factor.
	Zoomed(f64),
}

/// Result of releasing the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerOutcome {
	/// Press and release on the node at this index without moving.
	NodeClicked(usize),
	/// Press and release on empty canvas without moving.
	BackgroundClicked,
}

/// Highlight state of a node relative to the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeEmphasis {
	/// No selection or unrelated to it.
	Normal,
	/// The selected node.
	Selected,
	/// Directly linked to the selected node.
	Neighbor,
}

#[derive(Clone, Debug, Default)]
struct Selection {
	node: usize,
	neighbors: HashSet<usize>,
}

#[derive(Clone, Debug, Default)]
struct HoverState {
	node: Option<usize>,
	prev_node: Option<usize>,
	t: f64,
}

/// Everything the canvas shows, without touching the DOM.
pub struct GraphScene {
	/// Instance settings.
	pub config: VisualizerConfig,
	/// Simulation and graph.
	pub layout: ForceLayout,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Placeholder, graph or error.
	pub content: SceneContent,
	/// Canvas width in px.
	pub width: f64,
	/// Canvas height in px.
	pub height: f64,
	gesture: Gesture,
	selection: Option<Selection>,
	hover: HoverState,
}

impl GraphScene {
	/// Placeholder scene; zero sizes fall back to the configured default.
	pub fn new(config: VisualizerConfig, width: f64, height: f64) -> Self {
		let (width, height) = fallback_size(&config, width, height);
		Self {
			layout: ForceLayout::new(config.layout.clone(), width, height),
			config,
			transform: ViewTransform::default(),
			content: SceneContent::Placeholder,
			width,
			height,
			gesture: Gesture::Idle,
			selection: None,
			hover: HoverState::default(),
		}
	}

	/// Rebuild the graph from scratch. On failure the scene is cleared and
	/// shows an error instead of a partial graph.
	pub fn load(
		&mut self,
		root_id: &str,
		root: &RootData,
		relationships: &[RelationshipRecord],
	) -> Result<(), GraphError> {
		self.reset_interaction();
		match build_graph(root_id, root, relationships) {
			Ok(graph) => {
				info!(
					"loaded {} with {} relationships",
					root_id,
					relationships.len()
				);
				self.layout.seed(graph);
				self.transform = ViewTransform::default();
				self.content = SceneContent::Graph;
				Ok(())
			}
			Err(err) => {
				error!("failed to load relationships for {:?}: {}", root_id, err);
				self.show_error(&err);
				Err(err)
			}
		}
	}

	/// Replace the graph with an inline error.
	pub fn show_error(&mut self, err: &GraphError) {
		self.reset_interaction();
		self.layout.clear();
		self.content = SceneContent::Error(err.user_message().to_string());
	}

	/// Back to the placeholder.
	pub fn clear(&mut self) {
		self.reset_interaction();
		self.layout.clear();
		self.transform = ViewTransform::default();
		self.content = SceneContent::Placeholder;
	}

	/// New canvas size; the layout recenters.
	pub fn resize(&mut self, width: f64, height: f64) {
		let (width, height) = fallback_size(&self.config, width, height);
		self.width = width;
		self.height = height;
		self.layout.resize(width, height);
	}

	fn reset_interaction(&mut self) {
		self.gesture = Gesture::Idle;
		self.selection = None;
		self.hover = HoverState::default();
	}

	/// Nodes of the current graph.
	pub fn nodes(&self) -> &[GraphNode] {
		self.layout.nodes()
	}

	/// Edges of the current graph.
	pub fn edges(&self) -> &[GraphEdge] {
		&self.layout.graph().edges
	}

	/// Current interaction state.
	pub fn mode(&self) -> InteractionMode {
		match &self.gesture {
			Gesture::Dragging { id, .. } => InteractionMode::Dragging(id.clone()),
			Gesture::Panning { .. } => InteractionMode::Panning,
			Gesture::Idle if self.transform.k != 1.0 => InteractionMode::Zoomed(self.transform.k),
			Gesture::Idle => InteractionMode::Idle,
		}
	}

	/// Map a canvas position to graph coordinates.
	pub fn screen_to_graph(&self, screen: Point) -> Point {
		Point::new(
			(screen.x - self.transform.x) / self.transform.k,
			(screen.y - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen position.
	pub fn node_at_position(&self, screen: Point) -> Option<usize> {
		let at = self.screen_to_graph(screen);
		self.nodes()
			.iter()
			.enumerate()
			.rev()
			.find(|(i, node)| node.position.distance(at) <= node.radius() * self.hover_scale(*i))
			.map(|(i, _)| i)
	}

	/// Start a drag on a node, or a pan on empty canvas.
	pub fn pointer_down(&mut self, screen: Point) {
		if self.content != SceneContent::Graph {
			return;
		}
		if let Some(index) = self.node_at_position(screen) {
			let node = &self.nodes()[index];
			let (id, node_start) = (node.id.clone(), node.position);
			self.layout.pin(&id, node_start);
			self.layout
				.set_alpha_target(self.config.layout.drag_alpha_target);
			debug!("drag start on {}", id);
			self.gesture = Gesture::Dragging {
				id,
				index,
				origin: screen,
				node_start,
				moved: false,
			};
		} else {
			self.gesture = Gesture::Panning {
				origin: screen,
				transform_start: Point::new(self.transform.x, self.transform.y),
				moved: false,
			};
		}
	}

	/// Continue the active gesture, or update hover when idle.
	pub fn pointer_move(&mut self, screen: Point) {
		if self.gesture == Gesture::Idle {
			let hovered = self.node_at_position(screen);
			self.set_hover(hovered);
			return;
		}

		let threshold = self.config.click_threshold;
		let k = self.transform.k;
		match &mut self.gesture {
			Gesture::Dragging {
				id,
				origin,
				node_start,
				moved,
				..
			} => {
				*moved |= screen.distance(*origin) > threshold;
				let to = Point::new(
					node_start.x + (screen.x - origin.x) / k,
					node_start.y + (screen.y - origin.y) / k,
				);
				let id = id.clone();
				self.layout.pin(&id, to);
			}
			Gesture::Panning {
				origin,
				transform_start,
				moved,
			} => {
				*moved |= screen.distance(*origin) > threshold;
				self.transform.x = transform_start.x + (screen.x - origin.x);
				self.transform.y = transform_start.y + (screen.y - origin.y);
			}
			Gesture::Idle => {}
		}
	}

	/// Finish the active gesture. Only a press that stayed within the click threshold reports a click.
	pub fn pointer_up(&mut self) -> Option<PointerOutcome> {
		match std::mem::replace(&mut self.gesture, Gesture::Idle) {
			Gesture::Dragging {
				id, index, moved, ..
			} => {
				self.release(&id);
				if moved {
					None
				} else {
					self.toggle_selection(index);
					Some(PointerOutcome::NodeClicked(index))
				}
			}
			Gesture::Panning { moved: false, .. } => {
				self.clear_selection();
				Some(PointerOutcome::BackgroundClicked)
			}
			Gesture::Panning { .. } | Gesture::Idle => None,
		}
	}

	/// Pointer left the canvas: end any gesture without producing a click.
	pub fn pointer_leave(&mut self) {
		if let Gesture::Dragging { id, .. } = std::mem::replace(&mut self.gesture, Gesture::Idle) {
			self.release(&id);
		}
		self.set_hover(None);
	}

	fn release(&mut self, id: &str) {
		self.layout.unpin(id);
		self.layout.set_alpha_target(0.0);
		let heat = self.layout.alpha().max(self.config.layout.drag_alpha_target);
		self.layout.reheat(heat);
		debug!("drag end on {}", id);
	}

	/// Wheel step anchored at the pointer.
	pub fn wheel(&mut self, screen: Point, delta_y: f64) {
		if delta_y == 0.0 {
			return;
		}
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.zoom_by(factor, screen);
	}

	/// Zoom by `factor` keeping `anchor` fixed on screen. Clamped to the configured range.
	pub fn zoom_by(&mut self, factor: f64, anchor: Point) {
		let new_k = (self.transform.k * factor).clamp(self.config.min_zoom, self.config.max_zoom);
		let ratio = new_k / self.transform.k;
		self.transform.x = anchor.x - (anchor.x - self.transform.x) * ratio;
		self.transform.y = anchor.y - (anchor.y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Double click on empty canvas resets the view.
	pub fn double_click(&mut self, screen: Point) {
		if self.node_at_position(screen).is_none() {
			self.transform = ViewTransform::default();
		}
	}

	/// Select the node at `index` and its neighbors, or deselect it if it is already selected.
	pub fn toggle_selection(&mut self, index: usize) {
		if self.selection.as_ref().is_some_and(|s| s.node == index) {
			self.clear_selection();
			return;
		}
		let Some(id) = self.nodes().get(index).map(|n| n.id.clone()) else {
			return;
		};
		let neighbors = self
			.edges()
			.iter()
			.filter(|edge| edge.touches(&id))
			.filter_map(|edge| {
				let other = if edge.source_id == id {
					&edge.target_id
				} else {
					&edge.source_id
				};
				self.layout.index_of(other)
			})
			.collect();
		self.selection = Some(Selection {
			node: index,
			neighbors,
		});
	}

	/// Drop the highlight.
	pub fn clear_selection(&mut self) {
		self.selection = None;
	}

	/// Index of the selected node.
	pub fn selected(&self) -> Option<usize> {
		self.selection.as_ref().map(|s| s.node)
	}

	/// Whether any node is highlighted.
	pub fn has_selection(&self) -> bool {
		self.selection.is_some()
	}

	/// Emphasis for the node at `index`.
	pub fn emphasis(&self, index: usize) -> NodeEmphasis {
		match &self.selection {
			Some(s) if s.node == index => NodeEmphasis::Selected,
			Some(s) if s.neighbors.contains(&index) => NodeEmphasis::Neighbor,
			_ => NodeEmphasis::Normal,
		}
	}

	/// Edge opacity under the current selection.
	pub fn edge_opacity(&self, edge: &GraphEdge) -> f64 {
		match self.selected().and_then(|i| self.nodes().get(i)) {
			Some(node) if edge.touches(&node.id) => 1.0,
			Some(_) => 0.3,
			None => 0.7,
		}
	}

	/// Start the hover animation toward `node`.
	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
		} else {
			self.hover.prev_node = None;
			self.hover.t = 0.0;
		}
		self.hover.node = node;
	}

	/// Node under the pointer.
	pub fn hovered(&self) -> Option<usize> {
		self.hover.node
	}

	/// Tooltip text for the hovered node.
	pub fn hovered_tooltip(&self) -> Option<String> {
		self.hover
			.node
			.and_then(|i| self.nodes().get(i))
			.map(GraphNode::tooltip)
	}

	/// Radius multiplier for the hover affordance.
	pub fn hover_scale(&self, index: usize) -> f64 {
		if self.hover.node == Some(index) || self.hover.prev_node == Some(index) {
			1.0 + HOVER_GROWTH * ease_out_cubic(self.hover.t)
		} else {
			1.0
		}
	}

	/// Advance the simulation and hover animation by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		if self.content == SceneContent::Graph {
			self.layout.advance(dt * 1000.0);
		}

		let step = dt / self.config.hover_duration.max(f64::EPSILON);
		if self.hover.node.is_some() {
			self.hover.t = (self.hover.t + step).min(1.0);
		} else {
			self.hover.t = (self.hover.t - step).max(0.0);
			if self.hover.t == 0.0 {
				self.hover.prev_node = None;
			}
		}
	}
}

/// Cubic ease-out on `t` in 0..=1.
pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn fallback_size(config: &VisualizerConfig, width: f64, height: f64) -> (f64, f64) {
	if width > 0.0 && height > 0.0 {
		(width, height)
	} else {
		(config.fallback_width, config.fallback_height)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn records() -> Vec<RelationshipRecord> {
		vec![
			RelationshipRecord::new("derivative", "root", "a"),
			RelationshipRecord::new("derivative", "root", "b"),
			RelationshipRecord::new("parent", "p", "root"),
			RelationshipRecord::new("derivative", "a", "c"),
		]
	}

	fn loaded() -> GraphScene {
		let mut scene = GraphScene::new(VisualizerConfig::default(), 400.0, 300.0);
		scene.load("root", &RootData::default(), &records()).unwrap();
		scene
	}

	fn screen_of(scene: &GraphScene, id: &str) -> Point {
		let node = &scene.nodes()[scene.layout.index_of(id).unwrap()];
		Point::new(
			node.position.x * scene.transform.k + scene.transform.x,
			node.position.y * scene.transform.k + scene.transform.y,
		)
	}

	fn click(scene: &mut GraphScene, at: Point) -> Option<PointerOutcome> {
		scene.pointer_down(at);
		scene.pointer_up()
	}

	fn settle(scene: &mut GraphScene) {
		for _ in 0..400 {
			scene.layout.tick();
		}
	}

	#[test]
	fn zero_sized_container_uses_fallback() {
		let scene = GraphScene::new(VisualizerConfig::default(), 0.0, 0.0);
		assert_eq!((scene.width, scene.height), (360.0, 280.0));
		assert_eq!(scene.content, SceneContent::Placeholder);
		assert_eq!(scene.layout.center(), Point::new(180.0, 140.0));
	}

	#[test]
	fn resize_recenters_and_keeps_graph() {
		let mut scene = loaded();
		scene.resize(800.0, 600.0);
		assert_eq!((scene.width, scene.height), (800.0, 600.0));
		assert_eq!(scene.layout.center(), Point::new(400.0, 300.0));
		assert_eq!(scene.nodes().len(), 5);

		scene.resize(0.0, 600.0);
		assert_eq!((scene.width, scene.height), (360.0, 280.0));
	}

	#[test]
	fn click_highlights_node_and_direct_neighbors() {
		let mut scene = loaded();
		settle(&mut scene);
		let a = scene.layout.index_of("a").unwrap();

		let at = screen_of(&scene, "a");
		let outcome = click(&mut scene, at);
		assert_eq!(outcome, Some(PointerOutcome::NodeClicked(a)));

		for (i, node) in scene.nodes().iter().enumerate() {
			let expected = match node.id.as_str() {
				"a" => NodeEmphasis::Selected,
				"root" | "c" => NodeEmphasis::Neighbor,
				_ => NodeEmphasis::Normal,
			};
			assert_eq!(scene.emphasis(i), expected, "{}", node.id);
		}
		for edge in scene.edges() {
			let expected = if edge.touches("a") { 1.0 } else { 0.3 };
			assert_eq!(scene.edge_opacity(edge), expected);
		}
	}

	#[test]
	fn second_click_on_same_node_clears_highlight() {
		let mut scene = loaded();
		settle(&mut scene);
		let at = screen_of(&scene, "b");

		click(&mut scene, at);
		assert!(scene.has_selection());
		click(&mut scene, at);
		assert!(!scene.has_selection());
		for i in 0..scene.nodes().len() {
			assert_eq!(scene.emphasis(i), NodeEmphasis::Normal);
		}
		for edge in scene.edges() {
			assert_eq!(scene.edge_opacity(edge), 0.7);
		}
	}

	#[test]
	fn background_click_clears_highlight() {
		let mut scene = loaded();
		settle(&mut scene);
		let at = screen_of(&scene, "root");
		click(&mut scene, at);
		assert!(scene.has_selection());

		let outcome = click(&mut scene, Point::new(-500.0, -500.0));
		assert_eq!(outcome, Some(PointerOutcome::BackgroundClicked));
		assert!(!scene.has_selection());
	}

	#[test]
	fn drag_pins_node_then_releases_and_reheats() {
		let mut scene = loaded();
		settle(&mut scene);
		assert!(scene.layout.is_settled());
		let start = screen_of(&scene, "b");
		let b = scene.layout.index_of("b").unwrap();

		scene.pointer_down(start);
		assert_eq!(scene.mode(), InteractionMode::Dragging("b".into()));
		let to = Point::new(start.x + 40.0, start.y - 25.0);
		scene.pointer_move(to);

		let pinned = scene.nodes()[b].pinned.unwrap();
		assert!(pinned.distance(scene.screen_to_graph(to)) < 1e-9);
		for _ in 0..30 {
			scene.tick(1.0 / 60.0);
			let node = &scene.nodes()[b];
			assert_eq!(node.pinned, Some(pinned));
			assert_eq!(node.position, pinned);
		}

		assert_eq!(scene.pointer_up(), None);
		assert_eq!(scene.mode(), InteractionMode::Idle);
		assert_eq!(scene.nodes()[b].pinned, None);
		assert!(!scene.layout.is_settled());
		assert!(!scene.has_selection());
	}

	#[test]
	fn pan_moves_transform_without_selecting() {
		let mut scene = loaded();
		scene.pointer_down(Point::new(-100.0, -100.0));
		assert_eq!(scene.mode(), InteractionMode::Panning);
		scene.pointer_move(Point::new(-70.0, -90.0));
		assert_eq!(scene.pointer_up(), None);
		assert_eq!(scene.transform.x, 30.0);
		assert_eq!(scene.transform.y, 10.0);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut scene = loaded();
		let anchor = Point::new(200.0, 150.0);
		for _ in 0..200 {
			scene.wheel(anchor, -1.0);
			assert!(scene.transform.k <= 4.0);
		}
		assert_eq!(scene.transform.k, 4.0);
		assert_eq!(scene.mode(), InteractionMode::Zoomed(4.0));

		for _ in 0..200 {
			scene.wheel(anchor, 1.0);
			assert!(scene.transform.k >= 0.1);
		}
		assert_eq!(scene.transform.k, 0.1);

		scene.double_click(Point::new(-1000.0, -1000.0));
		assert_eq!(scene.transform, ViewTransform::default());
	}

	#[test]
	fn zoom_keeps_anchor_fixed() {
		let mut scene = loaded();
		let anchor = Point::new(120.0, 80.0);
		let before = scene.screen_to_graph(anchor);
		scene.wheel(anchor, -1.0);
		let after = scene.screen_to_graph(anchor);
		assert!(before.distance(after) < 1e-9);
	}

	#[test]
	fn horizontal_scroll_does_not_zoom() {
		let mut scene = loaded();
		scene.wheel(Point::new(120.0, 80.0), 0.0);
		assert_eq!(scene.transform, ViewTransform::default());
		assert_eq!(scene.mode(), InteractionMode::Idle);
	}

	#[test]
	fn hover_enlarges_without_touching_layout() {
		let mut scene = loaded();
		settle(&mut scene);
		let root = scene.layout.index_of("root").unwrap();
		let alpha = scene.layout.alpha();

		scene.pointer_move(screen_of(&scene, "root"));
		assert_eq!(scene.hovered(), Some(root));
		scene.tick(0.25);
		assert!((scene.hover_scale(root) - (1.0 + HOVER_GROWTH)).abs() < 1e-9);
		assert!(scene.hovered_tooltip().unwrap().contains("Type: root"));
		assert!(scene.layout.alpha() <= alpha);

		scene.pointer_leave();
		assert_eq!(scene.hovered(), None);
		scene.tick(0.25);
		assert_eq!(scene.hover_scale(root), 1.0);
	}

	#[test]
	fn reload_discards_previous_graph() {
		let mut scene = GraphScene::new(VisualizerConfig::default(), 400.0, 300.0);
		scene
			.load(
				"X",
				&RootData::default(),
				&[RelationshipRecord::new("derivative", "X", "X1")],
			)
			.unwrap();
		scene
			.load(
				"Y",
				&RootData::default(),
				&[
					RelationshipRecord::new("derivative", "Y", "Y1"),
					RelationshipRecord::new("parent", "Y0", "Y"),
				],
			)
			.unwrap();

		let ids: Vec<_> = scene.nodes().iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["Y", "Y1", "Y0"]);
		assert!(scene.edges().iter().all(|e| !e.touches("X") && !e.touches("X1")));
	}

	#[test]
	fn failed_load_shows_error_and_clears_graph() {
		let mut scene = loaded();
		let err = scene.load("", &RootData::default(), &records()).unwrap_err();

		assert_eq!(err, GraphError::EmptyRootId);
		assert!(scene.nodes().is_empty());
		assert!(matches!(scene.content, SceneContent::Error(_)));

		scene.pointer_down(Point::new(10.0, 10.0));
		assert_eq!(scene.mode(), InteractionMode::Idle);
	}

	#[test]
	fn clear_returns_to_placeholder() {
		let mut scene = loaded();
		click(&mut scene, Point::new(-500.0, -500.0));
		scene.clear();
		assert_eq!(scene.content, SceneContent::Placeholder);
		assert!(scene.nodes().is_empty());
		assert!(scene.edges().is_empty());
	}
}
