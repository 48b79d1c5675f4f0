//! Browser-facing graph instance.
//!
//! Owns a canvas inside the caller's container, drives the simulation from
//! `requestAnimationFrame` and turns mouse input into scene interactions.
//! All state lives on the instance; dropping it stops the animation loop and
//! detaches every listener.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, CustomEvent, CustomEventInit, Event, EventTarget, HtmlCanvasElement,
	HtmlElement, KeyboardEvent, MouseEvent, WheelEvent,
};

use super::error::GraphError;
use super::layout::FRAME_MS;
use super::render;
use super::state::{GraphScene, InteractionMode, PointerOutcome, VisualizerConfig};
use super::types::{GraphNode, GraphSummary, Point, RelationshipRecord, RootData};

/// Name of the DOM event fired on the container when a node is clicked.
/// `detail` carries `{ node, originalPointerEvent }`.
pub const NODE_CLICK_EVENT: &str = "nodeClick";

const MAX_FRAME_SECONDS: f64 = 0.1;

/// Rust-side node click subscriber, shared with the mouseup listener.
#[derive(Clone, Default)]
struct NodeClickHandler(Rc<RefCell<Option<Box<dyn FnMut(&GraphNode)>>>>);

impl NodeClickHandler {
	fn set(&self, handler: impl FnMut(&GraphNode) + 'static) {
		*self.0.borrow_mut() = Some(Box::new(handler));
	}

	/// The handler is out of the cell while it runs, so it may replace itself.
	fn run(&self, node: &GraphNode) {
		let taken = self.0.borrow_mut().take();
		if let Some(mut handler) = taken {
			handler(node);
			if self.0.borrow().is_none() {
				*self.0.borrow_mut() = Some(handler);
			}
		}
	}
}

struct Listener {
	target: EventTarget,
	event: &'static str,
	callback: Closure<dyn FnMut(Event)>,
}

/// A graph canvas living inside a host element.
pub struct IpGraphVisualizer {
	container: HtmlElement,
	canvas: HtmlCanvasElement,
	scene: Rc<RefCell<GraphScene>>,
	running: Rc<Cell<bool>>,
	frame: Rc<Cell<i32>>,
	animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
	listeners: Vec<Listener>,
	node_click: NodeClickHandler,
}

impl IpGraphVisualizer {
	/// Attach a new graph canvas to `container`, replacing its children.
	pub fn new(container: HtmlElement, config: VisualizerConfig) -> Result<Self, JsValue> {
		let document = container
			.owner_document()
			.ok_or_else(|| JsValue::from_str("container is not attached to a document"))?;
		let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
		canvas.set_class_name("ip-graph-canvas");
		canvas.set_attribute("tabindex", "0")?;
		let style = canvas.style();
		style.set_property("display", "block")?;
		style.set_property("cursor", "grab")?;
		style.set_property("outline", "none")?;
		container.set_inner_html("");
		container.append_child(&canvas)?;

		let (width, height) = measured_size(&container, &config);
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")?
			.ok_or_else(|| JsValue::from_str("2d canvas context unavailable"))?
			.dyn_into()?;

		let mut visualizer = Self {
			container,
			canvas,
			scene: Rc::new(RefCell::new(GraphScene::new(config, width, height))),
			running: Rc::new(Cell::new(true)),
			frame: Rc::new(Cell::new(0)),
			animate: Rc::new(RefCell::new(None)),
			listeners: Vec::new(),
			node_click: NodeClickHandler::default(),
		};
		visualizer.start_animation(ctx)?;
		visualizer.attach_listeners()?;
		info!("graph visualizer attached at {}x{}", width, height);
		Ok(visualizer)
	}

	/// Build and display the graph for `root_id`. Contract violations leave
	/// an inline error on the canvas and are returned to the caller.
	pub fn load_relationships(
		&self,
		root_id: &str,
		root: &RootData,
		relationships: &[RelationshipRecord],
	) -> Result<(), GraphError> {
		let result = self.scene.borrow_mut().load(root_id, root, relationships);
		self.sync_canvas_hints();
		result
	}

	/// Show an inline error instead of the graph.
	pub fn show_error(&self, err: &GraphError) {
		self.scene.borrow_mut().show_error(err);
		self.sync_canvas_hints();
	}

	/// Return to the placeholder.
	pub fn clear(&self) {
		self.scene.borrow_mut().clear();
		self.sync_canvas_hints();
	}

	/// Re-measure the container and recenter the layout.
	pub fn resize(&self) {
		fit_to_container(&self.container, &self.canvas, &self.scene);
	}

	/// Call `resize` whenever the browser window changes size. The listener
	/// is detached with the rest when the visualizer is dropped.
	pub fn follow_window_resize(&mut self) -> Result<(), JsValue> {
		let window: EventTarget = web_sys::window()
			.ok_or_else(|| JsValue::from_str("no window"))?
			.into();
		let (container, canvas, scene) = (
			self.container.clone(),
			self.canvas.clone(),
			self.scene.clone(),
		);
		self.listen(&window, "resize", move |_| {
			fit_to_container(&container, &canvas, &scene);
		})
	}

	/// Counts for the current graph.
	pub fn summary(&self) -> GraphSummary {
		self.scene.borrow().layout.graph().summary()
	}

	/// Rust-side subscription to node clicks, called before the DOM event.
	pub fn on_node_click(&self, handler: impl FnMut(&GraphNode) + 'static) {
		self.node_click.set(handler);
	}

	fn sync_canvas_hints(&self) {
		update_hints(&self.canvas, &self.scene.borrow());
	}

	fn start_animation(&mut self, ctx: CanvasRenderingContext2d) -> Result<(), JsValue> {
		let (scene, running, frame, animate_inner) = (
			self.scene.clone(),
			self.running.clone(),
			self.frame.clone(),
			self.animate.clone(),
		);
		let mut last: Option<f64> = None;
		*self.animate.borrow_mut() = Some(Closure::new(move |now: f64| {
			if !running.get() {
				return;
			}
			let dt = last.map_or(FRAME_MS / 1000.0, |prev| {
				((now - prev) / 1000.0).clamp(0.0, MAX_FRAME_SECONDS)
			});
			last = Some(now);
			{
				let mut scene = scene.borrow_mut();
				scene.tick(dt);
				render::render(&scene, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				match request_frame(cb) {
					Ok(handle) => frame.set(handle),
					Err(err) => warn!("animation frame request failed: {:?}", err),
				}
			}
		}));
		if let Some(ref cb) = *self.animate.borrow() {
			self.frame.set(request_frame(cb)?);
		}
		Ok(())
	}

	fn attach_listeners(&mut self) -> Result<(), JsValue> {
		let target: EventTarget = self.canvas.clone().into();

		let (scene, canvas) = (self.scene.clone(), self.canvas.clone());
		self.listen(&target, "mousedown", move |event| {
			let Some(ev) = event.dyn_ref::<MouseEvent>() else {
				return;
			};
			let _ = canvas.focus();
			let mut scene = scene.borrow_mut();
			scene.pointer_down(local_point(&canvas, ev));
			update_hints(&canvas, &scene);
		})?;

		let (scene, canvas) = (self.scene.clone(), self.canvas.clone());
		self.listen(&target, "mousemove", move |event| {
			let Some(ev) = event.dyn_ref::<MouseEvent>() else {
				return;
			};
			let mut scene = scene.borrow_mut();
			scene.pointer_move(local_point(&canvas, ev));
			update_hints(&canvas, &scene);
		})?;

		let (scene, canvas, container, node_click) = (
			self.scene.clone(),
			self.canvas.clone(),
			self.container.clone(),
			self.node_click.clone(),
		);
		self.listen(&target, "mouseup", move |event| {
			let Some(ev) = event.dyn_ref::<MouseEvent>() else {
				return;
			};
			// Release the scene before handlers run: they may reload the graph.
			let clicked = {
				let mut scene = scene.borrow_mut();
				let outcome = scene.pointer_up();
				update_hints(&canvas, &scene);
				match outcome {
					Some(PointerOutcome::NodeClicked(index)) => scene.nodes().get(index).cloned(),
					_ => None,
				}
			};
			if let Some(node) = clicked {
				node_click.run(&node);
				dispatch_node_click(&container, &node, ev);
			}
		})?;

		let (scene, canvas) = (self.scene.clone(), self.canvas.clone());
		self.listen(&target, "mouseleave", move |_| {
			let mut scene = scene.borrow_mut();
			scene.pointer_leave();
			update_hints(&canvas, &scene);
		})?;

		let (scene, canvas) = (self.scene.clone(), self.canvas.clone());
		self.listen(&target, "wheel", move |event| {
			let Some(ev) = event.dyn_ref::<WheelEvent>() else {
				return;
			};
			ev.prevent_default();
			scene
				.borrow_mut()
				.wheel(local_point(&canvas, ev), ev.delta_y());
		})?;

		let (scene, canvas) = (self.scene.clone(), self.canvas.clone());
		self.listen(&target, "dblclick", move |event| {
			let Some(ev) = event.dyn_ref::<MouseEvent>() else {
				return;
			};
			scene.borrow_mut().double_click(local_point(&canvas, ev));
		})?;

		let scene = self.scene.clone();
		self.listen(&target, "keydown", move |event| {
			if event
				.dyn_ref::<KeyboardEvent>()
				.is_some_and(|ev| ev.key() == "Escape")
			{
				scene.borrow_mut().clear_selection();
			}
		})?;

		Ok(())
	}

	fn listen(
		&mut self,
		target: &EventTarget,
		event: &'static str,
		handler: impl FnMut(Event) + 'static,
	) -> Result<(), JsValue> {
		let callback = Closure::<dyn FnMut(Event)>::new(handler);
		target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
		self.listeners.push(Listener {
			target: target.clone(),
			event,
			callback,
		});
		Ok(())
	}
}

impl Drop for IpGraphVisualizer {
	fn drop(&mut self) {
		self.running.set(false);
		if let Some(window) = web_sys::window() {
			let _ = window.cancel_animation_frame(self.frame.get());
		}
		self.animate.borrow_mut().take();
		for listener in self.listeners.drain(..) {
			let _ = listener.target.remove_event_listener_with_callback(
				listener.event,
				listener.callback.as_ref().unchecked_ref(),
			);
		}
	}
}

fn fit_to_container(
	container: &HtmlElement,
	canvas: &HtmlCanvasElement,
	scene: &Rc<RefCell<GraphScene>>,
) {
	let mut scene = scene.borrow_mut();
	let (width, height) = measured_size(container, &scene.config);
	canvas.set_width(width as u32);
	canvas.set_height(height as u32);
	scene.resize(width, height);
}

fn measure(container: &HtmlElement) -> Result<(f64, f64), GraphError> {
	let (width, height) = (
		container.client_width() as f64,
		container.client_height() as f64,
	);
	if width > 0.0 && height > 0.0 {
		Ok((width, height))
	} else {
		Err(GraphError::ContainerUnmeasured { width, height })
	}
}

fn measured_size(container: &HtmlElement, config: &VisualizerConfig) -> (f64, f64) {
	measure(container).unwrap_or_else(|err| {
		warn!(
			"{}, falling back to {}x{}",
			err, config.fallback_width, config.fallback_height
		);
		(config.fallback_width, config.fallback_height)
	})
}

fn request_frame(cb: &Closure<dyn FnMut(f64)>) -> Result<i32, JsValue> {
	web_sys::window()
		.ok_or_else(|| JsValue::from_str("no window"))?
		.request_animation_frame(cb.as_ref().unchecked_ref())
}

fn local_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn update_hints(canvas: &HtmlCanvasElement, scene: &GraphScene) {
	let cursor = match scene.mode() {
		InteractionMode::Dragging(_) | InteractionMode::Panning => "grabbing",
		_ if scene.hovered().is_some() => "pointer",
		_ => "grab",
	};
	let _ = canvas.style().set_property("cursor", cursor);
	let _ = match scene.hovered_tooltip() {
		Some(tooltip) => canvas.set_attribute("title", &tooltip),
		None => canvas.remove_attribute("title"),
	};
}

fn dispatch_node_click(container: &HtmlElement, node: &GraphNode, original: &MouseEvent) {
	let node_value = match serde_wasm_bindgen::to_value(node) {
		Ok(value) => value,
		Err(err) => {
			warn!("could not encode clicked node {}: {}", node.id, err);
			return;
		}
	};
	let detail = js_sys::Object::new();
	let _ = js_sys::Reflect::set(&detail, &"node".into(), &node_value);
	let _ = js_sys::Reflect::set(&detail, &"originalPointerEvent".into(), original);

	let init = CustomEventInit::new();
	init.set_detail(&detail);
	init.set_bubbles(true);
	match CustomEvent::new_with_event_init_dict(NODE_CLICK_EVENT, &init) {
		Ok(event) => {
			let _ = container.dispatch_event(&event);
		}
		Err(err) => warn!("could not create {} event: {:?}", NODE_CLICK_EVENT, err),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::ip_graph::NodeRole;

	#[test]
	fn click_handler_can_replace_itself() {
		let slot = NodeClickHandler::default();
		let calls = Rc::new(Cell::new(0));

		let (inner_slot, inner_calls) = (slot.clone(), calls.clone());
		slot.set(move |_| {
			inner_calls.set(inner_calls.get() + 1);
			let replaced = inner_calls.clone();
			inner_slot.set(move |_| replaced.set(replaced.get() + 10));
		});

		let node = GraphNode::new("0xa", "A", NodeRole::Child);
		slot.run(&node);
		assert_eq!(calls.get(), 1);
		slot.run(&node);
		assert_eq!(calls.get(), 11);
	}

	#[test]
	fn click_handler_survives_its_own_call() {
		let slot = NodeClickHandler::default();
		let calls = Rc::new(Cell::new(0));
		let counted = calls.clone();
		slot.set(move |_| counted.set(counted.get() + 1));

		let node = GraphNode::new("0xa", "A", NodeRole::Child);
		slot.run(&node);
		slot.run(&node);
		assert_eq!(calls.get(), 2);
	}
}
