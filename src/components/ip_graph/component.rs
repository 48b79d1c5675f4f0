use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, warn};
use web_sys::HtmlElement;

use super::state::VisualizerConfig;
use super::types::{GraphNode, GraphSummary, RelationshipRecord, RootData};
use super::visualizer::IpGraphVisualizer;

/// One `loadRelationships` call, as a value a signal can carry.
#[derive(Clone, Debug, Default)]
pub struct GraphRequest {
	/// Asset whose relationships are shown.
	pub root_id: String,
	/// Metadata for the root node.
	pub root: RootData,
	/// Records exactly as received upstream.
	pub relationships: Vec<RelationshipRecord>,
}

/// Relationship graph for Leptos pages.
///
/// `None` shows the placeholder; every new request rebuilds the graph.
/// Load failures are rendered inline and logged. The canvas is re-measured
/// whenever the window resizes.
#[component]
pub fn IpGraphCanvas(
	/// Graph to show; `None` for the placeholder.
	#[prop(into)]
	request: Signal<Option<GraphRequest>>,
	/// Called with the node under a click.
	#[prop(optional)]
	on_node_click: Option<Callback<GraphNode>>,
	/// Called with the counts after each load or clear.
	#[prop(optional)]
	on_summary: Option<Callback<GraphSummary>>,
	/// Class of the container element.
	#[prop(default = "ip-graph")]
	class: &'static str,
) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let visualizer: Rc<RefCell<Option<IpGraphVisualizer>>> = Rc::new(RefCell::new(None));

	Effect::new(move |_| {
		let Some(div) = container_ref.get() else {
			return;
		};
		let request = request.get();

		if visualizer.borrow().is_none() {
			let container: HtmlElement = div.into();
			match IpGraphVisualizer::new(container, VisualizerConfig::default()) {
				Ok(mut created) => {
					if let Err(err) = created.follow_window_resize() {
						warn!("graph canvas will not follow window resizes: {:?}", err);
					}
					if let Some(callback) = on_node_click {
						created.on_node_click(move |node| callback.run(node.clone()));
					}
					*visualizer.borrow_mut() = Some(created);
				}
				Err(err) => {
					error!("could not create graph canvas: {:?}", err);
					return;
				}
			}
		}

		let guard = visualizer.borrow();
		let Some(graph) = guard.as_ref() else {
			return;
		};
		match request {
			Some(req) => {
				// Failures are already drawn on the canvas and logged by the scene.
				let _ = graph.load_relationships(&req.root_id, &req.root, &req.relationships);
			}
			None => graph.clear(),
		}
		if let Some(callback) = on_summary {
			callback.run(graph.summary());
		}
	});

	view! { <div node_ref=container_ref class=class style="width: 100%; height: 100%;" /> }
}
