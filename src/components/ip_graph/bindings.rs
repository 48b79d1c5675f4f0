//! JavaScript entry point for hosts that embed the graph without Leptos.
//!
//! ```js
//! const graph = new IpGraph(document.getElementById("graph"));
//! await graph.loadRelationships(rootId, { name, owner, revenue }, relationships);
//! element.addEventListener("nodeClick", (e) => console.log(e.detail.node));
//! ```

use js_sys::{Array, Promise};
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use super::error::GraphError;
use super::state::VisualizerConfig;
use super::types::{RelationshipList, RelationshipRecord, RootData};
use super::visualizer::IpGraphVisualizer;

/// Relationship graph bound to a host element.
#[wasm_bindgen]
pub struct IpGraph {
	inner: IpGraphVisualizer,
}

#[wasm_bindgen]
impl IpGraph {
	/// Attach to `container` and show the empty-state placeholder.
	#[wasm_bindgen(constructor)]
	pub fn new(container: HtmlElement) -> Result<IpGraph, JsValue> {
		IpGraphVisualizer::new(container, VisualizerConfig::default()).map(|inner| Self { inner })
	}

	/// Replace whatever is displayed with the graph around `root_id`.
	///
	/// Resolves once the graph is built and handed to the layout. Rejects on
	/// an empty id or a relationship list that is not an array; the canvas
	/// shows an inline error in that case.
	#[wasm_bindgen(js_name = loadRelationships)]
	pub fn load_relationships(
		&self,
		root_id: &str,
		root_data: JsValue,
		relationships: JsValue,
	) -> Promise {
		let root = decode_root(root_data);
		let loaded = decode_relationships(relationships)
			.inspect_err(|err| self.inner.show_error(err))
			.and_then(|records| self.inner.load_relationships(root_id, &root, &records));
		match loaded {
			Ok(()) => Promise::resolve(&JsValue::UNDEFINED),
			Err(err) => Promise::reject(&JsError::from(err).into()),
		}
	}

	/// Stop interaction state and return to the placeholder.
	pub fn clear(&self) {
		self.inner.clear();
	}

	/// Re-measure the host element. Call after the container changes size.
	pub fn resize(&self) {
		self.inner.resize();
	}
}

fn decode_root(value: JsValue) -> RootData {
	if value.is_null() || value.is_undefined() {
		return RootData::default();
	}
	serde_wasm_bindgen::from_value(value).unwrap_or_else(|err| {
		warn!("ignoring unreadable root data: {}", err);
		RootData::default()
	})
}

fn decode_relationships(value: JsValue) -> Result<Vec<RelationshipRecord>, GraphError> {
	if !Array::is_array(&value) {
		return Err(GraphError::RelationshipsNotArray);
	}
	serde_wasm_bindgen::from_value::<RelationshipList>(value)
		.map(|list| list.0)
		.map_err(|err| GraphError::InvalidRecords(err.to_string()))
}
