use leptos::prelude::*;

use crate::components::ip_graph::{
	EdgeKind, GraphNode, GraphRequest, GraphSummary, IpGraphCanvas, NodeRole, RelationshipRecord,
	RootData,
};

const DEFAULT_ROOT: &str = "0x7a3b9c0d1e2f4a5b6c7d8e9f0a1b2c3d4e5f6a7b";

/// Sample relationships around `root_id` (deterministic for consistency).
fn sample_relationships(root_id: &str) -> Vec<RelationshipRecord> {
	let mut records = vec![
		RelationshipRecord::new("parent", "0xa11ce0000000000000000000000000000000beef", root_id)
			.with_name("Genesis Artwork")
			.with_owner("0x1f9a8b7c6d5e4f3a")
			.with_revenue(420.0),
		RelationshipRecord::new("license", "0xb0b0000000000000000000000000000000000cafe", root_id)
			.with_name("Soundtrack License")
			.with_owner("0x2e8b7c6d5e4f3a1f")
			.with_revenue(85.5),
	];

	for i in 0..6 {
		records.push(
			RelationshipRecord::new("derivative", root_id, derivative_id(i))
				.with_name(format!("Remix #{}", i + 1))
				.with_owner(format!("0x{:04x}cafe", i * 4099))
				.with_revenue((rand_simple(i) * 250.0).round())
				.with_derivatives((rand_simple(i + 7) * 5.0).floor()),
		);
	}

	// A derivative of a derivative, and a second mention of an existing node.
	records.push(
		RelationshipRecord::new("derivative", derivative_id(0), derivative_id(3)).with_revenue(40.0),
	);
	records.push(RelationshipRecord::new("license", root_id, derivative_id(1)).with_revenue(12.0));
	records
}

fn derivative_id(i: usize) -> String {
	format!("0xd3r1{:036x}", i + 1)
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let (root_id, set_root_id) = signal(DEFAULT_ROOT.to_string());
	let (request, set_request) = signal(None::<GraphRequest>);
	let (summary, set_summary) = signal(GraphSummary::default());
	let (clicked, set_clicked) = signal(None::<GraphNode>);

	let visualize = move |_| {
		let id = root_id.get_untracked().trim().to_string();
		let relationships = sample_relationships(&id);
		set_clicked.set(None);
		set_request.set(Some(GraphRequest {
			root_id: id,
			root: RootData {
				name: Some("Story Demo Asset".to_string()),
				owner: Some("0x9c8d7e6f5a4b3c2d".to_string()),
				revenue: Some(1280.0),
			},
			relationships,
		}));
	};
	let clear = move |_| {
		set_clicked.set(None);
		set_request.set(None);
	};

	let role_legend = NodeRole::ALL
		.iter()
		.map(|role| {
			view! {
				<li>
					<span class="swatch round" style=format!("background: {}", role.color())></span>
					{role.as_str()}
				</li>
			}
		})
		.collect_view();
	let edge_legend = EdgeKind::ALL
		.iter()
		.map(|kind| {
			view! {
				<li>
					<span class="swatch line" style=format!("background: {}", kind.color())></span>
					{kind.as_str()}
				</li>
			}
		})
		.collect_view();

	view! {
		<div class="page">
			<header class="toolbar">
				<h1>"IP Relationship Graph"</h1>
				<input
					type="text"
					placeholder="IP asset id"
					prop:value=root_id
					on:input=move |ev| set_root_id.set(event_target_value(&ev))
				/>
				<button on:click=visualize>"Visualize"</button>
				<button on:click=clear>"Clear"</button>
			</header>

			<main class="graph-area">
				<IpGraphCanvas
					request=request
					on_node_click=Callback::new(move |node: GraphNode| set_clicked.set(Some(node)))
					on_summary=Callback::new(move |s: GraphSummary| set_summary.set(s))
				/>
			</main>

			<aside class="sidebar">
				<p class="subtitle">
					"Click a node to highlight its neighbors. Drag nodes to pin them. Scroll to zoom, drag the background to pan, double-click to reset."
				</p>
				<h2>"Legend"</h2>
				<ul class="legend">{role_legend}</ul>
				<ul class="legend">{edge_legend}</ul>

				<h2>"Summary"</h2>
				<p>
					{move || {
						let s = summary.get();
						format!(
							"{} parents, {} children, {} derivatives, {} edges, ${:.1} total revenue",
							s.parents,
							s.children,
							s.derivatives,
							s.edges,
							s.total_revenue,
						)
					}}
				</p>

				<h2>"Selected"</h2>
				{move || match clicked.get() {
					Some(node) => {
						view! {
							<dl class="details">
								<dt>"Name"</dt>
								<dd>{node.display_name.clone()}</dd>
								<dt>"Id"</dt>
								<dd class="mono">{node.id.clone()}</dd>
								<dt>"Type"</dt>
								<dd>{node.role.as_str()}</dd>
								<dt>"Owner"</dt>
								<dd class="mono">{node.owner.clone()}</dd>
								<dt>"Revenue"</dt>
								<dd>{format!("${:.1}", node.revenue)}</dd>
								<dt>"Derivatives"</dt>
								<dd>{node.derivative_count}</dd>
							</dl>
						}
							.into_any()
					}
					None => view! { <p class="subtitle">"Nothing selected"</p> }.into_any(),
				}}
			</aside>
		</div>
	}
}
