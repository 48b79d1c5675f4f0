use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="page not-found">
			<h1>"Nothing to see here"</h1>
			<p class="subtitle">"This page does not exist."</p>
			<a href="/">"Back to the graph"</a>
		</div>
	}
}
