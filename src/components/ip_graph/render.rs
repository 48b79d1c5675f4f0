use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{GraphScene, HOVER_GROWTH, NodeEmphasis, SceneContent, ease_out_cubic};
use super::types::GraphNode;

const BACKGROUND: &str = "#fafafa";
const MUTED_TEXT: &str = "#6b7280";
const ARROW_SIZE: f64 = 8.0;

/// Draw the whole scene. The canvas is expected to be `scene.width` x `scene.height`.
pub fn render(scene: &GraphScene, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);

	match &scene.content {
		SceneContent::Placeholder => draw_placeholder(scene, ctx),
		SceneContent::Error(message) => draw_error(scene, ctx, message),
		SceneContent::Graph => {
			ctx.save();
			let _ = ctx.translate(scene.transform.x, scene.transform.y);
			let _ = ctx.scale(scene.transform.k, scene.transform.k);
			draw_edges(scene, ctx);
			draw_nodes(scene, ctx);
			ctx.restore();
		}
	}
}

fn draw_placeholder(scene: &GraphScene, ctx: &CanvasRenderingContext2d) {
	let (cx, cy) = (scene.width / 2.0, scene.height / 2.0);

	ctx.begin_path();
	let _ = ctx.arc(cx, cy, 30.0, 0.0, 2.0 * PI);
	ctx.set_fill_style_str("#f8f9fa");
	ctx.fill();
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(5.0),
		&JsValue::from_f64(5.0),
	));
	ctx.set_stroke_style_str("#dee2e6");
	ctx.set_line_width(2.0);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	ctx.set_text_align("center");
	ctx.set_font("24px sans-serif");
	let _ = ctx.fill_text("🎯", cx, cy + 8.0);
	ctx.set_font("12px sans-serif");
	ctx.set_fill_style_str(MUTED_TEXT);
	let _ = ctx.fill_text("Search for an IP Asset", cx, cy + 50.0);
	let _ = ctx.fill_text("to visualize relationships", cx, cy + 65.0);
}

fn draw_error(scene: &GraphScene, ctx: &CanvasRenderingContext2d, message: &str) {
	ctx.set_text_align("center");
	ctx.set_font("14px sans-serif");
	ctx.set_fill_style_str("#ef4444");
	let _ = ctx.fill_text(message, scene.width / 2.0, scene.height / 2.0);
}

fn draw_edges(scene: &GraphScene, ctx: &CanvasRenderingContext2d) {
	let nodes = scene.nodes();

	for edge in scene.edges() {
		let (Some(si), Some(ti)) = (
			scene.layout.index_of(&edge.source_id),
			scene.layout.index_of(&edge.target_id),
		) else {
			continue;
		};
		let (source, target) = (&nodes[si], &nodes[ti]);
		let (x1, y1, x2, y2) = (
			source.position.x,
			source.position.y,
			target.position.x,
			target.position.y,
		);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		let source_r = source.radius() * scene.hover_scale(si);
		let target_r = target.radius() * scene.hover_scale(ti);
		if dist <= source_r + target_r {
			continue;
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.set_global_alpha(scene.edge_opacity(edge));
		ctx.set_stroke_style_str(edge.kind.color());
		ctx.set_fill_style_str(edge.kind.color());
		ctx.set_line_width(edge.stroke_width());

		ctx.begin_path();
		ctx.move_to(x1 + ux * source_r, y1 + uy * source_r);
		ctx.line_to(
			x2 - ux * (target_r + ARROW_SIZE),
			y2 - uy * (target_r + ARROW_SIZE),
		);
		ctx.stroke();

		let (tip_x, tip_y) = (x2 - ux * target_r, y2 - uy * target_r);
		let (back_x, back_y) = (tip_x - ux * ARROW_SIZE, tip_y - uy * ARROW_SIZE);
		let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(scene: &GraphScene, ctx: &CanvasRenderingContext2d) {
	for (i, node) in scene.nodes().iter().enumerate() {
		let scale = scene.hover_scale(i);
		let radius = node.radius() * scale;
		let (x, y) = (node.position.x, node.position.y);
		let emphasis = scene.emphasis(i);

		if emphasis == NodeEmphasis::Selected {
			draw_halo(ctx, x, y, radius);
		}

		// Hover deepens the drop shadow along with the radius.
		let lift = ease_out_cubic(((scale - 1.0) / HOVER_GROWTH).clamp(0.0, 1.0));
		ctx.set_shadow_color(&format!("rgba(0, 0, 0, {})", 0.1 + 0.1 * lift));
		ctx.set_shadow_blur(4.0 + 4.0 * lift);
		ctx.set_shadow_offset_y(2.0 + 2.0 * lift);

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.role.color());
		ctx.fill();

		ctx.set_shadow_color("transparent");
		ctx.set_shadow_blur(0.0);
		ctx.set_shadow_offset_y(0.0);

		let (stroke, width) = match emphasis {
			NodeEmphasis::Selected => ("#ff6b6b", 4.0),
			NodeEmphasis::Neighbor => ("#4ecdc4", 4.0),
			NodeEmphasis::Normal => ("#fff", 3.0),
		};
		ctx.set_stroke_style_str(stroke);
		ctx.set_line_width(width);
		ctx.stroke();

		draw_labels(ctx, node, x, y, radius);
	}
}

fn draw_halo(ctx: &CanvasRenderingContext2d, x: f64, y: f64, radius: f64) {
	let outer = radius * 1.8;
	let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.8, x, y, outer) else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, "rgba(255, 107, 107, 0.35)");
	let _ = gradient.add_color_stop(1.0, "rgba(255, 107, 107, 0)");
	ctx.begin_path();
	let _ = ctx.arc(x, y, outer, 0.0, 2.0 * PI);
	ctx.set_fill_style_canvas_gradient(&gradient);
	ctx.fill();
}

fn draw_labels(ctx: &CanvasRenderingContext2d, node: &GraphNode, x: f64, y: f64, radius: f64) {
	ctx.set_text_align("center");
	ctx.set_font("600 11px sans-serif");
	ctx.set_fill_style_str("#333");
	let _ = ctx.fill_text(&node.label(), x, y + radius + 18.0);

	if let Some(revenue) = node.revenue_label() {
		ctx.set_font("500 9px sans-serif");
		ctx.set_fill_style_str("#10b981");
		let _ = ctx.fill_text(&revenue, x, y + radius + 32.0);
	}
}
