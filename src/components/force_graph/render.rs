//! Canvas rendering for the SBOM graph.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Links with arrowheads (world space)
//! 3. Nodes and labels, the selected node last so it sits on top
//! 4. Vignette (screen space)
//!
//! Nodes and links that fail the SBOM or type filters are skipped.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::graph::types::{Component, Link, LinkKind};
use crate::graph::{GraphState, Projection};
use crate::theme::{Color, Theme};

use super::layout::LayoutDriver;
use super::scale::{ScaleConfig, ScaledValues};

type Positions = HashMap<String, (f64, f64)>;

/// Renders the complete graph to the canvas.
pub fn render(
	layout: &LayoutDriver,
	state: &GraphState,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
) {
	let scale = ScaledValues::new(config, layout.transform.k);
	let projection = Projection::new(state, theme);
	let positions = layout.positions();

	draw_background(layout, ctx, theme);

	ctx.save();
	let _ = ctx.translate(layout.transform.x, layout.transform.y);
	let _ = ctx.scale(layout.transform.k, layout.transform.k);

	draw_links(state, &projection, &positions, ctx, &scale, theme);
	draw_nodes(state, &projection, &positions, ctx, &scale, theme);

	ctx.restore();

	if theme.background.vignette > 0.0 {
		draw_vignette(layout, ctx, theme);
	}
}

fn draw_background(layout: &LayoutDriver, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (w, h) = (layout.width, layout.height);
	let gradient = theme
		.background
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(w / 2.0, h / 2.0, 0.0, w / 2.0, h / 2.0, w.max(h) * 0.8)
				.ok()
		})
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}

	ctx.fill_rect(0.0, 0.0, w, h);
}

fn draw_vignette(layout: &LayoutDriver, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (w, h) = (layout.width, layout.height);
	let Ok(gradient) = ctx.create_radial_gradient(
		w / 2.0,
		h / 2.0,
		w.min(h) * 0.3,
		w / 2.0,
		h / 2.0,
		w.max(h) * 0.7,
	) else {
		return;
	};

	let _ = gradient.add_color_stop(0.0, "rgba(0, 0, 0, 0)");
	let _ = gradient.add_color_stop(
		1.0,
		&format!("rgba(0, 0, 0, {})", theme.background.vignette),
	);

	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill_rect(0.0, 0.0, w, h);
}

fn link_color(theme: &Theme, kind: &LinkKind) -> Color {
	match kind {
		LinkKind::Declared(_) => theme.edge.color,
		LinkKind::CrossSbom => theme.edge.cross_sbom_color,
		LinkKind::ClusterToNode | LinkKind::NodeToCluster | LinkKind::ClusterToCluster => {
			theme.edge.cluster_color
		}
	}
}

fn draw_links(
	state: &GraphState,
	projection: &Projection<'_>,
	positions: &Positions,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	for link in state.links() {
		if projection.link_visible(link) {
			draw_link(state, projection, positions, ctx, scale, theme, link);
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_link(
	state: &GraphState,
	projection: &Projection<'_>,
	positions: &Positions,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
	link: &Link,
) {
	let (Some(&(x1, y1)), Some(&(x2, y2))) =
		(positions.get(&link.source), positions.get(&link.target))
	else {
		return;
	};
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}

	let radius_of = |id: &str| {
		projection
			.node(id)
			.map_or(0.0, |node| scale.node_radius(projection.node_radius(node)))
	};
	let (r1, r2) = (radius_of(&link.source), radius_of(&link.target));
	if dist <= r1 + r2 {
		return;
	}

	let opacity = projection.link_opacity(link);
	let color = link_color(theme, &link.kind);
	let touches_selection = state.selected().is_some_and(|id| link.touches(id));

	ctx.set_stroke_style_str(&color.with_alpha(opacity * color.a).to_css());
	ctx.set_line_width(if touches_selection {
		scale.selected_line_width
	} else {
		scale.edge_line_width
	});

	if matches!(link.kind, LinkKind::Declared(_)) {
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	} else {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(scale.dash_pattern.0),
			&JsValue::from_f64(scale.dash_pattern.1),
		));
	}

	let (ux, uy) = (dx / dist, dy / dist);
	let arrow = if scale.cull_arrows { 0.0 } else { scale.arrow_size };

	ctx.begin_path();
	ctx.move_to(x1 + ux * r1, y1 + uy * r1);
	ctx.line_to(x2 - ux * (r2 + arrow), y2 - uy * (r2 + arrow));
	ctx.stroke();

	if scale.cull_arrows {
		return;
	}

	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_fill_style_str(
		&color
			.with_alpha(opacity * scale.arrow_alpha * color.a)
			.to_css(),
	);

	let (tip_x, tip_y) = (x2 - ux * r2, y2 - uy * r2);
	let (back_x, back_y) = (tip_x - ux * arrow, tip_y - uy * arrow);
	let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);

	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(
	state: &GraphState,
	projection: &Projection<'_>,
	positions: &Positions,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let selected = state.selected();
	let (top, rest): (Vec<&Component>, Vec<&Component>) = state
		.nodes()
		.iter()
		.partition(|node| Some(node.id.as_str()) == selected);

	for node in rest.into_iter().chain(top) {
		let Some(&(x, y)) = positions.get(&node.id) else {
			continue;
		};
		draw_node(ctx, projection, scale, theme, node, x, y);
	}
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	projection: &Projection<'_>,
	scale: &ScaledValues,
	theme: &Theme,
	node: &Component,
	x: f64,
	y: f64,
) {
	let style = projection.node_style(node);
	if !style.visible {
		return;
	}
	let radius = scale.node_radius(style.radius);

	let gradient = theme
		.node
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius)
				.ok()
		})
		.flatten();

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &style.fill.lighten(0.4).to_css());
			let _ = gradient.add_color_stop(0.7, &style.fill.to_css());
			let _ = gradient.add_color_stop(1.0, &style.fill.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&style.fill.to_css()),
	}
	ctx.fill();

	ctx.set_stroke_style_str(&style.stroke.color.to_css());
	ctx.set_line_width(style.stroke.width / scale.k);
	ctx.stroke();

	if node.is_cluster {
		if let Some(count) = node.component_count {
			ctx.set_fill_style_str(&theme.node.label_color.to_css());
			ctx.set_font(&scale.label_font);
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&count.to_string(), x, y + 4.0 / scale.k);
			ctx.set_text_align("start");
		}
	}

	let emphasized = node.is_cluster || style.class.contains("selected");
	let alpha = if emphasized { 1.0 } else { scale.label_alpha };
	if alpha > 0.01 {
		let color = theme.node.label_color;
		ctx.set_fill_style_str(&color.with_alpha(color.a * alpha).to_css());
		ctx.set_font(&scale.label_font);
		let _ = ctx.fill_text(&style.label, x + radius + 4.0 / scale.k, y + 3.0 / scale.k);
	}
}
