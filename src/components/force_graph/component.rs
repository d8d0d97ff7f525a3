//! Leptos component wrapping the SBOM graph canvas.
//!
//! The component creates an HTML canvas element and wires up mouse/wheel event
//! handlers for node dragging, selection, panning, and zooming. An animation loop
//! runs via `requestAnimationFrame`, stepping the layout and redrawing each frame.
//!
//! The shared [`GraphState`] signal is the single source of truth. The canvas
//! reads it untracked every frame and watches two revision counters: a new
//! layout revision restarts the simulation with the current working set, a new
//! style revision only updates node radii.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use crate::error::InitError;
use crate::graph::{GraphState, Projection};
use crate::theme::Theme;

use super::layout::{LayoutDriver, LayoutNode};
use super::render;
use super::scale::ScaleConfig;

const FRAME_DT: f32 = 0.016;

/// Bundles the layout driver with visual configuration.
struct GraphContext {
	layout: LayoutDriver,
	scale: ScaleConfig,
	theme: Theme,
}

fn layout_input(state: &GraphState, theme: &Theme) -> (Vec<LayoutNode>, Vec<(String, String)>) {
	let projection = Projection::new(state, theme);
	let nodes = state
		.nodes()
		.iter()
		.map(|node| LayoutNode {
			id: node.id.clone(),
			radius: projection.node_radius(node),
		})
		.collect();
	let links = state
		.links()
		.iter()
		.map(|link| (link.source.clone(), link.target.clone()))
		.collect();
	(nodes, links)
}

fn node_radii(state: &GraphState, theme: &Theme) -> HashMap<String, f64> {
	let projection = Projection::new(state, theme);
	state
		.nodes()
		.iter()
		.map(|node| (node.id.clone(), projection.node_radius(node)))
		.collect()
}

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn or_fallback(value: f64, fallback: f64) -> f64 {
	if value > 0.0 { value } else { fallback }
}

fn canvas_size(
	window: &Window,
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> Result<(f64, f64), InitError> {
	if fullscreen {
		return Ok(viewport_size(window).unwrap_or((800.0, 600.0)));
	}
	if let (Some(w), Some(h)) = (width, height) {
		return Ok((w, h));
	}
	let parent = canvas.parent_element().ok_or(InitError::NoCanvas)?;
	Ok((
		width.unwrap_or_else(|| or_fallback(parent.client_width() as f64, 800.0)),
		height.unwrap_or_else(|| or_fallback(parent.client_height() as f64, 600.0)),
	))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, InitError> {
	canvas
		.get_context("2d")
		.ok()
		.flatten()
		.ok_or(InitError::NoContext)?
		.dyn_into()
		.map_err(|_| InitError::NoContext)
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders the interactive SBOM graph on a canvas element.
///
/// The component sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the viewport and resize with the window.
/// Explicit `width`/`height` override automatic sizing.
#[component]
pub fn ForceGraphCanvas(
	state: RwSignal<GraphState>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let init_error = RwSignal::new(None::<String>);
	let context: Rc<RefCell<Option<GraphContext>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (context_init, animate_init, resize_cb_init) =
		(context.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if context_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();

		let setup = || -> Result<(Window, CanvasRenderingContext2d, f64, f64), InitError> {
			let window = web_sys::window().ok_or(InitError::NoWindow)?;
			let (w, h) = canvas_size(&window, &canvas, fullscreen, width, height)?;
			let ctx = context_2d(&canvas)?;
			Ok((window, ctx, w, h))
		};
		let (window, ctx, w, h) = match setup() {
			Ok(parts) => parts,
			Err(e) => {
				error!("sbom-graph: {}", e);
				init_error.set(Some(e.to_string()));
				return;
			}
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some((theme, layout_config)) = state.try_with_untracked(|s| {
			(Theme::by_name(&s.config().theme), s.config().layout.clone())
		}) else {
			return;
		};
		let mut layout = LayoutDriver::new(layout_config, w, h);
		if let Some((nodes, links)) = state.try_with_untracked(|s| layout_input(s, &theme)) {
			layout.set_data(nodes, links);
		}
		info!("sbom-graph: canvas ready at {}x{} ({} theme)", w, h, theme.name);

		*context_init.borrow_mut() = Some(GraphContext {
			layout,
			scale: ScaleConfig::default(),
			theme,
		});

		if fullscreen {
			let (context_resize, canvas_resize) = (context_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(viewport_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut c) = *context_resize.borrow_mut() {
					c.layout.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let mut mounted = true;
			if let Some(ref mut c) = *context_anim.borrow_mut() {
				if let Err(e) = c.layout.tick(FRAME_DT) {
					error!("sbom-graph: {}", e);
				}
				mounted = state
					.try_with_untracked(|s| render::render(&c.layout, s, &ctx, &c.scale, &c.theme))
					.is_some();
			}
			// The state signal is gone once the component unmounts.
			if !mounted {
				return;
			}
			if let (Some(cb), Some(window)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let layout_revision = Memo::new(move |_| state.with(|s| s.layout_revision()));
	let context_data = context.clone();
	Effect::new(move |_| {
		layout_revision.track();
		if let Some(ref mut c) = *context_data.borrow_mut() {
			if let Some((nodes, links)) = state.try_with_untracked(|s| layout_input(s, &c.theme)) {
				c.layout.set_data(nodes, links);
			}
		}
	});

	let style_revision = Memo::new(move |_| state.with(|s| s.style_revision()));
	let context_style = context.clone();
	Effect::new(move |_| {
		style_revision.track();
		if let Some(ref mut c) = *context_style.borrow_mut() {
			if let Some(radii) = state.try_with_untracked(|s| node_radii(s, &c.theme)) {
				c.layout.update_radii(&radii);
			}
		}
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_md.borrow_mut() {
			let hit = state
				.try_with_untracked(|s| {
					let projection = Projection::new(s, &c.theme);
					c.layout.node_at_position(x, y, &c.scale, |id| {
						projection
							.node(id)
							.is_some_and(|node| projection.node_visible(node))
					})
				})
				.flatten();
			match hit {
				Some((idx, id)) => c.layout.begin_drag(idx, id, x, y),
				None => c.layout.begin_pan(x, y),
			}
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_mm.borrow_mut() {
			if c.layout.drag.active {
				c.layout.drag_to(x, y);
			} else {
				c.layout.pan_to(x, y);
			}
		}
	};

	let context_mu = context.clone();
	let on_mouseup = move |_: MouseEvent| {
		let released = context_mu.borrow_mut().as_mut().and_then(|c| {
			c.layout.end_pan();
			c.layout.end_drag()
		});
		// A press without movement is a click: toggle the selection.
		if let Some((id, false)) = released {
			state.update(|s| {
				s.select_node(&id);
			});
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_ml.borrow_mut() {
			c.layout.end_drag();
			c.layout.end_pan();
		}
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_wh.borrow_mut() {
			c.layout.zoom_at(x, y, ev.delta_y());
		}
	};

	view! {
		<div class="graph-canvas-container">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<Show when=move || init_error.with(Option::is_some)>
				<div class="graph-error">
					<h2>"Unable to start the graph view"</h2>
					<p>{move || init_error.get().unwrap_or_default()}</p>
				</div>
			</Show>
		</div>
	}
}
