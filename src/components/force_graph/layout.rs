//! Force layout driver.
//!
//! Wraps the `force_graph` physics simulation (spring force along links,
//! charge repulsion, damping) and adds a centering force and radius-aware
//! collision avoidance. The driver is cooperative: [`LayoutDriver::tick`]
//! advances one step and is called from the animation frame loop.
//!
//! Cooling follows an alpha value. Replacing the data resets alpha to 1;
//! dragging holds it at a target above zero; once alpha decays below the
//! minimum the driver goes idle and ticks become no-ops.

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::warn;

use crate::config::LayoutConfig;
use crate::error::LayoutError;

use super::scale::{ScaleConfig, ScaledValues};

/// Per-node metadata attached to each node in the simulation.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	/// Radius in world units, used for collisions and hit testing.
	pub radius: f64,
}

/// Input node for [`LayoutDriver::set_data`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	pub id: String,
	pub radius: f64,
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to 0.1..10.0).
	pub k: f64,
}

/// Tracks an in-progress node drag operation.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub node_id: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
	/// Whether the pointer moved far enough to count as a drag, not a click.
	pub moved: bool,
}

/// Tracks an in-progress canvas pan operation.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Simulation state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutPhase {
	Idle,
	Simulating,
}

/// Pointer travel (screen pixels) below which a press counts as a click.
const CLICK_TOLERANCE: f64 = 3.0;

/// Alpha used when node radii change without new data.
const RESTYLE_ALPHA: f64 = 0.3;

#[derive(Clone, Copy)]
struct Body {
	idx: DefaultNodeIdx,
	x: f64,
	y: f64,
	r: f64,
	pinned: bool,
}

/// Physics harness for the working node/link set.
pub struct LayoutDriver {
	graph: ForceGraph<NodeInfo, ()>,
	index: HashMap<String, DefaultNodeIdx>,
	nodes: Vec<LayoutNode>,
	links: Vec<(String, String)>,
	config: LayoutConfig,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	alpha: f64,
	alpha_target: f64,
	phase: LayoutPhase,
	recovered: bool,
}

fn simulation_parameters(config: &LayoutConfig) -> SimulationParameters {
	SimulationParameters {
		force_charge: config.charge,
		force_spring: config.spring,
		force_max: config.max_force,
		node_speed: config.node_speed,
		damping_factor: config.damping,
	}
}

/// Initial position of node `i` of `n`, on a circle around the origin.
fn seed_position(i: usize, n: usize) -> (f32, f32) {
	let angle = (i as f64) * 2.0 * PI / n.max(1) as f64;
	let radius = 100.0 + 10.0 * (n as f64).sqrt();
	((radius * angle.cos()) as f32, (radius * angle.sin()) as f32)
}

impl LayoutDriver {
	pub fn new(config: LayoutConfig, width: f64, height: f64) -> Self {
		Self {
			graph: ForceGraph::new(simulation_parameters(&config)),
			index: HashMap::new(),
			nodes: Vec::new(),
			links: Vec::new(),
			config,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			width,
			height,
			alpha: 0.0,
			alpha_target: 0.0,
			phase: LayoutPhase::Idle,
			recovered: false,
		}
	}

	/// Replaces the simulated nodes and links and restarts the simulation
	/// at full alpha. Nodes that survive keep their positions.
	pub fn set_data(&mut self, nodes: Vec<LayoutNode>, links: Vec<(String, String)>) {
		let previous = self.positions_f32();
		self.nodes = nodes;
		self.links = links;
		self.build(&previous);
		self.drag = DragState::default();
		self.recovered = false;
		self.alpha = 1.0;
		self.alpha_target = 0.0;
		self.phase = LayoutPhase::Simulating;
	}

	fn build(&mut self, previous: &HashMap<String, (f32, f32)>) {
		let mut graph = ForceGraph::new(simulation_parameters(&self.config));
		let mut index = HashMap::with_capacity(self.nodes.len());
		let count = self.nodes.len();

		for (i, node) in self.nodes.iter().enumerate() {
			if index.contains_key(&node.id) {
				continue;
			}
			let (x, y) = previous
				.get(&node.id)
				.copied()
				.unwrap_or_else(|| seed_position(i, count));
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: node.id.clone(),
					radius: node.radius,
				},
			});
			index.insert(node.id.clone(), idx);
		}

		for (source, target) in &self.links {
			if source == target {
				continue;
			}
			if let (Some(&src), Some(&tgt)) = (index.get(source), index.get(target)) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}

		self.graph = graph;
		self.index = index;
	}

	/// Updates node radii in place and gently reheats the simulation.
	pub fn update_radii(&mut self, radii: &HashMap<String, f64>) {
		for node in &mut self.nodes {
			if let Some(&r) = radii.get(&node.id) {
				node.radius = r;
			}
		}
		self.graph.visit_nodes_mut(|node| {
			if let Some(&r) = radii.get(&node.data.user_data.id) {
				node.data.user_data.radius = r;
			}
		});
		self.reheat(RESTYLE_ALPHA);
	}

	/// Raises alpha to at least `alpha` and resumes simulating.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
		self.phase = LayoutPhase::Simulating;
	}

	/// Advances the simulation by one frame. Returns whether the layout is
	/// still moving.
	pub fn tick(&mut self, dt: f32) -> Result<bool, LayoutError> {
		if self.phase == LayoutPhase::Idle {
			return Ok(false);
		}

		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		self.graph.update(dt * self.alpha as f32);
		self.apply_centering();
		self.resolve_collisions();

		if self.has_diverged() {
			self.recover()?;
		}

		if self.alpha < self.config.alpha_min && self.alpha_target <= 0.0 {
			self.phase = LayoutPhase::Idle;
		}
		Ok(self.phase == LayoutPhase::Simulating)
	}

	fn apply_centering(&mut self) {
		let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
		self.graph.visit_nodes(|node| {
			sx += node.x() as f64;
			sy += node.y() as f64;
			n += 1;
		});
		if n == 0 {
			return;
		}
		let strength = self.config.center_strength;
		let (dx, dy) = ((sx / n as f64) * strength, (sy / n as f64) * strength);
		self.graph.visit_nodes_mut(|node| {
			if !node.data.is_anchor {
				node.data.x -= dx as f32;
				node.data.y -= dy as f32;
			}
		});
	}

	/// Pushes overlapping nodes apart. Nodes are bucketed into a grid with
	/// cells as wide as the largest diameter, so only neighboring cells are
	/// compared.
	fn resolve_collisions(&mut self) {
		let padding = self.config.collision_padding;
		let strength = self.config.collision_strength;

		let mut bodies: Vec<Body> = Vec::with_capacity(self.index.len());
		self.graph.visit_nodes(|node| {
			bodies.push(Body {
				idx: node.index(),
				x: node.x() as f64,
				y: node.y() as f64,
				r: node.data.user_data.radius + padding / 2.0,
				pinned: node.data.is_anchor,
			});
		});

		let cell = bodies.iter().map(|b| b.r).fold(0.0, f64::max) * 2.0;
		if bodies.len() < 2 || !cell.is_finite() || cell <= 0.0 {
			return;
		}
		let key = |x: f64, y: f64| ((x / cell).floor() as i64, (y / cell).floor() as i64);

		let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
		for (i, b) in bodies.iter().enumerate() {
			grid.entry(key(b.x, b.y)).or_default().push(i);
		}

		let mut shift = vec![(0.0f64, 0.0f64); bodies.len()];
		for (i, a) in bodies.iter().enumerate() {
			let (cx, cy) = key(a.x, a.y);
			for gx in cx - 1..=cx + 1 {
				for gy in cy - 1..=cy + 1 {
					let Some(members) = grid.get(&(gx, gy)) else {
						continue;
					};
					for &j in members {
						if j <= i {
							continue;
						}
						let b = &bodies[j];
						let min = a.r + b.r;
						let (dx, dy) = (b.x - a.x, b.y - a.y);
						let dist = (dx * dx + dy * dy).sqrt();
						if dist >= min {
							continue;
						}
						let (ux, uy, overlap) = if dist < 1e-6 {
							// Coincident: separate along a golden-angle direction.
							let angle = (i + j) as f64 * 2.399_963;
							(angle.cos(), angle.sin(), min)
						} else {
							(dx / dist, dy / dist, min - dist)
						};
						let (wa, wb) = match (a.pinned, b.pinned) {
							(true, true) => continue,
							(true, false) => (0.0, 1.0),
							(false, true) => (1.0, 0.0),
							(false, false) => (0.5, 0.5),
						};
						let push = overlap * strength;
						shift[i].0 -= ux * push * wa;
						shift[i].1 -= uy * push * wa;
						shift[j].0 += ux * push * wb;
						shift[j].1 += uy * push * wb;
					}
				}
			}
		}

		let slot: HashMap<DefaultNodeIdx, usize> =
			bodies.iter().enumerate().map(|(i, b)| (b.idx, i)).collect();
		self.graph.visit_nodes_mut(|node| {
			if let Some(&i) = slot.get(&node.index()) {
				node.data.x += shift[i].0 as f32;
				node.data.y += shift[i].1 as f32;
			}
		});
	}

	fn has_diverged(&self) -> bool {
		let mut diverged = false;
		self.graph.visit_nodes(|node| {
			if !node.x().is_finite() || !node.y().is_finite() {
				diverged = true;
			}
		});
		diverged
	}

	/// Rebuilds the simulation from freshly seeded positions. Only one
	/// rebuild is attempted per data set.
	fn recover(&mut self) -> Result<(), LayoutError> {
		if self.recovered {
			self.phase = LayoutPhase::Idle;
			self.alpha = 0.0;
			return Err(LayoutError::Diverged);
		}
		warn!("sbom-graph: layout produced non-finite positions, rebuilding");
		self.recovered = true;
		self.drag = DragState::default();
		self.build(&HashMap::new());
		self.alpha = 1.0;
		self.alpha_target = 0.0;
		Ok(())
	}

	pub fn phase(&self) -> LayoutPhase {
		self.phase
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn node_count(&self) -> usize {
		self.index.len()
	}

	fn positions_f32(&self) -> HashMap<String, (f32, f32)> {
		let mut positions = HashMap::with_capacity(self.index.len());
		self.graph.visit_nodes(|node| {
			if node.x().is_finite() && node.y().is_finite() {
				positions.insert(node.data.user_data.id.clone(), (node.x(), node.y()));
			}
		});
		positions
	}

	/// Current node positions in graph coordinates, keyed by node id.
	pub fn positions(&self) -> HashMap<String, (f64, f64)> {
		self.positions_f32()
			.into_iter()
			.map(|(id, (x, y))| (id, (x as f64, y as f64)))
			.collect()
	}

	pub fn position(&self, id: &str) -> Option<(f64, f64)> {
		let idx = *self.index.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	pub fn is_pinned(&self, id: &str) -> bool {
		let Some(&idx) = self.index.get(id) else {
			return false;
		};
		let mut pinned = false;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				pinned = node.data.is_anchor;
			}
		});
		pinned
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Nearest node under the screen point that `hittable` accepts.
	pub fn node_at_position(
		&self,
		sx: f64,
		sy: f64,
		config: &ScaleConfig,
		hittable: impl Fn(&str) -> bool,
	) -> Option<(DefaultNodeIdx, String)> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let scale = ScaledValues::new(config, self.transform.k);
		let mut candidates: Vec<(f64, DefaultNodeIdx, String)> = Vec::new();
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let dist = (dx * dx + dy * dy).sqrt();
			let reach = scale.node_radius(node.data.user_data.radius) + scale.hit_slack;
			if dist < reach {
				candidates.push((dist, node.index(), node.data.user_data.id.clone()));
			}
		});
		candidates
			.into_iter()
			.filter(|(_, _, id)| hittable(id))
			.min_by(|a, b| a.0.total_cmp(&b.0))
			.map(|(_, idx, id)| (idx, id))
	}

	/// Starts dragging the node at `idx`: pins it and holds the simulation
	/// warm until [`LayoutDriver::end_drag`].
	pub fn begin_drag(&mut self, idx: DefaultNodeIdx, id: String, sx: f64, sy: f64) {
		let mut start = (0.0, 0.0);
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				start = (node.x(), node.y());
				node.data.is_anchor = true;
			}
		});
		self.drag = DragState {
			active: true,
			node_idx: Some(idx),
			node_id: Some(id),
			start_x: sx,
			start_y: sy,
			node_start_x: start.0,
			node_start_y: start.1,
			moved: false,
		};
		self.alpha_target = self.config.drag_alpha_target;
		self.reheat(self.config.drag_alpha_target);
	}

	/// Moves the dragged node to follow the pointer.
	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(idx) = self.drag.node_idx.filter(|_| self.drag.active) else {
			return;
		};
		let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
		if (dx * dx + dy * dy).sqrt() > CLICK_TOLERANCE {
			self.drag.moved = true;
		}
		let (nx, ny) = (
			self.drag.node_start_x + (dx / self.transform.k) as f32,
			self.drag.node_start_y + (dy / self.transform.k) as f32,
		);
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = nx;
				node.data.y = ny;
			}
		});
	}

	/// Releases the dragged node. Returns its id and whether it moved.
	pub fn end_drag(&mut self) -> Option<(String, bool)> {
		let drag = std::mem::take(&mut self.drag);
		self.alpha_target = 0.0;
		let idx = drag.node_idx.filter(|_| drag.active)?;
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = false;
			}
		});
		drag.node_id.map(|id| (id, drag.moved))
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	pub fn end_pan(&mut self) {
		self.pan.active = false;
	}

	/// Zooms around the screen point, keeping it fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}
