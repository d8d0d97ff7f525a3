//! Zoom-dependent scaling of graph visuals.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: The coordinate system of the layout. Node radii come
//!   from the projection in world units and grow when zoomed in.
//! - **Screen-space**: Pixel coordinates on the canvas, unaffected by zoom.
//!
//! Each visual picks a [`ScaleBehavior`] describing which space it lives in.

/// How a visual size scales with zoom level.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant world-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels).
	Screen,
	/// World-space size, clamped to screen-space bounds.
	/// Use `f64::NEG_INFINITY` or `f64::INFINITY` for unbounded.
	Clamped { min_screen: f64, max_screen: f64 },
}

impl ScaleBehavior {
	/// World-space value for `base` at zoom `k`, ready for drawing after
	/// the canvas transform has been applied.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How an opacity multiplier scales with zoom level.
#[derive(Clone, Debug)]
pub enum AlphaBehavior {
	/// Alpha follows zoom, clamped to [0, 1].
	ScaleWithZoom,
	/// Fully visible at `full_alpha_k`, invisible at `zero_alpha_k`.
	Fade { zero_alpha_k: f64, full_alpha_k: f64 },
}

impl AlphaBehavior {
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::ScaleWithZoom => k.clamp(0.0, 1.0),
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k == full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Keeps tiny nodes clickable when zoomed out.
	pub radius_behavior: ScaleBehavior,
	/// Extra hit-test reach beyond the drawn radius.
	pub hit_slack: f64,
	pub hit_behavior: ScaleBehavior,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Zoom below which the label font stops growing in world units.
	pub label_min_k: f64,
	/// Labels of regular components fade out when zoomed far out.
	pub label_alpha_behavior: AlphaBehavior,
}

#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Line width in screen pixels.
	pub line_width: f64,
	/// Width multiplier for links touching the selected node.
	pub selected_width: f64,
	/// Dash pattern (dash, gap) for cluster-derived links.
	pub dash_pattern: (f64, f64),
	pub dash_behavior: ScaleBehavior,
}

#[derive(Clone, Debug)]
pub struct ArrowScaleConfig {
	/// Arrow size in world units.
	pub size: f64,
	pub size_behavior: ScaleBehavior,
	pub alpha_behavior: AlphaBehavior,
	/// Arrows with a smaller alpha multiplier are skipped.
	pub cull_alpha: f64,
}

/// Scale configuration for all graph elements.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub edge: EdgeScaleConfig,
	pub arrow: ArrowScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				radius_behavior: ScaleBehavior::Clamped {
					min_screen: 3.0,
					max_screen: f64::INFINITY,
				},
				hit_slack: 4.0,
				hit_behavior: ScaleBehavior::Screen,
				label_size: 11.0,
				label_min_k: 0.5,
				label_alpha_behavior: AlphaBehavior::Fade {
					zero_alpha_k: 0.3,
					full_alpha_k: 0.6,
				},
			},
			edge: EdgeScaleConfig {
				line_width: 1.5,
				selected_width: 2.0,
				dash_pattern: (6.0, 4.0),
				dash_behavior: ScaleBehavior::World,
			},
			arrow: ArrowScaleConfig {
				size: 6.0,
				size_behavior: ScaleBehavior::Clamped {
					min_screen: 0.0,
					max_screen: 18.0,
				},
				alpha_behavior: AlphaBehavior::ScaleWithZoom,
				cull_alpha: 0.05,
			},
		}
	}
}

/// Scale values for one zoom level. Computed once per frame; all sizes
/// are world-space.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	radius_behavior: ScaleBehavior,
	pub hit_slack: f64,
	pub label_font: String,
	pub label_alpha: f64,
	pub edge_line_width: f64,
	pub selected_line_width: f64,
	pub dash_pattern: (f64, f64),
	pub arrow_size: f64,
	pub arrow_alpha: f64,
	pub cull_arrows: bool,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label_font_size = config.node.label_size / k.max(config.node.label_min_k);
		let arrow_alpha = config.arrow.alpha_behavior.apply(k);
		let edge_line_width = config.edge.line_width / k;
		let (dash, gap) = config.edge.dash_pattern;

		Self {
			k,
			radius_behavior: config.node.radius_behavior.clone(),
			hit_slack: config.node.hit_behavior.apply(config.node.hit_slack, k),
			label_font: format!("{}px sans-serif", label_font_size),
			label_alpha: config.node.label_alpha_behavior.apply(k),
			edge_line_width,
			selected_line_width: edge_line_width * config.edge.selected_width,
			dash_pattern: (
				config.edge.dash_behavior.apply(dash, k),
				config.edge.dash_behavior.apply(gap, k),
			),
			arrow_size: config.arrow.size_behavior.apply(config.arrow.size, k),
			arrow_alpha,
			cull_arrows: arrow_alpha < config.arrow.cull_alpha,
		}
	}

	/// Drawn radius for a node whose world-space radius is `radius`.
	pub fn node_radius(&self, radius: f64) -> f64 {
		self.radius_behavior.apply(radius, self.k)
	}
}
