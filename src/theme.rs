//! Visual theming for the SBOM graph.
//!
//! Provides the SBOM color palette, fixed highlight colors and the canvas
//! style configuration.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	pub fn to_css_rgb(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Color of shared components while "highlight common" is on.
pub const SHARED_HIGHLIGHT: Color = Color::rgb(255, 87, 34);

/// Color of components whose SBOM has no assigned color.
pub const DEFAULT_NODE: Color = Color::rgb(70, 130, 180);

/// A cycling color palette; SBOMs take colors in registration order.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePalette {
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// The ten-color categorical palette used for SBOMs (default)
	pub fn category10() -> Self {
		Self {
			colors: vec![
				Color::rgb(31, 119, 180),  // Blue
				Color::rgb(255, 127, 14),  // Orange
				Color::rgb(44, 160, 44),   // Green
				Color::rgb(214, 39, 40),   // Red
				Color::rgb(148, 103, 189), // Purple
				Color::rgb(140, 86, 75),   // Brown
				Color::rgb(227, 119, 194), // Pink
				Color::rgb(127, 127, 127), // Gray
				Color::rgb(188, 189, 34),  // Olive
				Color::rgb(23, 190, 207),  // Cyan
			],
		}
	}

	pub fn len(&self) -> usize {
		self.colors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.colors.is_empty()
	}

	/// Color at `index`, wrapping around the palette.
	pub fn get(&self, index: usize) -> Color {
		if self.colors.is_empty() {
			return DEFAULT_NODE;
		}
		self.colors[index % self.colors.len()]
	}
}

impl Default for NodePalette {
	fn default() -> Self {
		Self::category10()
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Secondary color for gradients
	pub color_secondary: Color,
	/// Whether to use radial gradient
	pub use_gradient: bool,
	/// Vignette intensity (0.0 = none, 1.0 = strong)
	pub vignette: f64,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Color of declared dependency edges
	pub color: Color,
	/// Color of cluster-derived edges
	pub cluster_color: Color,
	/// Color of edges crossing SBOM boundaries
	pub cross_sbom_color: Color,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Whether nodes have inner gradients
	pub use_gradient: bool,
	/// Stroke of regular nodes
	pub border_color: Color,
	/// Stroke of cluster nodes
	pub cluster_border_color: Color,
	/// Stroke of the selected node
	pub selected_border_color: Color,
	/// Label fill
	pub label_color: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub name: &'static str,
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
	pub palette: NodePalette,
}

impl Theme {
	/// Dark theme with gradient nodes (default)
	pub fn default_theme() -> Self {
		Self {
			name: "default",
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
				vignette: 0.15,
			},
			edge: EdgeStyle {
				color: Color::rgb(140, 160, 180),
				cluster_color: Color::rgb(170, 170, 190),
				cross_sbom_color: SHARED_HIGHLIGHT,
			},
			node: NodeStyle {
				use_gradient: true,
				border_color: Color::rgba(255, 255, 255, 0.35),
				cluster_border_color: Color::rgb(51, 51, 51),
				selected_border_color: Color::rgb(255, 255, 255),
				label_color: Color::rgba(255, 255, 255, 0.85),
			},
			palette: NodePalette::category10(),
		}
	}

	/// Flat theme without gradients or vignette
	pub fn minimal() -> Self {
		Self {
			name: "minimal",
			background: BackgroundStyle {
				color: Color::rgb(25, 28, 35),
				color_secondary: Color::rgb(25, 28, 35),
				use_gradient: false,
				vignette: 0.0,
			},
			node: NodeStyle {
				use_gradient: false,
				..Self::default_theme().node
			},
			..Self::default_theme()
		}
	}

	/// Looks a theme up by name, falling back to the default.
	pub fn by_name(name: &str) -> Self {
		match name {
			"minimal" => Self::minimal(),
			_ => Self::default_theme(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_palette_wraps() {
		let palette = NodePalette::category10();
		assert_eq!(palette.len(), 10);
		assert_eq!(palette.get(0), palette.get(10));
		assert_eq!(palette.get(3), palette.get(23));
	}

	#[test]
	fn test_css_output() {
		assert_eq!(Color::rgb(31, 119, 180).to_css(), "#1f77b4");
		assert_eq!(
			Color::rgb(255, 0, 0).with_alpha(0.5).to_css(),
			"rgba(255, 0, 0, 0.5)"
		);
	}

	#[test]
	fn test_named_themes() {
		assert_eq!(Theme::by_name("minimal").name, "minimal");
		assert_eq!(Theme::by_name("nope").name, "default");
		assert!(!Theme::minimal().node.use_gradient);
	}
}
