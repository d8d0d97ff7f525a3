//! Canvas view of the SBOM graph.
//!
//! Renders the working set of a [`GraphState`](crate::graph::GraphState) on an
//! HTML canvas with:
//! - Physics-based node positioning via force simulation
//! - Pan, zoom, node dragging and click-to-select
//! - SBOM colors, filters and link dimming from the graph projection
//!
//! # Example
//!
//! ```ignore
//! use sbom_graph::{ForceGraphCanvas, GraphState};
//!
//! let state = RwSignal::new(GraphState::default());
//! view! { <ForceGraphCanvas state=state fullscreen=true /> }
//! ```

mod component;
pub mod layout;
mod render;
pub mod scale;

pub use component::ForceGraphCanvas;
pub use layout::{LayoutDriver, LayoutNode, LayoutPhase};
