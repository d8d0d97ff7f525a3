//! SBOM graph model: ingestion, clustering, session state and the visual
//! projection consumed by the canvas.
//!
//! Data flows one way:
//!
//! 1. [`ingest::normalize`] deduplicates nodes and resolves link endpoints.
//! 2. [`cluster::cluster`] collapses oversized SBOMs.
//! 3. [`GraphState`] registers SBOM colors and holds view parameters.
//! 4. [`Projection`] maps the working set to radii, colors and opacities.

pub mod cluster;
pub mod details;
pub mod format;
pub mod ingest;
pub mod projection;
pub mod state;
pub mod types;

pub use details::{ClusterDetails, ComponentDetails, Details, details};
pub use format::format_file_size;
pub use ingest::IngestReport;
pub use projection::{NodeStyle, Projection};
pub use state::{GraphState, GraphStats, Invalidation, LegendEntry, SizeMode};
pub use types::{Component, GraphPayload, Link, LinkKind, RawLink, SbomMeta};
