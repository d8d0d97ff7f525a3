//! Browser session: the shared graph state plus the backend operations
//! that feed it.

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info};
use web_sys::File;

use crate::api::{ApiClient, SbomSummary};
use crate::graph::types::SbomMeta;
use crate::graph::{GraphPayload, GraphState};

/// Severity of a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
	Info,
	Error,
}

impl StatusKind {
	pub fn class(self) -> &'static str {
		match self {
			StatusKind::Info => "status status-info",
			StatusKind::Error => "status status-error",
		}
	}
}

/// Message shown in the status banner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
	pub kind: StatusKind,
	pub message: String,
}

impl Status {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			kind: StatusKind::Info,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			kind: StatusKind::Error,
			message: message.into(),
		}
	}
}

/// Handle shared by every panel. Cheap to copy.
#[derive(Clone, Copy)]
pub struct Session {
	pub state: RwSignal<GraphState>,
	pub status: RwSignal<Option<Status>>,
	pub busy: RwSignal<bool>,
	client: StoredValue<ApiClient>,
}

impl Session {
	pub fn new(state: GraphState) -> Self {
		let client = ApiClient::new(state.config().api_base.clone());
		Self {
			state: RwSignal::new(state),
			status: RwSignal::new(None),
			busy: RwSignal::new(false),
			client: StoredValue::new(client),
		}
	}

	pub fn set_status(self, status: Status) {
		match status.kind {
			StatusKind::Info => info!("sbom-graph: {}", status.message),
			StatusKind::Error => error!("sbom-graph: {}", status.message),
		}
		self.status.set(Some(status));
	}

	/// Applies a graph payload and the SBOM list that accompanies it.
	pub fn apply(self, payload: GraphPayload, summaries: &[SbomSummary]) {
		let meta: Vec<SbomMeta> = summaries.iter().map(SbomMeta::from).collect();
		let report = self.state.try_update(|s| {
			let report = s.update_data(payload);
			s.record_sbom_names(&meta);
			report
		});
		if let Some(report) = report.filter(|r| r.duplicate_nodes + r.dangling_links > 0) {
			self.set_status(Status::info(format!(
				"Ignored {} duplicate components and {} broken dependencies",
				report.duplicate_nodes, report.dangling_links
			)));
		}
	}

	/// Reloads the graph and SBOM list from the backend.
	pub fn refresh(self) {
		let client = self.client.get_value();
		self.busy.set(true);
		spawn_local(async move {
			match client.load_session().await {
				Ok((payload, summaries)) => self.apply(payload, &summaries),
				Err(e) => self.set_status(Status::error(format!("Failed to load graph: {}", e))),
			}
			self.busy.set(false);
		});
	}

	/// Uploads an SBOM file, then reloads the graph.
	pub fn upload(self, file: File, name: Option<String>) {
		let client = self.client.get_value();
		self.busy.set(true);
		spawn_local(async move {
			let result = client.upload(&file, name.as_deref()).await;
			self.busy.set(false);
			match result {
				Ok(reply) => {
					let label = reply.sbom_name.unwrap_or_else(|| file.name());
					self.set_status(Status::info(format!(
						"Uploaded {}: {} components, {} dependencies",
						label, reply.nodes, reply.links
					)));
					self.refresh();
				}
				Err(e) => self.set_status(Status::error(format!("Upload failed: {}", e))),
			}
		});
	}

	/// Deletes an SBOM on the backend, then reloads the graph.
	pub fn delete_sbom(self, id: String) {
		let client = self.client.get_value();
		spawn_local(async move {
			match client.delete_sbom(&id).await {
				Ok(()) => {
					let name = self.state.with_untracked(|s| s.sbom_name(&id));
					self.state.update(|s| {
						s.forget_sbom(&id);
					});
					self.set_status(Status::info(format!("Deleted {}", name)));
					self.refresh();
				}
				Err(e) => self.set_status(Status::error(format!("Delete failed: {}", e))),
			}
		});
	}

	/// Expands a cluster node into its member components.
	pub fn expand_cluster(self, id: &str) {
		match self.state.try_update(|s| s.expand_cluster(id)) {
			Some(Ok(report)) => self.set_status(Status::info(format!(
				"Expanded {} components",
				report.restored
			))),
			Some(Err(e)) => self.set_status(Status::error(e.to_string())),
			None => {}
		}
	}
}
