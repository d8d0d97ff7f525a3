//! Sidebar panels around the graph canvas.

use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use web_sys::HtmlInputElement;

use crate::graph::{Details, SizeMode, details};
use crate::session::{Session, Status};

/// Component, dependency and SBOM counts of the working set.
#[component]
pub fn StatsBar(session: Session) -> impl IntoView {
	let stats = Memo::new(move |_| session.state.with(|s| s.stats()));

	view! {
		<div class="stats-bar">
			<span class="stat">{move || format!("{} components", stats.get().nodes)}</span>
			<span class="stat">{move || format!("{} dependencies", stats.get().links)}</span>
			<span class="stat">{move || format!("{} SBOMs", stats.get().sboms)}</span>
			<Show when=move || session.busy.get()>
				<span class="stat loading">"Loading..."</span>
			</Show>
		</div>
	}
}

/// Dismissable status banner.
#[component]
pub fn StatusBanner(session: Session) -> impl IntoView {
	move || {
		session.status.get().map(|status| {
			view! {
				<div class=status.kind.class()>
					<span>{status.message}</span>
					<button class="status-dismiss" on:click=move |_| session.status.set(None)>
						"×"
					</button>
				</div>
			}
		})
	}
}

/// File picker and optional name for uploading a new SBOM.
#[component]
pub fn UploadForm(session: Session) -> impl IntoView {
	let file_ref = NodeRef::<leptos::html::Input>::new();
	let name_ref = NodeRef::<leptos::html::Input>::new();

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let file = file_ref.get().and_then(|input| {
			let input: HtmlInputElement = input.into();
			input.files().and_then(|files| files.get(0))
		});
		let Some(file) = file else {
			session.set_status(Status::error("Choose an SBOM file to upload"));
			return;
		};
		let name = name_ref
			.get()
			.map(|input| {
				let input: HtmlInputElement = input.into();
				input.value().trim().to_string()
			})
			.filter(|name| !name.is_empty());
		session.upload(file, name);
	};

	view! {
		<form class="upload-form" on:submit=on_submit>
			<h3>"Upload SBOM"</h3>
			<input type="file" accept=".json,application/json" node_ref=file_ref />
			<input type="text" placeholder="Name (optional)" node_ref=name_ref />
			<button type="submit" disabled=move || session.busy.get()>
				"Upload"
			</button>
		</form>
	}
}

/// SBOM list with color swatches, visibility toggles and delete buttons.
#[component]
pub fn SbomLegend(session: Session) -> impl IntoView {
	let legend = Memo::new(move |_| session.state.with(|s| s.sbom_legend()));

	view! {
		<div class="panel sbom-legend">
			<h3>"SBOMs"</h3>
			<ul>
				{move || {
					legend
						.get()
						.into_iter()
						.map(|entry| {
							let (toggle_id, delete_id) = (entry.id.clone(), entry.id.clone());
							view! {
								<li class="legend-entry">
									<input
										type="checkbox"
										prop:checked=entry.visible
										on:change=move |ev| {
											let visible = event_target_checked(&ev);
											session.state.update(|s| {
												s.toggle_sbom_visibility(&toggle_id, visible);
											});
										}
									/>
									<span
										class="legend-swatch"
										style:background-color=entry.color.to_css()
									></span>
									<span class="legend-name">{entry.name}</span>
									<button
										class="legend-delete"
										title="Delete SBOM"
										on:click=move |_| session.delete_sbom(delete_id.clone())
									>
										"×"
									</button>
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
		</div>
	}
}

/// Size mode, shared-component highlighting and clustering controls.
#[component]
pub fn ViewControls(session: Session) -> impl IntoView {
	let state = session.state;

	view! {
		<div class="panel view-controls">
			<h3>"View"</h3>
			<label>
				"Node size "
				<select on:change=move |ev| {
					if let Some(mode) = SizeMode::parse(&event_target_value(&ev)) {
						state.update(|s| {
							s.set_node_size_by(mode);
						});
					}
				}>
					{SizeMode::ALL
						.into_iter()
						.map(|mode| {
							view! {
								<option
									value=mode.as_str()
									selected=move || state.with(|s| s.size_mode() == mode)
								>
									{mode.label()}
								</option>
							}
						})
						.collect_view()}
				</select>
			</label>
			<label>
				<input
					type="checkbox"
					prop:checked=move || state.with(|s| s.highlight_common())
					on:change=move |ev| {
						let enabled = event_target_checked(&ev);
						state.update(|s| {
							s.set_highlight_common(enabled);
						});
					}
				/>
				" Highlight shared components"
			</label>
			<label>
				<input
					type="checkbox"
					prop:checked=move || state.with(|s| s.config().cluster.enabled)
					on:change=move |ev| {
						let enabled = event_target_checked(&ev);
						state.update(|s| {
							s.set_clustering(enabled);
						});
					}
				/>
				" Cluster large SBOMs"
			</label>
			<label>
				"Cluster above "
				<input
					type="number"
					min="1"
					prop:value=move || state.with(|s| s.config().cluster.threshold.to_string())
					on:change=move |ev| {
						if let Ok(threshold) = event_target_value(&ev).trim().parse::<usize>() {
							state.update(|s| {
								s.set_cluster_threshold(threshold);
							});
						}
					}
				/>
				" components"
			</label>
		</div>
	}
}

/// Checkbox per component type present in the working set.
#[component]
pub fn TypeFilter(session: Session) -> impl IntoView {
	let state = session.state;
	let types = Memo::new(move |_| {
		state.with(|s| {
			s.node_types()
				.into_iter()
				.map(|kind| {
					let hidden = s.is_type_hidden(&kind);
					(kind, hidden)
				})
				.collect::<Vec<_>>()
		})
	});

	view! {
		<div class="panel type-filter">
			<h3>"Component types"</h3>
			{move || {
				types
					.get()
					.into_iter()
					.map(|(kind, hidden)| {
						let label = kind.clone();
						view! {
							<label class="type-entry">
								<input
									type="checkbox"
									prop:checked=!hidden
									on:change=move |ev| {
										let shown = event_target_checked(&ev);
										state.update(|s| {
											s.set_type_hidden(&kind, !shown);
										});
									}
								/>
								" "
								{label}
							</label>
						}
					})
					.collect_view()
			}}
		</div>
	}
}

fn detail_row(label: &'static str, value: String) -> impl IntoView {
	view! {
		<div class="detail-row">
			<span class="detail-label">{label}</span>
			<span class="detail-value">{value}</span>
		</div>
	}
}

/// Details of the selected node. Clusters get an expand button.
#[component]
pub fn DetailPanel(session: Session) -> impl IntoView {
	let selected = Memo::new(move |_| {
		session
			.state
			.with(|s| s.selected().and_then(|id| details(s, id)))
	});
	let close = move |_| {
		session.state.update(|s| {
			s.clear_selection();
		});
	};

	move || {
		selected.get().map(|info| {
			let body = match info {
				Details::Component(c) => view! {
					<h3>{c.name}</h3>
					{detail_row("Version", c.version)}
					{detail_row("Vendor", c.vendor)}
					{detail_row("Type", c.kind)}
					{detail_row("SBOM", c.sbom)}
					{detail_row("File", c.file_name)}
					{detail_row("Size", c.size)}
					{detail_row("UUID", c.uuid)}
					{detail_row("Found in", format!("{} SBOM(s)", c.shared_count))}
					{detail_row("Dependencies", c.dependencies.to_string())}
					{detail_row("Dependents", c.dependents.to_string())}
				}
				.into_any(),
				Details::Cluster(c) => {
					let id = c.id.clone();
					view! {
						<h3>{c.name}</h3>
						{detail_row("Type", c.kind)}
						{detail_row("SBOM", c.sbom)}
						{detail_row("Components", c.component_count.to_string())}
						{detail_row("Total size", c.size)}
						{detail_row("Incoming", c.incoming.to_string())}
						{detail_row("Outgoing", c.outgoing.to_string())}
						<button class="expand-cluster" on:click=move |_| session.expand_cluster(&id)>
							"Expand cluster"
						</button>
					}
					.into_any()
				}
			};
			view! {
				<div class="detail-panel">
					<button class="detail-close" on:click=close>
						"×"
					</button>
					{body}
				</div>
			}
		})
	}
}
