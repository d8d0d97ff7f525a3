//! HTTP client for the SBOM backend.
//!
//! | Request               | Response                                   |
//! |-----------------------|--------------------------------------------|
//! | `GET /graph`          | [`GraphPayload`]                           |
//! | `GET /sboms`          | list of [`SbomSummary`]                    |
//! | `POST /upload`        | [`UploadResponse`] (multipart form)        |
//! | `DELETE /sbom/{id}`   | `{ "success": true }`                      |
//!
//! Any endpoint may answer `{ "error": "..." }` instead, which surfaces as
//! [`ApiError::Backend`].

use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FormData, Request, RequestInit, Response};

use crate::error::ApiError;
use crate::graph::types::{GraphPayload, SbomMeta, de_id};

/// Summary row of `GET /sboms`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SbomSummary {
	#[serde(deserialize_with = "de_id")]
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub nodes: usize,
	#[serde(default)]
	pub links: usize,
}

impl From<&SbomSummary> for SbomMeta {
	fn from(summary: &SbomSummary) -> Self {
		SbomMeta {
			id: summary.id.clone(),
			name: summary.name.clone(),
		}
	}
}

/// Reply to `POST /upload`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UploadResponse {
	#[serde(deserialize_with = "de_id")]
	pub sbom_id: String,
	#[serde(default)]
	pub sbom_name: Option<String>,
	#[serde(default)]
	pub nodes: usize,
	#[serde(default)]
	pub links: usize,
}

#[derive(Deserialize)]
struct DeleteReply {
	#[serde(default)]
	success: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reply<T> {
	Failure { error: String },
	Success(T),
}

/// Decodes a response body, mapping `{ "error": ... }` bodies and
/// unsuccessful statuses to errors.
pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
	let ok = (200..300).contains(&status);
	match serde_json::from_str::<Reply<T>>(body) {
		Ok(Reply::Failure { error }) => Err(ApiError::Backend(error)),
		Ok(Reply::Success(value)) if ok => Ok(value),
		Ok(Reply::Success(_)) => Err(ApiError::Status { status }),
		Err(_) if !ok => Err(ApiError::Status { status }),
		// Re-parse without the envelope for a precise error message.
		Err(_) => serde_json::from_str::<T>(body).map_err(ApiError::from),
	}
}

/// Backend client. `base` is prefixed to every path; empty means same origin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiClient {
	base: String,
}

impl ApiClient {
	pub fn new(base: impl Into<String>) -> Self {
		let base = base.into();
		Self {
			base: base.trim_end_matches('/').to_string(),
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base, path)
	}

	async fn send(
		&self,
		method: &str,
		path: &str,
		body: Option<&JsValue>,
	) -> Result<(u16, String), ApiError> {
		let window = web_sys::window().ok_or(ApiError::NoWindow)?;
		let init = RequestInit::new();
		init.set_method(method);
		if let Some(body) = body {
			init.set_body(body);
		}
		let url = self.url(path);
		debug!("sbom-graph: {} {}", method, url);

		let request = Request::new_with_str_and_init(&url, &init).map_err(ApiError::from_js)?;
		request
			.headers()
			.set("Accept", "application/json")
			.map_err(ApiError::from_js)?;

		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(ApiError::from_js)?
			.dyn_into()
			.map_err(ApiError::from_js)?;
		let text = JsFuture::from(response.text().map_err(ApiError::from_js)?)
			.await
			.map_err(ApiError::from_js)?;
		Ok((response.status(), text.as_string().unwrap_or_default()))
	}

	pub async fn fetch_graph(&self) -> Result<GraphPayload, ApiError> {
		let (status, body) = self.send("GET", "/graph", None).await?;
		decode(status, &body)
	}

	pub async fn fetch_sboms(&self) -> Result<Vec<SbomSummary>, ApiError> {
		let (status, body) = self.send("GET", "/sboms", None).await?;
		decode(status, &body)
	}

	/// Uploads an SBOM document with an optional display name.
	pub async fn upload(&self, file: &File, name: Option<&str>) -> Result<UploadResponse, ApiError> {
		let form = FormData::new().map_err(ApiError::from_js)?;
		form.append_with_blob_and_filename("file", file, &file.name())
			.map_err(ApiError::from_js)?;
		if let Some(name) = name {
			form.append_with_str("sbom_name", name)
				.map_err(ApiError::from_js)?;
		}
		let (status, body) = self.send("POST", "/upload", Some(&form.into())).await?;
		decode(status, &body)
	}

	pub async fn delete_sbom(&self, id: &str) -> Result<(), ApiError> {
		let path = format!("/sbom/{}", String::from(js_sys::encode_uri_component(id)));
		let (status, body) = self.send("DELETE", &path, None).await?;
		let reply: DeleteReply = decode(status, &body)?;
		if reply.success {
			Ok(())
		} else {
			Err(ApiError::Backend(format!("backend refused to delete SBOM {}", id)))
		}
	}

	/// Fetches the graph, then the SBOM list. A failing SBOM list only
	/// costs the display names.
	pub async fn load_session(&self) -> Result<(GraphPayload, Vec<SbomSummary>), ApiError> {
		let graph = self.fetch_graph().await?;
		let summaries = match self.fetch_sboms().await {
			Ok(list) => list,
			Err(e) => {
				warn!("sbom-graph: could not list SBOMs: {}", e);
				Vec::new()
			}
		};
		Ok((graph, summaries))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_base_url_joining() {
		assert_eq!(ApiClient::new("").url("/graph"), "/graph");
		assert_eq!(
			ApiClient::new("http://localhost:5000/").url("/sboms"),
			"http://localhost:5000/sboms"
		);
	}

	#[test]
	fn test_decode_graph() {
		let body = r#"{"nodes": [{"id": "a", "sbom_id": 1}], "links": []}"#;
		let graph: GraphPayload = decode(200, body).unwrap();
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(graph.nodes[0].sbom_id.as_deref(), Some("1"));
	}

	#[test]
	fn test_decode_error_body() {
		let err = decode::<GraphPayload>(500, r#"{"error": "database locked"}"#).unwrap_err();
		assert!(matches!(err, ApiError::Backend(ref m) if m == "database locked"));
		assert_eq!(err.to_string(), "database locked");
	}

	#[test]
	fn test_decode_bad_status_without_body() {
		let err = decode::<Vec<SbomSummary>>(502, "<html>Bad Gateway</html>").unwrap_err();
		assert!(matches!(err, ApiError::Status { status: 502 }));
	}

	#[test]
	fn test_decode_malformed_success() {
		let err = decode::<Vec<SbomSummary>>(200, "{not json").unwrap_err();
		assert!(matches!(err, ApiError::Decode(_)));
	}

	#[test]
	fn test_decode_summaries_and_upload() {
		let list: Vec<SbomSummary> =
			decode(200, r#"[{"id": 3, "name": "router", "nodes": 12, "links": 20}]"#).unwrap();
		assert_eq!(list[0].id, "3");
		assert_eq!(SbomMeta::from(&list[0]).name.as_deref(), Some("router"));

		let up: UploadResponse =
			decode(200, r#"{"sbom_id": "7", "sbom_name": "gw", "nodes": 4, "links": 3}"#).unwrap();
		assert_eq!(up.sbom_id, "7");
		assert_eq!(up.nodes, 4);
	}

	#[test]
	fn test_delete_reply() {
		let reply: DeleteReply = decode(200, r#"{"success": true}"#).unwrap();
		assert!(reply.success);
	}
}
