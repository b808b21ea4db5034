use crate::{Artifact, Error, ResolveRequest, ResolveResponse, Result, Thumbnails};

use std::sync::Arc;

use axum::{
	extract::State,
	http::{
		header::{CONTENT_LENGTH, CONTENT_TYPE},
		HeaderMap, HeaderValue,
	},
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};

/// Header the data endpoint reads the transfer token from
pub const TRANSFER_TOKEN_HEADER: &str = "Transfer-Token";

/// `POST /thumbnails` resolves a thumbnail, `GET /data` downloads it
pub fn router<S: Thumbnails>(service: Arc<S>) -> Router {
	Router::new()
		.route("/thumbnails", post(resolve::<S>))
		.route("/data", get(data::<S>))
		.with_state(service)
}

async fn resolve<S: Thumbnails>(
	State(service): State<Arc<S>>,
	Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>> {
	service.resolve(request).await.map(Json)
}

async fn data<S: Thumbnails>(State(service): State<Arc<S>>, headers: HeaderMap) -> Result<Response> {
	let token = headers
		.get(TRANSFER_TOKEN_HEADER)
		.and_then(|value| value.to_str().ok())
		.filter(|token| !token.is_empty())
		.ok_or(Error::MissingToken)?;

	let Artifact {
		bytes,
		content_type,
	} = service.serve(token).await?;

	Ok((
		[
			(CONTENT_TYPE, HeaderValue::from_static(content_type)),
			(CONTENT_LENGTH, HeaderValue::from(bytes.len())),
		],
		bytes,
	)
		.into_response())
}
