use std::collections::HashMap;

use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::state::AppState;
use cirrus_query::{
	CompiledSuggest, CompletionQueryBuilder, CompletionRequestLog, PreferRecent, SearchContext,
	Suggestion, suggest::CompletionQuery,
};

const DEFAULT_INDEX_NAME: &str = "completion";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/suggest/compile", post(suggest_compile))
		.route("/v1/suggest/decode", post(suggest_decode))
		.route("/v1/rescore", post(rescore))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
	pub profile: Option<String>,
	pub term: String,
	#[serde(default)]
	pub variants: Vec<String>,
	pub limit: u32,
	#[serde(default)]
	pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
	pub results_possible: bool,
	pub hard_limit: u32,
	pub sub_queries: Vec<CompletionQuery>,
	pub request: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
	#[serde(flatten)]
	pub compile: CompileRequest,
	pub index_name: Option<String>,
	pub response: Value,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
	pub suggestions: Vec<Suggestion>,
	pub log: CompletionRequestLog,
}

#[derive(Debug, Deserialize)]
pub struct RescoreRequest {
	pub chain: String,
	pub namespaces: Option<Vec<i32>>,
	#[serde(default)]
	pub local_search: bool,
	pub with_default_boosts: Option<bool>,
	pub user_language: Option<String>,
	pub prefer_recent: Option<PreferRecent>,
	#[serde(default)]
	pub overrides: HashMap<String, String>,
	/// Request time in epoch milliseconds; the server clock otherwise.
	pub now_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RescoreResponse {
	pub rescore_query: Option<Value>,
}

fn compile(state: &AppState, payload: &CompileRequest) -> Result<CompiledSuggest, ApiError> {
	if payload.limit == 0 {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"limit must be greater than zero.",
			Some(vec!["$.limit".to_string()]),
		));
	}

	let completion = &state.config.completion;
	let name = payload.profile.as_deref().unwrap_or(completion.default_profile.as_str());
	let profile = completion.profile(name).ok_or_else(|| cirrus_query::Error::UnknownProfile {
		kind: "completion",
		name: name.to_string(),
	})?;
	let builder = CompletionQueryBuilder::new(profile, payload.limit, payload.offset, completion);

	Ok(builder.build(&payload.term, &payload.variants)?)
}

async fn suggest_compile(
	State(state): State<AppState>,
	Json(payload): Json<CompileRequest>,
) -> Result<Json<CompileResponse>, ApiError> {
	let compiled = compile(&state, &payload)?;
	let results_possible = compiled.results_possible();
	let request = (results_possible && !compiled.is_empty()).then(|| compiled.to_request());

	Ok(Json(CompileResponse {
		results_possible,
		hard_limit: compiled.hard_limit(),
		sub_queries: compiled.queries().to_vec(),
		request,
	}))
}

async fn suggest_decode(
	State(state): State<AppState>,
	Json(payload): Json<DecodeRequest>,
) -> Result<Json<DecodeResponse>, ApiError> {
	let compiled = compile(&state, &payload.compile)?;
	let index_name = payload.index_name.as_deref().unwrap_or(DEFAULT_INDEX_NAME);
	let mut log = CompletionRequestLog::for_request(&payload.compile.term, &compiled);
	let set = compiled.decode(&payload.response, index_name, &mut log)?;

	Ok(Json(DecodeResponse { suggestions: set.suggestions, log }))
}

async fn rescore(
	State(state): State<AppState>,
	Json(payload): Json<RescoreRequest>,
) -> Result<Json<RescoreResponse>, ApiError> {
	let now = match payload.now_ms {
		Some(millis) => OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
			.map_err(|_| {
				json_error(
					StatusCode::BAD_REQUEST,
					"INVALID_REQUEST",
					"now_ms is out of range.",
					Some(vec!["$.now_ms".to_string()]),
				)
			})?,
		None => OffsetDateTime::now_utc(),
	};
	let chain = state.chains.get(&payload.chain)?;
	let mut ctx = SearchContext::new(now);

	ctx.namespaces = payload.namespaces;
	ctx.local_search = payload.local_search;
	ctx.with_default_boosts = payload.with_default_boosts.unwrap_or(true);
	ctx.user_language = payload.user_language;
	ctx.prefer_recent = payload.prefer_recent;
	ctx.overrides = payload.overrides;

	let rescore_query = chain.build_rescore_query(&ctx)?.map(|function_score| function_score.to_value());

	tracing::debug!(chain = chain.name(), rescored = rescore_query.is_some(), "Rescore query built.");

	Ok(Json(RescoreResponse { rescore_query }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<cirrus_query::Error> for ApiError {
	fn from(err: cirrus_query::Error) -> Self {
		use cirrus_query::Error;

		let (status, code) = match &err {
			Error::InvalidRescoreProfile { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_RESCORE_PROFILE"),
			Error::UnknownProfile { .. } => (StatusCode::NOT_FOUND, "UNKNOWN_PROFILE"),
			Error::RequestTooLong { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "REQUEST_TOO_LONG"),
			Error::InvalidResponse { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_RESPONSE"),
			Error::HighlightMerge { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
		};

		json_error(status, code, err.to_string(), None)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
