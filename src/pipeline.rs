//! Ordered outbound request stages and inbound response classification.
//!
//! The gateway runs every outbound request through [`Pipeline::prepare`] (credential
//! attachment, content-type defaulting, then any host stages, in insertion order) and hands
//! every response to [`Pipeline::classify`]. Replays re-run the stages from the original
//! descriptor, so stages see the exact request the caller issued.

// crates.io
use ::http::{
	HeaderValue, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	http::{GatewayRequest, GatewayResponse, JSON_CONTENT_TYPE},
};

/// Per-dispatch inputs visible to request stages.
#[derive(Clone, Copy, Debug)]
pub struct OutboundContext<'a> {
	/// Access token to attach, if one is stored (or the refreshed token during a replay).
	pub access_token: Option<&'a TokenSecret>,
	/// `true` when the request is being replayed after a credential refresh.
	pub replay: bool,
}

/// Synchronous request transform applied before the transport sees the request.
///
/// Stages must not block; the outbound path never waits on refresh state.
pub trait RequestStage
where
	Self: Send + Sync,
{
	/// Stable label for diagnostics.
	fn name(&self) -> &'static str;

	/// Mutates `request` in place.
	fn apply(&self, request: &mut GatewayRequest, ctx: &OutboundContext<'_>) -> Result<()>;
}

/// Sets `Authorization: Bearer <token>` when a token is available and strips any caller-set
/// `Authorization` header otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerAuth;
impl RequestStage for BearerAuth {
	fn name(&self) -> &'static str {
		"bearer_auth"
	}

	fn apply(&self, request: &mut GatewayRequest, ctx: &OutboundContext<'_>) -> Result<()> {
		match ctx.access_token {
			Some(token) => {
				let mut value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
					ConfigError::InvalidHeader { name: AUTHORIZATION.as_str().to_owned() }
				})?;

				value.set_sensitive(true);
				request.headers.insert(AUTHORIZATION, value);
			},
			None => {
				request.headers.remove(AUTHORIZATION);
			},
		}

		Ok(())
	}
}

/// Defaults `Content-Type` to JSON when the caller left it unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonContentType;
impl RequestStage for JsonContentType {
	fn name(&self) -> &'static str {
		"json_content_type"
	}

	fn apply(&self, request: &mut GatewayRequest, _ctx: &OutboundContext<'_>) -> Result<()> {
		if !request.headers.contains_key(CONTENT_TYPE) {
			request.headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
		}

		Ok(())
	}
}

/// How the gateway treats a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
	/// Deliver to the caller unchanged.
	Success,
	/// The credential was rejected; eligible for one refresh-and-replay.
	AuthorizationFailure,
	/// Propagate to the caller as a request error.
	Failure,
}

/// Maps responses to [`Disposition`]s.
pub trait ResponseClassifier
where
	Self: Send + Sync,
{
	/// Classifies `response`.
	fn classify(&self, response: &GatewayResponse) -> Disposition;
}

/// Default classifier: 2xx succeeds, configured statuses (401 by default) are authorization
/// failures, everything else fails.
#[derive(Clone, Debug)]
pub struct StatusClassifier {
	authorization_statuses: Vec<StatusCode>,
}
impl StatusClassifier {
	/// Treats `statuses` as authorization failures instead of the default 401.
	pub fn with_authorization_statuses<I>(statuses: I) -> Self
	where
		I: IntoIterator<Item = StatusCode>,
	{
		Self { authorization_statuses: statuses.into_iter().collect() }
	}
}
impl Default for StatusClassifier {
	fn default() -> Self {
		Self::with_authorization_statuses([StatusCode::UNAUTHORIZED])
	}
}
impl ResponseClassifier for StatusClassifier {
	fn classify(&self, response: &GatewayResponse) -> Disposition {
		if response.status.is_success() {
			Disposition::Success
		} else if self.authorization_statuses.contains(&response.status) {
			Disposition::AuthorizationFailure
		} else {
			Disposition::Failure
		}
	}
}

/// Explicit, ordered request/response pipeline composed by the gateway.
#[derive(Clone)]
pub struct Pipeline {
	stages: Vec<Arc<dyn RequestStage>>,
	classifier: Arc<dyn ResponseClassifier>,
}
impl Pipeline {
	/// Bearer credential attachment, then JSON content-type defaulting, with the status
	/// classifier.
	pub fn standard() -> Self {
		Self {
			stages: vec![Arc::new(BearerAuth), Arc::new(JsonContentType)],
			classifier: Arc::new(StatusClassifier::default()),
		}
	}

	/// Appends a stage that runs after the existing ones.
	pub fn with_stage(mut self, stage: impl RequestStage + 'static) -> Self {
		self.stages.push(Arc::new(stage));

		self
	}

	/// Replaces the response classifier.
	pub fn with_classifier(mut self, classifier: impl ResponseClassifier + 'static) -> Self {
		self.classifier = Arc::new(classifier);

		self
	}

	/// Stage labels in execution order.
	pub fn stage_names(&self) -> Vec<&'static str> {
		self.stages.iter().map(|stage| stage.name()).collect()
	}

	/// Runs every stage over `request`.
	pub fn prepare(
		&self,
		mut request: GatewayRequest,
		ctx: &OutboundContext<'_>,
	) -> Result<GatewayRequest> {
		for stage in &self.stages {
			stage.apply(&mut request, ctx)?;
		}

		Ok(request)
	}

	/// Classifies `response`.
	pub fn classify(&self, response: &GatewayResponse) -> Disposition {
		self.classifier.classify(response)
	}
}
impl Default for Pipeline {
	fn default() -> Self {
		Self::standard()
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
	}
}
