//! Gateway-level error types shared by the outbound path, the refresh protocol, and stores.

// self
use crate::{
	_prelude::*, config::GatewayConfigError, http::GatewayResponse, pipeline::Disposition,
	store::StoreError,
};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); never retried by the gateway.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential refresh failed; the session has been signed out.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Upstream answered with a failure status that the gateway does not recover from.
	#[error(transparent)]
	Request(#[from] RequestError),

	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when the error is an authorization failure that survived the refresh
	/// protocol (e.g., the replay was rejected as well).
	pub fn is_authorization_failure(&self) -> bool {
		matches!(self, Self::Request(err) if err.is_authorization_failure())
	}

	/// Returns the refresh failure, if this error came from a failed refresh cycle.
	pub fn as_refresh(&self) -> Option<&RefreshError> {
		match self {
			Self::Refresh(err) => Some(err),
			_ => None,
		}
	}
}

/// Configuration and request-construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Gateway configuration failed validation.
	#[error(transparent)]
	Gateway(#[from] GatewayConfigError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` has an invalid name or value.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	RequestBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its configured timeout.
	#[error("Request to the upstream service timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Terminal refresh failures. Every request parked on the failed cycle receives a clone.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token was stored when the cycle started.
	#[error("No refresh token is available for the credential refresh.")]
	MissingRefreshToken,
	/// The refresh endpoint rejected the call or could not be reached.
	#[error("Refresh endpoint call failed (status {status:?}): {message}")]
	RefreshCallFailed {
		/// HTTP status code, when the endpoint answered at all.
		status: Option<u16>,
		/// Transport error or response body preview.
		message: String,
	},
	/// The refresh endpoint answered 2xx with a body that is not a credential payload.
	#[error("Refresh endpoint returned a malformed body at `{path}`: {message}")]
	MalformedResponse {
		/// JSON path of the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Reading the refresh token or persisting the rotated pair failed.
	#[error("Credential store failed during refresh: {0}")]
	Storage(#[source] StoreError),
	/// The driving request was dropped before the cycle settled.
	#[error("Credential refresh was abandoned before it settled.")]
	Abandoned,
}
impl RefreshError {
	pub(crate) fn call_failed(status: Option<u16>, message: impl Into<String>) -> Self {
		Self::RefreshCallFailed { status, message: message.into() }
	}

	pub(crate) fn malformed(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::MalformedResponse { path: err.path().to_string(), message: err.inner().to_string() }
	}
}

/// Upstream failure response propagated to the caller unchanged.
#[derive(Debug, ThisError)]
#[error("Request failed with HTTP status {}.", .response.status)]
pub struct RequestError {
	response: Box<GatewayResponse>,
	disposition: Disposition,
}
impl RequestError {
	/// Wraps the failing response, treating only 401 as an authorization failure.
	pub fn new(response: GatewayResponse) -> Self {
		let disposition = if response.status == ::http::StatusCode::UNAUTHORIZED {
			Disposition::AuthorizationFailure
		} else {
			Disposition::Failure
		};

		Self::classified(response, disposition)
	}

	/// Wraps the failing response with the disposition the pipeline's classifier assigned.
	pub fn classified(response: GatewayResponse, disposition: Disposition) -> Self {
		Self { response: Box::new(response), disposition }
	}

	/// Returns the numeric HTTP status of the failing response.
	pub fn status(&self) -> u16 {
		self.response.status.as_u16()
	}

	/// Returns how the classifier treated the failing response.
	pub fn disposition(&self) -> Disposition {
		self.disposition
	}

	/// Borrows the original response (status, headers, body).
	pub fn response(&self) -> &GatewayResponse {
		&self.response
	}

	/// Consumes the error and returns the original response.
	pub fn into_response(self) -> GatewayResponse {
		*self.response
	}

	/// Returns `true` when the classifier judged the response a credential rejection, so a
	/// 403 counts whenever the gateway's classifier lists it.
	pub fn is_authorization_failure(&self) -> bool {
		self.disposition == Disposition::AuthorizationFailure
	}
}
