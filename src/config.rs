//! Gateway configuration: backend base URL, client identity, and refresh endpoint settings.
//!
//! Values are supplied by the host, either through [`GatewayConfig::builder`] or from the
//! process environment via [`GatewayConfig::from_env`]:
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `AUTH_GATEWAY_BASE_URL` | yes | - |
//! | `AUTH_GATEWAY_CLIENT_ID` | yes | - |
//! | `AUTH_GATEWAY_CLIENT_SECRET` | yes | - |
//! | `AUTH_GATEWAY_REFRESH_PATH` | no | `account/op/refresh-token/` |
//! | `AUTH_GATEWAY_REFRESH_TIMEOUT_SECS` | no | `30` |

// std
use std::env;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Environment variable holding the backend base URL.
pub const ENV_BASE_URL: &str = "AUTH_GATEWAY_BASE_URL";
/// Environment variable holding the OAuth-style client identifier.
pub const ENV_CLIENT_ID: &str = "AUTH_GATEWAY_CLIENT_ID";
/// Environment variable holding the OAuth-style client secret.
pub const ENV_CLIENT_SECRET: &str = "AUTH_GATEWAY_CLIENT_SECRET";
/// Environment variable overriding the refresh endpoint path.
pub const ENV_REFRESH_PATH: &str = "AUTH_GATEWAY_REFRESH_PATH";
/// Environment variable overriding the refresh timeout, in whole seconds.
pub const ENV_REFRESH_TIMEOUT_SECS: &str = "AUTH_GATEWAY_REFRESH_TIMEOUT_SECS";

/// Errors raised while constructing or validating a [`GatewayConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum GatewayConfigError {
	/// A required environment variable is unset or empty.
	#[error("Environment variable `{name}` is required.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL must use HTTP or HTTPS and carry a host.
	#[error("Base URL must be an http(s) URL with a host: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Client identifier is required for the refresh call.
	#[error("Client identifier must not be empty.")]
	MissingClientId,
	/// Timeouts must be positive.
	#[error("The {which} timeout must be positive.")]
	NonPositiveTimeout {
		/// Which timeout failed validation.
		which: &'static str,
	},
	/// A numeric environment variable could not be parsed.
	#[error("Environment variable `{name}` must be a whole number of seconds, got `{value}`.")]
	InvalidTimeout {
		/// Variable name.
		name: &'static str,
		/// Raw value.
		value: String,
	},
}

/// Immutable gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
	/// Backend base URL; always ends with `/` so relative paths join beneath it.
	pub base_url: Url,
	/// Client identifier sent with every refresh call.
	pub client_id: String,
	/// Client secret sent with every refresh call.
	pub client_secret: TokenSecret,
	/// Refresh endpoint path, relative to [`GatewayConfig::base_url`].
	pub refresh_path: String,
	/// Upper bound for the refresh call; `None` waits indefinitely.
	pub refresh_timeout: Option<Duration>,
	/// Default timeout for ordinary requests; `None` defers to the transport.
	pub request_timeout: Option<Duration>,
}
impl GatewayConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &str = "account/op/refresh-token/";
	/// Default refresh call timeout.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, GatewayConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
		let require =
			|name: &'static str| read(name).ok_or(GatewayConfigError::MissingVariable { name });
		let base_url = Url::parse(require(ENV_BASE_URL)?.trim())
			.map_err(|source| GatewayConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url)
			.client_id(require(ENV_CLIENT_ID)?)
			.client_secret(require(ENV_CLIENT_SECRET)?);

		if let Some(path) = read(ENV_REFRESH_PATH) {
			builder = builder.refresh_path(path);
		}
		if let Some(raw) = read(ENV_REFRESH_TIMEOUT_SECS) {
			let secs = raw.trim().parse::<i64>().map_err(|_| GatewayConfigError::InvalidTimeout {
				name: ENV_REFRESH_TIMEOUT_SECS,
				value: raw.clone(),
			})?;

			builder = builder.refresh_timeout(Duration::seconds(secs));
		}

		builder.build()
	}

	/// Resolves `path` against the base URL. Leading slashes are ignored so every path stays
	/// beneath the configured prefix.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Resolves the refresh endpoint.
	pub fn refresh_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Client identifier.
	pub client_id: String,
	/// Client secret.
	pub client_secret: TokenSecret,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Refresh call timeout.
	pub refresh_timeout: Option<Duration>,
	/// Ordinary request timeout.
	pub request_timeout: Option<Duration>,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with the base URL and default refresh settings.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			client_id: String::new(),
			client_secret: TokenSecret::new(""),
			refresh_path: GatewayConfig::DEFAULT_REFRESH_PATH.into(),
			refresh_timeout: Some(GatewayConfig::DEFAULT_REFRESH_TIMEOUT),
			request_timeout: None,
		}
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, client_secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = client_secret.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the refresh call timeout.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Removes the refresh call timeout entirely.
	pub fn without_refresh_timeout(mut self) -> Self {
		self.refresh_timeout = None;

		self
	}

	/// Sets a default timeout for ordinary requests.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let config = GatewayConfig {
			base_url: normalize_base(self.base_url)?,
			client_id: self.client_id,
			client_secret: self.client_secret,
			refresh_path: self.refresh_path,
			refresh_timeout: self.refresh_timeout,
			request_timeout: self.request_timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

impl GatewayConfig {
	fn validate(&self) -> Result<(), GatewayConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(GatewayConfigError::MissingClientId);
		}

		validate_timeout("refresh", self.refresh_timeout)?;
		validate_timeout("request", self.request_timeout)?;

		Ok(())
	}
}

fn normalize_base(mut url: Url) -> Result<Url, GatewayConfigError> {
	if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
		return Err(GatewayConfigError::UnsupportedBaseUrl { url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

fn validate_timeout(
	which: &'static str,
	timeout: Option<Duration>,
) -> Result<(), GatewayConfigError> {
	match timeout {
		Some(value) if !value.is_positive() => Err(GatewayConfigError::NonPositiveTimeout { which }),
		_ => Ok(()),
	}
}
