//! Stored credential pair plus the request/response bodies of the refresh endpoint.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh credentials persisted by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived token attached to every authenticated request.
	pub access_token: TokenSecret,
	/// Longer-lived token used only to obtain a new access token.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Creates a pair holding only an access token.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}
}

/// JSON body posted to the refresh endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
	pub(crate) refresh_token: &'a str,
	pub(crate) client_id: &'a str,
	pub(crate) client_secret: &'a str,
}

/// Success body returned by the refresh endpoint. Unknown fields are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshedCredentials {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the server issued one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl RefreshedCredentials {
	/// Builds the pair to persist, retaining `previous_refresh` unless the server rotated it.
	///
	/// Returns `None` when the server answered with an empty access token.
	pub fn into_pair(self, previous_refresh: TokenSecret) -> Option<CredentialPair> {
		if self.access_token.is_empty() {
			return None;
		}

		let refresh_token = self
			.refresh_token
			.filter(|secret| !secret.is_empty())
			.unwrap_or(previous_refresh);

		Some(CredentialPair { access_token: self.access_token, refresh_token: Some(refresh_token) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(body: &str) -> RefreshedCredentials {
		serde_json::from_str(body).expect("Refresh body fixture should deserialize.")
	}

	#[test]
	fn rotation_replaces_refresh_token_when_returned() {
		let pair = parse(r#"{"access_token":"T2","refresh_token":"R2","expires_in":300}"#)
			.into_pair(TokenSecret::new("R1"))
			.expect("Non-empty access token should produce a pair.");

		assert_eq!(pair.access_token.expose(), "T2");
		assert_eq!(pair.refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
	}

	#[test]
	fn rotation_retains_refresh_token_when_absent_null_or_empty() {
		for body in [
			r#"{"access_token":"T2"}"#,
			r#"{"access_token":"T2","refresh_token":null}"#,
			r#"{"access_token":"T2","refresh_token":""}"#,
		] {
			let pair = parse(body)
				.into_pair(TokenSecret::new("R1"))
				.expect("Non-empty access token should produce a pair.");

			assert_eq!(pair.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"), "{body}");
		}
	}

	#[test]
	fn rotation_rejects_empty_access_token() {
		assert!(parse(r#"{"access_token":""}"#).into_pair(TokenSecret::new("R1")).is_none());
	}

	#[test]
	fn refresh_grant_serializes_client_identity() {
		let grant = RefreshGrant { refresh_token: "R1", client_id: "id", client_secret: "secret" };

		assert_eq!(
			serde_json::to_value(&grant).expect("Refresh grant should serialize."),
			serde_json::json!({ "refresh_token": "R1", "client_id": "id", "client_secret": "secret" }),
		);
	}
}
