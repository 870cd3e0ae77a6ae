//! Storage contracts and built-in durable key-value stores for gateway credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key-value storage holding the gateway's credential pair.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the secret stored under `key`, if present.
	fn fetch(&self, key: StoreKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Replaces both keys in one operation. A pair without a refresh token removes
	/// [`StoreKey::RefreshToken`].
	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Deletes both keys.
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Reads the full pair; `None` when no access token is stored.
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		Box::pin(async move {
			let Some(access_token) = self.fetch(StoreKey::AuthToken).await? else {
				return Ok(None);
			};
			let refresh_token = self.fetch(StoreKey::RefreshToken).await?;

			Ok(Some(CredentialPair { access_token, refresh_token }))
		})
	}
}

/// Fixed storage keys used for the credential pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
	/// Access token, stored under `auth_token`.
	AuthToken,
	/// Refresh token, stored under `refresh_token`.
	RefreshToken,
}
impl StoreKey {
	/// Both keys, in storage order.
	pub const ALL: [StoreKey; 2] = [StoreKey::AuthToken, StoreKey::RefreshToken];

	/// Returns the stable storage key.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreKey::AuthToken => "auth_token",
			StoreKey::RefreshToken => "refresh_token",
		}
	}

	/// Parses a storage key, returning `None` for unknown keys.
	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|key| key.as_str() == raw)
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Applies a pair to a key-value map the way every backend persists it.
pub(crate) fn apply_pair(map: &mut HashMap<StoreKey, TokenSecret>, pair: CredentialPair) {
	map.insert(StoreKey::AuthToken, pair.access_token);

	match pair.refresh_token {
		Some(refresh) => {
			map.insert(StoreKey::RefreshToken, refresh);
		},
		None => {
			map.remove(&StoreKey::RefreshToken);
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_keys_use_fixed_names() {
		assert_eq!(StoreKey::AuthToken.as_str(), "auth_token");
		assert_eq!(StoreKey::RefreshToken.as_str(), "refresh_token");
		assert_eq!(StoreKey::parse("refresh_token"), Some(StoreKey::RefreshToken));
		assert_eq!(StoreKey::parse("session"), None);
		assert_eq!(
			serde_json::to_string(&StoreKey::AuthToken).expect("Store key should serialize."),
			"\"auth_token\""
		);
	}

	#[test]
	fn applying_pair_without_refresh_drops_stale_refresh() {
		let mut map = HashMap::new();

		apply_pair(&mut map, CredentialPair::new("T1").with_refresh_token("R1"));
		apply_pair(&mut map, CredentialPair::new("T2"));

		assert_eq!(map.get(&StoreKey::AuthToken).map(TokenSecret::expose), Some("T2"));
		assert!(!map.contains_key(&StoreKey::RefreshToken));
	}
}
