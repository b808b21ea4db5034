use crate::{CacheKey, Error, Result};

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Claims of a transfer token: the artifact it grants access to and its lifetime,
/// both in seconds since the epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferClaims {
	pub key: String,
	pub iat: i64,
	pub exp: i64,
}

/// Signs and checks the short lived tokens handed out by the resolve call and
/// redeemed on the data endpoint.
pub struct TransferTokens {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	ttl: chrono::Duration,
}

impl TransferTokens {
	pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
		if secret.is_empty() {
			return Err(Error::Config("the transfer secret can't be empty".to_string()));
		}

		let ttl = chrono::Duration::from_std(ttl)
			.map_err(|e| Error::Config(format!("invalid transfer token lifetime: {e}")))?;

		// Expiry is checked by hand against an injectable clock, see `verify_at`
		let mut validation = Validation::new(Algorithm::HS256);
		validation.validate_exp = false;
		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp"]);

		Ok(Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
			ttl,
		})
	}

	pub fn issue(&self, key: &CacheKey) -> Result<String> {
		self.issue_at(key, Utc::now())
	}

	pub fn issue_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<String> {
		let claims = TransferClaims {
			key: key.to_string(),
			iat: now.timestamp(),
			exp: (now + self.ttl).timestamp(),
		};

		trace!(%key, exp = claims.exp, "Issuing transfer token");

		encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Into::into)
	}

	pub fn verify(&self, token: &str) -> Result<CacheKey> {
		self.verify_at(token, Utc::now())
	}

	/// Checks the signature, then the expiry, and returns the key the token grants
	/// access to. A token is still valid on the very second it expires.
	pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<CacheKey> {
		let claims = decode::<TransferClaims>(token, &self.decoding, &self.validation)?.claims;

		if now.timestamp() > claims.exp {
			return Err(Error::TokenExpired {
				expired_at: claims.exp,
			});
		}

		CacheKey::parse(&claims.key).map_err(|_| Error::InvalidTokenClaims)
	}
}
