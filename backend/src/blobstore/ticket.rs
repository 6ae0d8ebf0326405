//! Signed, time-limited upload tickets
//!
//! A ticket is `{nonce}.{expires_unix}.{hmac_hex}` where the HMAC-SHA256 covers the
//! upload target, the nonce and the expiry. The nonce also names the objects written
//! with the ticket, which is what makes a ticket single-use.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a ticket is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    /// The ticket does not have the `nonce.expiry.signature` shape
    #[error("malformed upload ticket")]
    Malformed,

    /// The signature does not match the target, nonce and expiry
    #[error("upload ticket signature mismatch")]
    BadSignature,

    /// The ticket's lifetime has passed
    #[error("upload ticket expired at {0}")]
    Expired(i64),

    /// The configured lifetime does not fit a timestamp
    #[error("upload ticket lifetime out of range")]
    LifetimeOutOfRange,
}

/// A freshly minted ticket
#[derive(Debug, Clone)]
pub struct UploadTicket {
    /// Random identifier, unique per ticket
    pub nonce: String,
    /// Last moment the ticket is accepted
    pub expires_at: DateTime<Utc>,
    /// Encoded ticket, as carried in the upload URL
    pub token: String,
}

/// Mints and verifies upload tickets with a server-side secret
pub struct TicketSigner {
    secret: Vec<u8>,
    ttl: Option<chrono::Duration>,
}

impl TicketSigner {
    /// Creates a signer issuing tickets valid for `ttl_secs`
    #[must_use]
    pub fn new(secret: Vec<u8>, ttl_secs: u64) -> Self {
        Self {
            secret,
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds),
        }
    }

    /// # Panics
    ///
    /// Never in practice: HMAC accepts keys of any length
    fn mac(&self, target: &str, nonce: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(format!("{target}|{nonce}|{expires}").as_bytes());
        mac
    }

    /// Mints a ticket for uploads posted to `target`
    ///
    /// # Errors
    ///
    /// Returns `TicketError::LifetimeOutOfRange` if `now` plus the lifetime overflows
    pub fn mint(&self, target: &str, now: DateTime<Utc>) -> Result<UploadTicket, TicketError> {
        let expires_at = self
            .ttl
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TicketError::LifetimeOutOfRange)?;
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(target, &nonce, expires).finalize().into_bytes());

        Ok(UploadTicket {
            token: format!("{nonce}.{expires}.{signature}"),
            nonce,
            expires_at,
        })
    }

    /// Checks a ticket presented to `target` and returns its nonce
    ///
    /// # Errors
    ///
    /// Returns a `TicketError` if the ticket is malformed, forged, bound to another
    /// target or expired
    pub fn verify(
        &self,
        target: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TicketError> {
        let mut parts = token.splitn(3, '.');
        let (Some(nonce), Some(expires), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TicketError::Malformed);
        };

        if nonce.len() != 32 || !nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TicketError::Malformed);
        }
        let expires = expires.parse::<i64>().map_err(|_| TicketError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TicketError::Malformed)?;

        self.mac(target, nonce, expires)
            .verify_slice(&signature)
            .map_err(|_| TicketError::BadSignature)?;

        if now.timestamp() > expires {
            return Err(TicketError::Expired(expires));
        }

        Ok(nonce.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TicketSigner {
        TicketSigner::new(b"test-secret".to_vec(), 60)
    }

    #[test]
    fn test_minted_ticket_verifies() {
        let now = Utc::now();
        let ticket = signer().mint("/upload", now).unwrap();

        let nonce = signer().verify("/upload", &ticket.token, now).unwrap();
        assert_eq!(nonce, ticket.nonce);
        assert_eq!(ticket.expires_at, now + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_nonces_are_unique() {
        let now = Utc::now();
        assert_ne!(
            signer().mint("/upload", now).unwrap().nonce,
            signer().mint("/upload", now).unwrap().nonce
        );
    }

    #[test]
    fn test_expired_ticket_is_rejected() {
        let now = Utc::now();
        let ticket = signer().mint("/upload", now).unwrap();

        let later = now + chrono::Duration::seconds(61);
        assert!(matches!(
            signer().verify("/upload", &ticket.token, later),
            Err(TicketError::Expired(_))
        ));
    }

    #[test]
    fn test_ticket_is_bound_to_target() {
        let now = Utc::now();
        let ticket = signer().mint("/upload", now).unwrap();

        assert_eq!(
            signer().verify("/elsewhere", &ticket.token, now),
            Err(TicketError::BadSignature)
        );
    }

    #[test]
    fn test_ticket_from_other_secret_is_rejected() {
        let now = Utc::now();
        let ticket = TicketSigner::new(b"other".to_vec(), 60).mint("/upload", now).unwrap();

        assert_eq!(
            signer().verify("/upload", &ticket.token, now),
            Err(TicketError::BadSignature)
        );
    }

    #[test]
    fn test_extended_expiry_is_rejected() {
        let now = Utc::now();
        let ticket = signer().mint("/upload", now).unwrap();
        let mut parts: Vec<_> = ticket.token.split('.').map(ToString::to_string).collect();
        parts[1] = (ticket.expires_at.timestamp() + 3600).to_string();

        assert_eq!(
            signer().verify("/upload", &parts.join("."), now),
            Err(TicketError::BadSignature)
        );
    }

    #[test]
    fn test_oversized_lifetime_fails_to_mint() {
        let signer = TicketSigner::new(b"test-secret".to_vec(), 1_000_000_000_000_000);

        assert_eq!(
            signer.mint("/upload", Utc::now()).unwrap_err(),
            TicketError::LifetimeOutOfRange
        );
        assert_eq!(
            TicketSigner::new(b"test-secret".to_vec(), u64::MAX)
                .mint("/upload", Utc::now())
                .unwrap_err(),
            TicketError::LifetimeOutOfRange
        );
    }

    #[test]
    fn test_malformed_tickets_are_rejected() {
        let now = Utc::now();
        for token in [
            "",
            "abc",
            "abc.123",
            "not-a-hex-nonce-not-a-hex-nonce!.123.00",
            "0123456789abcdef0123456789abcdef.soon.00",
            "0123456789abcdef0123456789abcdef.123.zz",
        ] {
            assert_eq!(
                signer().verify("/upload", token, now),
                Err(TicketError::Malformed),
                "token: {token:?}"
            );
        }
    }
}
