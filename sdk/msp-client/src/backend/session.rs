//! Authenticated backend sessions.
//!
//! Sign-in follows the SIWE pattern: the backend issues a challenge
//! message containing a nonce, the wallet signs it as a personal message,
//! and the backend exchanges the signature for a bearer token.

use chrono::{DateTime, Utc};

use shs_core::intention::PersonalSigner;
use shs_core::types::AccountId;

use super::models::{NonceRequest, UserProfile, VerifyRequest};
use super::BackendIndexGateway;
use crate::error::{Error, Result};

const LOG_TARGET: &str = "shs::backend::session";

/// A bearer-token session with the MSP backend.
///
/// Sessions are explicit values passed to every authenticated call; there
/// is no process-global token, so one process can hold sessions for
/// several accounts or backends at once.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    user: UserProfile,
    issued_at: DateTime<Utc>,
    invalidated: bool,
}

impl Session {
    pub(crate) fn new(token: String, user: UserProfile) -> Self {
        Self {
            token,
            user,
            issued_at: Utc::now(),
            invalidated: false,
        }
    }

    /// `Authorization` header value for this session.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn address(&self) -> AccountId {
        self.user.address
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn is_valid(&self) -> bool {
        !self.invalidated
    }

    /// Marks the session unusable locally. Server-side invalidation is
    /// [`sign_out`].
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Replaces the token with a freshly issued one.
    pub async fn refresh<B: BackendIndexGateway>(&mut self, backend: &B) -> Result<()> {
        let response = backend.refresh_token(self).await?;
        self.token = response.token;
        self.issued_at = Utc::now();
        tracing::debug!(target: LOG_TARGET, address = %self.user.address, "session refreshed");
        Ok(())
    }
}

/// Runs the full challenge/sign/verify flow and returns a live session.
pub async fn sign_in<B, S>(
    backend: &B,
    signer: &S,
    address: AccountId,
    chain_id: u64,
    domain: &str,
    uri: &str,
) -> Result<Session>
where
    B: BackendIndexGateway,
    S: PersonalSigner,
{
    let challenge = backend
        .request_nonce(&NonceRequest {
            address,
            chain_id,
            domain: domain.to_string(),
            uri: uri.to_string(),
        })
        .await?;

    let signature = signer
        .sign_personal(challenge.message.as_bytes())
        .await
        .map_err(|e| Error::Signer(e.to_string()))?;

    let verified = backend
        .verify_signature(&VerifyRequest {
            message: challenge.message,
            signature,
        })
        .await?;

    if verified.user.address != address {
        return Err(Error::Unauthorized(format!(
            "backend resolved a different address: expected {address}, got {}",
            verified.user.address
        )));
    }

    tracing::info!(target: LOG_TARGET, %address, "signed in");
    Ok(Session::new(verified.token, verified.user))
}

/// Invalidates the session on the backend and locally.
pub async fn sign_out<B: BackendIndexGateway>(backend: &B, session: &mut Session) -> Result<()> {
    backend.logout(session).await?;
    session.invalidate();
    tracing::info!(target: LOG_TARGET, address = %session.address(), "signed out");
    Ok(())
}
