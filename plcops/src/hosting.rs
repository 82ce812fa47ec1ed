//! # Hosting-Service Co-Signing
//!
//! When the locally held key is not among an identity's current rotation
//! keys, the holder cannot self-sign the next operation. The identity's
//! hosting service (PDS) can: it holds a rotation key of its own and will
//! co-sign a candidate operation after the account owner proves control
//! through an emailed authorization token.
//!
//! The exchange is three XRPC calls against the hosting service:
//!
//! 1. `com.atproto.server.createSession` — password login, yields the
//!    bearer token for the other two calls.
//! 2. `com.atproto.identity.requestPlcOperationSignature` — asks the
//!    service to email the authorization token. The flow then *ends*; the
//!    token arrives out of band and the tool is invoked a second time.
//! 3. `com.atproto.identity.signPlcOperation` — candidate fields plus the
//!    token in, a signed operation out.
//!
//! Session lifecycle beyond one login is out of scope: one token, used
//! immediately, never persisted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::HostingConfig;
use crate::operation::{PlcOperation, Service};
use crate::signing::{OperationSigner, SignError};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const REQUEST_SIGNATURE: &str = "com.atproto.identity.requestPlcOperationSignature";
const SIGN_OPERATION: &str = "com.atproto.identity.signPlcOperation";

/// Errors from hosting-service round trips.
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("hosting transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response, body verbatim.
    #[error("hosting service refused the request (status {status}): {message}")]
    Refused { status: u16, message: String },

    #[error("not authenticated with the hosting service; log in first")]
    NotAuthenticated,
}

/// Request body for the co-sign call. Fields left `None` are omitted and
/// the hosting service keeps the identity's current values for them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOperationRequest {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_methods: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, Service>>,
}

impl SignOperationRequest {
    /// A request that only replaces the rotation key list, the common case
    /// for key rotation.
    pub fn rotation_keys_only(token: impl Into<String>, rotation_keys: Vec<String>) -> Self {
        Self {
            token: token.into(),
            rotation_keys: Some(rotation_keys),
            verification_methods: None,
            also_known_as: None,
            services: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct SignOperationResponse {
    operation: PlcOperation,
}

/// Client for one hosting service.
pub struct HostingClient {
    http: reqwest::Client,
    address: String,
    access_token: Option<String>,
}

impl HostingClient {
    pub fn new(config: HostingConfig) -> Result<Self, HostingError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            address: config.address,
            access_token: None,
        })
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.address, nsid)
    }

    fn bearer(&self) -> Result<&str, HostingError> {
        self.access_token
            .as_deref()
            .ok_or(HostingError::NotAuthenticated)
    }

    /// Password login. Stores the session's bearer token for the
    /// signature calls; returns the DID the service authenticated.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<String, HostingError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            identifier: &'a str,
            password: &'a str,
        }

        tracing::debug!(%identifier, "logging in to hosting service");
        let resp = self
            .http
            .post(self.xrpc_url(CREATE_SESSION))
            .json(&LoginRequest { identifier, password })
            .send()
            .await?;
        let session: Session = Self::ensure_ok(resp).await?.json().await?;
        self.access_token = Some(session.access_jwt);
        Ok(session.did)
    }

    /// Ask the hosting service to email the out-of-band authorization
    /// token. The co-sign call cannot proceed until the caller returns
    /// with that token.
    pub async fn request_signature_token(&self) -> Result<(), HostingError> {
        let resp = self
            .http
            .post(self.xrpc_url(REQUEST_SIGNATURE))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Self::ensure_ok(resp).await?;
        tracing::info!("hosting service will email an authorization token");
        Ok(())
    }

    /// Exchange candidate fields and the authorization token for an
    /// operation signed by the hosting service's rotation key.
    pub async fn sign_operation(
        &self,
        request: &SignOperationRequest,
    ) -> Result<PlcOperation, HostingError> {
        let resp = self
            .http
            .post(self.xrpc_url(SIGN_OPERATION))
            .bearer_auth(self.bearer()?)
            .json(request)
            .send()
            .await?;
        let signed: SignOperationResponse = Self::ensure_ok(resp).await?.json().await?;
        tracing::info!("hosting service co-signed the operation");
        Ok(signed.operation)
    }

    async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, HostingError> {
        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %message, "hosting service refused request");
        Err(HostingError::Refused {
            status: status.as_u16(),
            message,
        })
    }
}

/// Rotation keys for a key-promotion update: `key` first, the remaining
/// keys in their existing order, duplicates of `key` removed.
pub fn promote_rotation_key(key: &str, existing: &[String]) -> Vec<String> {
    let mut keys = vec![key.to_string()];
    keys.extend(existing.iter().filter(|k| *k != key).cloned());
    keys
}

/// Signs by delegating to a hosting service with an authorization token.
///
/// The counterpart of [`crate::signing::KeypairSigner`] behind the same
/// [`OperationSigner`] capability. Note the returned operation is the
/// hosting service's composition: it signs the candidate *fields*, and
/// fills `prev` and anything omitted from its own view of the identity.
pub struct HostedSigner {
    client: HostingClient,
    token: String,
}

impl HostedSigner {
    pub fn new(client: HostingClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }
}

#[async_trait]
impl OperationSigner for HostedSigner {
    async fn sign(&self, op: PlcOperation) -> Result<PlcOperation, SignError> {
        let PlcOperation::Operation(op) = op else {
            return Err(SignError::HostedTombstone);
        };
        let request = SignOperationRequest {
            token: self.token.clone(),
            rotation_keys: Some(op.rotation_keys),
            verification_methods: (!op.verification_methods.is_empty())
                .then_some(op.verification_methods),
            also_known_as: (!op.also_known_as.is_empty()).then_some(op.also_known_as),
            services: (!op.services.is_empty()).then_some(op.services),
        };
        Ok(self.client.sign_operation(&request).await?)
    }
}
