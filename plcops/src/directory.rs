//! # Directory Client
//!
//! Thin async HTTP client for the directory service. Three endpoints:
//!
//! - `GET {addr}/{did}/data` — the current state of an identifier, in the
//!   loose JSON form (distinct from the canonical binary form).
//! - `GET {addr}/{did}/log/audit` — the audit log, from which the next
//!   `prev` reference is resolved.
//! - `POST {addr}/{did}` — submit a signed operation as JSON.
//!
//! HTTP 200 is success. Anything else is a rejection carrying the server's
//! body verbatim for operator inspection. This client never retries; a
//! caller that wants another attempt re-resolves the chain head and
//! rebuilds the operation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::audit::{self, AuditLogEntry, ResolveError};
use crate::config::DirectoryConfig;
use crate::operation::{Operation, PlcOperation};

/// Errors from directory round trips.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network or decode failure, straight from the HTTP collaborator.
    #[error("directory transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-200 response. `message` is the server body, unmodified.
    #[error("directory rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The audit log held no usable prior operation.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Client for one directory service.
pub struct DirectoryClient {
    http: reqwest::Client,
    address: String,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            address: config.address,
        })
    }

    /// Fetch the current state of an identifier: rotation keys,
    /// verification methods, linked identifiers, services.
    pub async fn current_state(&self, did: &str) -> Result<Operation, DirectoryError> {
        let url = format!("{}/{}/data", self.address, did);
        tracing::debug!(%did, "fetching directory state");
        let resp = self.http.get(&url).send().await?;
        Ok(Self::ensure_ok(resp).await?.json().await?)
    }

    /// Fetch the full audit log for an identifier.
    pub async fn audit_log(&self, did: &str) -> Result<Vec<AuditLogEntry>, DirectoryError> {
        let url = format!("{}/{}/log/audit", self.address, did);
        tracing::debug!(%did, "fetching audit log");
        let resp = self.http.get(&url).send().await?;
        Ok(Self::ensure_ok(resp).await?.json().await?)
    }

    /// Resolve the content identifier the next operation must reference.
    pub async fn latest_cid(&self, did: &str) -> Result<String, DirectoryError> {
        let log = self.audit_log(did).await?;
        Ok(audit::latest_active_cid(&log)?)
    }

    /// Submit a signed operation.
    ///
    /// The body is the operation's JSON form; the canonical binary form
    /// never travels over this wire, the directory re-derives it.
    pub async fn submit(&self, did: &str, op: &PlcOperation) -> Result<(), DirectoryError> {
        let url = format!("{}/{}", self.address, did);
        tracing::info!(%did, kind = op.type_name(), "submitting operation");
        let resp = self.http.post(&url).json(op).send().await?;
        Self::ensure_ok(resp).await?;
        tracing::info!(%did, "directory accepted operation");
        Ok(())
    }

    async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %message, "directory rejected request");
        Err(DirectoryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Tombstone;

    fn client_for(server: &mockito::ServerGuard) -> DirectoryClient {
        DirectoryClient::new(DirectoryConfig::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn current_state_decodes_loose_json() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "rotationKeys": ["did:key:zPrimary", "did:key:zBackup"],
            "verificationMethods": {"atproto": "did:key:zSigner"},
            "alsoKnownAs": ["at://alice.example.com"],
            "services": {
                "atproto_pds": {
                    "type": "AtprotoPersonalDataServer",
                    "endpoint": "https://pds.example.com"
                }
            }
        }"#;
        let m = server
            .mock("GET", "/did:plc:aaaabbbbccccddddeeeeffff/data")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let state = client_for(&server)
            .current_state("did:plc:aaaabbbbccccddddeeeeffff")
            .await
            .unwrap();

        assert_eq!(state.primary_rotation_key(), Some("did:key:zPrimary"));
        assert_eq!(
            state.services["atproto_pds"].endpoint,
            "https://pds.example.com"
        );
        assert_eq!(state.prev, None);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn latest_cid_skips_nullified_entries() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"[
            {"createdAt": "2024-01-03T00:00:00Z", "nullified": false, "cid": "cid-a"},
            {"createdAt": "2024-01-05T00:00:00Z", "nullified": true,  "cid": "cid-b"},
            {"createdAt": "2024-01-04T00:00:00Z", "nullified": false, "cid": "cid-c"}
        ]"#;
        let _m = server
            .mock("GET", "/did:plc:log/log/audit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let cid = client_for(&server).latest_cid("did:plc:log").await.unwrap();
        assert_eq!(cid, "cid-c");
    }

    #[tokio::test]
    async fn latest_cid_on_empty_history_is_resolve_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/did:plc:empty/log/audit")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let err = client_for(&server)
            .latest_cid("did:plc:empty")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Resolve(ResolveError::NoValidOperation)
        ));
    }

    #[tokio::test]
    async fn submit_success_is_quiet() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/did:plc:ok")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create_async()
            .await;

        let op = PlcOperation::from(Tombstone::new("bafyprev").unwrap())
            .into_signed("c2ln".to_string());
        client_for(&server).submit("did:plc:ok", &op).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_carries_status_and_body_and_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/did:plc:stale")
            .with_status(400)
            .with_body(r#"{"message":"prev does not match the current head"}"#)
            .expect(1)
            .create_async()
            .await;

        let op = PlcOperation::from(Tombstone::new("bafystale").unwrap())
            .into_signed("c2ln".to_string());
        let err = client_for(&server)
            .submit("did:plc:stale", &op)
            .await
            .unwrap_err();

        match err {
            DirectoryError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("prev does not match"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        // Exactly one request: a rejection is terminal, never retried here.
        m.assert_async().await;
    }
}
