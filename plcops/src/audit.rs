//! # Operation Chain Resolution
//!
//! Finding the `prev` reference for the next operation from the
//! directory's audit log. The directory is the sole arbiter of ordering;
//! this module just reads its verdict: latest entry by creation time that
//! has not been nullified by a recovery rewrite.
//!
//! Callers are expected to re-resolve immediately before constructing and
//! signing the next operation. That narrows, but does not close, the race
//! window against other submitters; a stale `prev` is the directory's to
//! reject.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// One entry of the directory's audit log for an identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub created_at: DateTime<Utc>,
    /// Superseded by a recovery operation; must be skipped when resolving
    /// the chain head.
    pub nullified: bool,
    pub cid: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identifier has no valid operation history, or all of it was
    /// nullified.
    #[error("no valid prior operation in the audit log")]
    NoValidOperation,
}

/// The content identifier of the most recent non-nullified operation.
/// This is the value to place in the next operation's `prev` field.
pub fn latest_active_cid(entries: &[AuditLogEntry]) -> Result<String, ResolveError> {
    let mut ordered: Vec<&AuditLogEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
        .into_iter()
        .find(|e| !e.nullified)
        .map(|e| e.cid.clone())
        .ok_or(ResolveError::NoValidOperation)
}
