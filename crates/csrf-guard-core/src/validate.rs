//! Candidate token validation

use crate::token::CsrfToken;
use std::fmt;
use subtle::ConstantTimeEq;

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No token in the body field or header.
    Missing,
    /// A token was supplied but does not match the session token.
    Mismatch,
}

impl RejectReason {
    /// Short identifier, suitable for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing the submitted token with the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The request may proceed.
    Allowed,
    /// The request must be halted.
    Rejected(RejectReason),
}

impl ValidationOutcome {
    /// Check if the outcome is [`ValidationOutcome::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Compare `candidate` with the session token in constant time.
pub fn validate(session_token: &CsrfToken, candidate: Option<&str>) -> ValidationOutcome {
    let candidate = match candidate {
        Some(c) if !c.is_empty() => c,
        _ => return ValidationOutcome::Rejected(RejectReason::Missing),
    };

    if bool::from(session_token.as_str().as_bytes().ct_eq(candidate.as_bytes())) {
        ValidationOutcome::Allowed
    } else {
        ValidationOutcome::Rejected(RejectReason::Mismatch)
    }
}
