//! Request method classification

use http::Method;
use std::collections::HashSet;

/// Whether a request method needs token validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Presumed not to change state; no validation.
    Safe,
    /// May change state; the token must be validated.
    Unsafe,
}

impl MethodClass {
    /// Check if this is [`MethodClass::Unsafe`].
    pub fn is_unsafe(self) -> bool {
        matches!(self, Self::Unsafe)
    }
}

/// The methods validated by default: POST, PUT, PATCH and DELETE.
pub fn default_unsafe_methods() -> HashSet<Method> {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE]
        .into_iter()
        .collect()
}

/// Classify `method` against the configured unsafe set.
pub fn classify(method: &Method, unsafe_methods: &HashSet<Method>) -> MethodClass {
    if unsafe_methods.contains(method) {
        MethodClass::Unsafe
    } else {
        MethodClass::Safe
    }
}
