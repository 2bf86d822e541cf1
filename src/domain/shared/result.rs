//! Domain result type

use super::error::DomainError;

/// Result type for call-domain operations that can violate a rule
pub type Result<T> = std::result::Result<T, DomainError>;
