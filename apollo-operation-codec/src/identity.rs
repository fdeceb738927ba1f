//! Stable, content-derived operation identities.
//!
//! A document is normalized through the GraphQL parser's canonical printer
//! (comments and insignificant whitespace disappear), then digested by a
//! version-tagged algorithm. Identical normalized text and identical
//! algorithm version always yield the same identity, across runs and across
//! machines.

use std::sync::Arc;

use apollo_compiler::ast;
use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Errors surfaced while turning raw document text into canonical form.
///
/// These are compile-time failures: the codec core receives pre-validated
/// documents, so hitting one means the input never went through validation.
#[derive(Error, Display, Debug, Clone)]
#[non_exhaustive]
pub enum NormalizeError {
    /// could not parse operation document: {0}
    Parse(String),
    /// document contains no operation definition
    MissingOperation,
}

/// A digest algorithm plus the version tag mixed into every identity it
/// produces.
///
/// Algorithms are capability values: two instances with the same version are
/// interchangeable, and different versions are never silently merged, even
/// if their digests happen to collide. Changing digest behavior without
/// bumping the version silently produces stale manifests.
pub trait IdentityAlgorithm: Send + Sync {
    fn version(&self) -> &str;
    /// Digest the normalized document text into a stable printable string.
    fn digest(&self, normalized_document: &str) -> String;
}

/// Version tag of the default algorithm.
pub const DEFAULT_IDENTITY_VERSION: &str = "sha256/v1";

/// The default algorithm: SHA-256 over the normalized UTF-8 bytes, rendered
/// as lowercase hexadecimal.
#[derive(Debug, Clone, Default)]
pub struct Sha256DocumentId;

impl IdentityAlgorithm for Sha256DocumentId {
    fn version(&self) -> &str {
        DEFAULT_IDENTITY_VERSION
    }

    fn digest(&self, normalized_document: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized_document.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// The stable identity of one operation document.
///
/// Equality and hashing cover the algorithm version as well as the digest,
/// so identities computed under different versions never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationIdentity {
    pub algorithm_version: String,
    pub digest: String,
}

/// Computes [`OperationIdentity`] values with a pluggable algorithm.
#[derive(Clone)]
pub struct OperationIdentifier {
    algorithm: Arc<dyn IdentityAlgorithm>,
}

impl Default for OperationIdentifier {
    fn default() -> Self {
        Self::new(Arc::new(Sha256DocumentId))
    }
}

impl OperationIdentifier {
    pub fn new(algorithm: Arc<dyn IdentityAlgorithm>) -> Self {
        Self { algorithm }
    }

    /// Normalize the document and digest it.
    pub fn identify(&self, document_text: &str) -> Result<OperationIdentity, NormalizeError> {
        Ok(self.identify_normalized(&normalize_document(document_text)?))
    }

    /// Digest text that has already been through [`normalize_document`].
    pub fn identify_normalized(&self, normalized_document: &str) -> OperationIdentity {
        OperationIdentity {
            algorithm_version: self.algorithm.version().to_string(),
            digest: self.algorithm.digest(normalized_document),
        }
    }

    pub fn algorithm_version(&self) -> &str {
        self.algorithm.version()
    }
}

/// Canonicalize document text: parse, then reserialize on a single line.
///
/// Comments never survive parsing and the canonical printer emits one exact
/// spelling for every token sequence, so any two documents differing only in
/// insignificant whitespace or comments normalize identically.
pub fn normalize_document(document_text: &str) -> Result<String, NormalizeError> {
    let document = parse_document(document_text)?;
    Ok(document.serialize().no_indent().to_string())
}

pub(crate) fn parse_document(document_text: &str) -> Result<ast::Document, NormalizeError> {
    let mut parser = apollo_compiler::parser::Parser::new();
    parser
        .parse_ast(document_text, "operation.graphql")
        .map_err(|invalid| NormalizeError::Parse(invalid.errors.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn whitespace_only_differences_share_an_identity() {
        let identifier = OperationIdentifier::default();
        let spaced = identifier.identify("query Hero { hero { name } }").unwrap();
        let compact = identifier.identify("query Hero{hero{name}}").unwrap();
        assert_eq!(spaced, compact);
    }

    #[test]
    fn comments_do_not_affect_the_identity() {
        let identifier = OperationIdentifier::default();
        let commented = identifier
            .identify("# fetch the hero\nquery Hero {\n  hero {\n    name\n  }\n}")
            .unwrap();
        let bare = identifier.identify("query Hero { hero { name } }").unwrap();
        assert_eq!(commented, bare);
    }

    #[test]
    fn significant_tokens_change_the_identity() {
        let identifier = OperationIdentifier::default();
        let name = identifier.identify("query Hero { hero { name } }").unwrap();
        let id = identifier.identify("query Hero { hero { id } }").unwrap();
        assert_ne!(name.digest, id.digest);
    }

    #[test]
    fn digests_are_lowercase_hex_sha256() {
        let identity = OperationIdentifier::default()
            .identify("query Hero { hero { name } }")
            .unwrap();
        assert_eq!(identity.algorithm_version, DEFAULT_IDENTITY_VERSION);
        assert_eq!(identity.digest.len(), 64);
        assert!(
            identity
                .digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn identify_is_deterministic() {
        let identifier = OperationIdentifier::default();
        let first = identifier.identify("query Hero { hero { name } }").unwrap();
        let second = identifier.identify("query Hero { hero { name } }").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn identical_digests_under_different_versions_are_distinct() {
        struct Versioned(&'static str);
        impl IdentityAlgorithm for Versioned {
            fn version(&self) -> &str {
                self.0
            }
            fn digest(&self, normalized_document: &str) -> String {
                // deliberately version-independent digest logic
                format!("{:x}", Sha256::digest(normalized_document.as_bytes()))
            }
        }

        let v1 = OperationIdentifier::new(Arc::new(Versioned("custom/v1")));
        let v2 = OperationIdentifier::new(Arc::new(Versioned("custom/v2")));
        let first = v1.identify("query Hero { hero { name } }").unwrap();
        let second = v2.identify("query Hero { hero { name } }").unwrap();

        assert_eq!(first.digest, second.digest);
        assert_ne!(first, second);

        let mut seen = std::collections::HashSet::new();
        seen.insert(first);
        assert!(!seen.contains(&second));
    }

    #[test]
    fn unparseable_documents_are_rejected() {
        let err = OperationIdentifier::default()
            .identify("query Hero { hero {")
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Parse(_)));
    }
}
