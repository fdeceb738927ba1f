//! Compiles GraphQL operations into stable content-derived identities and
//! typed, bidirectional response codecs.
//!
//! The crate covers the runtime and build-time core of operation
//! compilation: resolving scalar adapters, walking a schema-informed field
//! descriptor tree to convert between wire JSON and typed values (including
//! polymorphic fragment dispatch on `__typename`), normalizing and hashing
//! document text into persisted-query identities, and merging a batch of
//! operations into an allowlisting manifest.
//!
//! Discovering `.graphql` files, validating documents against a schema and
//! emitting generated source text are the responsibility of external
//! collaborators; this crate consumes validated, in-memory inputs and
//! produces in-memory results.

#![warn(unreachable_pub)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod identity;
pub mod manifest;
pub mod response;
pub mod scalars;
pub mod spec;

pub use identity::IdentityAlgorithm;
pub use identity::NormalizeError;
pub use identity::OperationIdentifier;
pub use identity::OperationIdentity;
pub use identity::Sha256DocumentId;
pub use identity::normalize_document;
pub use manifest::Manifest;
pub use manifest::ManifestConfig;
pub use manifest::ManifestEntry;
pub use manifest::ManifestError;
pub use manifest::ManifestFormat;
pub use manifest::ManifestResolver;
pub use manifest::OperationSource;
pub use manifest::OperationType;
pub use response::ResponseError;
pub use response::ResponseWalker;
pub use scalars::ScalarAdapter;
pub use scalars::ScalarAdapterRegistry;
pub use scalars::ScalarConversionError;
pub use scalars::UnresolvedScalarError;
pub use spec::FieldDescriptor;
pub use spec::FieldKind;
pub use spec::FragmentVariant;
pub use spec::ScalarType;
pub use spec::ScalarValue;
pub use spec::TYPENAME;
pub use spec::TypedValue;
