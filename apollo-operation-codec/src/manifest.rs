//! The operation manifest: which operations a compilation unit contains,
//! under which identities, rendered for persisted-query allowlisting.
//!
//! Resolution runs once per compilation over an in-memory batch and is fully
//! deterministic: entries keep source-declaration order and no partial
//! manifest is ever produced on error.

use std::collections::HashMap;
use std::fmt;

use apollo_compiler::ast;
use displaydoc::Display;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::identity::NormalizeError;
use crate::identity::OperationIdentifier;
use crate::identity::OperationIdentity;
use crate::identity::normalize_document;
use crate::identity::parse_document;

/// Errors raised while resolving a manifest. All of them abort the whole
/// compilation batch.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ManifestError {
    /// duplicate operation identity '{digest}' shared by operations {names:?} with differing documents
    DuplicateIdentity { digest: String, names: Vec<String> },
    /// manifest format '{format}' conflicts with the legacy operation output flag; set only one
    ConfigurationConflict { format: ManifestFormat },
    /// could not normalize operation document: {0}
    Normalize(#[from] NormalizeError),
    /// could not serialize manifest: {0}
    Serialize(#[from] serde_json::Error),
}

/// What kind of manifest file, if any, a compilation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    /// No manifest file.
    None,
    /// A JSON array of `{name, type, document}` records.
    OperationList,
    /// A JSON object keyed by identity digest, for server-side allowlists.
    PersistedQueryMap,
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManifestFormat::None => "none",
            ManifestFormat::OperationList => "operation_list",
            ManifestFormat::PersistedQueryMap => "persisted_query_map",
        };
        write!(f, "{name}")
    }
}

/// Manifest generation knobs.
///
/// `generate_operation_output` predates `format` and is kept for
/// configurations written against the old single-boolean surface; it is
/// equivalent to requesting [`ManifestFormat::OperationList`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default)]
    pub format: Option<ManifestFormat>,
    #[serde(default)]
    pub generate_operation_output: bool,
}

impl ManifestConfig {
    /// Apply the format policy: an explicit format is honored as-is, the
    /// legacy flag alone means [`ManifestFormat::OperationList`], and setting
    /// both so that each resolves to a manifest is a configuration error.
    pub fn effective_format(&self) -> Result<ManifestFormat, ManifestError> {
        match (self.format, self.generate_operation_output) {
            (Some(format), true) if format != ManifestFormat::None => {
                Err(ManifestError::ConfigurationConflict { format })
            }
            (Some(format), _) => Ok(format),
            (None, true) => Ok(ManifestFormat::OperationList),
            (None, false) => Ok(ManifestFormat::None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        };
        write!(f, "{name}")
    }
}

impl From<ast::OperationType> for OperationType {
    fn from(operation_type: ast::OperationType) -> Self {
        match operation_type {
            ast::OperationType::Query => OperationType::Query,
            ast::OperationType::Mutation => OperationType::Mutation,
            ast::OperationType::Subscription => OperationType::Subscription,
        }
    }
}

/// One operation as handed to the resolver, in source-declaration order.
#[derive(Debug, Clone)]
pub struct OperationSource {
    pub document_text: String,
    pub operation_name: String,
    pub operation_type: OperationType,
}

/// The name and type of the first operation in a document, for callers that
/// hold only raw text.
pub fn operation_metadata(
    document_text: &str,
) -> Result<(Option<String>, OperationType), NormalizeError> {
    let document = parse_document(document_text)?;
    for definition in &document.definitions {
        if let ast::Definition::OperationDefinition(operation) = definition {
            let name = operation.name.as_ref().map(|name| name.as_str().to_string());
            return Ok((name, OperationType::from(operation.operation_type)));
        }
    }
    Err(NormalizeError::MissingOperation)
}

/// One resolved manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub identity: OperationIdentity,
    pub operation_name: String,
    /// The normalized document text.
    pub document_text: String,
    pub operation_type: OperationType,
}

/// The resolved, source-ordered set of operations for one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestRecord<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    operation_type: OperationType,
    document: &'a str,
}

impl<'a> From<&'a ManifestEntry> for ManifestRecord<'a> {
    fn from(entry: &'a ManifestEntry) -> Self {
        Self {
            name: entry.operation_name.as_str(),
            operation_type: entry.operation_type,
            document: entry.document_text.as_str(),
        }
    }
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the manifest file content, or `None` when the format produces
    /// no file.
    pub fn render(&self, format: ManifestFormat) -> Result<Option<String>, ManifestError> {
        match format {
            ManifestFormat::None => Ok(None),
            ManifestFormat::OperationList => {
                let records: Vec<ManifestRecord<'_>> =
                    self.entries.iter().map(ManifestRecord::from).collect();
                Ok(Some(serde_json::to_string_pretty(&records)?))
            }
            ManifestFormat::PersistedQueryMap => {
                let map: IndexMap<&str, ManifestRecord<'_>> = self
                    .entries
                    .iter()
                    .map(|entry| (entry.identity.digest.as_str(), ManifestRecord::from(entry)))
                    .collect();
                Ok(Some(serde_json::to_string_pretty(&map)?))
            }
        }
    }
}

/// Merges a batch of operations with their identities into one manifest.
pub struct ManifestResolver {
    config: ManifestConfig,
    identifier: OperationIdentifier,
}

impl ManifestResolver {
    pub fn new(config: ManifestConfig, identifier: OperationIdentifier) -> Self {
        Self { config, identifier }
    }

    /// Resolve the effective format and the manifest for `sources`.
    ///
    /// Identities are computed once per entry; duplicates with identical
    /// normalized text collapse into the first record, duplicates with
    /// differing text are a hard error. Configuration conflicts are reported
    /// before any identity work begins.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn resolve(
        &self,
        sources: &[OperationSource],
    ) -> Result<(ManifestFormat, Manifest), ManifestError> {
        let format = self.config.effective_format()?;

        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(sources.len());
        let mut seen: HashMap<OperationIdentity, usize> = HashMap::with_capacity(sources.len());
        for source in sources {
            let document_text = normalize_document(&source.document_text)?;
            let identity = self.identifier.identify_normalized(&document_text);

            if let Some(&index) = seen.get(&identity) {
                let existing = &entries[index];
                // duplicate detection compares post-normalization text
                if existing.document_text == document_text {
                    tracing::debug!(
                        digest = identity.digest.as_str(),
                        operation = source.operation_name.as_str(),
                        "collapsing duplicate operation into existing manifest entry",
                    );
                    continue;
                }
                return Err(ManifestError::DuplicateIdentity {
                    digest: identity.digest.clone(),
                    names: vec![
                        existing.operation_name.clone(),
                        source.operation_name.clone(),
                    ],
                });
            }

            seen.insert(identity.clone(), entries.len());
            entries.push(ManifestEntry {
                identity,
                operation_name: source.operation_name.clone(),
                document_text,
                operation_type: source.operation_type,
            });
        }

        Ok((format, Manifest { entries }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source(name: &str, document_text: &str) -> OperationSource {
        OperationSource {
            document_text: document_text.to_string(),
            operation_name: name.to_string(),
            operation_type: OperationType::Query,
        }
    }

    fn resolver(config: ManifestConfig) -> ManifestResolver {
        ManifestResolver::new(config, OperationIdentifier::default())
    }

    #[test]
    fn explicit_format_is_honored() {
        let config = ManifestConfig {
            format: Some(ManifestFormat::PersistedQueryMap),
            generate_operation_output: false,
        };
        assert_eq!(
            config.effective_format().unwrap(),
            ManifestFormat::PersistedQueryMap
        );
    }

    #[test]
    fn absent_format_defaults_to_none() {
        assert_eq!(
            ManifestConfig::default().effective_format().unwrap(),
            ManifestFormat::None
        );
    }

    #[test]
    fn legacy_flag_alone_selects_operation_list() {
        let config = ManifestConfig {
            format: None,
            generate_operation_output: true,
        };
        assert_eq!(
            config.effective_format().unwrap(),
            ManifestFormat::OperationList
        );
    }

    #[test]
    fn conflicting_configuration_is_rejected_before_any_work() {
        let config = ManifestConfig {
            format: Some(ManifestFormat::OperationList),
            generate_operation_output: true,
        };
        let err = resolver(config)
            .resolve(&[source("Broken", "query Broken {")])
            .unwrap_err();
        // the conflict wins over the parse error: no identity work ran
        assert!(matches!(err, ManifestError::ConfigurationConflict { .. }));
    }

    #[test]
    fn explicit_none_with_legacy_flag_is_not_a_conflict() {
        let config = ManifestConfig {
            format: Some(ManifestFormat::None),
            generate_operation_output: true,
        };
        assert_eq!(config.effective_format().unwrap(), ManifestFormat::None);
    }

    #[test]
    fn byte_identical_operations_collapse_to_one_entry() {
        let config = ManifestConfig {
            format: Some(ManifestFormat::PersistedQueryMap),
            generate_operation_output: false,
        };
        let (format, manifest) = resolver(config)
            .resolve(&[
                source("Hero", "query Hero { hero { name } }"),
                // same document, different whitespace
                source("Hero", "query Hero{hero{name}}"),
            ])
            .unwrap();

        assert_eq!(format, ManifestFormat::PersistedQueryMap);
        assert_eq!(manifest.len(), 1);

        let rendered = manifest.render(format).unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let map = parsed.as_object().unwrap();
        assert_eq!(map.len(), 1);
        let record = map
            .get(manifest.entries[0].identity.digest.as_str())
            .unwrap();
        assert_eq!(record.get("name").unwrap(), "Hero");
        assert_eq!(record.get("type").unwrap(), "query");
    }

    #[test]
    fn colliding_identities_with_differing_text_are_an_error() {
        struct Constant;
        impl crate::identity::IdentityAlgorithm for Constant {
            fn version(&self) -> &str {
                "constant/v1"
            }
            fn digest(&self, _normalized_document: &str) -> String {
                "0000".to_string()
            }
        }

        let config = ManifestConfig {
            format: Some(ManifestFormat::OperationList),
            generate_operation_output: false,
        };
        let resolver = ManifestResolver::new(
            config,
            OperationIdentifier::new(std::sync::Arc::new(Constant)),
        );
        let err = resolver
            .resolve(&[
                source("Hero", "query Hero { hero { name } }"),
                source("Villain", "query Villain { villain { name } }"),
            ])
            .unwrap_err();

        let ManifestError::DuplicateIdentity { digest, names } = err else {
            panic!("expected a duplicate identity error");
        };
        assert_eq!(digest, "0000");
        assert_eq!(names, vec!["Hero".to_string(), "Villain".to_string()]);
    }

    #[test]
    fn entries_keep_source_declaration_order() {
        let config = ManifestConfig {
            format: Some(ManifestFormat::OperationList),
            generate_operation_output: false,
        };
        let (_, manifest) = resolver(config)
            .resolve(&[
                source("Zebra", "query Zebra { zebra { name } }"),
                source("Aardvark", "query Aardvark { aardvark { name } }"),
            ])
            .unwrap();

        let names: Vec<&str> = manifest
            .entries
            .iter()
            .map(|entry| entry.operation_name.as_str())
            .collect();
        assert_eq!(names, vec!["Zebra", "Aardvark"]);
    }

    #[test]
    fn operation_list_renders_normalized_documents() {
        let config = ManifestConfig {
            format: None,
            generate_operation_output: true,
        };
        let (format, manifest) = resolver(config)
            .resolve(&[source("Hero", "query Hero {\n  hero {\n    name\n  }\n}")])
            .unwrap();

        let rendered = manifest.render(format).unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 1);
        let document = records[0].get("document").unwrap().as_str().unwrap();
        assert_eq!(document, manifest.entries[0].document_text);
        // the canonical printer emits a single line
        assert!(!document.contains('\n'));
    }

    #[test]
    fn none_format_renders_no_file() {
        let (format, manifest) = resolver(ManifestConfig::default())
            .resolve(&[source("Hero", "query Hero { hero { name } }")])
            .unwrap();
        assert_eq!(format, ManifestFormat::None);
        assert_eq!(manifest.render(format).unwrap(), None);
    }

    #[test]
    fn metadata_extraction_reads_name_and_type() {
        let (name, operation_type) =
            operation_metadata("mutation SaveHero { saveHero { id } }").unwrap();
        assert_eq!(name.as_deref(), Some("SaveHero"));
        assert_eq!(operation_type, OperationType::Mutation);

        let (anonymous, operation_type) = operation_metadata("{ hero { name } }").unwrap();
        assert_eq!(anonymous, None);
        assert_eq!(operation_type, OperationType::Query);

        assert!(matches!(
            operation_metadata("fragment Named on Hero { name }").unwrap_err(),
            NormalizeError::MissingOperation
        ));
    }
}
