//! The response walker: a bidirectional codec between a GraphQL JSON response
//! and the typed value tree described by a [`FieldDescriptor`].
//!
//! A walker is compiled once per operation, which is also where unresolved
//! scalars surface; decode and encode are pure functions over the shared,
//! read-only descriptor and can run concurrently from any number of threads.

use std::collections::HashMap;
use std::sync::Arc;

use displaydoc::Display;
use indexmap::IndexMap;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;
use thiserror::Error;

use crate::scalars::ScalarAdapter;
use crate::scalars::ScalarAdapterRegistry;
use crate::scalars::UnresolvedScalarError;
use crate::spec::FieldDescriptor;
use crate::spec::FieldKind;
use crate::spec::FragmentVariant;
use crate::spec::TYPENAME;
use crate::spec::TypedValue;

const NULL: Value = Value::Null;

/// Runtime decode/encode failures.
///
/// These are returned to the immediate caller and never retried here; the
/// `path` is the dot-joined response-name path from the root, so the
/// offending field can be located without re-traversing the input.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum ResponseError {
    /// unexpected null at '{path}': field is non-nullable
    UnexpectedNull { path: String },
    /// type mismatch at '{path}': expected {expected}
    TypeMismatch {
        path: String,
        expected: &'static str,
    },
    /// could not decode scalar at '{path}': {reason}
    ScalarDecode { path: String, reason: String },
    /// value does not match its descriptor at '{path}': {reason}
    ///
    /// This is a programming defect: the value being encoded was not produced
    /// by decoding with the same descriptor. It is not recoverable at runtime.
    InvariantViolation { path: String, reason: String },
}

/// A compiled codec for one operation's response shape.
#[derive(Debug)]
pub struct ResponseWalker {
    descriptor: Arc<FieldDescriptor>,
    /// Adapters resolved at compile time, keyed by declared scalar name.
    adapters: HashMap<String, Arc<dyn ScalarAdapter>>,
}

impl ResponseWalker {
    /// Compile a codec, resolving every scalar adapter the descriptor needs.
    ///
    /// This is the compile-time gate for [`UnresolvedScalarError`]: a
    /// descriptor naming a scalar no adapter covers is rejected here, before
    /// the operation is accepted for codec generation.
    pub fn compile(
        descriptor: Arc<FieldDescriptor>,
        registry: &ScalarAdapterRegistry,
    ) -> Result<Self, UnresolvedScalarError> {
        let mut adapters = HashMap::new();
        collect_adapters(&descriptor, registry, &mut adapters)?;
        Ok(Self {
            descriptor,
            adapters,
        })
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Decode a wire value into the typed tree described by the descriptor.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn decode(&self, input: &Value) -> Result<TypedValue, ResponseError> {
        let mut path = vec![self.descriptor.response_name.clone()];
        self.decode_field(&self.descriptor, self.descriptor.list_depth, input, &mut path)
    }

    /// Encode a typed tree back into its wire form; the structural inverse of
    /// [`decode`](Self::decode).
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn encode(&self, value: &TypedValue) -> Result<Value, ResponseError> {
        let mut path = vec![self.descriptor.response_name.clone()];
        self.encode_field(&self.descriptor, self.descriptor.list_depth, value, &mut path)
    }

    fn decode_field(
        &self,
        descriptor: &FieldDescriptor,
        list_depth: usize,
        input: &Value,
        path: &mut Vec<String>,
    ) -> Result<TypedValue, ResponseError> {
        if input.is_null() {
            return if descriptor.nullable {
                Ok(TypedValue::Null)
            } else {
                Err(ResponseError::UnexpectedNull {
                    path: render_path(path),
                })
            };
        }

        if list_depth > 0 {
            let Value::Array(elements) = input else {
                return Err(ResponseError::TypeMismatch {
                    path: render_path(path),
                    expected: "an array",
                });
            };
            let mut decoded = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                path.push(index.to_string());
                decoded.push(self.decode_field(descriptor, list_depth - 1, element, path)?);
                path.pop();
            }
            return Ok(TypedValue::List(decoded));
        }

        match &descriptor.kind {
            FieldKind::Scalar(scalar_type) => {
                let adapter = self.adapter(&scalar_type.graphql_name, path)?;
                let value = adapter.decode(input).map_err(|err| ResponseError::ScalarDecode {
                    path: render_path(path),
                    reason: err.to_string(),
                })?;
                Ok(TypedValue::Scalar(value))
            }
            FieldKind::Object(children) => {
                let Value::Object(object) = input else {
                    return Err(ResponseError::TypeMismatch {
                        path: render_path(path),
                        expected: "an object",
                    });
                };
                Ok(TypedValue::Object(self.decode_children(children, object, path)?))
            }
            FieldKind::Fragment(variants) => {
                let Value::Object(object) = input else {
                    return Err(ResponseError::TypeMismatch {
                        path: render_path(path),
                        expected: "an object",
                    });
                };
                self.decode_fragment(variants, object, path)
            }
        }
    }

    fn decode_children(
        &self,
        children: &[FieldDescriptor],
        object: &Map<ByteString, Value>,
        path: &mut Vec<String>,
    ) -> Result<IndexMap<String, TypedValue>, ResponseError> {
        let mut fields = IndexMap::with_capacity(children.len());
        for child in children {
            path.push(child.response_name.clone());
            let value = match &child.kind {
                // A fragment group has no wire key of its own: its variants
                // apply to the object currently being decoded.
                FieldKind::Fragment(variants) => self.decode_fragment(variants, object, path)?,
                _ => {
                    // an absent key and an explicit null are treated the same
                    let input = object.get(child.wire_name.as_str()).unwrap_or(&NULL);
                    self.decode_field(child, child.list_depth, input, path)?
                }
            };
            path.pop();
            fields.insert(child.response_name.clone(), value);
        }
        Ok(fields)
    }

    fn decode_fragment(
        &self,
        variants: &[FragmentVariant],
        object: &Map<ByteString, Value>,
        path: &mut Vec<String>,
    ) -> Result<TypedValue, ResponseError> {
        let discriminator = object.get(TYPENAME).and_then(Value::as_str);
        for (index, variant) in variants.iter().enumerate() {
            if variant.matches(discriminator) {
                let fields = self.decode_children(&variant.children, object, path)?;
                return Ok(TypedValue::Variant {
                    matched: Some(index),
                    fields,
                });
            }
        }
        // The server returned a type this operation does not know about;
        // open-ended polymorphism makes that an empty variant, not an error.
        tracing::trace!(typename = ?discriminator, "no fragment variant matched");
        Ok(TypedValue::Variant {
            matched: None,
            fields: IndexMap::new(),
        })
    }

    fn encode_field(
        &self,
        descriptor: &FieldDescriptor,
        list_depth: usize,
        value: &TypedValue,
        path: &mut Vec<String>,
    ) -> Result<Value, ResponseError> {
        if value.is_null() {
            return if descriptor.nullable {
                Ok(Value::Null)
            } else {
                Err(self.invariant(path, "null value for a non-nullable field"))
            };
        }

        if list_depth > 0 {
            let TypedValue::List(elements) = value else {
                return Err(self.invariant(path, "expected a list value"));
            };
            let mut encoded = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                path.push(index.to_string());
                encoded.push(self.encode_field(descriptor, list_depth - 1, element, path)?);
                path.pop();
            }
            return Ok(Value::Array(encoded));
        }

        match (&descriptor.kind, value) {
            (FieldKind::Scalar(scalar_type), TypedValue::Scalar(scalar)) => {
                let adapter = self.adapter(&scalar_type.graphql_name, path)?;
                adapter
                    .encode(scalar)
                    .map_err(|err| self.invariant(path, &err.to_string()))
            }
            (FieldKind::Object(children), TypedValue::Object(fields)) => {
                let mut object = Map::new();
                self.encode_children(children, fields, &mut object, path)?;
                Ok(Value::Object(object))
            }
            (FieldKind::Fragment(variants), TypedValue::Variant { matched, fields }) => {
                let mut object = Map::new();
                self.encode_variant(variants, *matched, fields, &mut object, path)?;
                Ok(Value::Object(object))
            }
            _ => Err(self.invariant(path, "value shape does not match the descriptor")),
        }
    }

    fn encode_children(
        &self,
        children: &[FieldDescriptor],
        fields: &IndexMap<String, TypedValue>,
        object: &mut Map<ByteString, Value>,
        path: &mut Vec<String>,
    ) -> Result<(), ResponseError> {
        for child in children {
            path.push(child.response_name.clone());
            match (&child.kind, fields.get(&child.response_name)) {
                (
                    FieldKind::Fragment(variants),
                    Some(TypedValue::Variant { matched, fields: variant_fields }),
                ) => {
                    // fragment fields are flat on the wire
                    self.encode_variant(variants, *matched, variant_fields, object, path)?;
                }
                (FieldKind::Fragment(_), Some(_)) => {
                    return Err(self.invariant(path, "expected a variant value"));
                }
                (_, Some(value)) => {
                    let encoded = self.encode_field(child, child.list_depth, value, path)?;
                    object.insert(child.wire_name.as_str(), encoded);
                }
                (_, None) => {
                    return Err(self.invariant(path, "missing field entry"));
                }
            }
            path.pop();
        }
        Ok(())
    }

    fn encode_variant(
        &self,
        variants: &[FragmentVariant],
        matched: Option<usize>,
        fields: &IndexMap<String, TypedValue>,
        object: &mut Map<ByteString, Value>,
        path: &mut Vec<String>,
    ) -> Result<(), ResponseError> {
        // an unmatched fragment contributed no fields, so it emits none
        let Some(index) = matched else {
            return Ok(());
        };
        let Some(variant) = variants.get(index) else {
            return Err(self.invariant(path, "variant index out of range"));
        };
        self.encode_children(&variant.children, fields, object, path)
    }

    fn adapter(
        &self,
        graphql_name: &str,
        path: &[String],
    ) -> Result<&Arc<dyn ScalarAdapter>, ResponseError> {
        self.adapters.get(graphql_name).ok_or_else(|| {
            // unreachable as long as decode/encode walk the descriptor this
            // walker was compiled from
            ResponseError::InvariantViolation {
                path: render_path(path),
                reason: format!("no adapter compiled for scalar '{graphql_name}'"),
            }
        })
    }

    fn invariant(&self, path: &[String], reason: &str) -> ResponseError {
        ResponseError::InvariantViolation {
            path: render_path(path),
            reason: reason.to_string(),
        }
    }
}

fn collect_adapters(
    descriptor: &FieldDescriptor,
    registry: &ScalarAdapterRegistry,
    adapters: &mut HashMap<String, Arc<dyn ScalarAdapter>>,
) -> Result<(), UnresolvedScalarError> {
    match &descriptor.kind {
        FieldKind::Scalar(scalar_type) => {
            if !adapters.contains_key(&scalar_type.graphql_name) {
                let adapter = registry.resolve(scalar_type)?;
                adapters.insert(scalar_type.graphql_name.clone(), adapter);
            }
        }
        FieldKind::Object(children) => {
            for child in children {
                collect_adapters(child, registry, adapters)?;
            }
        }
        FieldKind::Fragment(variants) => {
            for variant in variants {
                for child in &variant.children {
                    collect_adapters(child, registry, adapters)?;
                }
            }
        }
    }
    Ok(())
}

fn render_path(path: &[String]) -> String {
    path.join(".")
}
