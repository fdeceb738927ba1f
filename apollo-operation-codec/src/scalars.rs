//! Scalar adapters: the encode/decode strategies bridging a GraphQL scalar
//! type and its in-memory representation.
//!
//! Resolution is two-step: an exact match on the declared scalar name among
//! user-registered adapters, then a fallback on the host type name against
//! the built-in table. Failing both is a compile-time error raised before any
//! document is accepted for codec generation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use displaydoc::Display;
use serde_json_bytes::Value;
use thiserror::Error;

use crate::spec::ScalarType;
use crate::spec::ScalarValue;

/// no scalar adapter registered for '{graphql_name}' (host type '{host_type_name}')
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedScalarError {
    pub graphql_name: String,
    pub host_type_name: String,
}

/// {reason}
#[derive(Error, Display, Debug, Clone)]
pub struct ScalarConversionError {
    pub reason: String,
}

impl ScalarConversionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Converts between the wire form of a scalar and its in-memory form.
///
/// Adapters are stateless and shared: one instance may serve many scalar
/// types with the same underlying representation.
pub trait ScalarAdapter: Send + Sync {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError>;
    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError>;
}

impl std::fmt::Debug for dyn ScalarAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScalarAdapter")
    }
}

/// Resolves a [`ScalarType`] to the adapter that will convert its values.
///
/// Read-only once handed to a codec; safe to share across operations.
#[derive(Default)]
pub struct ScalarAdapterRegistry {
    custom: HashMap<String, Arc<dyn ScalarAdapter>>,
}

impl ScalarAdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a scalar by its declared GraphQL name,
    /// overriding the built-in fallback for that scalar.
    pub fn register(&mut self, graphql_name: impl Into<String>, adapter: Arc<dyn ScalarAdapter>) {
        self.custom.insert(graphql_name.into(), adapter);
    }

    pub fn resolve(
        &self,
        scalar_type: &ScalarType,
    ) -> Result<Arc<dyn ScalarAdapter>, UnresolvedScalarError> {
        if let Some(adapter) = self.custom.get(&scalar_type.graphql_name) {
            return Ok(adapter.clone());
        }
        BUILT_IN_ADAPTERS
            .get(scalar_type.host_type_name.as_str())
            .cloned()
            .ok_or_else(|| UnresolvedScalarError {
                graphql_name: scalar_type.graphql_name.clone(),
                host_type_name: scalar_type.host_type_name.clone(),
            })
    }
}

/// Fallback adapters keyed by host type name. Initialized once, never
/// mutated, so resolution is lock-free.
static BUILT_IN_ADAPTERS: LazyLock<HashMap<&'static str, Arc<dyn ScalarAdapter>>> =
    LazyLock::new(|| {
        let string: Arc<dyn ScalarAdapter> = Arc::new(StringAdapter);
        let boolean: Arc<dyn ScalarAdapter> = Arc::new(BooleanAdapter);
        let int: Arc<dyn ScalarAdapter> = Arc::new(IntAdapter);
        let long: Arc<dyn ScalarAdapter> = Arc::new(LongAdapter);
        let float: Arc<dyn ScalarAdapter> = Arc::new(FloatAdapter);

        let mut table: HashMap<&'static str, Arc<dyn ScalarAdapter>> = HashMap::new();
        table.insert("String", string.clone());
        table.insert("ID", string);
        table.insert("bool", boolean.clone());
        table.insert("Boolean", boolean);
        table.insert("i32", int.clone());
        table.insert("Int", int);
        table.insert("i64", long);
        // single and double precision floats share a wire representation
        table.insert("f32", float.clone());
        table.insert("f64", float.clone());
        table.insert("Float", float);
        table.insert("Map", Arc::new(MapAdapter));
        table.insert("List", Arc::new(ListAdapter));
        table.insert("Upload", Arc::new(UploadAdapter));
        table.insert("Value", Arc::new(AnyAdapter));
        table
    });

struct StringAdapter;

impl ScalarAdapter for StringAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        raw.as_str()
            .map(|value| ScalarValue::String(value.to_string()))
            .ok_or_else(|| ScalarConversionError::new("expected a string"))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::String(value) => Ok(Value::String(value.clone().into())),
            _ => Err(ScalarConversionError::new("expected a string value")),
        }
    }
}

struct BooleanAdapter;

impl ScalarAdapter for BooleanAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        raw.as_bool()
            .map(ScalarValue::Boolean)
            .ok_or_else(|| ScalarConversionError::new("expected a boolean"))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Boolean(value) => Ok(Value::Bool(*value)),
            _ => Err(ScalarConversionError::new("expected a boolean value")),
        }
    }
}

struct IntAdapter;

impl ScalarAdapter for IntAdapter {
    // Spec: https://spec.graphql.org/June2018/#sec-Int
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        raw.as_i64()
            .and_then(|value| i32::try_from(value).ok())
            .map(ScalarValue::Int)
            .ok_or_else(|| ScalarConversionError::new("expected a 32-bit integer"))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Int(value) => Ok(Value::Number((*value).into())),
            _ => Err(ScalarConversionError::new("expected a 32-bit integer value")),
        }
    }
}

struct LongAdapter;

impl ScalarAdapter for LongAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        raw.as_i64()
            .map(ScalarValue::Long)
            .ok_or_else(|| ScalarConversionError::new("expected a 64-bit integer"))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Long(value) => Ok(Value::Number((*value).into())),
            _ => Err(ScalarConversionError::new("expected a 64-bit integer value")),
        }
    }
}

struct FloatAdapter;

impl ScalarAdapter for FloatAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        raw.as_f64()
            .map(ScalarValue::Float)
            .ok_or_else(|| ScalarConversionError::new("expected a number"))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .ok_or_else(|| ScalarConversionError::new("float is not finite")),
            _ => Err(ScalarConversionError::new("expected a float value")),
        }
    }
}

struct MapAdapter;

impl ScalarAdapter for MapAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        match raw {
            Value::Object(_) => Ok(ScalarValue::Json(raw.clone())),
            _ => Err(ScalarConversionError::new("expected a key/value object")),
        }
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Json(json @ Value::Object(_)) => Ok(json.clone()),
            _ => Err(ScalarConversionError::new("expected a key/value payload")),
        }
    }
}

struct ListAdapter;

impl ScalarAdapter for ListAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        match raw {
            Value::Array(_) => Ok(ScalarValue::Json(raw.clone())),
            _ => Err(ScalarConversionError::new("expected a list")),
        }
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Json(json @ Value::Array(_)) => Ok(json.clone()),
            _ => Err(ScalarConversionError::new("expected a list payload")),
        }
    }
}

struct UploadAdapter;

impl ScalarAdapter for UploadAdapter {
    // Uploads are an input-only type: a server can never send one back.
    fn decode(&self, _raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        Err(ScalarConversionError::new(
            "file upload scalars cannot appear in a response",
        ))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Json(json) => Ok(json.clone()),
            _ => Err(ScalarConversionError::new("expected an upload token")),
        }
    }
}

struct AnyAdapter;

impl ScalarAdapter for AnyAdapter {
    fn decode(&self, raw: &Value) -> Result<ScalarValue, ScalarConversionError> {
        Ok(ScalarValue::Json(raw.clone()))
    }

    fn encode(&self, value: &ScalarValue) -> Result<Value, ScalarConversionError> {
        match value {
            ScalarValue::Json(json) => Ok(json.clone()),
            _ => Err(ScalarConversionError::new("expected an untyped payload")),
        }
    }
}
