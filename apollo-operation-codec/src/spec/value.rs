use indexmap::IndexMap;
use serde_json_bytes::Value;

/// The in-memory form of one decoded leaf value.
///
/// One shape may serve many scalar types: every built-in string-like scalar
/// decodes to [`ScalarValue::String`], and all generic map/list/fallback
/// payloads share [`ScalarValue::Json`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f64),
    String(String),
    /// Untyped payloads: generic maps, generic lists and the catch-all
    /// fallback adapter.
    Json(Value),
    /// The canonical in-memory representation produced by a registered custom
    /// adapter, tagged with the host type it belongs to.
    Custom { host_type: String, value: Value },
}

/// A decoded value tree mirroring the shape of its
/// [`FieldDescriptor`](crate::spec::FieldDescriptor).
///
/// Object and variant fields are keyed by `response_name`, in descriptor
/// order. Owned exclusively by the caller that invoked decode.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Scalar(ScalarValue),
    List(Vec<TypedValue>),
    Object(IndexMap<String, TypedValue>),
    /// The outcome of a fragment group: the index of the variant that was
    /// selected, or `None` when the server returned a type no variant covers.
    Variant {
        matched: Option<usize>,
        fields: IndexMap<String, TypedValue>,
    },
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Look up a field of an object or variant node by response name.
    pub fn get(&self, response_name: &str) -> Option<&TypedValue> {
        match self {
            TypedValue::Object(fields) | TypedValue::Variant { fields, .. } => {
                fields.get(response_name)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Scalar(ScalarValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reaches_into_objects_and_variants() {
        let mut fields = IndexMap::new();
        fields.insert(
            "name".to_string(),
            TypedValue::Scalar(ScalarValue::String("R2-D2".to_string())),
        );
        let object = TypedValue::Object(fields.clone());
        let variant = TypedValue::Variant {
            matched: Some(0),
            fields,
        };

        assert_eq!(object.get("name").and_then(TypedValue::as_str), Some("R2-D2"));
        assert_eq!(variant.get("name").and_then(TypedValue::as_str), Some("R2-D2"));
        assert_eq!(object.get("missing"), None);
        assert_eq!(TypedValue::Null.get("name"), None);
    }
}
