use std::collections::BTreeSet;

/// A custom scalar as declared in the schema, paired with the nominal type it
/// maps to in the generated model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScalarType {
    /// The scalar name as spelled in the schema, e.g. `Date`.
    pub graphql_name: String,
    /// The type the scalar maps to in the generated model, e.g. `CustomDate`.
    pub host_type_name: String,
}

impl ScalarType {
    pub fn new(graphql_name: impl Into<String>, host_type_name: impl Into<String>) -> Self {
        Self {
            graphql_name: graphql_name.into(),
            host_type_name: host_type_name.into(),
        }
    }
}

/// What a selected field contains.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A leaf value converted through a [`crate::scalars::ScalarAdapter`].
    Scalar(ScalarType),
    /// A nested selection set. Children are in document order.
    Object(Vec<FieldDescriptor>),
    /// A type-conditioned group of selections over the enclosing object.
    ///
    /// Variants are tried in declared order and the first match wins; a
    /// variant with an empty type condition is the unconditioned default.
    Fragment(Vec<FragmentVariant>),
}

/// One type-conditioned alternative of a [`FieldKind::Fragment`] group.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentVariant {
    /// Concrete type names this variant applies to. Empty means "any type".
    pub type_condition: BTreeSet<String>,
    pub children: Vec<FieldDescriptor>,
}

impl FragmentVariant {
    pub fn new<I, S>(type_condition: I, children: Vec<FieldDescriptor>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_condition: type_condition.into_iter().map(Into::into).collect(),
            children,
        }
    }

    /// The unconditioned default variant, selected when nothing else matches.
    pub fn default_variant(children: Vec<FieldDescriptor>) -> Self {
        Self {
            type_condition: BTreeSet::new(),
            children,
        }
    }

    pub(crate) fn matches(&self, discriminator: Option<&str>) -> bool {
        if self.type_condition.is_empty() {
            return true;
        }
        discriminator.is_some_and(|typename| self.type_condition.contains(typename))
    }
}

/// Immutable description of one selected field in an operation or fragment.
///
/// `response_name` is unique among siblings (aliasing disambiguates duplicate
/// wire names); `wire_name` is the key the value is read from and written to
/// on the wire. `list_depth` counts nested list wrappers around the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub wire_name: String,
    pub response_name: String,
    pub nullable: bool,
    pub list_depth: usize,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            response_name: name,
            // types are optional by default in GraphQL
            nullable: true,
            list_depth: 0,
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self::new(name, FieldKind::Scalar(scalar_type))
    }

    pub fn object(name: impl Into<String>, children: Vec<FieldDescriptor>) -> Self {
        Self::new(name, FieldKind::Object(children))
    }

    pub fn fragment(name: impl Into<String>, variants: Vec<FragmentVariant>) -> Self {
        Self::new(name, FieldKind::Fragment(variants))
    }

    pub fn non_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn list(mut self, depth: usize) -> Self {
        self.list_depth = depth;
        self
    }

    /// Set the response alias, keeping the wire name.
    pub fn alias(mut self, response_name: impl Into<String>) -> Self {
        self.response_name = response_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditioned_variant_matches_only_its_types() {
        let variant = FragmentVariant::new(["Droid", "Robot"], vec![]);
        assert!(variant.matches(Some("Droid")));
        assert!(variant.matches(Some("Robot")));
        assert!(!variant.matches(Some("Human")));
        assert!(!variant.matches(None));
    }

    #[test]
    fn default_variant_matches_anything() {
        let variant = FragmentVariant::default_variant(vec![]);
        assert!(variant.matches(Some("Droid")));
        assert!(variant.matches(None));
    }

    #[test]
    fn alias_changes_response_name_only() {
        let field = FieldDescriptor::scalar("name", ScalarType::new("String", "String"))
            .alias("heroName");
        assert_eq!(field.wire_name, "name");
        assert_eq!(field.response_name, "heroName");
    }
}
