use std::collections::HashMap;

use crate::storage::FieldValue;

/// A filter expression together with the values bound to its placeholders.
///
/// `:name` placeholders resolve through `values`; `#name` placeholders resolve
/// to attribute names through `names`, which is how reserved words such as
/// `value` are referenced in a store expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpecification {
    expression: String,
    values: HashMap<String, FieldValue>,
    names: HashMap<String, String>,
}

impl FilterSpecification {
    pub fn new(expression: impl Into<String>, values: HashMap<String, FieldValue>) -> Self {
        Self {
            expression: expression.into(),
            values,
            names: HashMap::new(),
        }
    }

    /// Binds an attribute-name placeholder such as `#value`.
    pub fn with_name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), attribute.into());
        self
    }

    /// Binds a value placeholder such as `:fruit0`.
    pub fn with_value(mut self, placeholder: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(placeholder.into(), value);
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn values(&self) -> &HashMap<String, FieldValue> {
        &self.values
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    pub fn value(&self, placeholder: &str) -> Option<&FieldValue> {
        self.values.get(placeholder)
    }

    pub fn name(&self, placeholder: &str) -> Option<&str> {
        self.names.get(placeholder).map(String::as_str)
    }
}
