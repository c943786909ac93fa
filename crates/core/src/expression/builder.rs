//! Fluent builder for store-side filter expressions.
//!
//! The builder only concatenates fixed text templates. It does not insert
//! connectives, check grammar or escape anything: field names and
//! placeholders are written verbatim, and the store validates the result.

use std::collections::HashMap;

use crate::storage::FieldValue;

use super::FilterSpecification;

/// Accumulates a filter expression one fragment at a time.
///
/// Every condition method appends `" ( <condition> ) "`, `and`/`or` append
/// `" and "`/`" or "`. Callers chain exactly one connective between two
/// conditions.
///
/// ```
/// use dynarepo_core::expression::FilterExpressionBuilder;
///
/// let expression = FilterExpressionBuilder::new()
///     .contains("test", ":test")
///     .and()
///     .contains("test", ":test2")
///     .build();
///
/// assert_eq!(
///     expression,
///     " ( contains(test, :test) )  and  ( contains(test, :test2) ) "
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct FilterExpressionBuilder {
    expression: String,
}

impl FilterExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `contains(field, operand)`: substring or set membership.
    pub fn contains(self, field: &str, operand: &str) -> Self {
        self.condition(&format!("contains({field}, {operand})"))
    }

    /// `begins_with(field, operand )`: string prefix. The space before the
    /// closing parenthesis is part of the emitted text.
    pub fn begins_with(self, field: &str, operand: &str) -> Self {
        self.condition(&format!("begins_with({field}, {operand} )"))
    }

    /// `field in (v1, v2, ...)`, operands in the order given.
    pub fn in_list<I, S>(self, field: &str, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let operands = operands
            .into_iter()
            .map(|operand| operand.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.condition(&format!("{field} in ({operands})"))
    }

    /// `field between from and to`, bounds inclusive.
    pub fn between(self, field: &str, from: &str, to: &str) -> Self {
        self.condition(&format!("{field} between {from} and {to}"))
    }

    pub fn attribute_exists(self, field: &str) -> Self {
        self.condition(&format!("attribute_exists({field})"))
    }

    pub fn attribute_not_exists(self, field: &str) -> Self {
        self.condition(&format!("attribute_not_exists({field})"))
    }

    pub fn and(self) -> Self {
        self.push(" and ")
    }

    pub fn or(self) -> Self {
        self.push(" or ")
    }

    /// The expression text, verbatim.
    pub fn build(self) -> String {
        self.expression
    }

    /// Pairs the expression with its placeholder values.
    ///
    /// Placeholders are not cross-checked against the text; an unbound
    /// placeholder is rejected by the store when the filter runs.
    pub fn build_filter_specification<I, K>(self, values: I) -> FilterSpecification
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        let values: HashMap<String, FieldValue> = values
            .into_iter()
            .map(|(placeholder, value)| (placeholder.into(), value))
            .collect();
        FilterSpecification::new(self.expression, values)
    }

    /// The text accumulated so far.
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    fn condition(self, predicate: &str) -> Self {
        self.push(" ( ").push(predicate).push(" ) ")
    }

    fn push(mut self, fragment: &str) -> Self {
        self.expression.push_str(fragment);
        self
    }
}
