mod builder;
mod specification;

pub use builder::FilterExpressionBuilder;
pub use specification::FilterSpecification;
