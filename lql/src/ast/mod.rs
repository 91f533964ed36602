//! Abstract syntax tree shared by every pipeline stage.

mod display;
mod metrics;
mod types;

pub use types::{
    Comparison, FieldPath, LogicalExpr, LogicalOp, MAX_FIELD_SEGMENTS, Operator, QueryExpression,
    QueryValue, RangeValue, RawCondition, simple,
};
