//! Query model: the intermediate representation every AQL query compiles into.

mod criterion;
mod query;
mod value;

pub use criterion::{Criterion, CriterionKind, Variable};
pub use query::{
    ActionKind, ActionSpec, AqlQuery, QueryElement, ResultField, SortDetails, SortType,
};
pub use value::{parse_date, parse_relative_time, relative_to, AqlValue, Comparator, ItemType, Literal, Operator};
