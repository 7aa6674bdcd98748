use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::registry::{PhysicalField, SqlTable};

use super::value::{AqlValue, Comparator};

/// One side of a criterion: a column reference or a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    Field(PhysicalField),
    Value(AqlValue),
}

impl Variable {
    pub fn field(&self) -> Option<PhysicalField> {
        match self {
            Variable::Field(f) => Some(*f),
            Variable::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&AqlValue> {
        match self {
            Variable::Value(v) => Some(v),
            Variable::Field(_) => None,
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variable::Field(field) => match field.domain() {
                Some(domain) => write!(f, "{}.{}", domain.segment(), field.name()),
                None => write!(f, "{:?}", field),
            },
            Variable::Value(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriterionKind {
    /// Plain column comparison.
    Simple,
    /// Comparison on the key or the value column of a property table.
    SimpleProperty,
    /// Key equality combined with a value comparison on the same property row.
    ComplexProperty,
    /// `SimpleProperty` comparing a 255-character prefix of the value.
    PostgresSimpleProperty,
    /// `ComplexProperty` comparing a 255-character prefix of the value.
    PostgresComplexProperty,
}

impl CriterionKind {
    pub fn is_complex(self) -> bool {
        matches!(
            self,
            CriterionKind::ComplexProperty | CriterionKind::PostgresComplexProperty
        )
    }

    pub fn is_postgres(self) -> bool {
        matches!(
            self,
            CriterionKind::PostgresSimpleProperty | CriterionKind::PostgresComplexProperty
        )
    }
}

/// A single comparison on the query graph.
///
/// `sub_domains` is the domain path from the main domain to the compared field.
/// For complex property criteria `variable1` holds the property key and
/// `variable2` the compared value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub kind: CriterionKind,
    pub sub_domains: Vec<Domain>,
    pub variable1: Variable,
    pub table1: SqlTable,
    pub comparator: Comparator,
    pub variable2: Variable,
    pub table2: SqlTable,
}

impl Criterion {
    pub fn simple(
        sub_domains: Vec<Domain>,
        field: PhysicalField,
        table: SqlTable,
        comparator: Comparator,
        value: AqlValue,
    ) -> Self {
        let kind = if table.name.is_property_table() {
            CriterionKind::SimpleProperty
        } else {
            CriterionKind::Simple
        };
        Self {
            kind,
            sub_domains,
            variable1: Variable::Field(field),
            table1: table,
            comparator,
            variable2: Variable::Value(value),
            table2: table,
        }
    }

    pub fn complex_property(
        sub_domains: Vec<Domain>,
        key: String,
        table: SqlTable,
        comparator: Comparator,
        value: AqlValue,
    ) -> Self {
        Self {
            kind: CriterionKind::ComplexProperty,
            sub_domains,
            variable1: Variable::Value(AqlValue::String(key)),
            table1: table,
            comparator,
            variable2: Variable::Value(value),
            table2: table,
        }
    }

    /// A criterion that never matches, rendered as a comparison of two unequal literals.
    pub fn never(sub_domains: Vec<Domain>, table: SqlTable) -> Self {
        Self {
            kind: CriterionKind::Simple,
            sub_domains,
            variable1: Variable::Value(AqlValue::Long(1)),
            table1: table,
            comparator: Comparator::Equals,
            variable2: Variable::Value(AqlValue::Long(0)),
            table2: table,
        }
    }

    /// Copy of this criterion with a different comparator and compared value.
    pub fn with(&self, comparator: Comparator, value: AqlValue) -> Self {
        Self {
            comparator,
            variable2: Variable::Value(value),
            ..self.clone()
        }
    }

    pub fn field(&self) -> Option<PhysicalField> {
        self.variable1.field()
    }

    pub fn value(&self) -> Option<&AqlValue> {
        self.variable2.value()
    }

    pub fn main_domain(&self) -> Option<Domain> {
        self.sub_domains.first().copied()
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.variable1,
            self.comparator.signature(),
            self.variable2
        )
    }
}
