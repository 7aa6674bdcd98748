use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::registry::PhysicalField;

use super::criterion::Criterion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryElement {
    Criterion(Criterion),
    And,
    Or,
    OpenParenthesis,
    CloseParenthesis,
}

impl QueryElement {
    pub fn is_operator(&self) -> bool {
        matches!(self, QueryElement::And | QueryElement::Or)
    }

    pub fn criterion(&self) -> Option<&Criterion> {
        match self {
            QueryElement::Criterion(c) => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryElement::Criterion(c) => write!(f, "{}", c),
            QueryElement::And => f.write_str("$and"),
            QueryElement::Or => f.write_str("$or"),
            QueryElement::OpenParenthesis => f.write_str("("),
            QueryElement::CloseParenthesis => f.write_str(")"),
        }
    }
}

/// A field returned by the query, qualified by the domain path that reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultField {
    pub field: PhysicalField,
    pub sub_domains: Vec<Domain>,
}

impl ResultField {
    pub fn new(field: PhysicalField, sub_domains: Vec<Domain>) -> Self {
        Self { field, sub_domains }
    }

    pub fn main(field: PhysicalField, domain: Domain) -> Self {
        Self {
            field,
            sub_domains: vec![domain],
        }
    }

    /// The domain whose row this field populates.
    pub fn owner(&self) -> Option<Domain> {
        self.sub_domains.last().copied()
    }

    pub fn is_main(&self) -> bool {
        self.sub_domains.len() == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    Desc,
}

impl SortType {
    pub fn keyword(self) -> &'static str {
        match self {
            SortType::Asc => "asc",
            SortType::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDetails {
    pub sort_type: SortType,
    pub fields: Vec<ResultField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Find,
    Delete,
    UpdateProperty,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Find => "find",
            ActionKind::Delete => "delete",
            ActionKind::UpdateProperty => "update",
        }
    }

    pub fn supports_domain(self, domain: Domain) -> bool {
        match self {
            ActionKind::Find => true,
            ActionKind::Delete => domain == Domain::Items,
            ActionKind::UpdateProperty => domain == Domain::Properties,
        }
    }
}

/// The row action attached to a query, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    /// `None` falls back to the engine default.
    pub dry_run: Option<bool>,
    pub keys: Vec<String>,
    pub new_value: Option<String>,
}

impl ActionSpec {
    pub fn find() -> Self {
        Self::of(ActionKind::Find)
    }

    pub fn of(kind: ActionKind) -> Self {
        Self {
            kind,
            dry_run: None,
            keys: Vec::new(),
            new_value: None,
        }
    }
}

impl Default for ActionSpec {
    fn default() -> Self {
        Self::find()
    }
}

/// Compiled, storage-independent form of an AQL query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqlQuery {
    pub domain: Domain,
    pub result_fields: Vec<ResultField>,
    pub elements: Vec<QueryElement>,
    pub sort: Option<SortDetails>,
    pub limit: i64,
    pub offset: i64,
    pub action: ActionSpec,
}

impl AqlQuery {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            result_fields: Vec::new(),
            elements: Vec::new(),
            sort: None,
            limit: i64::MAX,
            offset: 0,
            action: ActionSpec::find(),
        }
    }

    /// Add a result field, keeping insertion order and skipping duplicates.
    pub fn add_result_field(&mut self, field: ResultField) {
        if !self.result_fields.contains(&field) {
            self.result_fields.push(field);
        }
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.elements.iter().filter_map(|e| e.criterion())
    }

    /// Space separated rendering of the element list, used in logs and tests.
    pub fn describe(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
