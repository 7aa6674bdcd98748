//! Fluent builder for AQL queries.
//!
//! ```
//! use aql_core::api::{and, field, or, property, AqlApi};
//!
//! let query = AqlApi::items()
//!     .filter(and([
//!         or([field("repo").equal("libs-release"), field("repo").equal("libs-snapshot")]),
//!         property("license").matches("*GPL*"),
//!     ]))
//!     .include(["name", "size"])
//!     .limit(10);
//! # let _ = query;
//! ```

use crate::domain::Domain;
use crate::model::{ActionKind, ActionSpec, Comparator, Literal, SortType};

/// A filter tree built with [`field`], [`property`], [`and`], [`or`] and [`msp`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Criterion {
        path: String,
        comparator: Comparator,
        value: Literal,
    },
    And(Vec<Clause>),
    Or(Vec<Clause>),
    /// Criteria that must hold on one property row.
    Msp(Vec<Clause>),
}

pub fn and<I: IntoIterator<Item = Clause>>(clauses: I) -> Clause {
    Clause::And(clauses.into_iter().collect())
}

pub fn or<I: IntoIterator<Item = Clause>>(clauses: I) -> Clause {
    Clause::Or(clauses.into_iter().collect())
}

pub fn msp<I: IntoIterator<Item = Clause>>(clauses: I) -> Clause {
    Clause::Msp(clauses.into_iter().collect())
}

/// Reference a field by its path, e.g. `name` or `archive.entry.name`.
pub fn field(path: &str) -> FieldRef {
    FieldRef {
        path: path.to_string(),
    }
}

/// Reference a property by key. `*` matches any key.
pub fn property(key: &str) -> FieldRef {
    FieldRef {
        path: format!("@{}", key),
    }
}

#[derive(Debug, Clone)]
pub struct FieldRef {
    path: String,
}

impl FieldRef {
    pub fn compare(self, comparator: Comparator, value: impl Into<Literal>) -> Clause {
        Clause::Criterion {
            path: self.path,
            comparator,
            value: value.into(),
        }
    }

    pub fn equal(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::Equals, value)
    }

    pub fn not_equal(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::NotEquals, value)
    }

    pub fn greater(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::Greater, value)
    }

    pub fn greater_or_equal(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::GreaterEquals, value)
    }

    pub fn less(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::Less, value)
    }

    pub fn less_or_equal(self, value: impl Into<Literal>) -> Clause {
        self.compare(Comparator::LessEquals, value)
    }

    pub fn matches(self, pattern: &str) -> Clause {
        self.compare(Comparator::Matches, pattern)
    }

    pub fn not_matches(self, pattern: &str) -> Clause {
        self.compare(Comparator::NotMatches, pattern)
    }

    /// Newer than a relative time such as `3d`.
    pub fn last(self, relative: &str) -> Clause {
        self.compare(Comparator::Last, relative)
    }

    /// Older than a relative time such as `3d`.
    pub fn before(self, relative: &str) -> Clause {
        self.compare(Comparator::Before, relative)
    }

    pub fn is_null(self) -> Clause {
        self.compare(Comparator::Equals, Literal::Null)
    }
}

/// A query under construction through the fluent API.
#[derive(Debug, Clone)]
pub struct AqlApi {
    pub(crate) domain: Domain,
    pub(crate) filters: Vec<Clause>,
    pub(crate) includes: Vec<String>,
    pub(crate) sort: Option<(SortType, Vec<String>)>,
    pub(crate) offset: Option<i64>,
    pub(crate) limit: Option<i64>,
    pub(crate) action: ActionSpec,
}

impl AqlApi {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            filters: Vec::new(),
            includes: Vec::new(),
            sort: None,
            offset: None,
            limit: None,
            action: ActionSpec::find(),
        }
    }

    pub fn items() -> Self {
        Self::new(Domain::Items)
    }

    pub fn properties() -> Self {
        Self::new(Domain::Properties)
    }

    pub fn stats() -> Self {
        Self::new(Domain::Statistics)
    }

    pub fn entries() -> Self {
        Self::new(Domain::Entries)
    }

    pub fn artifacts() -> Self {
        Self::new(Domain::Artifacts)
    }

    pub fn dependencies() -> Self {
        Self::new(Domain::Dependencies)
    }

    pub fn modules() -> Self {
        Self::new(Domain::Modules)
    }

    pub fn builds() -> Self {
        Self::new(Domain::Builds)
    }

    pub fn build_properties() -> Self {
        Self::new(Domain::BuildProperties)
    }

    pub fn build_promotions() -> Self {
        Self::new(Domain::BuildPromotions)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Add a filter. Several filters are AND-ed.
    pub fn filter(mut self, clause: Clause) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn sort_by<I, S>(mut self, sort_type: SortType, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = Some((sort_type, fields.into_iter().map(Into::into).collect()));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn delete(mut self) -> Self {
        self.action.kind = ActionKind::Delete;
        self
    }

    pub fn update_property<I, S>(mut self, keys: I, new_value: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action.kind = ActionKind::UpdateProperty;
        self.action.keys = keys.into_iter().map(Into::into).collect();
        self.action.new_value = new_value.map(str::to_string);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.action.dry_run = Some(dry_run);
        self
    }
}
