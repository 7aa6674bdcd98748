//! Typed result rows.
//!
//! A row belongs to one domain and holds the values of that domain's result
//! fields. Values of joined sub-domains live in nested child rows.

use aql_core::model::{parse_date, ItemType};
use aql_core::{Domain, FieldType, PhysicalField};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::capability::SqlValue;

/// A field value typed by its registry definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Long(i64),
    /// Epoch milliseconds
    Date(i64),
    ItemType(ItemType),
}

impl FieldValue {
    /// Type a raw column value. Values that do not fit the field type are kept as read.
    pub fn from_sql(field_type: FieldType, value: SqlValue) -> FieldValue {
        match (field_type, value) {
            (_, SqlValue::Null) => FieldValue::Null,
            (FieldType::String, SqlValue::Text(s)) => FieldValue::Text(s),
            (FieldType::String, SqlValue::Integer(n)) => FieldValue::Text(n.to_string()),
            (FieldType::Long | FieldType::Integer, SqlValue::Integer(n)) => FieldValue::Long(n),
            (FieldType::Long | FieldType::Integer, SqlValue::Text(s)) => match s.trim().parse() {
                Ok(n) => FieldValue::Long(n),
                Err(_) => FieldValue::Text(s),
            },
            (FieldType::Date, SqlValue::Integer(n)) => FieldValue::Date(n),
            (FieldType::Date, SqlValue::Text(s)) => match parse_date(&s) {
                Ok(millis) => FieldValue::Date(millis),
                Err(_) => FieldValue::Text(s),
            },
            (FieldType::ItemType, SqlValue::Integer(n)) => match ItemType::from_code(n) {
                Some(item_type) => FieldValue::ItemType(item_type),
                None => FieldValue::Long(n),
            },
            (FieldType::ItemType, SqlValue::Text(s)) => match ItemType::from_name(&s) {
                Some(item_type) => FieldValue::ItemType(item_type),
                None => FieldValue::Text(s),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Long(n) | FieldValue::Date(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(millis) => Utc.timestamp_millis_opt(*millis).single(),
            _ => None,
        }
    }

    /// Dates render as ISO-8601, item types by name.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Long(n) => Value::from(*n),
            FieldValue::Date(millis) => match self.as_date() {
                Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => Value::from(*millis),
            },
            FieldValue::ItemType(item_type) => Value::String(item_type.as_str().to_string()),
        }
    }
}

/// Repository key and relative path of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoPath {
    pub repo: String,
    pub path: String,
}

impl RepoPath {
    pub fn new(repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
        }
    }

    /// Build from the stored `node_path` and `node_name`. A `.` path is the repository root.
    pub fn from_aql(repo: &str, path: &str, name: &str) -> Self {
        let relative = if path.is_empty() || path == "." {
            name.to_string()
        } else if name.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", path, name)
        };
        Self::new(repo, relative)
    }

    /// Parent path (`.` for root items) and name, as stored in the nodes table.
    pub fn parent_and_name(&self) -> (&str, &str) {
        match self.path.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => (".", self.path.as_str()),
        }
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repo, self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    domain: Domain,
    values: Vec<(PhysicalField, FieldValue)>,
    children: Vec<Row>,
}

impl Row {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn set(&mut self, field: PhysicalField, value: FieldValue) {
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn with(mut self, field: PhysicalField, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: PhysicalField) -> Option<&FieldValue> {
        self.values.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    pub fn get_str(&self, field: PhysicalField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn get_i64(&self, field: PhysicalField) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    pub fn get_date(&self, field: PhysicalField) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_date)
    }

    pub fn item_type(&self) -> Option<ItemType> {
        match self.get(PhysicalField::ItemType) {
            Some(FieldValue::ItemType(item_type)) => Some(*item_type),
            _ => None,
        }
    }

    pub fn values(&self) -> &[(PhysicalField, FieldValue)] {
        &self.values
    }

    pub fn children(&self) -> &[Row] {
        &self.children
    }

    pub fn children_of(&self, domain: Domain) -> impl Iterator<Item = &Row> {
        self.children.iter().filter(move |c| c.domain == domain)
    }

    pub fn add_child(&mut self, child: Row) {
        self.children.push(child);
    }

    pub fn retain_children<F: FnMut(&Row) -> bool>(&mut self, f: F) {
        self.children.retain(f);
    }

    /// The child row of `domain`, created when missing.
    pub(crate) fn child_mut(&mut self, domain: Domain) -> &mut Row {
        let index = match self.children.iter().rposition(|c| c.domain == domain) {
            Some(index) => index,
            None => {
                self.children.push(Row::new(domain));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Repository path of an item row carrying repo, path and name.
    pub fn repo_path(&self) -> Option<RepoPath> {
        if self.domain != Domain::Items {
            return None;
        }
        let repo = self.get_str(PhysicalField::ItemRepo)?;
        let path = self.get_str(PhysicalField::ItemPath)?;
        let name = self.get_str(PhysicalField::ItemName)?;
        Some(RepoPath::from_aql(repo, path, name))
    }

    /// No value and no children: the outer join found nothing.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_null()) && self.children.is_empty()
    }

    pub(crate) fn prune_empty_children(&mut self) {
        for child in &mut self.children {
            child.prune_empty_children();
        }
        self.children.retain(|c| !c.is_empty());
    }

    /// Rows describing the same entity carry the same domain and values.
    pub fn same_entity(&self, other: &Row) -> bool {
        self.domain == other.domain && self.values == other.values
    }

    /// Fold the children of another row of the same entity into this one.
    pub fn merge(&mut self, other: Row) {
        for child in other.children {
            match self.children.iter_mut().find(|c| c.same_entity(&child)) {
                Some(existing) => existing.merge(child),
                None => self.children.push(child),
            }
        }
    }

    /// Flat field/value pairs, children grouped under their domain's plural name.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (field, value) in &self.values {
            object.insert(field.name().to_string(), value.to_json());
        }
        for child in &self.children {
            let entry = object
                .entry(child.domain.plural().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entry {
                items.push(child.to_json());
            }
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(repo: &str, path: &str, name: &str) -> Row {
        Row::new(Domain::Items)
            .with(PhysicalField::ItemRepo, FieldValue::Text(repo.into()))
            .with(PhysicalField::ItemPath, FieldValue::Text(path.into()))
            .with(PhysicalField::ItemName, FieldValue::Text(name.into()))
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(
            FieldValue::from_sql(FieldType::ItemType, SqlValue::Integer(1)),
            FieldValue::ItemType(ItemType::File)
        );
        assert_eq!(
            FieldValue::from_sql(FieldType::ItemType, SqlValue::Integer(0)),
            FieldValue::ItemType(ItemType::Folder)
        );
        assert_eq!(
            FieldValue::from_sql(FieldType::Long, SqlValue::Text(" 42".into())),
            FieldValue::Long(42)
        );
        assert_eq!(
            FieldValue::from_sql(FieldType::String, SqlValue::Integer(7)),
            FieldValue::Text("7".into())
        );
        assert!(FieldValue::from_sql(FieldType::Date, SqlValue::Null).is_null());
    }

    #[test]
    fn test_date_json_is_iso() {
        let value = FieldValue::from_sql(FieldType::Date, SqlValue::Integer(0));
        assert_eq!(value.to_json(), json!("1970-01-01T00:00:00.000Z"));
        assert_eq!(value.as_date().map(|d| d.timestamp()), Some(0));
    }

    #[test]
    fn test_repo_path() {
        assert_eq!(item("libs", ".", "a.jar").repo_path(), Some(RepoPath::new("libs", "a.jar")));
        let path = item("libs", "org/acme", "a.jar").repo_path().unwrap();
        assert_eq!(path.to_string(), "libs:org/acme/a.jar");
        assert_eq!(path.parent_and_name(), ("org/acme", "a.jar"));
        assert_eq!(RepoPath::new("libs", "a.jar").parent_and_name(), (".", "a.jar"));
        assert_eq!(Row::new(Domain::Builds).repo_path(), None);
    }

    #[test]
    fn test_merge_and_json() {
        let property = |key: &str| {
            Row::new(Domain::Properties)
                .with(PhysicalField::PropertyKey, FieldValue::Text(key.into()))
                .with(PhysicalField::PropertyValue, FieldValue::Null)
        };
        let mut first = item("libs", ".", "a.jar");
        first.add_child(property("k1"));
        let mut second = item("libs", ".", "a.jar");
        second.add_child(property("k2"));
        let mut third = item("libs", ".", "a.jar");
        third.add_child(property("k1"));

        assert!(first.same_entity(&second));
        first.merge(second);
        first.merge(third);

        assert_eq!(
            first.to_json(),
            json!({
                "repo": "libs",
                "path": ".",
                "name": "a.jar",
                "properties": [
                    {"key": "k1", "value": null},
                    {"key": "k2", "value": null}
                ]
            })
        );
    }

    #[test]
    fn test_prune_empty_children() {
        let mut row = item("libs", ".", "a.jar");
        row.child_mut(Domain::Properties)
            .set(PhysicalField::PropertyKey, FieldValue::Null);
        row.prune_empty_children();
        assert!(row.children().is_empty());
        assert!(!row.is_empty());
    }
}
