//! Adapters turning parsed text or fluent API calls into an [`AqlQuery`].
//!
//! Both front ends share the field resolution and query completion rules defined here.

mod api;
mod parser;

pub use api::ApiToAqlAdapter;
pub use parser::ParserToAqlAdapter;

use chrono::Utc;

use crate::context::AdapterContext;
use crate::domain::Domain;
use crate::error::{AqlError, AqlResult};
use crate::model::{
    relative_to, ActionKind, AqlQuery, AqlValue, Comparator, Criterion, Literal,
    ResultField, SortDetails, SortType,
};
use crate::registry::{self, FieldType, PhysicalField, SqlTable};

/// Walk dotted domain segments from `domain`.
fn resolve_domain_path(domain: Domain, segments: &[&str]) -> Option<Vec<Domain>> {
    let mut path = vec![domain];
    let mut current = domain;
    for (i, segment) in segments.iter().enumerate() {
        // A leading segment naming the main domain itself is redundant.
        if i == 0 && *segment == domain.segment() && domain.sub_domain(segment).is_none() {
            continue;
        }
        current = current.sub_domain(segment)?;
        path.push(current);
    }
    Some(path)
}

/// Resolve `name`, `property.key` or `archive.entry.name` against a main domain.
pub(crate) fn resolve_field(domain: Domain, path: &str) -> AqlResult<ResultField> {
    let segments: Vec<&str> = path.split('.').collect();
    let (name, prefix) = segments
        .split_last()
        .ok_or_else(|| AqlError::UnknownField(path.to_string()))?;
    let sub_domains = resolve_domain_path(domain, prefix)
        .ok_or_else(|| AqlError::UnknownField(path.to_string()))?;
    let owner = *sub_domains.last().unwrap_or(&domain);
    let field = registry::field_by_name(owner, name)
        .ok_or_else(|| AqlError::UnknownField(path.to_string()))?;
    Ok(ResultField::new(field, sub_domains))
}

/// Fields named by an include entry: a field, a domain, `domain.*` or `*`.
pub(crate) fn resolve_include(domain: Domain, path: &str) -> AqlResult<Vec<ResultField>> {
    if path == "*" {
        return Ok(registry::domain_fields(domain)
            .map(|f| ResultField::main(f, domain))
            .collect());
    }
    if let Some(prefix) = path.strip_suffix(".*") {
        let segments: Vec<&str> = prefix.split('.').collect();
        let sub_domains = resolve_domain_path(domain, &segments)
            .ok_or_else(|| AqlError::UnknownField(path.to_string()))?;
        let owner = *sub_domains.last().unwrap_or(&domain);
        return Ok(registry::domain_fields(owner)
            .map(|f| ResultField::new(f, sub_domains.clone()))
            .collect());
    }
    if let Ok(field) = resolve_field(domain, path) {
        return Ok(vec![field]);
    }
    let segments: Vec<&str> = path.split('.').collect();
    match resolve_domain_path(domain, &segments) {
        Some(sub_domains) if sub_domains.len() > 1 => {
            let owner = *sub_domains.last().unwrap_or(&domain);
            Ok(registry::default_fields(owner)
                .iter()
                .map(|f| ResultField::new(*f, sub_domains.clone()))
                .collect())
        }
        _ => Err(AqlError::UnknownField(path.to_string())),
    }
}

/// Resolve `$last` and `$before` into absolute comparisons against now.
fn resolve_relative(
    path: &str,
    field_type: FieldType,
    comparator: Comparator,
    literal: &Literal,
) -> AqlResult<(Comparator, AqlValue)> {
    let comparator = match comparator {
        Comparator::Last => Comparator::Greater,
        Comparator::Before => Comparator::Less,
        other => return Ok((other, AqlValue::for_field(field_type, literal)?)),
    };
    if field_type != FieldType::Date {
        return Err(AqlError::UnsupportedComparator(format!(
            "relative time comparison on non-date field {}",
            path
        )));
    }
    let millis = relative_to(Utc::now().timestamp_millis(), &literal.to_string())?;
    Ok((comparator, AqlValue::Date(millis)))
}

fn check_comparator(
    path: &str,
    field_type: FieldType,
    comparator: Comparator,
    value: &AqlValue,
) -> AqlResult<()> {
    let equality = matches!(comparator, Comparator::Equals | Comparator::NotEquals);
    if *value == AqlValue::Null && !equality {
        return Err(AqlError::UnsupportedComparator(format!(
            "{} null on {}",
            comparator.signature(),
            path
        )));
    }
    match comparator {
        Comparator::Matches | Comparator::NotMatches if field_type != FieldType::String => {
            Err(AqlError::UnsupportedComparator(format!(
                "{} on non-text field {}",
                comparator.signature(),
                path
            )))
        }
        _ if field_type == FieldType::ItemType && !equality => {
            Err(AqlError::UnsupportedComparator(format!(
                "{} on item type",
                comparator.signature()
            )))
        }
        _ => Ok(()),
    }
}

/// Build one criterion from a field path, comparator and raw value.
pub(crate) fn build_criterion(
    ctx: &mut AdapterContext,
    path: &str,
    comparator: Comparator,
    literal: &Literal,
) -> AqlResult<Criterion> {
    let domain = ctx.domain();

    if let Some(key) = path.strip_prefix('@') {
        return build_property_criterion(ctx, key, comparator, literal);
    }

    let resolved = resolve_field(domain, path)?;
    let ext = registry::lookup(resolved.field)?;
    let (comparator, value) = resolve_relative(path, ext.field_type, comparator, literal)?;
    check_comparator(path, ext.field_type, comparator, &value)?;

    let chain = registry::table_chain(&resolved.sub_domains, ext.table);
    let table_id = if chain.len() == 1 {
        0
    } else if ext.table.is_property_table() {
        match ctx.single_property_table_id() {
            Some(id) => id,
            None => ctx.provide_table_id(),
        }
    } else {
        ctx.provide_table_id()
    };

    Ok(Criterion::simple(
        resolved.sub_domains,
        resolved.field,
        SqlTable::new(ext.table, table_id),
        comparator,
        value,
    ))
}

fn build_property_criterion(
    ctx: &mut AdapterContext,
    key: &str,
    comparator: Comparator,
    literal: &Literal,
) -> AqlResult<Criterion> {
    let domain = ctx.domain();
    let property_domain = domain
        .property_domain()
        .ok_or_else(|| AqlError::UnknownField(format!("@{} on {}", key, domain)))?;
    let (key_field, value_field) = registry::property_fields(property_domain)
        .ok_or_else(|| AqlError::UnknownField(format!("@{}", key)))?;

    if matches!(comparator, Comparator::Last | Comparator::Before) {
        return Err(AqlError::UnsupportedComparator(format!(
            "{} on property @{}",
            comparator.signature(),
            key
        )));
    }
    let value = AqlValue::for_field(FieldType::String, literal)?;
    check_comparator(key, FieldType::String, comparator, &value)?;

    let sub_domains = if domain == property_domain {
        vec![domain]
    } else {
        vec![domain, property_domain]
    };
    let table_id = match ctx.single_property_table_id() {
        Some(id) => id,
        None if sub_domains.len() > 1 => ctx.provide_table_id(),
        None => 0,
    };
    let table = SqlTable::new(property_domain.primary_table(), table_id);

    if key == "*" {
        return Ok(Criterion::simple(sub_domains, value_field, table, comparator, value));
    }
    if value.as_str() == Some("*") && matches!(comparator, Comparator::Equals | Comparator::Matches) {
        return Ok(Criterion::simple(
            sub_domains,
            key_field,
            table,
            Comparator::Equals,
            AqlValue::String(key.to_string()),
        ));
    }
    Ok(Criterion::complex_property(
        sub_domains,
        key.to_string(),
        table,
        comparator,
        value,
    ))
}

/// Result fields: the main domain defaults unless a main field is included, then includes.
pub(crate) fn apply_includes(query: &mut AqlQuery, includes: &[String]) -> AqlResult<()> {
    let mut included = Vec::new();
    for path in includes {
        included.extend(resolve_include(query.domain, path)?);
    }
    if !included.iter().any(|f| f.is_main()) {
        for field in registry::default_fields(query.domain) {
            query.add_result_field(ResultField::main(*field, query.domain));
        }
    }
    for field in included {
        query.add_result_field(field);
    }
    Ok(())
}

/// Check the action against the domain and add the fields it reads.
pub(crate) fn apply_action(query: &mut AqlQuery) -> AqlResult<()> {
    let kind = query.action.kind;
    if !kind.supports_domain(query.domain) {
        return Err(AqlError::InvalidAction(format!(
            "{} is not supported on {}",
            kind.name(),
            query.domain
        )));
    }
    if kind != ActionKind::UpdateProperty
        && (!query.action.keys.is_empty() || query.action.new_value.is_some())
    {
        return Err(AqlError::InvalidAction(format!(
            "keys and newValue only apply to update, not {}",
            kind.name()
        )));
    }
    if kind == ActionKind::Find && query.action.dry_run.is_some() {
        return Err(AqlError::InvalidAction("dryRun does not apply to find".to_string()));
    }

    let location = [
        PhysicalField::ItemRepo,
        PhysicalField::ItemPath,
        PhysicalField::ItemName,
    ];
    match kind {
        ActionKind::Find => {}
        ActionKind::Delete => {
            for field in location {
                query.add_result_field(ResultField::main(field, Domain::Items));
            }
        }
        ActionKind::UpdateProperty => {
            for field in location {
                query.add_result_field(ResultField::new(
                    field,
                    vec![Domain::Properties, Domain::Items],
                ));
            }
        }
    }
    Ok(())
}

/// Resolve sort paths and set them on the context. Includes must already be applied.
pub(crate) fn apply_sort(ctx: &mut AdapterContext, sort_type: SortType, fields: &[String]) -> AqlResult<()> {
    let mut resolved = Vec::with_capacity(fields.len());
    for path in fields {
        let field = resolve_field(ctx.domain(), path)
            .map_err(|_| AqlError::InvalidSort(format!("unknown sort field {}", path)))?;
        resolved.push(field);
    }
    ctx.set_sort(SortDetails {
        sort_type,
        fields: resolved,
    })
}

pub(crate) fn apply_paging(ctx: &mut AdapterContext, offset: Option<i64>, limit: Option<i64>) -> AqlResult<()> {
    if let Some(offset) = offset {
        ctx.set_offset(offset)?;
    }
    if let Some(limit) = limit {
        ctx.set_limit(limit)?;
    }
    Ok(())
}

pub(crate) fn parse_sort_type(direction: &str) -> AqlResult<SortType> {
    match direction {
        "$asc" => Ok(SortType::Asc),
        "$desc" => Ok(SortType::Desc),
        other => Err(AqlError::InvalidSort(format!("unknown direction {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_field_paths() {
        let f = resolve_field(Domain::Items, "repo").unwrap();
        assert_eq!(f, ResultField::main(PhysicalField::ItemRepo, Domain::Items));

        let f = resolve_field(Domain::Items, "archive.entry.name").unwrap();
        assert_eq!(f.field, PhysicalField::ArchiveEntryName);
        assert_eq!(
            f.sub_domains,
            vec![Domain::Items, Domain::Archives, Domain::Entries]
        );

        let f = resolve_field(Domain::Properties, "property.key").unwrap();
        assert_eq!(f, ResultField::main(PhysicalField::PropertyKey, Domain::Properties));

        assert!(resolve_field(Domain::Items, "colour").is_err());
        assert!(resolve_field(Domain::Items, "build.name").is_err());
    }

    #[test]
    fn test_resolve_includes() {
        let fields = resolve_include(Domain::Items, "property.*").unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|f| f.sub_domains == vec![Domain::Items, Domain::Properties]));

        let fields = resolve_include(Domain::Builds, "promotion").unwrap();
        assert_eq!(fields.len(), 6);

        assert!(resolve_include(Domain::Items, "nothing.*").is_err());
    }

    #[test]
    fn test_relative_time_only_on_dates() {
        let mut ctx = AdapterContext::new(Domain::Items);
        let c = build_criterion(&mut ctx, "modified", Comparator::Last, &"1d".into()).unwrap();
        assert_eq!(c.comparator, Comparator::Greater);
        assert!(matches!(c.value(), Some(AqlValue::Date(_))));

        let err = build_criterion(&mut ctx, "name", Comparator::Before, &"1d".into());
        assert!(matches!(err, Err(AqlError::UnsupportedComparator(_))));
    }

    #[test]
    fn test_huge_relative_time_is_an_error() {
        let mut ctx = AdapterContext::new(Domain::Items);
        let err = build_criterion(&mut ctx, "modified", Comparator::Last, &"999999999999999d".into());
        assert!(matches!(err, Err(AqlError::InvalidValue(_))));
        let err = build_criterion(&mut ctx, "created", Comparator::Before, &"999999999999999999y".into());
        assert!(matches!(err, Err(AqlError::InvalidValue(_))));
    }

    #[test]
    fn test_property_criterion_kinds() {
        let mut ctx = AdapterContext::new(Domain::Items);
        let c = build_criterion(&mut ctx, "@license", Comparator::Equals, &"GPL".into()).unwrap();
        assert!(c.kind.is_complex());
        assert!(c.table1.is_dynamic());
        assert_eq!(c.sub_domains, vec![Domain::Items, Domain::Properties]);

        let c = build_criterion(&mut ctx, "@*", Comparator::Matches, &"*GPL*".into()).unwrap();
        assert_eq!(c.field(), Some(PhysicalField::PropertyValue));

        let c = build_criterion(&mut ctx, "@license", Comparator::Equals, &"*".into()).unwrap();
        assert_eq!(c.field(), Some(PhysicalField::PropertyKey));
        assert_eq!(c.value(), Some(&AqlValue::String("license".into())));

        let mut ctx = AdapterContext::new(Domain::Artifacts);
        assert!(build_criterion(&mut ctx, "@k", Comparator::Equals, &"v".into()).is_err());
    }

    #[test]
    fn test_comparator_type_checks() {
        let mut ctx = AdapterContext::new(Domain::Items);
        assert!(build_criterion(&mut ctx, "size", Comparator::Matches, &"1*".into()).is_err());
        assert!(build_criterion(&mut ctx, "type", Comparator::Greater, &"file".into()).is_err());
        assert!(build_criterion(&mut ctx, "name", Comparator::Less, &Literal::Null).is_err());
        assert!(build_criterion(&mut ctx, "name", Comparator::NotEquals, &Literal::Null).is_ok());
    }
}
