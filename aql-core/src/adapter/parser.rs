use tracing::debug;

use crate::context::ParserAdapterContext;
use crate::domain::Domain;
use crate::error::{AqlError, AqlResult};
use crate::model::{ActionKind, ActionSpec, AqlQuery, Comparator, Literal, SortType};
use crate::parser::{self, ParseResult, ParsedElement};

use super::{apply_action, apply_includes, apply_paging, apply_sort, build_criterion, parse_sort_type};

/// Converts a [`ParseResult`] into an [`AqlQuery`].
///
/// Each concern is handled by its own pass over the parsed element stack.
#[derive(Debug, Default)]
pub struct ParserToAqlAdapter;

impl ParserToAqlAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse and adapt AQL text in one step.
    pub fn compile(&self, text: &str) -> AqlResult<AqlQuery> {
        let parse_result = parser::parse(text)?;
        self.adapt(parse_result)
    }

    pub fn adapt(&self, parse_result: ParseResult) -> AqlResult<AqlQuery> {
        let mut ctx = ParserAdapterContext::new(parse_result);

        self.handle_domain(&mut ctx)?;
        let includes = self.handle_include(&mut ctx);
        let sort = self.handle_sort(&mut ctx)?;
        self.handle_paging(&mut ctx)?;
        self.handle_action_params(&mut ctx)?;
        self.handle_filter(&mut ctx)?;

        let mut ctx = ctx.into_inner();
        apply_includes(ctx.query_mut(), &includes)?;
        apply_action(ctx.query_mut())?;
        if let Some((sort_type, fields)) = sort {
            apply_sort(&mut ctx, sort_type, &fields)?;
        }
        let query = ctx.finish()?;

        debug!(domain = %query.domain, elements = %query.describe(), "Adapted AQL text");
        Ok(query)
    }

    fn handle_domain(&self, ctx: &mut ParserAdapterContext) -> AqlResult<()> {
        ctx.reset_index();
        let mut domain = None;
        let mut action = None;

        while ctx.has_next() {
            match ctx.current() {
                Some(ParsedElement::Domain(name)) => {
                    domain = Some(
                        Domain::from_main_name(name)
                            .ok_or_else(|| AqlError::UnknownDomain(name.clone()))?,
                    );
                }
                Some(ParsedElement::Action(name)) => {
                    action = Some(match name.as_str() {
                        "find" => ActionKind::Find,
                        "delete" => ActionKind::Delete,
                        "update" => ActionKind::UpdateProperty,
                        other => return Err(AqlError::InvalidAction(other.to_string())),
                    });
                }
                _ => {}
            }
            ctx.decrement(1);
        }

        let domain = domain.ok_or_else(|| AqlError::ParseError("missing domain".to_string()))?;
        ctx.set_domain(domain);
        ctx.set_action(ActionSpec::of(action.unwrap_or(ActionKind::Find)));
        Ok(())
    }

    fn handle_include(&self, ctx: &mut ParserAdapterContext) -> Vec<String> {
        ctx.reset_index();
        let mut includes = Vec::new();
        while ctx.has_next() {
            if let Some(ParsedElement::Include(fields)) = ctx.current() {
                includes.extend(fields.iter().cloned());
            }
            ctx.decrement(1);
        }
        includes
    }

    fn handle_sort(&self, ctx: &mut ParserAdapterContext) -> AqlResult<Option<(SortType, Vec<String>)>> {
        ctx.reset_index();
        let mut sort = None;
        while ctx.has_next() {
            if let Some(ParsedElement::Sort { direction, fields }) = ctx.current() {
                if sort.is_some() {
                    return Err(AqlError::InvalidSort("sort given more than once".to_string()));
                }
                sort = Some((parse_sort_type(direction)?, fields.clone()));
            }
            ctx.decrement(1);
        }
        Ok(sort)
    }

    fn handle_paging(&self, ctx: &mut ParserAdapterContext) -> AqlResult<()> {
        ctx.reset_index();
        let mut offset = None;
        let mut limit = None;
        while ctx.has_next() {
            match ctx.current() {
                Some(ParsedElement::Offset(n)) => offset = Some(*n),
                Some(ParsedElement::Limit(n)) => limit = Some(*n),
                _ => {}
            }
            ctx.decrement(1);
        }
        apply_paging(ctx, offset, limit)
    }

    fn handle_action_params(&self, ctx: &mut ParserAdapterContext) -> AqlResult<()> {
        ctx.reset_index();
        let mut dry_run = None;
        let mut keys = Vec::new();
        let mut new_value = None;
        while ctx.has_next() {
            match ctx.current() {
                Some(ParsedElement::DryRun(flag)) => dry_run = Some(*flag),
                Some(ParsedElement::Keys(k)) => keys.extend(k.iter().cloned()),
                Some(ParsedElement::NewValue(Literal::Null)) => new_value = None,
                Some(ParsedElement::NewValue(v)) => new_value = Some(v.to_string()),
                _ => {}
            }
            ctx.decrement(1);
        }
        let kind = ctx.query().action.kind;
        ctx.set_action(ActionSpec {
            kind,
            dry_run,
            keys,
            new_value,
        });
        Ok(())
    }

    fn handle_filter(&self, ctx: &mut ParserAdapterContext) -> AqlResult<()> {
        ctx.reset_index();
        while ctx.has_next() {
            let element = ctx.current().cloned();
            match element {
                Some(ParsedElement::ClauseBegin(operator)) => {
                    ctx.open_clause(operator);
                    ctx.decrement(1);
                }
                Some(ParsedElement::ClauseEnd) => {
                    ctx.close_clause()?;
                    ctx.decrement(1);
                }
                Some(ParsedElement::Field(path)) => {
                    let comparator = match ctx.lookahead(1) {
                        Some(ParsedElement::Comparator(sig)) => Comparator::from_signature(sig)
                            .ok_or_else(|| AqlError::UnsupportedComparator(sig.clone()))?,
                        _ => {
                            return Err(AqlError::ParseError(format!(
                                "missing comparator for {}",
                                path
                            )))
                        }
                    };
                    let value = match ctx.lookahead(2) {
                        Some(ParsedElement::Value(v)) => v.clone(),
                        _ => {
                            return Err(AqlError::ParseError(format!("missing value for {}", path)))
                        }
                    };
                    let criterion = build_criterion(ctx, &path, comparator, &value)?;
                    ctx.add_criterion(criterion);
                    ctx.decrement(3);
                }
                _ => ctx.decrement(1),
            }
        }
        Ok(())
    }
}
