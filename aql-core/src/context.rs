//! Mutable state shared by the parser and API adapters while building an [`AqlQuery`].

use std::ops::{Deref, DerefMut};

use crate::domain::Domain;
use crate::error::{AqlError, AqlResult};
use crate::model::{ActionSpec, AqlQuery, Criterion, Operator, QueryElement, SortDetails};
use crate::parser::{ParseResult, ParsedElement};
use crate::registry::MINIMAL_DYNAMIC_TABLE_ID;

/// An open clause on the adapter stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseElement {
    And,
    Or,
    /// Criteria inside share one property table occurrence.
    MatchSingleProperty { table_id: u32 },
}

impl ClauseElement {
    fn joiner(self) -> QueryElement {
        match self {
            ClauseElement::Or => QueryElement::Or,
            ClauseElement::And | ClauseElement::MatchSingleProperty { .. } => QueryElement::And,
        }
    }
}

#[derive(Debug)]
pub struct AdapterContext {
    query: AqlQuery,
    stack: Vec<ClauseElement>,
    table_id: u32,
}

impl AdapterContext {
    pub fn new(domain: Domain) -> Self {
        Self {
            query: AqlQuery::new(domain),
            stack: Vec::new(),
            table_id: MINIMAL_DYNAMIC_TABLE_ID,
        }
    }

    pub fn domain(&self) -> Domain {
        self.query.domain
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.query.domain = domain;
    }

    pub fn query(&self) -> &AqlQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut AqlQuery {
        &mut self.query
    }

    pub fn set_action(&mut self, action: ActionSpec) {
        self.query.action = action;
    }

    pub fn set_offset(&mut self, offset: i64) -> AqlResult<()> {
        if offset < 0 {
            return Err(AqlError::InvalidValue(format!("negative offset {}", offset)));
        }
        self.query.offset = offset;
        Ok(())
    }

    pub fn set_limit(&mut self, limit: i64) -> AqlResult<()> {
        if limit < 0 {
            return Err(AqlError::InvalidValue(format!("negative limit {}", limit)));
        }
        self.query.limit = limit;
        Ok(())
    }

    /// Sort fields must already be result fields of the query.
    pub fn set_sort(&mut self, sort: SortDetails) -> AqlResult<()> {
        if sort.fields.is_empty() {
            return Err(AqlError::InvalidSort("no sort fields given".to_string()));
        }
        if let Some(field) = sort
            .fields
            .iter()
            .find(|f| !self.query.result_fields.contains(f))
        {
            return Err(AqlError::InvalidSort(format!(
                "{} is not a result field",
                field.field.name()
            )));
        }
        self.query.sort = Some(sort);
        Ok(())
    }

    /// Next dynamic table id. Ids are unique within the context.
    pub fn provide_table_id(&mut self) -> u32 {
        let id = self.table_id;
        self.table_id += 1;
        id
    }

    pub fn push(&mut self, element: ClauseElement) {
        self.stack.push(element);
    }

    pub fn pop(&mut self) -> Option<ClauseElement> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<ClauseElement> {
        self.stack.last().copied()
    }

    /// Table id shared by the innermost enclosing `$msp` clause, if any.
    pub fn single_property_table_id(&self) -> Option<u32> {
        self.stack.iter().rev().find_map(|e| match e {
            ClauseElement::MatchSingleProperty { table_id } => Some(*table_id),
            _ => None,
        })
    }

    fn needs_joiner(&self) -> bool {
        matches!(
            self.query.elements.last(),
            Some(QueryElement::Criterion(_)) | Some(QueryElement::CloseParenthesis)
        )
    }

    fn add_joiner(&mut self) {
        if self.needs_joiner() {
            let joiner = self.peek().unwrap_or(ClauseElement::And).joiner();
            self.query.elements.push(joiner);
        }
    }

    pub fn add_criterion(&mut self, criterion: Criterion) {
        self.add_joiner();
        self.query.elements.push(QueryElement::Criterion(criterion));
    }

    pub fn open_clause(&mut self, operator: Operator) {
        self.add_joiner();
        let element = match operator {
            Operator::And => ClauseElement::And,
            Operator::Or => ClauseElement::Or,
            Operator::Msp => ClauseElement::MatchSingleProperty {
                table_id: self.provide_table_id(),
            },
        };
        self.push(element);
        self.query.elements.push(QueryElement::OpenParenthesis);
    }

    /// Close the innermost clause. An empty clause is removed with its joiner.
    pub fn close_clause(&mut self) -> AqlResult<()> {
        if self.pop().is_none() {
            return Err(AqlError::MalformedQuery(
                "closing a clause that was never opened".to_string(),
            ));
        }
        let elements = &mut self.query.elements;
        if elements.last() == Some(&QueryElement::OpenParenthesis) {
            elements.pop();
            if elements.last().is_some_and(|e| e.is_operator()) {
                elements.pop();
            }
        } else {
            elements.push(QueryElement::CloseParenthesis);
        }
        Ok(())
    }

    /// Validate the element list and hand out the finished query.
    pub fn finish(self) -> AqlResult<AqlQuery> {
        if !self.stack.is_empty() {
            return Err(AqlError::MalformedQuery(format!(
                "{} clause(s) left open",
                self.stack.len()
            )));
        }
        validate_elements(&self.query)?;
        Ok(self.query)
    }
}

/// Check balance, alternation and domain consistency of a query's elements.
pub fn validate_elements(query: &AqlQuery) -> AqlResult<()> {
    let mut depth: usize = 0;
    // true when the next element must be an operand (criterion or open parenthesis)
    let mut expect_operand = true;

    for element in &query.elements {
        match element {
            QueryElement::Criterion(criterion) => {
                if !expect_operand {
                    return Err(AqlError::MalformedQuery(format!(
                        "missing operator before {}",
                        criterion
                    )));
                }
                if criterion.main_domain() != Some(query.domain) {
                    return Err(AqlError::DomainMismatch(format!(
                        "criterion {} does not start from {}",
                        criterion, query.domain
                    )));
                }
                expect_operand = false;
            }
            QueryElement::OpenParenthesis => {
                if !expect_operand {
                    return Err(AqlError::MalformedQuery(
                        "missing operator before '('".to_string(),
                    ));
                }
                depth += 1;
            }
            QueryElement::CloseParenthesis => {
                if expect_operand || depth == 0 {
                    return Err(AqlError::MalformedQuery("unexpected ')'".to_string()));
                }
                depth -= 1;
            }
            QueryElement::And | QueryElement::Or => {
                if expect_operand {
                    return Err(AqlError::MalformedQuery(format!(
                        "operator {} without left operand",
                        element
                    )));
                }
                expect_operand = true;
            }
        }
    }

    if depth != 0 {
        return Err(AqlError::MalformedQuery("unbalanced parenthesis".to_string()));
    }
    if expect_operand && !query.elements.is_empty() {
        return Err(AqlError::MalformedQuery(
            "query ends with an operator".to_string(),
        ));
    }
    Ok(())
}

/// Adapter context over a parse result, read from the top of the stack downwards.
#[derive(Debug)]
pub struct ParserAdapterContext {
    inner: AdapterContext,
    elements: Vec<ParsedElement>,
    index: isize,
}

impl ParserAdapterContext {
    pub fn new(parse_result: ParseResult) -> Self {
        let index = parse_result.elements.len() as isize - 1;
        Self {
            inner: AdapterContext::new(Domain::Items),
            elements: parse_result.elements,
            index,
        }
    }

    pub fn has_next(&self) -> bool {
        self.index >= 0
    }

    pub fn current(&self) -> Option<&ParsedElement> {
        if self.index < 0 {
            return None;
        }
        self.elements.get(self.index as usize)
    }

    /// Element `offset` positions after the current one.
    pub fn lookahead(&self, offset: usize) -> Option<&ParsedElement> {
        let index = self.index - offset as isize;
        if index < 0 {
            return None;
        }
        self.elements.get(index as usize)
    }

    pub fn decrement(&mut self, amount: usize) {
        self.index -= amount as isize;
    }

    pub fn reset_index(&mut self) {
        self.index = self.elements.len() as isize - 1;
    }

    pub fn into_inner(self) -> AdapterContext {
        self.inner
    }
}

impl Deref for ParserAdapterContext {
    type Target = AdapterContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ParserAdapterContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
