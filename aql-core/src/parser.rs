//! Recursive descent parser for AQL text.
//!
//! The parser does not resolve fields or domains. It flattens the query into a
//! stack of [`ParsedElement`]s which the parser adapter walks in several passes.

use crate::error::{AqlError, AqlResult};
use crate::lexer::{Lexer, Token};
use crate::model::{Literal, Operator};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedElement {
    /// Main domain, e.g. `items` or `build.properties`.
    Domain(String),
    /// `find`, `delete` or `update`.
    Action(String),
    ClauseBegin(Operator),
    ClauseEnd,
    /// Field path of a criterion, followed by its comparator and value.
    Field(String),
    Comparator(String),
    Value(Literal),
    Include(Vec<String>),
    Sort { direction: String, fields: Vec<String> },
    Offset(i64),
    Limit(i64),
    DryRun(bool),
    Keys(Vec<String>),
    NewValue(Literal),
}

/// Parsed elements stored as a stack: the first element of the query is last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    pub elements: Vec<ParsedElement>,
}

impl ParseResult {
    /// Elements in query order.
    pub fn in_order(&self) -> impl Iterator<Item = &ParsedElement> {
        self.elements.iter().rev()
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    output: Vec<ParsedElement>,
}

impl Parser {
    pub fn new(input: &str) -> AqlResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
            output: Vec::new(),
        })
    }

    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: Token) -> AqlResult<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(AqlError::ParseError(format!(
                "Expected {}, found {}",
                expected,
                self.current_token()
            )))
        }
    }

    fn expect_identifier(&mut self) -> AqlResult<String> {
        match self.current_token().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(AqlError::ParseError(format!(
                "Expected identifier, found {}",
                other
            ))),
        }
    }

    fn expect_string(&mut self) -> AqlResult<String> {
        match self.current_token().clone() {
            Token::String(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(AqlError::ParseError(format!(
                "Expected string, found {}",
                other
            ))),
        }
    }

    pub fn parse(mut self) -> AqlResult<ParseResult> {
        self.parse_domain_and_action()?;

        while *self.current_token() == Token::Dot {
            self.advance();
            let method = self.expect_identifier()?;
            self.expect(Token::LeftParen)?;
            self.parse_method(&method)?;
            self.expect(Token::RightParen)?;
        }

        if *self.current_token() != Token::Eof {
            return Err(AqlError::ParseError(format!(
                "Unexpected {} after query",
                self.current_token()
            )));
        }

        let mut elements = self.output;
        elements.reverse();
        Ok(ParseResult { elements })
    }

    /// `domain(.domain)*.action(criteria?)`
    fn parse_domain_and_action(&mut self) -> AqlResult<()> {
        let mut segments = vec![self.expect_identifier()?];

        loop {
            self.expect(Token::Dot)?;
            let name = self.expect_identifier()?;
            if matches!(name.as_str(), "find" | "delete" | "update") {
                self.output.push(ParsedElement::Domain(segments.join(".")));
                self.output.push(ParsedElement::Action(name));
                break;
            }
            segments.push(name);
        }

        self.expect(Token::LeftParen)?;
        if *self.current_token() == Token::LeftBrace {
            self.parse_criteria_object()?;
        }
        self.expect(Token::RightParen)
    }

    fn parse_method(&mut self, method: &str) -> AqlResult<()> {
        match method {
            "include" => {
                let fields = self.parse_string_list()?;
                self.output.push(ParsedElement::Include(fields));
            }
            "sort" => self.parse_sort()?,
            "offset" => {
                let n = self.parse_number()?;
                self.output.push(ParsedElement::Offset(n));
            }
            "limit" => {
                let n = self.parse_number()?;
                self.output.push(ParsedElement::Limit(n));
            }
            "dryRun" => {
                let flag = match self.current_token().clone() {
                    Token::True => true,
                    Token::False => false,
                    Token::String(s) => s.parse::<bool>().map_err(|_| {
                        AqlError::ParseError(format!("Invalid dryRun value: {}", s))
                    })?,
                    other => {
                        return Err(AqlError::ParseError(format!(
                            "Invalid dryRun value: {}",
                            other
                        )))
                    }
                };
                self.advance();
                self.output.push(ParsedElement::DryRun(flag));
            }
            "keys" => {
                let keys = self.parse_string_list()?;
                self.output.push(ParsedElement::Keys(keys));
            }
            "newValue" => {
                let value = self.parse_literal()?;
                self.output.push(ParsedElement::NewValue(value));
            }
            other => {
                return Err(AqlError::ParseError(format!("Unknown method: {}", other)));
            }
        }
        Ok(())
    }

    /// `"a", "b"` or `["a", "b"]`, possibly empty.
    fn parse_string_list(&mut self) -> AqlResult<Vec<String>> {
        let bracketed = *self.current_token() == Token::LeftBracket;
        if bracketed {
            self.advance();
        }

        let mut values = Vec::new();
        while let Token::String(s) = self.current_token().clone() {
            values.push(s);
            self.advance();
            if *self.current_token() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        if bracketed {
            self.expect(Token::RightBracket)?;
        }
        Ok(values)
    }

    /// `{"$asc": ["a", "b"]}`
    fn parse_sort(&mut self) -> AqlResult<()> {
        self.expect(Token::LeftBrace)?;
        let direction = self.expect_string()?;
        self.expect(Token::Colon)?;
        let fields = self.parse_string_list()?;
        self.expect(Token::RightBrace)?;
        self.output.push(ParsedElement::Sort { direction, fields });
        Ok(())
    }

    fn parse_number(&mut self) -> AqlResult<i64> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(n)
            }
            Token::String(s) => {
                self.advance();
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| AqlError::ParseError(format!("Expected number, found \"{}\"", s)))
            }
            other => Err(AqlError::ParseError(format!(
                "Expected number, found {}",
                other
            ))),
        }
    }

    fn parse_literal(&mut self) -> AqlResult<Literal> {
        let literal = match self.current_token().clone() {
            Token::String(s) => Literal::String(s),
            Token::Number(n) => Literal::Number(n),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            other => {
                return Err(AqlError::ParseError(format!(
                    "Expected value, found {}",
                    other
                )))
            }
        };
        self.advance();
        Ok(literal)
    }

    /// Entries of an object are combined with `$and`.
    fn parse_criteria_object(&mut self) -> AqlResult<()> {
        let entries = self.collect_object_entries()?;
        self.emit_entries(entries, Operator::And, false)
    }

    /// Parse `{ "key": value, ... }`, emitting each entry into its own buffer.
    fn collect_object_entries(&mut self) -> AqlResult<Vec<Vec<ParsedElement>>> {
        self.expect(Token::LeftBrace)?;
        let mut entries = Vec::new();

        while *self.current_token() != Token::RightBrace {
            let saved = std::mem::take(&mut self.output);
            let result = self.parse_entry();
            let entry = std::mem::replace(&mut self.output, saved);
            result?;
            entries.push(entry);

            if *self.current_token() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightBrace)?;
        Ok(entries)
    }

    /// Emit entries joined by `operator`. More than one entry is wrapped in a clause.
    fn emit_entries(
        &mut self,
        entries: Vec<Vec<ParsedElement>>,
        operator: Operator,
        force_clause: bool,
    ) -> AqlResult<()> {
        let wrap = force_clause || entries.len() > 1;
        if wrap {
            self.output.push(ParsedElement::ClauseBegin(operator));
        }
        for entry in entries {
            self.output.extend(entry);
        }
        if wrap {
            self.output.push(ParsedElement::ClauseEnd);
        }
        Ok(())
    }

    fn parse_entry(&mut self) -> AqlResult<()> {
        let key = self.expect_string()?;
        self.expect(Token::Colon)?;

        if let Some(operator) = Operator::from_signature(&key) {
            return self.parse_clause(operator);
        }
        if key.starts_with('$') {
            return Err(AqlError::ParseError(format!(
                "Unexpected comparator {} where a field was expected",
                key
            )));
        }

        if *self.current_token() == Token::LeftBrace {
            // {"field": {"$gt": 1, "$lt": 5}}
            self.advance();
            let mut criteria = Vec::new();
            while *self.current_token() != Token::RightBrace {
                let comparator = self.expect_string()?;
                self.expect(Token::Colon)?;
                let value = self.parse_literal()?;
                criteria.push(vec![
                    ParsedElement::Field(key.clone()),
                    ParsedElement::Comparator(comparator),
                    ParsedElement::Value(value),
                ]);
                if *self.current_token() == Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(Token::RightBrace)?;
            if criteria.is_empty() {
                return Err(AqlError::ParseError(format!(
                    "No comparator given for field {}",
                    key
                )));
            }
            return self.emit_entries(criteria, Operator::And, false);
        }

        let value = self.parse_literal()?;
        self.output.push(ParsedElement::Field(key));
        self.output.push(ParsedElement::Comparator("$eq".to_string()));
        self.output.push(ParsedElement::Value(value));
        Ok(())
    }

    /// `"$or": [{...}, {...}]` or `"$or": {...}`
    fn parse_clause(&mut self, operator: Operator) -> AqlResult<()> {
        match self.current_token() {
            Token::LeftBracket => {
                self.advance();
                let mut members = Vec::new();
                while *self.current_token() == Token::LeftBrace {
                    let entries = self.collect_object_entries()?;
                    // Entries inside one array member are always AND-ed.
                    let saved = std::mem::take(&mut self.output);
                    let inner = if operator == Operator::Msp {
                        entries.into_iter().flatten().collect::<Vec<_>>()
                    } else {
                        self.emit_entries(entries, Operator::And, false)?;
                        std::mem::take(&mut self.output)
                    };
                    self.output = saved;
                    members.push(inner);
                    if *self.current_token() == Token::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Token::RightBracket)?;
                self.emit_clause_members(operator, members);
                Ok(())
            }
            Token::LeftBrace => {
                let entries = self.collect_object_entries()?;
                self.emit_clause_members(operator, entries);
                Ok(())
            }
            other => Err(AqlError::ParseError(format!(
                "Expected array or object after {}, found {}",
                operator.signature(),
                other
            ))),
        }
    }

    fn emit_clause_members(&mut self, operator: Operator, members: Vec<Vec<ParsedElement>>) {
        self.output.push(ParsedElement::ClauseBegin(operator));
        for member in members {
            self.output.extend(member);
        }
        self.output.push(ParsedElement::ClauseEnd);
    }
}

pub fn parse(input: &str) -> AqlResult<ParseResult> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> Vec<ParsedElement> {
        parse(input).unwrap().in_order().cloned().collect()
    }

    #[test]
    fn test_simple_find() {
        let elements = parsed(r#"items.find({"repo":"repo1"})"#);
        assert_eq!(
            elements,
            vec![
                ParsedElement::Domain("items".into()),
                ParsedElement::Action("find".into()),
                ParsedElement::Field("repo".into()),
                ParsedElement::Comparator("$eq".into()),
                ParsedElement::Value(Literal::String("repo1".into())),
            ]
        );
    }

    #[test]
    fn test_stack_order() {
        let result = parse("items.find()").unwrap();
        assert_eq!(
            result.elements.last(),
            Some(&ParsedElement::Domain("items".into()))
        );
    }

    #[test]
    fn test_dotted_domain() {
        let elements = parsed("build.properties.find()");
        assert_eq!(elements[0], ParsedElement::Domain("build.properties".into()));
        assert_eq!(elements[1], ParsedElement::Action("find".into()));
    }

    #[test]
    fn test_or_clause_with_multi_entry_member() {
        let elements = parsed(r#"items.find({"$or":[{"repo":"a","name":"x"},{"repo":"b"}]})"#);
        let shape: Vec<&str> = elements
            .iter()
            .map(|e| match e {
                ParsedElement::ClauseBegin(Operator::Or) => "or(",
                ParsedElement::ClauseBegin(Operator::And) => "and(",
                ParsedElement::ClauseEnd => ")",
                ParsedElement::Field(_) => "f",
                _ => "",
            })
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(shape, vec!["or(", "and(", "f", "f", ")", "f", ")"]);
    }

    #[test]
    fn test_comparator_object() {
        let elements = parsed(r#"items.find({"size":{"$gt":10,"$lt":100}})"#);
        assert!(elements.contains(&ParsedElement::ClauseBegin(Operator::And)));
        assert!(elements.contains(&ParsedElement::Comparator("$gt".into())));
        assert!(elements.contains(&ParsedElement::Value(Literal::Number(100))));
    }

    #[test]
    fn test_methods() {
        let elements = parsed(
            r#"items.find().include("name","property.*").sort({"$desc":["name"]}).offset(5).limit(10)"#,
        );
        assert!(elements.contains(&ParsedElement::Include(vec![
            "name".into(),
            "property.*".into()
        ])));
        assert!(elements.contains(&ParsedElement::Sort {
            direction: "$desc".into(),
            fields: vec!["name".into()],
        }));
        assert!(elements.contains(&ParsedElement::Offset(5)));
        assert!(elements.contains(&ParsedElement::Limit(10)));
    }

    #[test]
    fn test_update_methods() {
        let elements = parsed(
            r#"properties.update({"key":"build.number"}).keys("build.number").newValue("68").dryRun(false)"#,
        );
        assert!(elements.contains(&ParsedElement::Action("update".into())));
        assert!(elements.contains(&ParsedElement::Keys(vec!["build.number".into()])));
        assert!(elements.contains(&ParsedElement::NewValue(Literal::String("68".into()))));
        assert!(elements.contains(&ParsedElement::DryRun(false)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("items").is_err());
        assert!(parse("items.find(").is_err());
        assert!(parse(r#"items.find({"repo"})"#).is_err());
        assert!(parse("items.find().frobnicate()").is_err());
        assert!(parse(r#"items.find({"$eq":"x"})"#).is_err());
        assert!(parse("items.find() extra").is_err());
    }
}
