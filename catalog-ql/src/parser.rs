//! Recursive-descent parser, one token of look-ahead.
//!
//! ```text
//! Expression   := ("IN" ContextList)? FirstClause ("WHERE" FilterList)?
//!                 (Set | Delete | Create)? Return?
//! FirstClause  := Match | Create
//! Match        := "MATCH" NodeRelList
//! Create       := "CREATE" NodeRelList
//! NodeRelList  := Node ( RelArrow Node | "," Node )*
//! Node         := "(" (Ident)? (":" Kind Props?)? ")"
//! Props        := "{" KV ("," KV)* "}"    -- in MATCH
//!              |  JSON-DOCUMENT            -- in CREATE
//! Set          := "SET"    KVList
//! Delete       := "DELETE" IdentList
//! Return       := "RETURN" ReturnItemList OrderBy? Limit? Skip?
//! ReturnItem   := (Agg "{" Path "}" | Path) ("AS" Ident)?
//! Agg          := "COUNT" | "SUM"
//! FilterList   := Filter ( ("," | "AND") Filter )*
//! Filter       := "NOT"? ( SubPattern | Path Op Value )
//! Value        := STRING | NUMBER | BOOLEAN | NULL | JSON | Temporal
//! Temporal     := ("datetime"|"duration") "(" STRING? ")" (("+"|"-") Temporal)?
//! ```

use std::collections::HashSet;

use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::lexer::{LexMode, Lexer};
use crate::token::{Span, Token, TokenKind};

pub struct Parser {
    lexer: Lexer,
    current: Token,
    anon_counter: usize,
    match_variables: HashSet<String>,
}

impl Parser {
    pub fn new(src: &str) -> Result<Self> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            anon_counter: 0,
            match_variables: HashSet::new(),
        })
    }

    pub fn parse(src: &str) -> Result<Query> {
        let mut parser = Parser::new(src)?;
        parser.parse_query()
    }

    fn bump(&mut self, mode: LexMode) -> Result<()> {
        self.lexer.set_mode(mode);
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: format!("{:?}({:?})", self.current.kind, self.current.literal),
            span: self.current.span,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.bump(LexMode::Normal)?;
            Ok(tok)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn next_anon_name(&mut self) -> String {
        let name = format!("_anon{}", self.anon_counter);
        self.anon_counter += 1;
        name
    }

    fn strip_quotes(literal: &str) -> String {
        let inner = literal.strip_prefix('"').unwrap_or(literal);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    pub fn parse_query(&mut self) -> Result<Query> {
        let start = self.current.span;
        let contexts = if self.current.kind == TokenKind::In {
            self.bump(LexMode::Normal)?;
            self.parse_context_list()?
        } else {
            Vec::new()
        };

        let mut clauses = Vec::new();

        match self.current.kind {
            TokenKind::Match => {
                clauses.push(Clause::Match(self.parse_match_clause()?));
                match self.current.kind {
                    TokenKind::Set => clauses.push(Clause::Set(self.parse_set_clause()?)),
                    TokenKind::Delete => clauses.push(Clause::Delete(self.parse_delete_clause()?)),
                    TokenKind::Create => clauses.push(Clause::Create(self.parse_create_clause()?)),
                    _ => {}
                }
                if self.current.kind == TokenKind::Return {
                    clauses.push(Clause::Return(self.parse_return_clause()?));
                }
            }
            TokenKind::Create => {
                clauses.push(Clause::Create(self.parse_create_clause()?));
                if self.current.kind == TokenKind::Return {
                    clauses.push(Clause::Return(self.parse_return_clause()?));
                }
            }
            _ => return Err(self.unexpected("MATCH or CREATE")),
        }

        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected("end of query"));
        }

        Ok(Query {
            contexts,
            clauses,
            span: Span {
                start: start.start,
                end: self.current.span.end,
                line: start.line,
                col: start.col,
            },
        })
    }

    fn parse_context_list(&mut self) -> Result<Vec<String>> {
        let mut contexts = Vec::new();
        loop {
            let tok = self.expect(TokenKind::Ident, "context name")?;
            contexts.push(tok.literal);
            if self.current.kind == TokenKind::Comma {
                self.bump(LexMode::Normal)?;
                continue;
            }
            break;
        }
        Ok(contexts)
    }

    // ---- MATCH / CREATE pattern lists ----

    fn parse_match_clause(&mut self) -> Result<MatchClause> {
        let start = self.current.span;
        self.bump(LexMode::Normal)?; // consume MATCH
        let chains = self.parse_node_rel_list(false)?;

        for chain in &chains {
            self.match_variables.insert(chain.start.name.clone());
            for seg in &chain.segments {
                self.match_variables.insert(seg.node.name.clone());
            }
        }
        self.validate_kindless(&chains)?;

        let filters = if self.current.kind == TokenKind::Where {
            self.bump(LexMode::Normal)?;
            let filters = self.parse_filter_list()?;
            if filters.iter().any(|f| matches!(f, Filter::SubMatch(_)))
                && chains.iter().any(|c| {
                    c.start.is_kindless()
                        || c.segments.iter().any(|s| s.node.is_kindless())
                })
            {
                return Err(ParseError::SubMatchWithKindlessOuter { span: start });
            }
            filters
        } else {
            Vec::new()
        };

        Ok(MatchClause {
            chains,
            filters,
            span: start,
        })
    }

    fn parse_create_clause(&mut self) -> Result<CreateClause> {
        let start = self.current.span;
        self.bump(LexMode::Normal)?; // consume CREATE
        let chains = self.parse_node_rel_list(true)?;
        Ok(CreateClause {
            chains,
            span: start,
        })
    }

    fn validate_kindless(&self, chains: &[PatternChain]) -> Result<()> {
        for chain in chains {
            if chain.segments.is_empty() && chain.start.is_kindless() {
                return Err(ParseError::KindlessWithoutKindedNeighbor {
                    variable: chain.start.name.clone(),
                    span: chain.start.span,
                });
            }
            let mut prev = &chain.start;
            for seg in &chain.segments {
                if prev.is_kindless() && seg.node.is_kindless() {
                    return Err(ParseError::KindlessWithoutKindedNeighbor {
                        variable: seg.node.name.clone(),
                        span: seg.node.span,
                    });
                }
                prev = &seg.node;
            }
        }
        Ok(())
    }

    fn parse_node_rel_list(&mut self, in_create: bool) -> Result<Vec<PatternChain>> {
        let mut chains = Vec::new();
        let mut start = self.parse_node(in_create)?;
        let mut segments = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::ArrowRight
                | TokenKind::ArrowLeft
                | TokenKind::ArrowBoth
                | TokenKind::ArrowOpenRight
                | TokenKind::ArrowOpenLeft => {
                    let relationship = self.parse_relationship()?;
                    let node = self.parse_node(in_create)?;
                    segments.push(PathSegment { relationship, node });
                }
                TokenKind::Comma => {
                    chains.push(PatternChain {
                        start,
                        segments: std::mem::take(&mut segments),
                    });
                    self.bump(LexMode::Normal)?;
                    start = self.parse_node(in_create)?;
                }
                _ => break,
            }
        }
        chains.push(PatternChain { start, segments });

        if chains.len() == 1
            && chains[0].segments.is_empty()
            && chains[0].start.anonymous
            && chains[0].start.kind.is_none()
        {
            return Err(ParseError::AnonymousStandalone {
                span: chains[0].start.span,
            });
        }

        Ok(chains)
    }

    fn parse_node(&mut self, in_create: bool) -> Result<NodePattern> {
        let start = self.current.span;
        self.expect(TokenKind::LParen, "(")?;

        let (name, anonymous) = if self.current.kind == TokenKind::Ident {
            let tok = self.current.clone();
            self.bump(LexMode::Normal)?;
            (tok.literal, false)
        } else {
            (self.next_anon_name(), true)
        };

        let mut kind = None;
        let mut properties = Vec::new();
        let mut json_template = None;

        if self.current.kind == TokenKind::Colon {
            self.bump(LexMode::Kind)?;
            let kind_tok = self.expect(TokenKind::Ident, "resource kind")?;
            kind = Some(kind_tok.literal);

            if self.current.kind == TokenKind::LBrace {
                if in_create {
                    let json_tok = self.lexer.capture_json_block()?;
                    let value: serde_json::Value = serde_json::from_str(&json_tok.literal)
                        .map_err(|e| ParseError::InvalidJson {
                            message: e.to_string(),
                            span: json_tok.span,
                        })?;
                    json_template = Some(value);
                    self.bump(LexMode::Normal)?;
                } else {
                    properties = self.parse_kv_props()?;
                }
            }
        }

        self.expect(TokenKind::RParen, ")")?;

        Ok(NodePattern {
            name,
            kind,
            properties,
            json_template,
            anonymous,
            span: start,
        })
    }

    fn parse_kv_props(&mut self) -> Result<Vec<(String, Value)>> {
        self.expect(TokenKind::LBrace, "{")?;
        let mut props = Vec::new();
        if self.current.kind == TokenKind::RBrace {
            self.bump(LexMode::Normal)?;
            return Ok(props);
        }
        loop {
            let key_tok = self.expect(TokenKind::Ident, "property key")?;
            self.expect(TokenKind::Colon, ":")?;
            let value = self.parse_value()?;
            props.push((key_tok.literal, value));
            if self.current.kind == TokenKind::Comma {
                self.bump(LexMode::Normal)?;
                continue;
            }
            break;
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(props)
    }

    fn parse_relationship(&mut self) -> Result<Relationship> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::ArrowRight => {
                self.bump(LexMode::Normal)?;
                Ok(Relationship {
                    variable: None,
                    kind: None,
                    direction: Direction::Right,
                    properties: Vec::new(),
                    span: start,
                })
            }
            TokenKind::ArrowLeft => {
                self.bump(LexMode::Normal)?;
                Ok(Relationship {
                    variable: None,
                    kind: None,
                    direction: Direction::Left,
                    properties: Vec::new(),
                    span: start,
                })
            }
            TokenKind::ArrowBoth => {
                self.bump(LexMode::Normal)?;
                Ok(Relationship {
                    variable: None,
                    kind: None,
                    direction: Direction::Both,
                    properties: Vec::new(),
                    span: start,
                })
            }
            TokenKind::ArrowOpenRight | TokenKind::ArrowOpenLeft => {
                let opened_left = self.current.kind == TokenKind::ArrowOpenLeft;
                self.bump(LexMode::Normal)?;

                let variable = if self.current.kind == TokenKind::Ident {
                    let tok = self.current.clone();
                    self.bump(LexMode::Normal)?;
                    Some(tok.literal)
                } else {
                    None
                };

                let mut kind = None;
                let mut properties = Vec::new();
                if self.current.kind == TokenKind::Colon {
                    self.bump(LexMode::Kind)?;
                    let kind_tok = self.expect(TokenKind::Ident, "relationship kind")?;
                    kind = Some(kind_tok.literal);
                }
                if self.current.kind == TokenKind::LBrace {
                    properties = self.parse_kv_props()?;
                }

                let closer = self.current.kind;
                self.bump(LexMode::Normal)?;
                let direction = match (opened_left, closer) {
                    (true, TokenKind::ArrowCloseUndir) => Direction::Left,
                    (false, TokenKind::ArrowCloseRight) => Direction::Right,
                    (false, TokenKind::ArrowCloseUndir) => Direction::Both,
                    _ => return Err(self.unexpected("]- or ]->")),
                };

                Ok(Relationship {
                    variable,
                    kind,
                    direction,
                    properties,
                    span: start,
                })
            }
            _ => Err(self.unexpected("relationship arrow")),
        }
    }

    // ---- WHERE ----

    fn parse_filter_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = vec![self.parse_filter()?];
        loop {
            match self.current.kind {
                TokenKind::Comma | TokenKind::And => {
                    self.bump(LexMode::Normal)?;
                    filters.push(self.parse_filter()?);
                }
                _ => break,
            }
        }
        Ok(filters)
    }

    fn parse_filter(&mut self) -> Result<Filter> {
        let start = self.current.span;
        let negated = if self.current.kind == TokenKind::Not {
            self.bump(LexMode::Normal)?;
            true
        } else {
            false
        };

        if self.current.kind == TokenKind::LParen {
            return self.parse_sub_match(negated, start);
        }

        let path = self.parse_json_path()?;
        let operator = self.parse_operator()?;
        let value = self.parse_value()?;
        Ok(Filter::KeyValue(KeyValueFilter {
            path,
            operator,
            value,
            negated,
            span: start,
        }))
    }

    fn parse_sub_match(&mut self, negated: bool, start: Span) -> Result<Filter> {
        let chains = self.parse_node_rel_list(false)?;

        let mut reference_name = None;
        for chain in &chains {
            if chain.start.kind.is_none() && chain.start.properties.is_empty() {
                reference_name = Some(chain.start.name.clone());
                break;
            }
            for seg in &chain.segments {
                if seg.node.kind.is_none() && seg.node.properties.is_empty() {
                    reference_name = Some(seg.node.name.clone());
                    break;
                }
            }
            if reference_name.is_some() {
                break;
            }
        }

        let reference_name =
            reference_name.ok_or(ParseError::SubMatchMissingReference { span: start })?;

        Ok(Filter::SubMatch(SubMatchFilter {
            negated,
            chains,
            reference_name,
            span: start,
        }))
    }

    fn parse_operator(&mut self) -> Result<Operator> {
        let op = match self.current.kind {
            TokenKind::Eq => Operator::Eq,
            TokenKind::Neq => Operator::Neq,
            TokenKind::Lt => Operator::Lt,
            TokenKind::Gt => Operator::Gt,
            TokenKind::Lte => Operator::Lte,
            TokenKind::Gte => Operator::Gte,
            TokenKind::Contains => Operator::Contains,
            TokenKind::RegexEq => Operator::RegexMatch,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.bump(LexMode::Normal)?;
        Ok(op)
    }

    // ---- Values ----

    fn parse_value(&mut self) -> Result<Value> {
        match self.current.kind {
            TokenKind::String => {
                let literal = Self::strip_quotes(&self.current.literal);
                self.bump(LexMode::Normal)?;
                Ok(Value::String(literal))
            }
            TokenKind::Int => {
                let lit = self.current.literal.clone();
                let n: i64 = lit
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: lit.clone(),
                        span: self.current.span,
                    })?;
                self.bump(LexMode::Normal)?;
                Ok(Value::Int(n))
            }
            TokenKind::Number => {
                let lit = self.current.literal.clone();
                let n: f64 = lit
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: lit.clone(),
                        span: self.current.span,
                    })?;
                self.bump(LexMode::Normal)?;
                Ok(Value::Number(n))
            }
            TokenKind::True => {
                self.bump(LexMode::Normal)?;
                Ok(Value::Bool(true))
            }
            TokenKind::False => {
                self.bump(LexMode::Normal)?;
                Ok(Value::Bool(false))
            }
            TokenKind::Null => {
                self.bump(LexMode::Normal)?;
                Ok(Value::Null)
            }
            TokenKind::Datetime | TokenKind::Duration => {
                Ok(Value::Temporal(self.parse_temporal()?))
            }
            TokenKind::LBrace => {
                let json_tok = self.lexer.capture_json_block()?;
                let value: serde_json::Value = serde_json::from_str(&json_tok.literal)
                    .map_err(|e| ParseError::InvalidJson {
                        message: e.to_string(),
                        span: json_tok.span,
                    })?;
                self.bump(LexMode::Normal)?;
                Ok(Value::Json(value))
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_temporal(&mut self) -> Result<TemporalExpr> {
        let is_datetime = self.current.kind == TokenKind::Datetime;
        let kw_span = self.current.span;
        self.bump(LexMode::Normal)?;
        self.expect(TokenKind::LParen, "(")?;

        let arg = if self.current.kind == TokenKind::String {
            let lit = self.current.literal.clone();
            let span = self.current.span;
            let s = Self::strip_quotes(&lit);
            if is_datetime && !looks_like_rfc3339(&s) {
                return Err(ParseError::InvalidDateTime { literal: s, span });
            }
            if !is_datetime && !looks_like_iso8601_duration(&s) {
                return Err(ParseError::InvalidDuration { literal: s, span });
            }
            self.bump(LexMode::Normal)?;
            Some(s)
        } else {
            None
        };
        self.expect(TokenKind::RParen, ")")?;

        let mut expr = if is_datetime {
            TemporalExpr::DateTime(arg)
        } else {
            TemporalExpr::Duration(arg)
        };
        let _ = kw_span;

        if matches!(self.current.kind, TokenKind::Plus | TokenKind::Minus) {
            let op = if self.current.kind == TokenKind::Plus {
                TemporalOp::Add
            } else {
                TemporalOp::Sub
            };
            self.bump(LexMode::Normal)?;
            let rhs = self.parse_temporal()?;
            expr = TemporalExpr::BinOp {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }

        Ok(expr)
    }

    // ---- JSON paths ----

    fn parse_json_path(&mut self) -> Result<JsonPath> {
        let variable_tok = self.expect(TokenKind::Ident, "variable")?;
        let variable = variable_tok.literal;
        let mut steps = Vec::new();

        loop {
            if self.current.kind == TokenKind::Dot {
                self.bump(LexMode::PropertyPath)?;
                let seg = self.expect(TokenKind::Ident, "path segment")?;
                steps.push(PathStep::Key(seg.literal));
                self.parse_trailing_brackets(&mut steps)?;
                continue;
            }
            break;
        }
        Ok(JsonPath { variable, steps })
    }

    fn parse_trailing_brackets(&mut self, steps: &mut Vec<PathStep>) -> Result<()> {
        while self.current.kind == TokenKind::LBracket {
            self.bump(LexMode::Normal)?;
            match self.current.kind {
                TokenKind::Star => {
                    self.bump(LexMode::Normal)?;
                    steps.push(PathStep::Wildcard);
                }
                TokenKind::Int => {
                    let lit = self.current.literal.clone();
                    let idx: i64 = lit.parse().map_err(|_| ParseError::InvalidNumber {
                        literal: lit.clone(),
                        span: self.current.span,
                    })?;
                    self.bump(LexMode::Normal)?;
                    steps.push(PathStep::Index(idx));
                }
                _ => return Err(self.unexpected("* or an integer index")),
            }
            self.expect(TokenKind::RBracket, "]")?;
        }
        Ok(())
    }

    // ---- SET / DELETE ----

    fn parse_set_clause(&mut self) -> Result<SetClause> {
        let start = self.current.span;
        self.bump(LexMode::Normal)?; // consume SET
        let mut assignments = Vec::new();
        loop {
            let item_start = self.current.span;
            let path = self.parse_json_path()?;
            self.expect(TokenKind::Eq, "=")?;
            let value = self.parse_value()?;
            assignments.push(SetAssignment {
                path,
                value,
                span: item_start,
            });
            if self.current.kind == TokenKind::Comma {
                self.bump(LexMode::Normal)?;
                continue;
            }
            break;
        }
        Ok(SetClause {
            assignments,
            span: start,
        })
    }

    fn parse_delete_clause(&mut self) -> Result<DeleteClause> {
        let start = self.current.span;
        self.bump(LexMode::Normal)?; // consume DELETE
        let mut variables = Vec::new();
        loop {
            let tok = self.expect(TokenKind::Ident, "variable")?;
            variables.push(tok.literal);
            if self.current.kind == TokenKind::Comma {
                self.bump(LexMode::Normal)?;
                continue;
            }
            break;
        }
        Ok(DeleteClause {
            variables,
            span: start,
        })
    }

    // ---- RETURN ----

    fn parse_return_clause(&mut self) -> Result<ReturnClause> {
        let start = self.current.span;
        self.bump(LexMode::Normal)?; // consume RETURN

        let mut items = vec![self.parse_return_item()?];
        while self.current.kind == TokenKind::Comma {
            self.bump(LexMode::Normal)?;
            items.push(self.parse_return_item()?);
        }

        let order_by = if self.current.kind == TokenKind::Order {
            self.bump(LexMode::Normal)?;
            self.expect(TokenKind::By, "BY")?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };

        let mut skip = None;
        let mut limit = None;
        loop {
            match self.current.kind {
                TokenKind::Skip => {
                    self.bump(LexMode::Normal)?;
                    skip = Some(self.parse_non_negative_int()?);
                }
                TokenKind::Limit => {
                    self.bump(LexMode::Normal)?;
                    limit = Some(self.parse_non_negative_int()?);
                }
                _ => break,
            }
        }

        Ok(ReturnClause {
            items,
            order_by,
            skip,
            limit,
            span: start,
        })
    }

    fn parse_non_negative_int(&mut self) -> Result<u64> {
        if self.current.kind != TokenKind::Int {
            return Err(ParseError::InvalidLimitOrSkip {
                found: self.current.literal.clone(),
                span: self.current.span,
            });
        }
        let lit = self.current.literal.clone();
        let span = self.current.span;
        let value: i64 = lit
            .parse()
            .map_err(|_| ParseError::InvalidLimitOrSkip {
                found: lit.clone(),
                span,
            })?;
        if value < 0 {
            return Err(ParseError::InvalidLimitOrSkip { found: lit, span });
        }
        self.bump(LexMode::Normal)?;
        Ok(value as u64)
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = vec![self.parse_order_by_item()?];
        while self.current.kind == TokenKind::Comma {
            self.bump(LexMode::Normal)?;
            items.push(self.parse_order_by_item()?);
        }
        Ok(items)
    }

    fn parse_order_by_item(&mut self) -> Result<OrderByItem> {
        let path = self.parse_json_path()?;
        if !self.match_variables.is_empty() && !self.match_variables.contains(&path.variable) {
            return Err(ParseError::UndefinedOrderByVariable {
                variable: path.variable,
                span: self.current.span,
            });
        }
        let direction = match self.current.kind {
            TokenKind::Asc => {
                self.bump(LexMode::Normal)?;
                SortDirection::Asc
            }
            TokenKind::Desc => {
                self.bump(LexMode::Normal)?;
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        Ok(OrderByItem { path, direction })
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem> {
        let start = self.current.span;
        let target = match self.current.kind {
            TokenKind::Count | TokenKind::Sum => {
                let agg = if self.current.kind == TokenKind::Count {
                    AggKind::Count
                } else {
                    AggKind::Sum
                };
                self.bump(LexMode::Normal)?;
                self.expect(TokenKind::LBrace, "{")?;
                let path = self.parse_json_path()?;
                self.expect(TokenKind::RBrace, "}")?;
                ReturnTarget::Aggregate { agg, path }
            }
            _ => ReturnTarget::Path(self.parse_json_path()?),
        };

        let alias = if self.current.kind == TokenKind::As {
            self.bump(LexMode::Normal)?;
            let tok = self.expect(TokenKind::Ident, "alias")?;
            Some(tok.literal)
        } else {
            None
        };

        Ok(ReturnItem {
            target,
            alias,
            span: start,
        })
    }
}

/// Coarse structural gate, not a full RFC-3339 validator — the authoritative
/// parse happens in `catalog-core`'s temporal module, which needs a real
/// parser anyway to perform arithmetic on the result.
fn looks_like_rfc3339(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 20 {
        return false;
    }
    let date_ok = bytes[4] == b'-' && bytes[7] == b'-' && (bytes[10] == b'T' || bytes[10] == b't');
    let digits_ok = bytes[0..4].iter().all(u8::is_ascii_digit)
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[8..10].iter().all(u8::is_ascii_digit);
    date_ok && digits_ok
}

/// Coarse structural gate for `P[nY][nM][nD](T[nH][nM][nS])?`: designators
/// must appear, in order, at most once each.
fn looks_like_iso8601_duration(s: &str) -> bool {
    let mut chars = s.chars().peekable();
    if chars.next() != Some('P') {
        return false;
    }
    let date_designators = ['Y', 'M', 'D'];
    let time_designators = ['H', 'M', 'S'];
    let mut date_idx = 0usize;
    let mut seen_any = false;

    while let Some(&c) = chars.peek() {
        if c == 'T' {
            chars.next();
            break;
        }
        if !consume_designated_field(&mut chars, &date_designators, &mut date_idx) {
            return false;
        }
        seen_any = true;
    }

    if chars.peek().is_some() {
        let mut time_idx = 0usize;
        while chars.peek().is_some() {
            if !consume_designated_field(&mut chars, &time_designators, &mut time_idx) {
                return false;
            }
            seen_any = true;
        }
    }

    seen_any
}

fn consume_designated_field(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    designators: &[char],
    idx: &mut usize,
) -> bool {
    let mut had_digit = false;
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        chars.next();
        had_digit = true;
    }
    if !had_digit {
        return false;
    }
    let Some(&designator) = chars.peek() else {
        return false;
    };
    let Some(pos) = designators.iter().position(|d| *d == designator) else {
        return false;
    };
    if pos < *idx {
        return false;
    }
    *idx = pos + 1;
    chars.next();
    true
}
