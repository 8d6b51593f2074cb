//! Abstract syntax produced by [`crate::parser::Parser`].
//!
//! The tree is immutable once parsed; the kindless rewriter in `catalog-core`
//! produces a brand new `Query` rather than mutating this one in place.

use crate::token::Span;

/// Top-level parsed unit: an optional list of contexts (`IN a, b`) followed
/// by an ordered sequence of clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub contexts: Vec<String>,
    pub clauses: Vec<Clause>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(MatchClause),
    Create(CreateClause),
    Set(SetClause),
    Delete(DeleteClause),
    Return(ReturnClause),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub chains: Vec<PatternChain>,
    pub filters: Vec<Filter>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    pub chains: Vec<PatternChain>,
    pub span: Span,
}

/// A single comma-separated pattern component: a start node and zero or more
/// `(relationship, node)` continuations chained off it.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternChain {
    pub start: NodePattern,
    pub segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub relationship: Relationship,
    pub node: NodePattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub name: String,
    pub kind: Option<String>,
    pub properties: Vec<(String, Value)>,
    pub json_template: Option<serde_json::Value>,
    pub anonymous: bool,
    pub span: Span,
}

impl NodePattern {
    pub fn is_kindless(&self) -> bool {
        self.kind.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Both,
    /// No arrow glyph carried meaning for this occurrence — used for the
    /// implicit edge inside a `SubMatch` pattern, where the grammar never
    /// requires the user to write one.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub variable: Option<String>,
    pub kind: Option<String>,
    pub direction: Direction,
    pub properties: Vec<(String, Value)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    KeyValue(KeyValueFilter),
    SubMatch(SubMatchFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueFilter {
    pub path: JsonPath,
    pub operator: Operator,
    pub value: Value,
    pub negated: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubMatchFilter {
    pub negated: bool,
    pub chains: Vec<PatternChain>,
    pub reference_name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Contains,
    RegexMatch,
}

/// A JSON path rooted at a MATCH/RETURN/SET/ORDER BY variable, e.g.
/// `d.metadata.labels.app\.kubernetes\.io/name` or `p.spec.containers[*].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    pub variable: String,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// A field name. Escaped dots (`\.`) inside a segment are stored
    /// unescaped (literal `.`) — only an *unquoted* dot splits segments.
    Key(String),
    Index(i64),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Null,
    Json(serde_json::Value),
    Temporal(TemporalExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemporalExpr {
    DateTime(Option<String>),
    Duration(Option<String>),
    BinOp {
        op: TemporalOp,
        left: Box<TemporalExpr>,
        right: Box<TemporalExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub assignments: Vec<SetAssignment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetAssignment {
    pub path: JsonPath,
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub variables: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Count,
    Sum,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnTarget {
    Path(JsonPath),
    Aggregate { agg: AggKind, path: JsonPath },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub target: ReturnTarget,
    pub alias: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByItem {
    pub path: JsonPath,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<OrderByItem>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub span: Span,
}
