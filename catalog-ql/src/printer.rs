//! Renders an AST back to DSL source text.
//!
//! Used by the round-trip property (parse → print → parse yields an equal
//! AST modulo anonymous-name renumbering) and, in `catalog-core`, by the
//! kindless rewriter, which builds its per-kind union query by printing
//! specialized clause fragments and re-parsing the concatenation.

use crate::ast::*;

pub fn print_query(q: &Query) -> String {
    let mut out = String::new();
    if !q.contexts.is_empty() {
        out.push_str("IN ");
        out.push_str(&q.contexts.join(", "));
        out.push(' ');
    }
    let parts: Vec<String> = q.clauses.iter().map(print_clause).collect();
    out.push_str(&parts.join(" "));
    out
}

pub fn print_clause(c: &Clause) -> String {
    match c {
        Clause::Match(m) => print_match(m),
        Clause::Create(c) => print_create(c),
        Clause::Set(s) => print_set(s),
        Clause::Delete(d) => print_delete(d),
        Clause::Return(r) => print_return(r),
    }
}

pub fn print_match(m: &MatchClause) -> String {
    let mut out = String::from("MATCH ");
    out.push_str(&print_chains(&m.chains));
    if !m.filters.is_empty() {
        out.push_str(" WHERE ");
        let parts: Vec<String> = m.filters.iter().map(print_filter).collect();
        out.push_str(&parts.join(", "));
    }
    out
}

pub fn print_create(c: &CreateClause) -> String {
    let mut out = String::from("CREATE ");
    out.push_str(&print_chains(&c.chains));
    out
}

fn print_chains(chains: &[PatternChain]) -> String {
    chains
        .iter()
        .map(print_chain)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_chain(chain: &PatternChain) -> String {
    let mut out = print_node(&chain.start, false);
    for seg in &chain.segments {
        out.push_str(&print_relationship(&seg.relationship));
        out.push_str(&print_node(&seg.node, false));
    }
    out
}

fn print_node(n: &NodePattern, _in_sub_match: bool) -> String {
    let mut out = String::from("(");
    if !n.anonymous {
        out.push_str(&n.name);
    }
    if let Some(kind) = &n.kind {
        out.push(':');
        out.push_str(kind);
        if let Some(json) = &n.json_template {
            out.push_str(&json.to_string());
        } else if !n.properties.is_empty() {
            out.push_str(" {");
            let parts: Vec<String> = n
                .properties
                .iter()
                .map(|(k, v)| format!("{}: {}", k, print_value(v)))
                .collect();
            out.push_str(&parts.join(", "));
            out.push('}');
        }
    }
    out.push(')');
    out
}

fn print_relationship(r: &Relationship) -> String {
    let has_label = r.variable.is_some() || r.kind.is_some() || !r.properties.is_empty();
    if !has_label {
        return match r.direction {
            Direction::Right => "->".to_string(),
            Direction::Left => "<-".to_string(),
            Direction::Both | Direction::None => "--".to_string(),
        };
    }

    let mut body = String::new();
    if let Some(var) = &r.variable {
        body.push_str(var);
    }
    if let Some(kind) = &r.kind {
        body.push(':');
        body.push_str(kind);
    }
    if !r.properties.is_empty() {
        body.push_str(" {");
        let parts: Vec<String> = r
            .properties
            .iter()
            .map(|(k, v)| format!("{}: {}", k, print_value(v)))
            .collect();
        body.push_str(&parts.join(", "));
        body.push('}');
    }

    match r.direction {
        Direction::Right => format!("-[{}]->", body),
        Direction::Left => format!("<-[{}]-", body),
        Direction::Both | Direction::None => format!("-[{}]-", body),
    }
}

fn print_filter(f: &Filter) -> String {
    match f {
        Filter::KeyValue(kv) => {
            let mut out = String::new();
            if kv.negated {
                out.push_str("NOT ");
            }
            out.push_str(&print_json_path(&kv.path));
            out.push(' ');
            out.push_str(print_operator(kv.operator));
            out.push(' ');
            out.push_str(&print_value(&kv.value));
            out
        }
        Filter::SubMatch(sm) => {
            let mut out = String::new();
            if sm.negated {
                out.push_str("NOT ");
            }
            out.push_str(&print_chains(&sm.chains));
            out
        }
    }
}

fn print_operator(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Neq => "!=",
        Operator::Lt => "<",
        Operator::Gt => ">",
        Operator::Lte => "<=",
        Operator::Gte => ">=",
        Operator::Contains => "CONTAINS",
        Operator::RegexMatch => "=~",
    }
}

pub fn print_json_path(p: &JsonPath) -> String {
    let mut out = p.variable.clone();
    for step in &p.steps {
        match step {
            PathStep::Key(k) => {
                out.push('.');
                out.push_str(&k.replace('.', "\\."));
            }
            PathStep::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
            PathStep::Wildcard => out.push_str("[*]"),
        }
    }
    out
}

pub fn print_value(v: &Value) -> String {
    match v {
        Value::String(s) => format!("{:?}", s),
        Value::Number(n) => n.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Json(j) => j.to_string(),
        Value::Temporal(t) => print_temporal(t),
    }
}

fn print_temporal(t: &TemporalExpr) -> String {
    match t {
        TemporalExpr::DateTime(arg) => match arg {
            Some(s) => format!("datetime({:?})", s),
            None => "datetime()".to_string(),
        },
        TemporalExpr::Duration(arg) => match arg {
            Some(s) => format!("duration({:?})", s),
            None => "duration()".to_string(),
        },
        TemporalExpr::BinOp { op, left, right } => {
            let op_str = match op {
                TemporalOp::Add => "+",
                TemporalOp::Sub => "-",
            };
            format!("{} {} {}", print_temporal(left), op_str, print_temporal(right))
        }
    }
}

fn print_set(s: &SetClause) -> String {
    let mut out = String::from("SET ");
    let parts: Vec<String> = s
        .assignments
        .iter()
        .map(|a| format!("{} = {}", print_json_path(&a.path), print_value(&a.value)))
        .collect();
    out.push_str(&parts.join(", "));
    out
}

fn print_delete(d: &DeleteClause) -> String {
    format!("DELETE {}", d.variables.join(", "))
}

fn print_return(r: &ReturnClause) -> String {
    let mut out = String::from("RETURN ");
    let parts: Vec<String> = r.items.iter().map(print_return_item).collect();
    out.push_str(&parts.join(", "));
    if !r.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        let parts: Vec<String> = r
            .order_by
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {}", print_json_path(&o.path), dir)
            })
            .collect();
        out.push_str(&parts.join(", "));
    }
    if let Some(skip) = r.skip {
        out.push_str(&format!(" SKIP {}", skip));
    }
    if let Some(limit) = r.limit {
        out.push_str(&format!(" LIMIT {}", limit));
    }
    out
}

fn print_return_item(item: &ReturnItem) -> String {
    let mut out = match &item.target {
        ReturnTarget::Path(p) => print_json_path(p),
        ReturnTarget::Aggregate { agg, path } => {
            let name = match agg {
                AggKind::Count => "COUNT",
                AggKind::Sum => "SUM",
            };
            format!("{} {{{}}}", name, print_json_path(path))
        }
    };
    if let Some(alias) = &item.alias {
        out.push_str(" AS ");
        out.push_str(alias);
    }
    out
}
