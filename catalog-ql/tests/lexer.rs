use catalog_ql::lexer::{LexMode, Lexer};
use catalog_ql::token::TokenKind;

fn tokens(src: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lexer.next_token().unwrap();
        if tok.kind == TokenKind::Eof {
            break;
        }
        out.push(tok.kind);
    }
    out
}

#[test]
fn lexes_keywords_case_insensitively() {
    let toks = tokens("match (d:Deployment) return d");
    assert_eq!(
        toks,
        vec![
            TokenKind::Match,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::Colon,
            TokenKind::Ident,
            TokenKind::RParen,
            TokenKind::Return,
            TokenKind::Ident,
        ]
    );
}

#[test]
fn lexes_relationship_arrows() {
    assert_eq!(tokens("->"), vec![TokenKind::ArrowRight]);
    assert_eq!(tokens("<-"), vec![TokenKind::ArrowLeft]);
    assert_eq!(tokens("--"), vec![TokenKind::ArrowBoth]);
    assert_eq!(
        tokens("-[r:OWNS]->"),
        vec![
            TokenKind::ArrowOpenRight,
            TokenKind::Ident,
            TokenKind::Colon,
            TokenKind::Ident,
            TokenKind::ArrowCloseRight,
        ]
    );
    assert_eq!(
        tokens("<-[r:OWNS]-"),
        vec![
            TokenKind::ArrowOpenLeft,
            TokenKind::Ident,
            TokenKind::Colon,
            TokenKind::Ident,
            TokenKind::ArrowCloseUndir,
        ]
    );
}

#[test]
fn lexes_operators() {
    assert_eq!(
        tokens("= != < > <= >= =~"),
        vec![
            TokenKind::Eq,
            TokenKind::Neq,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::RegexEq,
        ]
    );
}

#[test]
fn skips_line_comments() {
    let toks = tokens("MATCH (d) // trailing comment\nRETURN d");
    assert_eq!(
        toks,
        vec![
            TokenKind::Match,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::RParen,
            TokenKind::Return,
            TokenKind::Ident,
        ]
    );
}

#[test]
fn property_path_mode_splits_unescaped_dots() {
    let mut lexer = Lexer::new("d.metadata.name");
    let var = lexer.next_token().unwrap();
    assert_eq!(var.kind, TokenKind::Ident);
    assert_eq!(var.literal, "d");

    lexer.set_mode(LexMode::Normal);
    let dot = lexer.next_token().unwrap();
    assert_eq!(dot.kind, TokenKind::Dot);

    lexer.set_mode(LexMode::PropertyPath);
    let seg = lexer.next_token().unwrap();
    assert_eq!(seg.kind, TokenKind::Ident);
    assert_eq!(seg.literal, "metadata");
}

#[test]
fn property_path_mode_preserves_escaped_dots() {
    let mut lexer = Lexer::new("app\\.kubernetes\\.io/name");
    lexer.set_mode(LexMode::PropertyPath);
    let tok = lexer.next_token().unwrap();
    assert_eq!(tok.kind, TokenKind::Ident);
    assert_eq!(tok.literal, "app.kubernetes.io/name");
}

#[test]
fn kind_mode_keeps_dots_in_one_token() {
    let mut lexer = Lexer::new("apps.example.com/v1");
    lexer.set_mode(LexMode::Kind);
    let tok = lexer.next_token().unwrap();
    assert_eq!(tok.kind, TokenKind::Ident);
    assert_eq!(tok.literal, "apps.example.com/v1");
}

#[test]
fn captures_json_block_verbatim() {
    let mut lexer = Lexer::new(r#"{"metadata":{"name":"nginx"}} RETURN"#);
    let tok = lexer.capture_json_block().unwrap();
    assert_eq!(tok.kind, TokenKind::JsonData);
    assert_eq!(tok.literal, r#"{"metadata":{"name":"nginx"}}"#);
}

#[test]
fn illegal_character_reported() {
    let mut lexer = Lexer::new("MATCH (d) WHERE d.x & 1");
    let mut last = None;
    loop {
        match lexer.next_token() {
            Ok(t) if t.kind == TokenKind::Eof => break,
            Ok(_) => continue,
            Err(e) => {
                last = Some(e);
                break;
            }
        }
    }
    assert!(last.is_some());
}
