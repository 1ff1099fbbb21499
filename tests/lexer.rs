//! Integration coverage for the tokenizer over multi-line, realistic
//! snippets (unit tests in `src/lexer.rs` cover isolated token shapes).

use wrangle::lexer::{tokenize, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn pipeline_script_tokenizes_without_stray_newlines_across_pipes() {
    let src = "result = data\n|> filter($age > 18)\n|> select($name, $age)";
    let toks = kinds(src);
    assert_eq!(toks.iter().filter(|k| **k == TokenKind::Newline).count(), 0);
    assert!(toks.contains(&TokenKind::Pipe));
}

#[test]
fn unconditional_pipe_token_recognized() {
    assert_eq!(
        kinds("x ?|> f()"),
        vec![
            TokenKind::Ident("x".to_string()),
            TokenKind::PipeUnconditional,
            TokenKind::Ident("f".to_string()),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
}

#[test]
fn keywords_are_not_lexed_as_plain_identifiers() {
    assert_eq!(
        kinds("if true else false null NA in and or"),
        vec![
            TokenKind::If,
            TokenKind::True,
            TokenKind::Else,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::Na,
            TokenKind::In,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_string_is_a_parse_error() {
    assert!(tokenize("\"abc").is_err());
}

#[test]
fn multiple_statements_separated_by_newlines_preserve_boundaries() {
    let toks = kinds("x = 1\ny = 2\nz = 3");
    let newline_count = toks.iter().filter(|k| **k == TokenKind::Newline).count();
    assert_eq!(newline_count, 2);
}
