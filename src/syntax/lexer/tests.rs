use super::*;

fn lex(source: &str) -> Vec<Lexeme> {
    let (tokens, _comments, diags) = Lexer::new(source, 0).tokenize();
    assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
    tokens.into_iter().map(|t| t.node).collect()
}

fn lex_errors(source: &str) -> Vec<Diagnostic> {
    let (_tokens, _comments, diags) = Lexer::new(source, 0).tokenize();
    diags
}

fn ident(name: &str) -> Lexeme {
    Lexeme::Ident(name.to_string())
}

#[test]
fn test_keywords_and_identifiers() {
    let tokens = lex("function let const return if else foo $bar _baz");
    assert_eq!(
        tokens,
        vec![
            Lexeme::Function,
            Lexeme::Let,
            Lexeme::Const,
            Lexeme::Return,
            Lexeme::If,
            Lexeme::Else,
            ident("foo"),
            ident("$bar"),
            ident("_baz"),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_numbers() {
    let tokens = lex("0 42 3.5 .25 1e3 0x1F 0b101 1_000");
    assert_eq!(
        tokens,
        vec![
            Lexeme::Number(0.0),
            Lexeme::Number(42.0),
            Lexeme::Number(3.5),
            Lexeme::Number(0.25),
            Lexeme::Number(1000.0),
            Lexeme::Number(31.0),
            Lexeme::Number(5.0),
            Lexeme::Number(1000.0),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_string_escapes() {
    let tokens = lex(r#"'a\'b' "c\nd" "A\x42""#);
    assert_eq!(
        tokens,
        vec![
            Lexeme::Str("a'b".to_string()),
            Lexeme::Str("c\nd".to_string()),
            Lexeme::Str("AB".to_string()),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_operators_longest_match() {
    let tokens = lex("=== !== ?. ?? ??= ... => ** **= >>> >>>= ++ && ||=");
    assert_eq!(
        tokens,
        vec![
            Lexeme::EqEqEq,
            Lexeme::BangEqEq,
            Lexeme::QuestionDot,
            Lexeme::QuestionQuestion,
            Lexeme::AssignOp(Box::new(Lexeme::QuestionQuestion)),
            Lexeme::Ellipsis,
            Lexeme::Arrow,
            Lexeme::StarStar,
            Lexeme::AssignOp(Box::new(Lexeme::StarStar)),
            Lexeme::UShr,
            Lexeme::AssignOp(Box::new(Lexeme::UShr)),
            Lexeme::PlusPlus,
            Lexeme::AmpAmp,
            Lexeme::AssignOp(Box::new(Lexeme::PipePipe)),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_conditional_before_decimal_is_not_optional_chain() {
    let tokens = lex("a?.5:1");
    assert_eq!(tokens[1], Lexeme::Question);
    assert_eq!(tokens[2], Lexeme::Number(0.5));
}

#[test]
fn test_template_without_splices() {
    let tokens = lex("`hello\\nworld`");
    assert_eq!(
        tokens[0],
        Lexeme::Template {
            cooked: "hello\nworld".to_string(),
            raw: "hello\\nworld".to_string(),
            part: TemplatePart::Full,
        }
    );
}

#[test]
fn test_template_with_nested_braces_in_splice() {
    let tokens = lex("`a${ {x: 1}.x }b${c}d`");
    let parts: Vec<TemplatePart> = tokens
        .iter()
        .filter_map(|t| match t {
            Lexeme::Template { part, .. } => Some(*part),
            _ => None,
        })
        .collect();
    assert_eq!(
        parts,
        vec![TemplatePart::Head, TemplatePart::Middle, TemplatePart::Tail]
    );
    assert!(tokens.contains(&Lexeme::LBrace));
    assert!(tokens.contains(&Lexeme::RBrace));
    assert!(tokens.contains(&ident("c")));
}

#[test]
fn test_nested_templates() {
    let tokens = lex("`x${`y${z}`}w`");
    let count = tokens
        .iter()
        .filter(|t| matches!(t, Lexeme::Template { .. }))
        .count();
    assert_eq!(count, 4);
    assert_eq!(tokens.last(), Some(&Lexeme::Eof));
}

#[test]
fn test_comments_collected() {
    let (tokens, comments, diags) = Lexer::new("a // one\n/* two */ b", 0).tokenize();
    assert!(diags.is_empty());
    assert_eq!(tokens.len(), 3);
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].text, "// one");
    assert!(comments[0].trailing);
    assert_eq!(comments[1].text, "/* two */");
    assert!(!comments[1].trailing);
}

#[test]
fn test_spans() {
    let (tokens, _, _) = Lexer::new("let xy = 1;", 0).tokenize();
    assert_eq!(tokens[1].span.start, 4);
    assert_eq!(tokens[1].span.end, 6);
}

#[test]
fn test_division_after_operand() {
    let tokens = lex("a / b");
    assert_eq!(tokens[1], Lexeme::Slash);
}

#[test]
fn test_regex_literal_rejected() {
    let errors = lex_errors("x = /ab+/;");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("regular expression"));
}

#[test]
fn test_unterminated_string() {
    let errors = lex_errors("'abc");
    assert!(errors[0].message.contains("unterminated string"));
}

#[test]
fn test_unexpected_character() {
    let errors = lex_errors("a # b");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("unexpected character"));
}
