//! Turns a canonicalized token stream back into readable source text.
//!
//! This is a structural pretty-printer, not a byte-for-byte reconstruction:
//! the wire format never kept whitespace or comments, so the output is a
//! consistently-formatted rendering of the same token sequence rather than a
//! reproduction of whatever the original author typed.

use itertools::Itertools;

use crate::variant;

use super::reindent::indent_levels;
use super::revision::RevisionFeatures;
use super::token::{Opcode, Token, TokenKind};

const INDENT_UNIT: &str = "\t";

pub fn print_tokens(tokens: &[Token], _features: RevisionFeatures) -> String {
    let levels = indent_levels(tokens);
    let mut out = String::new();
    let mut at_line_start = true;

    // `None` marks a structural newline; `Some(text)` is a rendered token.
    // Indent/Dedent/Eof carry no text and are dropped here entirely.
    let items: Vec<(Option<String>, usize)> = tokens
        .iter()
        .zip(levels.iter())
        .filter_map(|(token, depth)| match &token.kind {
            TokenKind::Op(Opcode::Newline) => Some((None, *depth)),
            TokenKind::Op(Opcode::Indent | Opcode::Dedent | Opcode::Eof) => None,
            kind => Some((Some(render(kind)), *depth)),
        })
        .collect();

    // Pairing each item with the one that follows it lets the spacing
    // decision look ahead at what comes next rather than carry the previous
    // token's text as separate trailing state.
    for ((text, depth), (next_text, _)) in items.iter().cloned().tuple_windows() {
        write_item(&mut out, &mut at_line_start, text, depth, next_text.as_deref());
    }
    if let Some((text, depth)) = items.last().cloned() {
        write_item(&mut out, &mut at_line_start, text, depth, None);
    }

    out.trim_end_matches('\n').to_string()
}

fn write_item(out: &mut String, at_line_start: &mut bool, text: Option<String>, depth: usize, next_text: Option<&str>) {
    match text {
        None => {
            out.push('\n');
            *at_line_start = true;
        }
        Some(text) => {
            if *at_line_start {
                out.push_str(&INDENT_UNIT.repeat(depth));
            }
            out.push_str(&text);
            *at_line_start = false;
            if let Some(next_text) = next_text {
                if wants_space_between(&text, next_text) {
                    out.push(' ');
                }
            }
        }
    }
}

fn render(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Op(op) => opcode_text(*op).to_string(),
        TokenKind::Identifier(name) => name.clone(),
        TokenKind::Annotation(name) => format!("@{name}"),
        TokenKind::Constant(value) => variant::to_text(value),
        TokenKind::Error(message) => format!("<error: {message}>"),
    }
}

fn opcode_text(op: Opcode) -> &'static str {
    match op {
        Opcode::Comma => ",",
        Opcode::Colon => ":",
        Opcode::Period => ".",
        Opcode::Arrow => "->",
        Opcode::ParenOpen => "(",
        Opcode::ParenClose => ")",
        Opcode::BracketOpen => "[",
        Opcode::BracketClose => "]",
        Opcode::BraceOpen => "{",
        Opcode::BraceClose => "}",
        Opcode::Plus => "+",
        Opcode::Minus => "-",
        Opcode::Star => "*",
        Opcode::Slash => "/",
        Opcode::Percent => "%",
        Opcode::Equal => "=",
        Opcode::EqualEqual => "==",
        Opcode::NotEqual => "!=",
        Opcode::Less => "<",
        Opcode::LessEqual => "<=",
        Opcode::Greater => ">",
        Opcode::GreaterEqual => ">=",
        Opcode::And => "and",
        Opcode::Or => "or",
        Opcode::Not => "not",
        Opcode::If => "if",
        Opcode::Elif => "elif",
        Opcode::Else => "else",
        Opcode::For => "for",
        Opcode::While => "while",
        Opcode::Func => "func",
        Opcode::Var => "var",
        Opcode::Const => "const",
        Opcode::Return => "return",
        Opcode::Pass => "pass",
        Opcode::Break => "break",
        Opcode::Continue => "continue",
        Opcode::Class => "class",
        Opcode::Extends => "extends",
        Opcode::SelfKw => "self",
        Opcode::True => "true",
        Opcode::False => "false",
        Opcode::Null => "null",
        Opcode::Newline | Opcode::Indent | Opcode::Dedent | Opcode::Eof => "",
        Opcode::Identifier | Opcode::Annotation | Opcode::Constant | Opcode::ErrorTok => "",
    }
}

/// No space before a closing bracket, comma, colon, period or an opening
/// call parenthesis; no space after an opening bracket or a period.
fn wants_space_between(prev: &str, next: &str) -> bool {
    let no_space_before = matches!(next, ")" | "]" | "}" | "," | ":" | "." | "(");
    let no_space_after = matches!(prev, "(" | "[" | "{" | ".");
    !(no_space_before || no_space_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn op(opcode: Opcode) -> Token {
        Token { kind: TokenKind::Op(opcode), line: 0, column: 0 }
    }

    fn ident(name: &str) -> Token {
        Token { kind: TokenKind::Identifier(name.to_string()), line: 0, column: 0 }
    }

    #[test]
    fn prints_a_minimal_function() {
        let tokens = vec![
            op(Opcode::Func),
            ident("f"),
            op(Opcode::ParenOpen),
            op(Opcode::ParenClose),
            op(Opcode::Colon),
            op(Opcode::Newline),
            op(Opcode::Indent),
            op(Opcode::Return),
            Token { kind: TokenKind::Constant(Variant::Int(1)), line: 0, column: 0 },
            op(Opcode::Newline),
            op(Opcode::Dedent),
            op(Opcode::Eof),
        ];
        let features = RevisionFeatures { typed_variables: true, legacy_content_header: false };
        let printed = print_tokens(&tokens, features);
        assert_eq!(printed, "func f():\n\treturn 1");
    }

    #[test]
    fn call_arguments_are_comma_separated_without_leading_space() {
        let tokens = vec![
            ident("f"),
            op(Opcode::ParenOpen),
            Token { kind: TokenKind::Constant(Variant::Int(1)), line: 0, column: 0 },
            op(Opcode::Comma),
            Token { kind: TokenKind::Constant(Variant::Int(2)), line: 0, column: 0 },
            op(Opcode::ParenClose),
        ];
        let features = RevisionFeatures { typed_variables: true, legacy_content_header: false };
        assert_eq!(print_tokens(&tokens, features), "f(1, 2)");
    }
}
