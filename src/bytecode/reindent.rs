//! Re-derives indentation depth from a decoded token stream.
//!
//! The wire format never stores literal whitespace, only structural
//! `Indent`/`Dedent`/`Newline` tokens (spec §4.E) — mirroring how the engine's
//! own lexer folds leading whitespace into those same three token kinds
//! before discarding the source text entirely. [`printer`](super::printer)
//! needs the depth back to lay out readable source, so this module replays
//! the indent stack the original lexer built while tokenizing.

use super::token::{Opcode, Token, TokenKind};

/// One entry per token in the input, giving the indent depth (`Indent`
/// tokens in effect) at that point in the stream.
pub fn indent_levels(tokens: &[Token]) -> Vec<usize> {
    let mut depth = 0usize;
    let mut levels = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let TokenKind::Op(Opcode::Dedent) = token.kind {
            depth = depth.saturating_sub(1);
        }
        levels.push(depth);
        if let TokenKind::Op(Opcode::Indent) = token.kind {
            depth += 1;
        }
    }
    levels
}

/// Reconstructs the structural `Indent`/`Dedent` tokens the wire format
/// never carries (spec §4.E), by comparing each new statement's leading
/// column against an indent-column stack — the same bookkeeping the
/// engine's own lexer does while tokenizing, replayed here from the
/// `line`/`column` the decoder already resolved per token.
///
/// A line is only a candidate for re-indenting when bracket nesting is back
/// to zero: a `Newline` inside `(...)`/`[...]`/`{...}` is a continuation,
/// not a statement boundary.
pub fn synthesize_indentation(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut indent_stack: Vec<u32> = vec![0];
    let mut bracket_depth = 0i32;
    let mut at_line_start = true;

    for token in tokens {
        let is_newline = matches!(token.kind, TokenKind::Op(Opcode::Newline));

        if at_line_start && bracket_depth == 0 && !is_newline {
            let column = token.column;
            let top = *indent_stack.last().unwrap();
            if column > top {
                indent_stack.push(column);
                out.push(Token { kind: TokenKind::Op(Opcode::Indent), line: token.line, column });
            } else {
                while indent_stack.len() > 1 && column < *indent_stack.last().unwrap() {
                    indent_stack.pop();
                    out.push(Token { kind: TokenKind::Op(Opcode::Dedent), line: token.line, column });
                }
            }
        }

        match token.kind {
            TokenKind::Op(Opcode::ParenOpen | Opcode::BracketOpen | Opcode::BraceOpen) => bracket_depth += 1,
            TokenKind::Op(Opcode::ParenClose | Opcode::BracketClose | Opcode::BraceClose) => bracket_depth = (bracket_depth - 1).max(0),
            _ => {}
        }

        at_line_start = is_newline && bracket_depth == 0;
        out.push(token);
    }

    while indent_stack.len() > 1 {
        indent_stack.pop();
        let (line, column) = out.last().map(|t| (t.line, t.column)).unwrap_or((0, 0));
        out.push(Token { kind: TokenKind::Op(Opcode::Dedent), line, column });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(opcode: Opcode) -> Token {
        Token { kind: TokenKind::Op(opcode), line: 0, column: 0 }
    }

    #[test]
    fn indent_and_dedent_track_a_single_nested_block() {
        let tokens = vec![
            op(Opcode::Func),
            op(Opcode::Newline),
            op(Opcode::Indent),
            op(Opcode::If),
            op(Opcode::Newline),
            op(Opcode::Indent),
            op(Opcode::Pass),
            op(Opcode::Newline),
            op(Opcode::Dedent),
            op(Opcode::Dedent),
            op(Opcode::Eof),
        ];
        let levels = indent_levels(&tokens);
        assert_eq!(levels, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 1, 0]);
    }

    fn at(kind: TokenKind, line: u32, column: u32) -> Token {
        Token { kind, line, column }
    }

    #[test]
    fn a_deeper_column_synthesizes_an_indent_and_a_shallower_one_synthesizes_a_dedent() {
        let tokens = vec![
            at(TokenKind::Op(Opcode::Func), 1, 0),
            at(TokenKind::Op(Opcode::Colon), 1, 8),
            at(TokenKind::Op(Opcode::Newline), 1, 9),
            at(TokenKind::Op(Opcode::Return), 2, 4),
            at(TokenKind::Op(Opcode::Newline), 2, 10),
            at(TokenKind::Op(Opcode::Eof), 3, 0),
        ];
        let synthesized = synthesize_indentation(tokens);
        let kinds: Vec<&TokenKind> = synthesized.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Op(Opcode::Func),
                &TokenKind::Op(Opcode::Colon),
                &TokenKind::Op(Opcode::Newline),
                &TokenKind::Op(Opcode::Indent),
                &TokenKind::Op(Opcode::Return),
                &TokenKind::Op(Opcode::Newline),
                &TokenKind::Op(Opcode::Dedent),
                &TokenKind::Op(Opcode::Eof),
            ]
        );
    }

    #[test]
    fn a_newline_inside_brackets_does_not_trigger_reindenting() {
        let tokens = vec![
            at(TokenKind::Op(Opcode::BracketOpen), 1, 0),
            at(TokenKind::Op(Opcode::Newline), 1, 1),
            Token { kind: TokenKind::Constant(crate::variant::Variant::Int(1)), line: 2, column: 4 },
            at(TokenKind::Op(Opcode::BracketClose), 3, 0),
        ];
        let synthesized = synthesize_indentation(tokens);
        assert!(!synthesized.iter().any(|t| matches!(t.kind, TokenKind::Op(Opcode::Indent) | TokenKind::Op(Opcode::Dedent))));
    }
}
