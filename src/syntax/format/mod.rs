mod expr;
mod items;
mod stmts;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::syntax::lexer::Comment;

pub(crate) use expr::format_expr;

const INDENT: &str = "  ";

/// Format a parsed program back to source, keeping top-level comments.
pub fn format_program(program: &Program, comments: &[Comment]) -> String {
    let mut ctx = FormatCtx::new(comments);
    ctx.emit_program(program);
    ctx.emit_remaining_comments();
    let mut out = ctx.output;
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Format one function as a declaration.
pub fn format_function(function: &Function) -> String {
    let mut out = expr::format_function_decl(function, 0);
    out.push('\n');
    out
}

pub(super) fn indent_str(level: usize) -> String {
    INDENT.repeat(level)
}

pub(super) struct FormatCtx {
    pub(super) output: String,
    pub(super) comments: Vec<CommentEntry>,
}

#[derive(Clone)]
pub(super) struct CommentEntry {
    pub(super) text: String,
    pub(super) byte_offset: u32,
    pub(super) used: bool,
}

impl FormatCtx {
    fn new(comments: &[Comment]) -> Self {
        let entries = comments
            .iter()
            .map(|c| CommentEntry {
                text: c.text.clone(),
                byte_offset: c.span.start,
                used: false,
            })
            .collect();
        Self {
            output: String::new(),
            comments: entries,
        }
    }

    /// Emit comments that appear before `span_start`. Comments inside
    /// function bodies are attached to the enclosing item and emitted
    /// ahead of it.
    pub(super) fn emit_leading_comments(&mut self, span_start: u32) {
        for entry in self.comments.iter_mut() {
            if entry.used || entry.byte_offset >= span_start {
                continue;
            }
            entry.used = true;
            self.output.push_str(&entry.text);
            self.output.push('\n');
        }
    }

    fn emit_remaining_comments(&mut self) {
        let mut first = true;
        for entry in self.comments.iter_mut() {
            if entry.used {
                continue;
            }
            if first && !self.output.is_empty() {
                self.output.push('\n');
            }
            first = false;
            entry.used = true;
            self.output.push_str(&entry.text);
            self.output.push('\n');
        }
    }
}

/// JavaScript `Number.prototype.toString()` for a finite or special value.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // Shortest round-trip digits and decimal exponent from `{:e}`.
    let sci = format!("{:e}", n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let k = digits.len() as i32;
    let point = exp + 1;

    if k <= point && point <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((point - k) as usize));
        out
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let e = (point - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, e)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, e)
        }
    }
}

/// Double-quoted string literal with escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
