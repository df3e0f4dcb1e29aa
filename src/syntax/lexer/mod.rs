use crate::diagnostic::Diagnostic;
use crate::syntax::lexeme::{Lexeme, TemplatePart};
use crate::syntax::span::{Span, Spanned};

/// A source comment preserved for the formatter.
#[derive(Clone, Debug)]
pub struct Comment {
    pub text: String, // includes the "//" or "/*" prefix
    pub span: Span,
    pub trailing: bool, // true if a token appeared earlier on the same line
}

pub struct Lexer<'src> {
    source: &'src [u8],
    file_id: u16,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    comments: Vec<Comment>,
    /// Whether we've seen a non-whitespace token on the current line.
    token_on_line: bool,
    /// One entry per open `${` splice: braces opened inside it so far.
    template_braces: Vec<u32>,
    last: Option<Lexeme>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file_id: u16) -> Self {
        Self {
            source: source.as_bytes(),
            file_id,
            pos: 0,
            diagnostics: Vec::new(),
            comments: Vec::new(),
            token_on_line: false,
            template_braces: Vec::new(),
            last: None,
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Comment>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            self.last = Some(tok.node.clone());
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        if !self.template_braces.is_empty() {
            let at = self.source.len() as u32;
            self.diagnostics.push(Diagnostic::error(
                "unterminated template literal: missing '}' after '${'".to_string(),
                Span::new(self.file_id, at, at),
            ));
        }
        (tokens, self.comments, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            self.token_on_line = true;

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit()
                || (ch == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                return self.scan_number();
            }

            if ch == b'"' || ch == b'\'' {
                return self.scan_string(ch);
            }

            if ch == b'`' {
                self.pos += 1;
                return self.scan_template(start, true);
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                if self.source[self.pos] == b'\n' {
                    self.token_on_line = false;
                }
                self.pos += 1;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'/') {
                let start = self.pos;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                self.push_comment(start);
                continue;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos >= self.source.len() {
                        self.diagnostics.push(Diagnostic::error(
                            "unterminated block comment".to_string(),
                            Span::new(self.file_id, start as u32, self.pos as u32),
                        ));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                        self.pos += 2;
                        break;
                    }
                    if self.source[self.pos] == b'\n' {
                        self.token_on_line = false;
                    }
                    self.pos += 1;
                }
                self.push_comment(start);
                continue;
            }

            break;
        }
    }

    fn push_comment(&mut self, start: usize) {
        let text = self.text(start, self.pos);
        self.comments.push(Comment {
            text,
            span: Span::new(self.file_id, start as u32, self.pos as u32),
            trailing: self.token_on_line,
        });
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = self.text(start, self.pos);
        let token = Lexeme::from_keyword(&text).unwrap_or(Lexeme::Ident(text));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => 16,
            (Some(b'0'), Some(b'o' | b'O')) => 8,
            (Some(b'0'), Some(b'b' | b'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.pos += 2;
            let digits_start = self.pos;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_hexdigit() || c == b'_')
            {
                self.pos += 1;
            }
            let digits: String = self
                .text(digits_start, self.pos)
                .chars()
                .filter(|c| *c != '_')
                .collect();
            let value = match u64::from_str_radix(&digits, radix) {
                Ok(n) => n as f64,
                Err(_) => {
                    self.error_span(
                        format!("invalid base-{} literal", radix),
                        start,
                        self.pos,
                    );
                    0.0
                }
            };
            return self.make_token(Lexeme::Number(value), start, self.pos);
        }

        self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.eat_digits();
            } else {
                self.pos = save;
            }
        }

        let text: String = self
            .text(start, self.pos)
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if self.peek().is_some_and(is_ident_start) {
            self.error_span(
                "identifier starts immediately after numeric literal".to_string(),
                start,
                self.pos + 1,
            );
        }
        match text.parse::<f64>() {
            Ok(n) => self.make_token(Lexeme::Number(n), start, self.pos),
            Err(_) => {
                self.error_span(format!("invalid number literal '{}'", text), start, self.pos);
                self.make_token(Lexeme::Number(0.0), start, self.pos)
            }
        }
    }

    fn eat_digits(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == b'_')
        {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self, quote: u8) -> Spanned<Lexeme> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                self.error_span("unterminated string literal".to_string(), start, self.pos);
                break;
            };
            if ch == quote {
                self.pos += 1;
                break;
            }
            if ch == b'\n' {
                self.error_span("unterminated string literal".to_string(), start, self.pos);
                break;
            }
            if ch == b'\\' {
                self.scan_escape(&mut value);
                continue;
            }
            self.push_char(&mut value);
        }
        self.make_token(Lexeme::Str(value), start, self.pos)
    }

    /// Scan template text up to the next `${` or closing backtick. `self.pos`
    /// is just past the opening backtick or the `}` closing a splice.
    fn scan_template(&mut self, start: usize, opened: bool) -> Spanned<Lexeme> {
        let mut cooked = String::new();
        let raw_start = self.pos;
        let part;
        loop {
            let Some(ch) = self.peek() else {
                self.error_span("unterminated template literal".to_string(), start, self.pos);
                part = if opened {
                    TemplatePart::Full
                } else {
                    TemplatePart::Tail
                };
                break;
            };
            if ch == b'`' {
                let raw = self.text(raw_start, self.pos);
                self.pos += 1;
                let part = if opened {
                    TemplatePart::Full
                } else {
                    TemplatePart::Tail
                };
                return self.make_token(Lexeme::Template { cooked, raw, part }, start, self.pos);
            }
            if ch == b'$' && self.peek_at(1) == Some(b'{') {
                part = if opened {
                    TemplatePart::Head
                } else {
                    TemplatePart::Middle
                };
                break;
            }
            if ch == b'\\' {
                self.scan_escape(&mut cooked);
                continue;
            }
            if ch == b'\r' {
                // Template line terminators normalize to \n.
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                cooked.push('\n');
                continue;
            }
            self.push_char(&mut cooked);
        }
        let raw = self.text(raw_start, self.pos);
        if matches!(part, TemplatePart::Head | TemplatePart::Middle) {
            self.pos += 2;
            self.template_braces.push(0);
        }
        self.make_token(Lexeme::Template { cooked, raw, part }, start, self.pos)
    }

    fn scan_escape(&mut self, out: &mut String) {
        let start = self.pos;
        self.pos += 1;
        let Some(ch) = self.peek() else {
            self.error_span("unterminated escape sequence".to_string(), start, self.pos);
            return;
        };
        self.pos += 1;
        match ch {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'r' => out.push('\r'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'v' => out.push('\u{b}'),
            b'0' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            b'\n' => {}
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'x' => {
                let code = self.scan_hex_digits(2);
                self.push_code_point(code, start, out);
            }
            b'u' => {
                let code = if self.peek() == Some(b'{') {
                    self.pos += 1;
                    let digits_start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let digits = self.text(digits_start, self.pos);
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                    } else {
                        self.error_span("expected '}' in unicode escape".to_string(), start, self.pos);
                    }
                    u32::from_str_radix(&digits, 16).ok()
                } else {
                    self.scan_hex_digits(4)
                };
                self.push_code_point(code, start, out);
            }
            _ => {
                // Identity escape: `\'`, `\"`, `\\`, `` \` ``, `\$` and friends.
                self.pos -= 1;
                self.push_char(out);
            }
        }
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let digits_start = self.pos;
        for _ in 0..count {
            if self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            } else {
                return None;
            }
        }
        u32::from_str_radix(&self.text(digits_start, self.pos), 16).ok()
    }

    fn push_code_point(&mut self, code: Option<u32>, start: usize, out: &mut String) {
        match code.and_then(char::from_u32) {
            Some(c) => out.push(c),
            None => {
                self.error_span("invalid escape sequence".to_string(), start, self.pos);
            }
        }
    }

    /// Copy one UTF-8 encoded character from the source into `out`.
    fn push_char(&mut self, out: &mut String) {
        let rest = &self.source[self.pos..];
        let len = utf8_len(rest[0]).min(rest.len());
        out.push_str(&String::from_utf8_lossy(&rest[..len]));
        self.pos += len;
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => {
                if let Some(depth) = self.template_braces.last_mut() {
                    *depth += 1;
                }
                Lexeme::LBrace
            }
            b'}' => match self.template_braces.last().copied() {
                Some(0) => {
                    self.template_braces.pop();
                    return Some(self.scan_template(start, false));
                }
                Some(depth) => {
                    if let Some(top) = self.template_braces.last_mut() {
                        *top = depth - 1;
                    }
                    Lexeme::RBrace
                }
                None => Lexeme::RBrace,
            },
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b';' => Lexeme::Semicolon,
            b',' => Lexeme::Comma,
            b':' => Lexeme::Colon,
            b'~' => Lexeme::Tilde,
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                    self.pos += 2;
                    Lexeme::Ellipsis
                } else {
                    Lexeme::Dot
                }
            }
            b'?' => {
                if self.peek() == Some(b'.') && !self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                {
                    self.pos += 1;
                    Lexeme::QuestionDot
                } else if self.peek() == Some(b'?') {
                    self.pos += 1;
                    self.assign_or(Lexeme::QuestionQuestion)
                } else {
                    Lexeme::Question
                }
            }
            b'=' => {
                if self.eat_byte(b'>') {
                    Lexeme::Arrow
                } else if self.eat_byte(b'=') {
                    if self.eat_byte(b'=') {
                        Lexeme::EqEqEq
                    } else {
                        Lexeme::EqEq
                    }
                } else {
                    Lexeme::Eq
                }
            }
            b'!' => {
                if self.eat_byte(b'=') {
                    if self.eat_byte(b'=') {
                        Lexeme::BangEqEq
                    } else {
                        Lexeme::BangEq
                    }
                } else {
                    Lexeme::Bang
                }
            }
            b'<' => {
                if self.eat_byte(b'<') {
                    self.assign_or(Lexeme::Shl)
                } else if self.eat_byte(b'=') {
                    Lexeme::LtEq
                } else {
                    Lexeme::Lt
                }
            }
            b'>' => {
                if self.eat_byte(b'>') {
                    if self.eat_byte(b'>') {
                        self.assign_or(Lexeme::UShr)
                    } else {
                        self.assign_or(Lexeme::Shr)
                    }
                } else if self.eat_byte(b'=') {
                    Lexeme::GtEq
                } else {
                    Lexeme::Gt
                }
            }
            b'+' => {
                if self.eat_byte(b'+') {
                    Lexeme::PlusPlus
                } else {
                    self.assign_or(Lexeme::Plus)
                }
            }
            b'-' => {
                if self.eat_byte(b'-') {
                    Lexeme::MinusMinus
                } else {
                    self.assign_or(Lexeme::Minus)
                }
            }
            b'*' => {
                if self.eat_byte(b'*') {
                    self.assign_or(Lexeme::StarStar)
                } else {
                    self.assign_or(Lexeme::Star)
                }
            }
            b'/' => {
                if !self.last.as_ref().is_some_and(Lexeme::ends_operand) {
                    self.error_span(
                        "regular expression literals are not supported".to_string(),
                        start,
                        self.pos,
                    );
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                    return None;
                }
                self.assign_or(Lexeme::Slash)
            }
            b'%' => self.assign_or(Lexeme::Percent),
            b'&' => {
                if self.eat_byte(b'&') {
                    self.assign_or(Lexeme::AmpAmp)
                } else {
                    self.assign_or(Lexeme::Amp)
                }
            }
            b'|' => {
                if self.eat_byte(b'|') {
                    self.assign_or(Lexeme::PipePipe)
                } else {
                    self.assign_or(Lexeme::Pipe)
                }
            }
            b'^' => self.assign_or(Lexeme::Caret),
            _ => {
                self.pos = start + utf8_len(ch).min(self.source.len() - start);
                let text = self.text(start, self.pos);
                self.diagnostics.push(
                    Diagnostic::error(
                        format!("unexpected character '{}'", text),
                        Span::new(self.file_id, start as u32, self.pos as u32),
                    )
                    .with_help(
                        "this character is not part of the accepted JavaScript subset".to_string(),
                    ),
                );
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    /// Turn `op` into `op=` when followed by `=`.
    fn assign_or(&mut self, op: Lexeme) -> Lexeme {
        if self.eat_byte(b'=') {
            Lexeme::AssignOp(Box::new(op))
        } else {
            op
        }
    }

    fn eat_byte(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    fn error_span(&mut self, message: String, start: usize, end: usize) {
        self.diagnostics.push(Diagnostic::error(
            message,
            Span::new(self.file_id, start as u32, end as u32),
        ));
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(self.file_id, start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$' || ch >= 0x80
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xff => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests;
