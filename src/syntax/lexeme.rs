/// Position of a template chunk relative to its `${…}` splices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplatePart {
    /// `` `text` `` with no splices.
    Full,
    /// `` `text${ ``
    Head,
    /// `` }text${ ``
    Middle,
    /// `` }text` ``
    Tail,
}

/// All lexemes of the accepted JavaScript subset.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Throw,
    Try,
    Catch,
    Finally,
    New,
    Delete,
    Typeof,
    Void,
    In,
    Instanceof,
    True,
    False,
    Null,
    This,
    Class,
    With,
    Async,
    Await,
    Yield,
    Import,
    Export,
    Debugger,

    // Literals
    Ident(String),
    Number(f64),
    Str(String),
    Template {
        cooked: String,
        raw: String,
        part: TemplatePart,
    },

    // Punctuation
    LParen,        // (
    RParen,        // )
    LBrace,        // {
    RBrace,        // }
    LBracket,      // [
    RBracket,      // ]
    Semicolon,     // ;
    Comma,         // ,
    Dot,           // .
    Ellipsis,      // ...
    QuestionDot,   // ?.
    Question,      // ?
    Colon,         // :
    Arrow,         // =>
    Eq,            // =
    EqEq,          // ==
    EqEqEq,        // ===
    BangEq,        // !=
    BangEqEq,      // !==
    Lt,            // <
    LtEq,          // <=
    Gt,            // >
    GtEq,          // >=
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    Percent,       // %
    StarStar,      // **
    PlusPlus,      // ++
    MinusMinus,    // --
    Shl,           // <<
    Shr,           // >>
    UShr,          // >>>
    Amp,           // &
    Pipe,          // |
    Caret,         // ^
    Bang,          // !
    Tilde,         // ~
    AmpAmp,        // &&
    PipePipe,      // ||
    QuestionQuestion, // ??
    /// Compound assignment `op=`, carrying the operator lexeme.
    AssignOp(Box<Lexeme>),

    // Control
    Eof,
}

impl Lexeme {
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "var" => Some(Lexeme::Var),
            "let" => Some(Lexeme::Let),
            "const" => Some(Lexeme::Const),
            "function" => Some(Lexeme::Function),
            "return" => Some(Lexeme::Return),
            "if" => Some(Lexeme::If),
            "else" => Some(Lexeme::Else),
            "for" => Some(Lexeme::For),
            "while" => Some(Lexeme::While),
            "do" => Some(Lexeme::Do),
            "break" => Some(Lexeme::Break),
            "continue" => Some(Lexeme::Continue),
            "switch" => Some(Lexeme::Switch),
            "case" => Some(Lexeme::Case),
            "default" => Some(Lexeme::Default),
            "throw" => Some(Lexeme::Throw),
            "try" => Some(Lexeme::Try),
            "catch" => Some(Lexeme::Catch),
            "finally" => Some(Lexeme::Finally),
            "new" => Some(Lexeme::New),
            "delete" => Some(Lexeme::Delete),
            "typeof" => Some(Lexeme::Typeof),
            "void" => Some(Lexeme::Void),
            "in" => Some(Lexeme::In),
            "instanceof" => Some(Lexeme::Instanceof),
            "true" => Some(Lexeme::True),
            "false" => Some(Lexeme::False),
            "null" => Some(Lexeme::Null),
            "this" => Some(Lexeme::This),
            "class" => Some(Lexeme::Class),
            "with" => Some(Lexeme::With),
            "async" => Some(Lexeme::Async),
            "await" => Some(Lexeme::Await),
            "yield" => Some(Lexeme::Yield),
            "import" => Some(Lexeme::Import),
            "export" => Some(Lexeme::Export),
            "debugger" => Some(Lexeme::Debugger),
            _ => None,
        }
    }

    /// Keyword text, if this lexeme is a keyword. Keywords are valid
    /// property names after `.` and in object literals.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Lexeme::Var => "var",
            Lexeme::Let => "let",
            Lexeme::Const => "const",
            Lexeme::Function => "function",
            Lexeme::Return => "return",
            Lexeme::If => "if",
            Lexeme::Else => "else",
            Lexeme::For => "for",
            Lexeme::While => "while",
            Lexeme::Do => "do",
            Lexeme::Break => "break",
            Lexeme::Continue => "continue",
            Lexeme::Switch => "switch",
            Lexeme::Case => "case",
            Lexeme::Default => "default",
            Lexeme::Throw => "throw",
            Lexeme::Try => "try",
            Lexeme::Catch => "catch",
            Lexeme::Finally => "finally",
            Lexeme::New => "new",
            Lexeme::Delete => "delete",
            Lexeme::Typeof => "typeof",
            Lexeme::Void => "void",
            Lexeme::In => "in",
            Lexeme::Instanceof => "instanceof",
            Lexeme::True => "true",
            Lexeme::False => "false",
            Lexeme::Null => "null",
            Lexeme::This => "this",
            Lexeme::Class => "class",
            Lexeme::With => "with",
            Lexeme::Async => "async",
            Lexeme::Await => "await",
            Lexeme::Yield => "yield",
            Lexeme::Import => "import",
            Lexeme::Export => "export",
            Lexeme::Debugger => "debugger",
            _ => return None,
        };
        Some(text)
    }

    /// Whether a `/` after this lexeme would start a regular expression
    /// rather than a division. Regular expressions are not accepted, so the
    /// lexer only uses this to report a clear error.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Lexeme::Ident(_)
                | Lexeme::Number(_)
                | Lexeme::Str(_)
                | Lexeme::Template {
                    part: TemplatePart::Full | TemplatePart::Tail,
                    ..
                }
                | Lexeme::RParen
                | Lexeme::RBracket
                | Lexeme::RBrace
                | Lexeme::True
                | Lexeme::False
                | Lexeme::Null
                | Lexeme::This
                | Lexeme::PlusPlus
                | Lexeme::MinusMinus
        )
    }

    pub fn description(&self) -> &'static str {
        if let Some(text) = self.keyword_text() {
            return match text {
                "var" => "'var'",
                "let" => "'let'",
                "const" => "'const'",
                "function" => "'function'",
                "return" => "'return'",
                "if" => "'if'",
                "else" => "'else'",
                "for" => "'for'",
                "while" => "'while'",
                "do" => "'do'",
                "break" => "'break'",
                "continue" => "'continue'",
                "switch" => "'switch'",
                "case" => "'case'",
                "default" => "'default'",
                "catch" => "'catch'",
                "finally" => "'finally'",
                "in" => "'in'",
                _ => "keyword",
            };
        }
        match self {
            Lexeme::Ident(_) => "identifier",
            Lexeme::Number(_) => "number",
            Lexeme::Str(_) => "string",
            Lexeme::Template { .. } => "template literal",
            Lexeme::LParen => "'('",
            Lexeme::RParen => "')'",
            Lexeme::LBrace => "'{'",
            Lexeme::RBrace => "'}'",
            Lexeme::LBracket => "'['",
            Lexeme::RBracket => "']'",
            Lexeme::Semicolon => "';'",
            Lexeme::Comma => "','",
            Lexeme::Dot => "'.'",
            Lexeme::Ellipsis => "'...'",
            Lexeme::QuestionDot => "'?.'",
            Lexeme::Question => "'?'",
            Lexeme::Colon => "':'",
            Lexeme::Arrow => "'=>'",
            Lexeme::Eq => "'='",
            Lexeme::EqEq => "'=='",
            Lexeme::EqEqEq => "'==='",
            Lexeme::BangEq => "'!='",
            Lexeme::BangEqEq => "'!=='",
            Lexeme::Lt => "'<'",
            Lexeme::LtEq => "'<='",
            Lexeme::Gt => "'>'",
            Lexeme::GtEq => "'>='",
            Lexeme::Plus => "'+'",
            Lexeme::Minus => "'-'",
            Lexeme::Star => "'*'",
            Lexeme::Slash => "'/'",
            Lexeme::Percent => "'%'",
            Lexeme::StarStar => "'**'",
            Lexeme::PlusPlus => "'++'",
            Lexeme::MinusMinus => "'--'",
            Lexeme::Shl => "'<<'",
            Lexeme::Shr => "'>>'",
            Lexeme::UShr => "'>>>'",
            Lexeme::Amp => "'&'",
            Lexeme::Pipe => "'|'",
            Lexeme::Caret => "'^'",
            Lexeme::Bang => "'!'",
            Lexeme::Tilde => "'~'",
            Lexeme::AmpAmp => "'&&'",
            Lexeme::PipePipe => "'||'",
            Lexeme::QuestionQuestion => "'??'",
            Lexeme::AssignOp(_) => "assignment operator",
            Lexeme::Eof => "end of file",
            _ => "keyword",
        }
    }
}
