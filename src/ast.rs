pub mod navigate;

use crate::syntax::span::{Span, Spanned};

/// A parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub items: Vec<Spanned<Item>>,
}

/// Top-level items.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Stmt { export: Export, stmt: Spanned<Stmt> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Export {
    None,
    Named,
    Default,
}

/// `import { a, b as c } from "source";`, `import d from "source";`
#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    pub default: Option<Spanned<String>>,
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: Spanned<String>,
}

/// A function declaration, function expression or arrow function.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Option<Spanned<String>>,
    pub params: Vec<Spanned<Pattern>>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Spanned<Stmt>>),
    /// Concise arrow body: `x => x + 1`.
    Expr(Box<Spanned<Expr>>),
}

impl Function {
    /// Directive prologue: leading string-literal statements of a block body.
    pub fn directives(&self) -> Vec<&str> {
        let FunctionBody::Block(stmts) = &self.body else {
            return Vec::new();
        };
        stmts
            .iter()
            .map_while(|stmt| match &stmt.node {
                Stmt::Expr(expr) => match &expr.node {
                    Expr::Str(text) => Some(text.as_str()),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    pub fn has_directive(&self, directive: &str) -> bool {
        self.directives().contains(&directive)
    }

    pub fn name_str(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.node.as_str())
    }
}

// ─── Patterns ──────────────────────────────────────────────────────

/// A binding or assignment target.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<Box<Spanned<Pattern>>>,
    },
    Array {
        elements: Vec<Option<Spanned<Pattern>>>,
        rest: Option<Box<Spanned<Pattern>>>,
    },
    /// `target = default`
    Default {
        target: Box<Spanned<Pattern>>,
        default: Box<Spanned<Expr>>,
    },
    /// `...rest` in parameter position.
    Rest(Box<Spanned<Pattern>>),
    /// Member expression target, only valid in assignments.
    Member(Box<Spanned<Expr>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropKey,
    pub value: Spanned<Pattern>,
    pub shorthand: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Number(f64),
    Computed(Box<Spanned<Expr>>),
}

impl PropKey {
    /// Static property name, if the key is not computed.
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropKey::Ident(name) | PropKey::Str(name) => Some(name.clone()),
            PropKey::Number(n) => Some(crate::syntax::format::number_to_string(*n)),
            PropKey::Computed(_) => None,
        }
    }
}

// ─── Statements ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    pub target: Spanned<Pattern>,
    pub init: Option<Spanned<Expr>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        decls: Vec<Declarator>,
    },
    FunctionDecl(Function),
    Expr(Spanned<Expr>),
    Block(Vec<Spanned<Stmt>>),
    If {
        test: Spanned<Expr>,
        consequent: Box<Spanned<Stmt>>,
        alternate: Option<Box<Spanned<Stmt>>>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Spanned<Expr>>,
        update: Option<Spanned<Expr>>,
        body: Box<Spanned<Stmt>>,
    },
    ForOf {
        left: ForHead,
        right: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },
    ForIn {
        left: ForHead,
        right: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },
    While {
        test: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },
    DoWhile {
        body: Box<Spanned<Stmt>>,
        test: Spanned<Expr>,
    },
    Switch {
        discriminant: Spanned<Expr>,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: Spanned<String>,
        body: Box<Spanned<Stmt>>,
    },
    Break(Option<Spanned<String>>),
    Continue(Option<Spanned<String>>),
    Return(Option<Spanned<Expr>>),
    Throw(Spanned<Expr>),
    Try {
        block: Vec<Spanned<Stmt>>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Spanned<Stmt>>>,
    },
    With {
        object: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },
    Debugger,
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ForInit {
    VarDecl {
        kind: DeclKind,
        decls: Vec<Declarator>,
    },
    Expr(Spanned<Expr>),
}

/// Left-hand side of `for (… of …)` / `for (… in …)`.
#[derive(Clone, Debug, PartialEq)]
pub enum ForHead {
    Decl {
        kind: DeclKind,
        target: Spanned<Pattern>,
    },
    Target(Spanned<Pattern>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Spanned<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub param: Option<Spanned<Pattern>>,
    pub body: Vec<Spanned<Stmt>>,
}

// ─── Expressions ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Exp => "**",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::StrictEq => "===",
            BinOp::StrictNotEq => "!==",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::UShr => ">>>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::In => "in",
            BinOp::Instanceof => "instanceof",
        }
    }

    /// Operator precedence (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::BitOr => 6,
            BinOp::BitXor => 7,
            BinOp::BitAnd => 8,
            BinOp::Eq | BinOp::NotEq | BinOp::StrictEq | BinOp::StrictNotEq => 9,
            BinOp::Lt
            | BinOp::LtEq
            | BinOp::Gt
            | BinOp::GtEq
            | BinOp::In
            | BinOp::Instanceof => 10,
            BinOp::Shl | BinOp::Shr | BinOp::UShr => 11,
            BinOp::Add | BinOp::Sub => 12,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 13,
            BinOp::Exp => 14,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::Nullish => 3,
            LogicalOp::Or => 4,
            LogicalOp::And => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Compound(BinOp),
    Logical(LogicalOp),
}

impl AssignOp {
    pub fn as_str(self) -> String {
        match self {
            AssignOp::Assign => "=".to_string(),
            AssignOp::Compound(op) => format!("{}=", op.as_str()),
            AssignOp::Logical(op) => format!("{}=", op.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateQuasi {
    pub cooked: String,
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    Expr(Spanned<Expr>),
    Spread(Spanned<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArrayElement {
    Hole,
    Expr(Spanned<Expr>),
    Spread(Spanned<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectMember {
    Property {
        key: PropKey,
        value: Spanned<Expr>,
        shorthand: bool,
        method: bool,
    },
    Spread(Spanned<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum MemberProp {
    Ident(String),
    Computed(Box<Spanned<Expr>>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    This,
    Template {
        quasis: Vec<TemplateQuasi>,
        exprs: Vec<Spanned<Expr>>,
    },
    TaggedTemplate {
        tag: Box<Spanned<Expr>>,
        quasis: Vec<TemplateQuasi>,
        exprs: Vec<Spanned<Expr>>,
    },
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectMember>),
    Function(Box<Function>),
    Unary {
        op: UnaryOp,
        arg: Box<Spanned<Expr>>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Assign {
        op: AssignOp,
        target: Box<Spanned<Pattern>>,
        value: Box<Spanned<Expr>>,
    },
    Conditional {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Argument>,
        optional: bool,
    },
    New {
        callee: Box<Spanned<Expr>>,
        args: Vec<Argument>,
    },
    Member {
        object: Box<Spanned<Expr>>,
        property: MemberProp,
        optional: bool,
    },
    /// Boundary of an optional chain: short-circuits to `undefined`.
    Chain(Box<Spanned<Expr>>),
    Sequence(Vec<Spanned<Expr>>),
    Await(Box<Spanned<Expr>>),
    Yield(Option<Box<Spanned<Expr>>>),
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    pub fn member(object: Spanned<Expr>, name: &str) -> Expr {
        Expr::Member {
            object: Box::new(object),
            property: MemberProp::Ident(name.to_string()),
            optional: false,
        }
    }

    pub fn call(callee: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args: args.into_iter().map(Argument::Expr).collect(),
            optional: false,
        }
    }

    pub fn binary(op: BinOp, left: Spanned<Expr>, right: Spanned<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(target: Pattern, value: Spanned<Expr>) -> Expr {
        Expr::Assign {
            op: AssignOp::Assign,
            target: Box::new(Spanned::dummy(target)),
            value: Box::new(value),
        }
    }
}
