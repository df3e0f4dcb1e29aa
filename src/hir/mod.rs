//! High-level intermediate representation: a control-flow graph of basic
//! blocks whose instructions operate on `Place`s.
//!
//! Blocks live in a per-function arena indexed by `BlockId`; terminals
//! name their successors by id. Identifiers (temporaries and named bindings) live in
//! an `Environment` shared by a function and every function nested in it.
//!
//! Instruction ids are allocated in evaluation order: operands before the
//! instruction that consumes them, a terminal's id before the blocks it
//! owns. The ids of one source statement therefore form a contiguous range.

pub mod builder;
pub mod globals;
pub mod print;

use std::fmt;

use crate::ast::{self, BinOp, LogicalOp, TemplateQuasi, UnaryOp, UpdateOp};
use crate::span::Span;

// ─── Ids ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierId(pub u32);

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl IdentifierId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ─── Identifiers ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Produced by exactly one instruction.
    Temporary,
    /// A declared variable; may be stored to more than once.
    Binding,
}

#[derive(Clone, Debug)]
pub struct Identifier {
    pub id: IdentifierId,
    /// Source name for bindings. Synthesized bindings and temporaries have
    /// none until code generation names them.
    pub name: Option<String>,
    pub kind: IdentifierKind,
    pub span: Span,
}

impl Identifier {
    pub fn is_binding(&self) -> bool {
        self.kind == IdentifierKind::Binding
    }
}

/// Identifier arena and id counters for one compilation.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub identifiers: Vec<Identifier>,
    next_instr: u32,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_temporary(&mut self, span: Span) -> IdentifierId {
        self.push_identifier(None, IdentifierKind::Temporary, span)
    }

    pub fn new_binding(&mut self, name: Option<String>, span: Span) -> IdentifierId {
        self.push_identifier(name, IdentifierKind::Binding, span)
    }

    fn push_identifier(&mut self, name: Option<String>, kind: IdentifierKind, span: Span) -> IdentifierId {
        let id = IdentifierId(self.identifiers.len() as u32);
        self.identifiers.push(Identifier {
            id,
            name,
            kind,
            span,
        });
        id
    }

    pub fn next_instr_id(&mut self) -> InstrId {
        let id = InstrId(self.next_instr);
        self.next_instr += 1;
        id
    }

    /// One past the largest instruction id allocated so far.
    pub fn instr_count(&self) -> u32 {
        self.next_instr
    }

    pub fn identifier(&self, id: IdentifierId) -> &Identifier {
        &self.identifiers[id.index()]
    }

    pub fn name_of(&self, id: IdentifierId) -> Option<&str> {
        self.identifiers[id.index()].name.as_deref()
    }
}

/// A reference to an identifier at a source location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Place {
    pub identifier: IdentifierId,
    pub span: Span,
}

impl Place {
    pub fn new(identifier: IdentifierId, span: Span) -> Self {
        Self { identifier, span }
    }
}

// ─── Instructions ──────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Const,
    Let,
    /// Hoisted `function f() {}`.
    Function,
    Reassign,
}

impl StoreKind {
    pub fn is_declaration(self) -> bool {
        !matches!(self, StoreKind::Reassign)
    }

    pub fn from_decl(kind: ast::DeclKind) -> StoreKind {
        match kind {
            ast::DeclKind::Const => StoreKind::Const,
            ast::DeclKind::Let | ast::DeclKind::Var => StoreKind::Let,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallArg {
    Place(Place),
    Spread(Place),
}

impl CallArg {
    pub fn place(&self) -> Place {
        match self {
            CallArg::Place(p) | CallArg::Spread(p) => *p,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArrayItem {
    Hole,
    Place(Place),
    Spread(Place),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyKey {
    Named(String),
    Computed(Place),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectProperty {
    Property {
        key: PropertyKey,
        value: Place,
        /// `m() {}` method syntax.
        method: bool,
    },
    Spread(Place),
}

/// A destructuring pattern whose leaves are places.
#[derive(Clone, Debug, PartialEq)]
pub enum HirPattern {
    Place(Place),
    Object {
        props: Vec<(PropertyKey, HirPattern)>,
        rest: Option<Place>,
    },
    Array {
        items: Vec<Option<HirPattern>>,
        rest: Option<Place>,
    },
}

impl HirPattern {
    /// Leaf places in source order.
    pub fn places(&self) -> Vec<Place> {
        let mut out = Vec::new();
        self.collect_places(&mut out);
        out
    }

    fn collect_places(&self, out: &mut Vec<Place>) {
        match self {
            HirPattern::Place(p) => out.push(*p),
            HirPattern::Object { props, rest } => {
                for (_, value) in props {
                    value.collect_places(out);
                }
                out.extend(rest.iter().copied());
            }
            HirPattern::Array { items, rest } => {
                for item in items.iter().flatten() {
                    item.collect_places(out);
                }
                out.extend(rest.iter().copied());
            }
        }
    }

    /// Computed keys, which are operands rather than targets.
    pub fn computed_keys(&self) -> Vec<Place> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut Vec<Place>) {
        match self {
            HirPattern::Place(_) => {}
            HirPattern::Object { props, .. } => {
                for (key, value) in props {
                    if let PropertyKey::Computed(p) = key {
                        out.push(*p);
                    }
                    value.collect_keys(out);
                }
            }
            HirPattern::Array { items, .. } => {
                for item in items.iter().flatten() {
                    item.collect_keys(out);
                }
            }
        }
    }
}

/// Instructions evaluated conditionally inside a single expression, with
/// the place holding their result.
#[derive(Clone, Debug)]
pub struct ValueBlock {
    pub instructions: Vec<Instruction>,
    pub result: Place,
}

/// A nested function (closure) lowered for analysis. Code generation emits
/// its original AST.
#[derive(Clone, Debug)]
pub struct LoweredFunction {
    pub func: Box<HirFunction>,
    pub ast: Box<ast::Function>,
}

#[derive(Clone, Debug)]
pub enum InstructionValue {
    Primitive(Primitive),
    LoadLocal(Place),
    LoadGlobal(String),
    /// `this` inside a nested non-arrow function.
    LoadThis,
    StoreLocal {
        kind: StoreKind,
        target: Place,
        value: Place,
    },
    StoreGlobal {
        name: String,
        value: Place,
    },
    /// `let x;`
    DeclareLocal {
        kind: StoreKind,
        target: Place,
    },
    Destructure {
        kind: StoreKind,
        pattern: HirPattern,
        value: Place,
    },
    BinaryOp {
        op: BinOp,
        left: Place,
        right: Place,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Place,
    },
    /// `x++` / `--x` on a local binding.
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Place,
    },
    PropertyLoad {
        object: Place,
        property: String,
    },
    ComputedLoad {
        object: Place,
        property: Place,
    },
    PropertyStore {
        object: Place,
        property: String,
        value: Place,
    },
    ComputedStore {
        object: Place,
        property: Place,
        value: Place,
    },
    PropertyDelete {
        object: Place,
        property: String,
    },
    ComputedDelete {
        object: Place,
        property: Place,
    },
    Call {
        callee: Place,
        args: Vec<CallArg>,
    },
    MethodCall {
        receiver: Place,
        property: PropertyKey,
        args: Vec<CallArg>,
    },
    New {
        callee: Place,
        args: Vec<CallArg>,
    },
    ArrayExpression(Vec<ArrayItem>),
    ObjectExpression(Vec<ObjectProperty>),
    TemplateLiteral {
        quasis: Vec<TemplateQuasi>,
        exprs: Vec<Place>,
    },
    /// Opaque construction: the tag receives the strings and the values.
    TaggedTemplate {
        tag: Place,
        quasis: Vec<TemplateQuasi>,
        exprs: Vec<Place>,
    },
    FunctionExpression {
        lowered: LoweredFunction,
        /// Outer bindings referenced by the function.
        context: Vec<Place>,
    },
    /// `await` inside a nested async function.
    Await(Place),
    /// `left op right`, where `right` only runs when `left` does not decide.
    Logical {
        op: LogicalOp,
        left: Place,
        right: ValueBlock,
    },
    Ternary {
        test: Place,
        consequent: ValueBlock,
        alternate: ValueBlock,
    },
    /// `object?.…`: the chain runs only if `object` is not nullish.
    Optional {
        object: Place,
        chain: ValueBlock,
    },
}

impl InstructionValue {
    /// Places read by this instruction, excluding value-block contents.
    pub fn operands(&self) -> Vec<Place> {
        use InstructionValue as V;
        match self {
            V::Primitive(_) | V::LoadGlobal(_) | V::LoadThis => Vec::new(),
            V::LoadLocal(p) => vec![*p],
            V::StoreLocal { value, .. } | V::StoreGlobal { value, .. } => vec![*value],
            V::DeclareLocal { .. } => Vec::new(),
            V::Destructure { pattern, value, .. } => {
                let mut out = vec![*value];
                out.extend(pattern.computed_keys());
                out
            }
            V::BinaryOp { left, right, .. } => vec![*left, *right],
            V::UnaryOp { operand, .. } => vec![*operand],
            V::Update { target, .. } => vec![*target],
            V::PropertyLoad { object, .. } | V::PropertyDelete { object, .. } => vec![*object],
            V::ComputedLoad { object, property } | V::ComputedDelete { object, property } => {
                vec![*object, *property]
            }
            V::PropertyStore { object, value, .. } => vec![*object, *value],
            V::ComputedStore {
                object,
                property,
                value,
            } => vec![*object, *property, *value],
            V::Call { callee, args } | V::New { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().map(CallArg::place));
                out
            }
            V::MethodCall {
                receiver,
                property,
                args,
            } => {
                let mut out = vec![*receiver];
                if let PropertyKey::Computed(p) = property {
                    out.push(*p);
                }
                out.extend(args.iter().map(CallArg::place));
                out
            }
            V::ArrayExpression(items) => items
                .iter()
                .filter_map(|item| match item {
                    ArrayItem::Hole => None,
                    ArrayItem::Place(p) | ArrayItem::Spread(p) => Some(*p),
                })
                .collect(),
            V::ObjectExpression(props) => {
                let mut out = Vec::new();
                for prop in props {
                    match prop {
                        ObjectProperty::Property { key, value, .. } => {
                            if let PropertyKey::Computed(p) = key {
                                out.push(*p);
                            }
                            out.push(*value);
                        }
                        ObjectProperty::Spread(p) => out.push(*p),
                    }
                }
                out
            }
            V::TemplateLiteral { exprs, .. } => exprs.clone(),
            V::TaggedTemplate { tag, exprs, .. } => {
                let mut out = vec![*tag];
                out.extend(exprs.iter().copied());
                out
            }
            V::FunctionExpression { context, .. } => context.clone(),
            V::Await(p) => vec![*p],
            V::Logical { left, .. } => vec![*left],
            V::Ternary { test, .. } => vec![*test],
            V::Optional { object, .. } => vec![*object],
        }
    }

    /// Value blocks owned by this instruction.
    pub fn value_blocks(&self) -> Vec<&ValueBlock> {
        match self {
            InstructionValue::Logical { right, .. } => vec![right],
            InstructionValue::Ternary {
                consequent,
                alternate,
                ..
            } => vec![consequent, alternate],
            InstructionValue::Optional { chain, .. } => vec![chain],
            _ => Vec::new(),
        }
    }

    /// Bindings written by this instruction besides its lvalue.
    pub fn stored_places(&self) -> Vec<Place> {
        match self {
            InstructionValue::StoreLocal { target, .. }
            | InstructionValue::DeclareLocal { target, .. }
            | InstructionValue::Update { target, .. } => vec![*target],
            InstructionValue::Destructure { pattern, .. } => pattern.places(),
            _ => Vec::new(),
        }
    }

    /// Whether the lvalue is a freshly allocated object.
    pub fn allocates(&self) -> bool {
        matches!(
            self,
            InstructionValue::ArrayExpression(_)
                | InstructionValue::ObjectExpression(_)
                | InstructionValue::FunctionExpression { .. }
                | InstructionValue::New { .. }
                | InstructionValue::TaggedTemplate { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct Instruction {
    pub id: InstrId,
    pub lvalue: Place,
    pub value: InstructionValue,
    pub span: Span,
}

impl Instruction {
    /// Visit this instruction and every instruction nested in its value blocks.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Instruction)) {
        f(self);
        for block in self.value.value_blocks() {
            for instr in &block.instructions {
                instr.walk(f);
            }
        }
    }
}

// ─── Terminals ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LabelName {
    User(String),
    /// Introduced by the compiler (manual memoization bodies).
    Generated(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GotoKind {
    Fallthrough,
    Break { label: Option<LabelName> },
    Continue { label: Option<LabelName> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnKind {
    /// Falling off the end of the body.
    Implicit,
    /// `return;`
    Void,
    Explicit,
}

#[derive(Clone, Debug)]
pub struct SwitchCaseBlock {
    /// `None` for `default:`.
    pub test: Option<Place>,
    pub block: BlockId,
}

#[derive(Clone, Debug)]
pub struct CatchHandler {
    pub param: Option<Place>,
    pub block: BlockId,
}

/// The per-iteration binding of `for…of` / `for…in`.
#[derive(Clone, Debug)]
pub struct LoopBinding {
    pub kind: StoreKind,
    pub target: HirPattern,
}

#[derive(Clone, Debug)]
pub enum TerminalKind {
    Goto {
        block: BlockId,
        kind: GotoKind,
    },
    If {
        test: Place,
        consequent: BlockId,
        alternate: Option<BlockId>,
        fallthrough: BlockId,
    },
    /// Conditional jump ending a loop test block.
    Branch {
        test: Place,
        consequent: BlockId,
        alternate: BlockId,
    },
    Switch {
        discriminant: Place,
        cases: Vec<SwitchCaseBlock>,
        fallthrough: BlockId,
    },
    While {
        test: BlockId,
        body: BlockId,
        fallthrough: BlockId,
    },
    DoWhile {
        body: BlockId,
        test: BlockId,
        fallthrough: BlockId,
    },
    For {
        init: BlockId,
        test: Option<BlockId>,
        update: Option<BlockId>,
        body: BlockId,
        fallthrough: BlockId,
    },
    /// `collection` is evaluated once, before the terminal.
    ForOf {
        collection: Place,
        binding: LoopBinding,
        body: BlockId,
        fallthrough: BlockId,
    },
    ForIn {
        collection: Place,
        binding: LoopBinding,
        body: BlockId,
        fallthrough: BlockId,
    },
    Label {
        label: LabelName,
        block: BlockId,
        fallthrough: BlockId,
    },
    Try {
        block: BlockId,
        handler: Option<CatchHandler>,
        finalizer: Option<BlockId>,
        fallthrough: BlockId,
    },
    Return {
        value: Place,
        kind: ReturnKind,
    },
    Throw {
        value: Place,
    },
    Unreachable,
}

#[derive(Clone, Debug)]
pub struct Terminal {
    pub id: InstrId,
    pub kind: TerminalKind,
    pub span: Span,
}

impl TerminalKind {
    /// Successor blocks, in the order control may reach them.
    pub fn successors(&self) -> Vec<BlockId> {
        use TerminalKind as T;
        match self {
            T::Goto { block, .. } => vec![*block],
            T::If {
                consequent,
                alternate,
                fallthrough,
                ..
            } => {
                let mut out = vec![*consequent];
                out.extend(alternate.iter().copied());
                out.push(*fallthrough);
                out
            }
            T::Branch {
                consequent,
                alternate,
                ..
            } => vec![*consequent, *alternate],
            T::Switch {
                cases, fallthrough, ..
            } => {
                let mut out: Vec<BlockId> = cases.iter().map(|c| c.block).collect();
                out.push(*fallthrough);
                out
            }
            T::While {
                test,
                body,
                fallthrough,
            } => vec![*test, *body, *fallthrough],
            T::DoWhile {
                body,
                test,
                fallthrough,
            } => vec![*body, *test, *fallthrough],
            T::For {
                init,
                test,
                update,
                body,
                fallthrough,
            } => {
                let mut out = vec![*init];
                out.extend(test.iter().copied());
                out.push(*body);
                out.extend(update.iter().copied());
                out.push(*fallthrough);
                out
            }
            T::ForOf {
                body, fallthrough, ..
            }
            | T::ForIn {
                body, fallthrough, ..
            } => vec![*body, *fallthrough],
            T::Label {
                block, fallthrough, ..
            } => vec![*block, *fallthrough],
            T::Try {
                block,
                handler,
                finalizer,
                fallthrough,
            } => {
                let mut out = vec![*block];
                out.extend(handler.iter().map(|h| h.block));
                out.extend(finalizer.iter().copied());
                out.push(*fallthrough);
                out
            }
            T::Return { .. } | T::Throw { .. } | T::Unreachable => Vec::new(),
        }
    }

    /// Successors control can reach directly. A structured terminal reaches
    /// its fallthrough through the blocks it owns, unless the construct
    /// itself may skip them (an `if` without `else`, a `switch` without
    /// `default`, a `for…of` over an empty collection).
    pub fn flow_successors(&self) -> Vec<BlockId> {
        use TerminalKind as T;
        match self {
            T::If {
                consequent,
                alternate,
                fallthrough,
                ..
            } => vec![*consequent, alternate.unwrap_or(*fallthrough)],
            T::Switch {
                cases, fallthrough, ..
            } => {
                let mut out: Vec<BlockId> = cases.iter().map(|c| c.block).collect();
                if cases.iter().all(|c| c.test.is_some()) {
                    out.push(*fallthrough);
                }
                out
            }
            T::While { test, .. } => vec![*test],
            T::DoWhile { body, .. } => vec![*body],
            T::For { init, .. } => vec![*init],
            T::Label { block, .. } => vec![*block],
            T::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                let mut out = vec![*block];
                out.extend(handler.iter().map(|h| h.block));
                out.extend(finalizer.iter().copied());
                out
            }
            _ => self.successors(),
        }
    }

    /// Places read by the terminal itself.
    pub fn operands(&self) -> Vec<Place> {
        use TerminalKind as T;
        match self {
            T::If { test, .. } | T::Branch { test, .. } => vec![*test],
            T::Switch {
                discriminant,
                cases,
                ..
            } => {
                let mut out = vec![*discriminant];
                out.extend(cases.iter().filter_map(|c| c.test));
                out
            }
            T::ForOf { collection, .. } | T::ForIn { collection, .. } => vec![*collection],
            T::Return { value, .. } | T::Throw { value } => vec![*value],
            _ => Vec::new(),
        }
    }

    /// Bindings written by the terminal (loop bindings, catch parameters).
    pub fn stored_places(&self) -> Vec<Place> {
        match self {
            TerminalKind::ForOf { binding, .. } | TerminalKind::ForIn { binding, .. } => {
                binding.target.places()
            }
            TerminalKind::Try {
                handler: Some(CatchHandler {
                    param: Some(param), ..
                }),
                ..
            } => vec![*param],
            _ => Vec::new(),
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            TerminalKind::While { .. }
                | TerminalKind::DoWhile { .. }
                | TerminalKind::For { .. }
                | TerminalKind::ForOf { .. }
                | TerminalKind::ForIn { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    /// Indices into `instructions` where a source statement begins.
    pub statement_starts: Vec<usize>,
    pub terminal: Terminal,
}

impl BasicBlock {
    /// Instructions split at source statement boundaries.
    pub fn statements(&self) -> Vec<&[Instruction]> {
        let mut bounds: Vec<usize> = self
            .statement_starts
            .iter()
            .copied()
            .filter(|&i| i > 0 && i < self.instructions.len())
            .collect();
        bounds.dedup();
        let mut out = Vec::new();
        let mut start = 0;
        for end in bounds {
            out.push(&self.instructions[start..end]);
            start = end;
        }
        if start < self.instructions.len() {
            out.push(&self.instructions[start..]);
        }
        out
    }
}

// ─── Functions ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    If,
    Switch,
    Loop,
    Label,
    Try,
}

/// Instruction ids owned by a structured terminal: `terminal < id <= end`.
#[derive(Clone, Copy, Debug)]
pub struct ControlRegion {
    pub terminal: InstrId,
    pub end: InstrId,
    pub kind: RegionKind,
    /// Branch condition for `if` and `switch`.
    pub test: Option<Place>,
}

impl ControlRegion {
    pub fn contains(&self, id: InstrId) -> bool {
        self.terminal < id && id <= self.end
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub place: Place,
    pub rest: bool,
}

#[derive(Clone, Debug)]
pub struct HirFunction {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub entry: BlockId,
    /// Indexed by `BlockId`.
    pub blocks: Vec<BasicBlock>,
    pub directives: Vec<String>,
    pub regions: Vec<ControlRegion>,
    /// Results of lowered `useMemo`/`useCallback` calls.
    pub manual_memos: Vec<IdentifierId>,
    /// Outer bindings this function reads, for nested functions.
    pub context: Vec<Place>,
    pub is_arrow: bool,
    pub is_async: bool,
    pub span: Span,
}

impl HirFunction {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    /// Every instruction, including value-block contents, in block order.
    pub fn instructions(&self) -> Vec<&Instruction> {
        let mut out = Vec::new();
        for block in &self.blocks {
            for instr in &block.instructions {
                instr.walk(&mut |i| out.push(i));
            }
        }
        out
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.blocks.iter().map(|b| &b.terminal)
    }

    /// Blocks control can actually reach, indexed by `BlockId`.
    pub fn live_blocks(&self) -> Vec<bool> {
        let mut live = vec![false; self.blocks.len()];
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            let index = id.0 as usize;
            if live[index] {
                continue;
            }
            live[index] = true;
            stack.extend(self.block(id).terminal.kind.flow_successors());
        }
        live
    }

    /// Instructions of live blocks, including value-block contents, in
    /// reverse postorder.
    pub fn reachable_instructions(&self) -> Vec<&Instruction> {
        let live = self.live_blocks();
        let mut out = Vec::new();
        for id in self.reverse_postorder() {
            if !live[id.0 as usize] {
                continue;
            }
            for instr in &self.block(id).instructions {
                instr.walk(&mut |i| out.push(i));
            }
        }
        out
    }

    pub fn reachable_terminals(&self) -> Vec<&Terminal> {
        let live = self.live_blocks();
        self.reverse_postorder()
            .into_iter()
            .filter(|id| live[id.0 as usize])
            .map(|id| &self.block(id).terminal)
            .collect()
    }

    /// Blocks reachable from the entry, in reverse postorder.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut postorder = Vec::new();
        let mut stack = vec![(self.entry, false)];
        while let Some((id, done)) = stack.pop() {
            if done {
                postorder.push(id);
                continue;
            }
            let index = id.0 as usize;
            if visited[index] {
                continue;
            }
            visited[index] = true;
            stack.push((id, true));
            for succ in self.block(id).terminal.kind.successors().into_iter().rev() {
                if !visited[succ.0 as usize] {
                    stack.push((succ, false));
                }
            }
        }
        postorder.reverse();
        postorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_allocates_sequential_ids() {
        let mut env = Environment::new();
        let t = env.new_temporary(Span::dummy());
        let b = env.new_binding(Some("x".to_string()), Span::dummy());
        assert_eq!(t, IdentifierId(0));
        assert_eq!(b, IdentifierId(1));
        assert!(env.identifier(b).is_binding());
        assert_eq!(env.name_of(b), Some("x"));
        assert_eq!(env.next_instr_id(), InstrId(0));
        assert_eq!(env.next_instr_id(), InstrId(1));
        assert_eq!(env.instr_count(), 2);
    }

    #[test]
    fn test_pattern_places_in_order() {
        let p = |n| Place::new(IdentifierId(n), Span::dummy());
        let pattern = HirPattern::Object {
            props: vec![
                (PropertyKey::Named("a".into()), HirPattern::Place(p(1))),
                (
                    PropertyKey::Computed(p(9)),
                    HirPattern::Array {
                        items: vec![None, Some(HirPattern::Place(p(2)))],
                        rest: Some(p(3)),
                    },
                ),
            ],
            rest: Some(p(4)),
        };
        let ids: Vec<u32> = pattern.places().iter().map(|p| p.identifier.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(pattern.computed_keys(), vec![p(9)]);
    }

    #[test]
    fn test_block_statements_split_at_starts() {
        let instr = |n| Instruction {
            id: InstrId(n),
            lvalue: Place::new(IdentifierId(n), Span::dummy()),
            value: InstructionValue::Primitive(Primitive::Null),
            span: Span::dummy(),
        };
        let block = BasicBlock {
            id: BlockId(0),
            instructions: (0..5).map(instr).collect(),
            statement_starts: vec![0, 2, 2, 4],
            terminal: Terminal {
                id: InstrId(5),
                kind: TerminalKind::Unreachable,
                span: Span::dummy(),
            },
        };
        let lens: Vec<usize> = block.statements().iter().map(|s| s.len()).collect();
        assert_eq!(lens, vec![2, 2, 1]);
    }

    #[test]
    fn test_region_contains_is_exclusive_of_terminal() {
        let region = ControlRegion {
            terminal: InstrId(4),
            end: InstrId(9),
            kind: RegionKind::If,
            test: None,
        };
        assert!(!region.contains(InstrId(4)));
        assert!(region.contains(InstrId(5)));
        assert!(region.contains(InstrId(9)));
        assert!(!region.contains(InstrId(10)));
    }
}
