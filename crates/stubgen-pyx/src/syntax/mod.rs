//! Declaration tree produced by a source-dialect parser
//!
//! The collector and converter only ever see these types. A parser for a
//! concrete grammar implements [`DeclarationParser`] and lowers its own
//! syntax into this closed set of node kinds; statements that do not declare
//! anything visible end up as [`Node::Other`].

pub mod cython;
pub mod expression;

pub use cython::CythonParser;
pub use expression::Expression;

use crate::{error::StubgenError, parsing::tokenizer::Position};

/// Parser collaborator turning preprocessed source into a declaration tree
pub trait DeclarationParser: Send + Sync {
    /// Parse a whole module of preprocessed text
    fn parse_module(&self, source: &str, module_name: &str) -> Result<ModuleNode, StubgenError>;

    /// Parse one standalone expression
    fn parse_expression(&self, text: &str) -> Result<Expression, StubgenError>;
}

/// Source range of a node, from its first to its last token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub name: String,
    pub doc: Option<String>,
    pub body: Vec<Node>,
}

/// Every statement kind the declaration collector distinguishes
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Statements grouped without introducing a scope, e.g. a `cdef:` block
    StatList(Vec<Node>),
    Assignment(AssignmentNode),
    /// `name: annotation` without a value
    AnnotatedName(AnnotatedNameNode),
    /// `def` / `async def`
    Function(FunctionNode),
    /// `cdef` / `cpdef` function
    NativeFunction(NativeFunctionNode),
    Class(ClassNode),
    /// `cdef class`
    ExtensionClass(ClassNode),
    Enum(EnumNode),
    /// `ctypedef <type> Name`
    TypeDef(TypeDefNode),
    Import(ImportNode),
    If(IfNode),
    /// Anything that declares nothing the stub needs
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    Name {
        name: String,
        annotation: Option<String>,
    },
    /// Attribute, subscript or unpacking target
    Complex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub span: Span,
    pub target: AssignmentTarget,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedNameNode {
    pub span: Span,
    pub name: String,
    pub annotation: String,
}

/// A C-level type as written in a declaration, without pointer markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
    pub name: String,
    /// Dotted prefix, e.g. `["np"]` for `np.ndarray`
    pub module_path: Vec<String>,
}

impl BaseType {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_path: Vec::new(),
        }
    }

    /// Fully qualified spelling, e.g. `np.ndarray`
    pub fn dotted(&self) -> String {
        let mut parts = self.module_path.clone();
        parts.push(self.name.clone());
        parts.join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    /// Empty when a C declaration names only a type
    pub name: String,
    pub annotation: Option<String>,
    pub base_type: Option<BaseType>,
    pub default: Option<Expression>,
}

impl ArgumentNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            base_type: None,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub span: Span,
    pub name: String,
    pub is_async: bool,
    pub doc: Option<String>,
    pub decorators: Vec<Span>,
    pub args: Vec<ArgumentNode>,
    pub star_arg: Option<ArgumentNode>,
    pub starstar_arg: Option<ArgumentNode>,
    pub num_posonly_args: usize,
    pub num_kwonly_args: usize,
    pub return_annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeFunctionNode {
    pub span: Span,
    pub name: String,
    pub doc: Option<String>,
    pub decorators: Vec<Span>,
    pub args: Vec<ArgumentNode>,
    pub return_base_type: Option<BaseType>,
    pub return_annotation: Option<String>,
    /// Declared `cpdef`, i.e. callable from Python
    pub overridable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub span: Span,
    pub name: String,
    pub doc: Option<String>,
    pub decorators: Vec<Span>,
    pub bases: Vec<Expression>,
    pub metaclass: Option<Expression>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    pub span: Span,
    pub name: Option<String>,
    pub members: Vec<String>,
    /// Declared `cpdef`, i.e. exposed to Python
    pub create_wrapper: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefNode {
    pub span: Span,
    pub name: String,
    pub base_type: BaseType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import a.b`
    Import,
    /// `cimport a.b`
    NativeImport,
    /// `from a import b`
    FromImport,
    /// `from a cimport b`
    FromNativeImport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub span: Span,
    pub kind: ImportKind,
    /// Source module of a from-import, including leading dots
    pub module: Option<String>,
    pub names: Vec<ImportedName>,
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expression,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub span: Span,
    /// The `if` clause followed by every `elif`
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<Node>>,
}
