//! Stub model: the language-neutral shape of a generated interface file
//!
//! Every element is a plain value owned by its parent scope. The only change
//! after construction is [`StubModule::merge_companion`], which folds the
//! declarations of a `.pxd` file into the module built from its `.pyx`.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::StubgenError, types::FxIndexSet};

static CIMPORT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcimport\b").expect("cimport pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubModule {
    /// Triple-quoted docstring literal
    pub doc: Option<String>,
    pub imports: Vec<StubImport>,
    pub scope: StubScope,
}

impl StubModule {
    /// Fold a declaration-only companion into this module
    ///
    /// Imports and enums are appended. Classes are appended unless a class
    /// with the same name already exists in this module.
    pub fn merge_companion(&mut self, companion: StubModule) {
        self.imports.extend(companion.imports);
        self.scope.enums.extend(companion.scope.enums);

        let existing: FxIndexSet<String> = self
            .scope
            .classes
            .iter()
            .map(|class| class.name.clone())
            .collect();
        self.scope.classes.extend(
            companion
                .scope
                .classes
                .into_iter()
                .filter(|class| !existing.contains(&class.name)),
        );
    }
}

/// Declarations of one module or class body
///
/// The four lists are independent; the order they are rendered in is up to
/// the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubScope {
    pub enums: Vec<StubEnum>,
    pub classes: Vec<StubClass>,
    pub assignments: Vec<StubAssignment>,
    pub functions: Vec<StubFunction>,
}

impl StubScope {
    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
            && self.classes.is_empty()
            && self.assignments.is_empty()
            && self.functions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubClass {
    pub name: String,
    pub doc: Option<String>,
    pub bases: Vec<String>,
    pub metaclass: Option<String>,
    /// Decorator source lines, including the `@`
    pub decorators: Vec<String>,
    pub scope: StubScope,
}

impl StubClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            bases: Vec::new(),
            metaclass: None,
            decorators: Vec::new(),
            scope: StubScope::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFunction {
    pub name: String,
    pub is_async: bool,
    pub doc: Option<String>,
    pub decorators: Vec<String>,
    pub signature: Signature,
}

impl StubFunction {
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            is_async: false,
            doc: None,
            decorators: Vec::new(),
            signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub annotation: Option<String>,
    /// Default value as stub text, e.g. `None` or `...`
    pub default: Option<String>,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Call signature; positional-only arguments lead `args` and keyword-only
/// arguments trail it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    args: Vec<Argument>,
    num_posonly_args: usize,
    num_kwonly_args: usize,
    pub var_arg: Option<Argument>,
    pub kw_arg: Option<Argument>,
    pub return_annotation: Option<String>,
}

impl Signature {
    pub fn new(
        args: Vec<Argument>,
        num_posonly_args: usize,
        num_kwonly_args: usize,
    ) -> Result<Self, StubgenError> {
        if num_posonly_args + num_kwonly_args > args.len() {
            return Err(StubgenError::InternalShape(format!(
                "signature declares {num_posonly_args} positional-only and {num_kwonly_args} \
                 keyword-only arguments but has only {}",
                args.len()
            )));
        }
        Ok(Self {
            args,
            num_posonly_args,
            num_kwonly_args,
            ..Self::default()
        })
    }

    /// Signature with plain positional arguments only
    pub fn positional(args: Vec<Argument>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn num_posonly_args(&self) -> usize {
        self.num_posonly_args
    }

    pub fn num_kwonly_args(&self) -> usize {
        self.num_kwonly_args
    }

    pub fn posonly_args(&self) -> &[Argument] {
        &self.args[..self.num_posonly_args]
    }

    /// Arguments between the positional-only and keyword-only groups
    pub fn regular_args(&self) -> &[Argument] {
        &self.args[self.num_posonly_args..self.args.len() - self.num_kwonly_args]
    }

    pub fn kwonly_args(&self) -> &[Argument] {
        &self.args[self.args.len() - self.num_kwonly_args..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubAssignment {
    /// Statement transcribed verbatim from the source
    Statement(String),
    /// `name[: annotation] = value` with a literal value
    Structured {
        name: String,
        annotation: Option<String>,
        value: String,
    },
}

impl StubAssignment {
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Self::Statement(statement) => Cow::Borrowed(statement),
            Self::Structured {
                name,
                annotation: Some(annotation),
                value,
            } => Cow::Owned(format!("{name}: {annotation} = {value}")),
            Self::Structured {
                name,
                annotation: None,
                value,
            } => Cow::Owned(format!("{name} = {value}")),
        }
    }
}

/// Import statement text, with `cimport` rewritten to `import`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubImport {
    statement: String,
}

impl StubImport {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: CIMPORT_KEYWORD.replace_all(statement, "import").into_owned(),
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEnum {
    pub name: Option<String>,
    pub members: Vec<String>,
}
