//! Indentation-aware declaration parser for preprocessed Cython source
//!
//! The parser works on logical lines: after preprocessing every statement
//! sits on its own line and every compound header ends with a colon, so a
//! block is simply the run of following lines indented deeper than its
//! header. Only declarations are parsed in detail. Function bodies are
//! skipped after their docstring, and statements that declare nothing are
//! kept as opaque [`Node::Other`] spans.

use log::trace;
use ruff_python_ast::Expr;

use super::{
    AnnotatedNameNode, ArgumentNode, AssignmentNode, AssignmentTarget, BaseType, ClassNode,
    DeclarationParser, EnumNode, Expression, FunctionNode, IfClause, IfNode, ImportKind,
    ImportNode, ImportedName, ModuleNode, NativeFunctionNode, Node, Span, TypeDefNode,
    expression::{classify, classify_expr},
};
use crate::{
    error::StubgenError,
    parsing::{
        position::PositionMap,
        tokenizer::{Position, Token, TokenKind, tokenize},
    },
};

/// Storage and visibility modifiers that may precede a C declaration
const DECLARATION_MODIFIERS: &[&str] = &[
    "public", "api", "inline", "readonly", "static", "nogil", "noexcept", "extern_c",
];

/// C declarations that never produce anything visible from Python
const OPAQUE_DECLARATIONS: &[&str] = &[
    "extern", "struct", "union", "cppclass", "fused", "packed", "ctypedef",
];

/// Words that modify a C base type without naming it
const TYPE_MODIFIERS: &[&str] = &["signed", "unsigned", "short", "long"];

/// Qualifiers dropped from C types entirely
const TYPE_QUALIFIERS: &[&str] = &["const", "volatile"];

/// Built-in C type names, used to tell `f(int)` apart from `f(x)`
const C_TYPE_NAMES: &[&str] = &[
    "int", "char", "short", "long", "float", "double", "bint", "void", "object", "size_t",
    "Py_ssize_t", "Py_hash_t", "Py_UCS4", "Py_UNICODE",
];

/// Parser for the Cython dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct CythonParser;

impl CythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationParser for CythonParser {
    fn parse_module(&self, source: &str, module_name: &str) -> Result<ModuleNode, StubgenError> {
        let tokens = tokenize(source);
        let lines = logical_lines(&tokens, module_name)?;
        trace!("{module_name}: {} logical lines", lines.len());

        let mut parser = BlockParser {
            module_name,
            map: PositionMap::new(source),
            lines: &lines,
            index: 0,
        };
        let doc = parser.take_docstring(0);
        let body = parser.parse_block(0)?;

        Ok(ModuleNode {
            name: module_name.to_string(),
            doc,
            body,
        })
    }

    fn parse_expression(&self, text: &str) -> Result<Expression, StubgenError> {
        let trimmed = text.trim();
        match ruff_python_parser::parse_expression(trimmed) {
            Ok(parsed) => Ok(classify_expr(&parsed.into_expr(), trimmed)),
            Err(err) => Err(StubgenError::syntax(
                "<expression>",
                1,
                usize::from(err.location.start()),
                err.to_string(),
            )),
        }
    }
}

/// One statement's tokens, without the trailing newline
#[derive(Debug)]
struct LogicalLine<'s> {
    tokens: Vec<Token<'s>>,
    indent: usize,
}

impl<'s> LogicalLine<'s> {
    fn start(&self) -> Position {
        self.tokens.first().map(|t| t.start).unwrap_or_default()
    }

    fn end(&self) -> Position {
        self.tokens.last().map(|t| t.end).unwrap_or_default()
    }

    fn span(&self) -> Span {
        Span::new(self.start(), self.end())
    }

    fn token(&self, index: usize) -> Option<&Token<'s>> {
        self.tokens.get(index)
    }

    fn ends_with_colon(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.is_op(":"))
    }

    fn starts_with_name(&self, name: &str) -> bool {
        self.token(0).is_some_and(|t| t.is_name(name))
    }
}

/// Group tokens into logical lines, rejecting malformed lexical structure
fn logical_lines<'s>(
    tokens: &[Token<'s>],
    module_name: &str,
) -> Result<Vec<LogicalLine<'s>>, StubgenError> {
    let mut lines = Vec::new();
    let mut current: Vec<Token<'s>> = Vec::new();
    let mut brackets: Vec<Token<'s>> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::Comment | TokenKind::NonLogicalNewline => {}
            TokenKind::ErrorToken => {
                let message = if token.text.ends_with(['"', '\''])
                    || token.text.contains(['"', '\''])
                {
                    "unterminated string literal".to_string()
                } else {
                    format!("invalid character '{}'", token.text)
                };
                return Err(StubgenError::syntax(
                    module_name,
                    token.start.line,
                    token.start.column,
                    message,
                ));
            }
            TokenKind::Newline | TokenKind::EndOfFile => {
                if let Some(open) = brackets.first() {
                    return Err(StubgenError::syntax(
                        module_name,
                        open.start.line,
                        open.start.column,
                        format!("'{}' was never closed", open.text),
                    ));
                }
                if let Some(first) = current.first() {
                    let indent = first.start.column;
                    lines.push(LogicalLine {
                        tokens: std::mem::take(&mut current),
                        indent,
                    });
                }
            }
            TokenKind::Op if matches!(token.text, "(" | "[" | "{") => {
                brackets.push(*token);
                current.push(*token);
            }
            TokenKind::Op if matches!(token.text, ")" | "]" | "}") => {
                let matches_open = brackets
                    .last()
                    .is_some_and(|open| closing_bracket(open.text) == Some(token.text));
                if !matches_open {
                    return Err(StubgenError::syntax(
                        module_name,
                        token.start.line,
                        token.start.column,
                        format!("unmatched '{}'", token.text),
                    ));
                }
                brackets.pop();
                current.push(*token);
            }
            _ => current.push(*token),
        }
    }
    Ok(lines)
}

fn closing_bracket(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "[" => Some("]"),
        "{" => Some("}"),
        _ => None,
    }
}

/// Parameters of a function declaration
#[derive(Debug, Default)]
struct Parameters {
    args: Vec<ArgumentNode>,
    star_arg: Option<ArgumentNode>,
    starstar_arg: Option<ArgumentNode>,
    num_posonly_args: usize,
    num_kwonly_args: usize,
}

struct BlockParser<'s, 'l> {
    module_name: &'s str,
    map: PositionMap<'s>,
    lines: &'l [LogicalLine<'s>],
    index: usize,
}

impl<'s, 'l> BlockParser<'s, 'l> {
    fn line(&self, index: usize) -> Option<&'l LogicalLine<'s>> {
        let lines: &'l [LogicalLine<'s>] = self.lines;
        lines.get(index)
    }

    fn error(&self, position: Position, message: impl Into<String>) -> StubgenError {
        StubgenError::syntax(self.module_name, position.line, position.column, message)
    }

    /// Source text from the start of `first` to the end of `last`
    fn text(&self, first: &Token<'_>, last: &Token<'_>) -> &'s str {
        self.map.slice(first.start, last.end)
    }

    fn tokens_text(&self, tokens: &[Token<'_>]) -> Option<&'s str> {
        Some(self.text(tokens.first()?, tokens.last()?))
    }

    fn parse_block(&mut self, indent: usize) -> Result<Vec<Node>, StubgenError> {
        let mut body = Vec::new();
        while let Some(line) = self.line(self.index) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line.start(), "unexpected indent"));
            }
            body.push(self.parse_statement(line, Vec::new())?);
        }
        Ok(body)
    }

    fn parse_statement(
        &mut self,
        line: &'l LogicalLine<'s>,
        decorators: Vec<Span>,
    ) -> Result<Node, StubgenError> {
        let Some(first) = line.token(0) else {
            self.index += 1;
            return Ok(Node::Other(line.span()));
        };
        match (first.kind, first.text) {
            (TokenKind::Op, "@") => self.parse_decorated(line),
            (TokenKind::Name, "def") => self.parse_function(line, decorators, false),
            (TokenKind::Name, "async") if line.token(1).is_some_and(|t| t.is_name("def")) => {
                self.parse_function(line, decorators, true)
            }
            (TokenKind::Name, "class") => self.parse_class(line, decorators),
            (TokenKind::Name, "cdef" | "cpdef") => {
                let overridable = first.text == "cpdef";
                self.parse_native(line, 1, overridable, decorators)
            }
            (TokenKind::Name, "ctypedef") => self.parse_typedef(line),
            (TokenKind::Name, "import" | "cimport") => self.parse_import(line),
            (TokenKind::Name, "from") => self.parse_from_import(line),
            (TokenKind::Name, "if") => self.parse_if(line),
            _ => self.parse_simple_statement(line),
        }
    }

    /// Index of the first line of the block opened by `header`, which has
    /// already been consumed
    fn enter_block(&self, header: &LogicalLine<'s>, what: &str) -> Result<usize, StubgenError> {
        match self.line(self.index) {
            Some(next) if next.indent > header.indent => Ok(next.indent),
            _ => Err(self.error(
                header.end(),
                format!("expected an indented block after {what}"),
            )),
        }
    }

    fn skip_block(&mut self, header_indent: usize) {
        while self
            .line(self.index)
            .is_some_and(|line| line.indent > header_indent)
        {
            self.index += 1;
        }
    }

    /// Consume a docstring statement at the current line, if there is one
    fn take_docstring(&mut self, indent: usize) -> Option<String> {
        let line = self.line(self.index)?;
        if line.indent != indent
            || !line.tokens.iter().all(|t| t.kind == TokenKind::String)
        {
            return None;
        }
        let text = self.tokens_text(&line.tokens)?;
        let parsed = ruff_python_parser::parse_expression(text).ok()?;
        let Expr::StringLiteral(string) = parsed.into_expr() else {
            return None;
        };
        self.index += 1;
        Some(string.value.to_str().to_string())
    }

    /// Docstring of a definition body; the rest of the body is skipped
    fn skip_body_keeping_doc(
        &mut self,
        header: &LogicalLine<'s>,
        what: &str,
    ) -> Result<Option<String>, StubgenError> {
        let body_indent = self.enter_block(header, what)?;
        let doc = self.take_docstring(body_indent);
        self.skip_block(header.indent);
        Ok(doc)
    }

    fn parse_decorated(&mut self, first: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        let mut decorators = Vec::new();
        while let Some(line) = self.line(self.index) {
            if line.indent != first.indent || !line.token(0).is_some_and(|t| t.is_op("@")) {
                break;
            }
            decorators.push(line.span());
            self.index += 1;
        }

        let target = self
            .line(self.index)
            .filter(|line| line.indent == first.indent);
        let Some(target) = target else {
            return Err(self.error(first.end(), "decorator must be followed by a definition"));
        };
        let is_definition = target.token(0).is_some_and(|t| {
            t.kind == TokenKind::Name && matches!(t.text, "def" | "class" | "cdef" | "cpdef")
        }) || (target.starts_with_name("async")
            && target.token(1).is_some_and(|t| t.is_name("def")));
        if !is_definition {
            return Err(self.error(
                target.start(),
                "decorator must be followed by a definition",
            ));
        }
        self.parse_statement(target, decorators)
    }

    fn parse_function(
        &mut self,
        line: &'l LogicalLine<'s>,
        decorators: Vec<Span>,
        is_async: bool,
    ) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let name_index = if is_async { 2 } else { 1 };
        let name = match tokens.get(name_index) {
            Some(token) if token.kind == TokenKind::Name => token.text.to_string(),
            _ => return Err(self.error(line.start(), "expected function name after 'def'")),
        };
        let open = name_index + 1;
        if !tokens.get(open).is_some_and(|t| t.is_op("(")) {
            return Err(self.error(tokens[name_index].end, "expected '(' after function name"));
        }
        let close = matching_bracket(tokens, open)
            .ok_or_else(|| self.error(tokens[open].start, "'(' was never closed"))?;
        if !line.ends_with_colon() {
            return Err(self.error(line.end(), "expected ':'"));
        }
        let parameters = self.parse_parameters(&tokens[open + 1..close])?;
        let return_annotation = self.return_annotation(&tokens[close + 1..tokens.len() - 1])?;

        self.index += 1;
        let doc = self.skip_body_keeping_doc(line, "function definition")?;
        trace!("Parsed function {name}");

        Ok(Node::Function(FunctionNode {
            span: line.span(),
            name,
            is_async,
            doc,
            decorators,
            args: parameters.args,
            star_arg: parameters.star_arg,
            starstar_arg: parameters.starstar_arg,
            num_posonly_args: parameters.num_posonly_args,
            num_kwonly_args: parameters.num_kwonly_args,
            return_annotation,
        }))
    }

    /// Text after `->` in the tokens following a parameter list
    fn return_annotation(&self, tail: &[Token<'_>]) -> Result<Option<String>, StubgenError> {
        let Some(arrow) = tail.iter().position(|t| t.is_op("->")) else {
            return Ok(None);
        };
        let annotation = &tail[arrow + 1..];
        match self.tokens_text(annotation) {
            Some(text) => Ok(Some(text.to_string())),
            None => Err(self.error(tail[arrow].end, "expected return annotation after '->'")),
        }
    }

    fn parse_parameters(&self, tokens: &[Token<'_>]) -> Result<Parameters, StubgenError> {
        let mut parameters = Parameters::default();
        let mut keyword_only = false;

        for item in split_top_level(tokens, ",") {
            match item {
                [] => {}
                [slash] if slash.is_op("/") => {
                    parameters.num_posonly_args = parameters.args.len();
                }
                [star] if star.is_op("*") => keyword_only = true,
                // C varargs
                [dots] if dots.is_op("...") => {}
                [star, rest @ ..] if star.is_op("*") => {
                    parameters.star_arg = Some(self.parse_parameter(rest, star.end)?);
                    keyword_only = true;
                }
                [star, rest @ ..] if star.is_op("**") => {
                    parameters.starstar_arg = Some(self.parse_parameter(rest, star.end)?);
                }
                _ => {
                    let argument = self.parse_parameter(item, item[0].start)?;
                    if keyword_only {
                        parameters.num_kwonly_args += 1;
                    }
                    parameters.args.push(argument);
                }
            }
        }
        Ok(parameters)
    }

    fn parse_parameter(
        &self,
        tokens: &[Token<'_>],
        at: Position,
    ) -> Result<ArgumentNode, StubgenError> {
        let (declaration, default) = match top_level_position(tokens, "=") {
            Some(eq) => {
                let default = self
                    .tokens_text(&tokens[eq + 1..])
                    .ok_or_else(|| self.error(tokens[eq].end, "expected default value"))?;
                (&tokens[..eq], Some(classify(default)))
            }
            None => (tokens, None),
        };
        let declaration = strip_none_check(declaration);
        if declaration.is_empty() {
            return Err(self.error(at, "expected parameter"));
        }

        if let Some(colon) = top_level_position(declaration, ":") {
            let [name] = &declaration[..colon] else {
                return Err(self.error(declaration[0].start, "invalid parameter"));
            };
            if name.kind != TokenKind::Name {
                return Err(self.error(name.start, "invalid parameter"));
            }
            let annotation = self
                .tokens_text(&declaration[colon + 1..])
                .ok_or_else(|| self.error(declaration[colon].end, "expected annotation"))?;
            return Ok(ArgumentNode {
                name: name.text.to_string(),
                annotation: Some(annotation.to_string()),
                base_type: None,
                default,
            });
        }

        let (name, base_type) = c_declaration(declaration);
        Ok(ArgumentNode {
            name,
            annotation: None,
            base_type,
            default,
        })
    }

    fn parse_class(
        &mut self,
        line: &'l LogicalLine<'s>,
        decorators: Vec<Span>,
    ) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let name = match tokens.get(1) {
            Some(token) if token.kind == TokenKind::Name => token.text.to_string(),
            _ => return Err(self.error(line.start(), "expected class name")),
        };
        if !line.ends_with_colon() {
            return Err(self.error(line.end(), "expected ':'"));
        }
        let (bases, metaclass) = match tokens.get(2) {
            Some(open) if open.is_op("(") => {
                let close = matching_bracket(tokens, 2)
                    .ok_or_else(|| self.error(open.start, "'(' was never closed"))?;
                self.class_arguments(&tokens[3..close])
            }
            _ => (Vec::new(), None),
        };

        self.index += 1;
        let body_indent = self.enter_block(line, "class definition")?;
        let doc = self.take_docstring(body_indent);
        let body = self.parse_block(body_indent)?;

        Ok(Node::Class(ClassNode {
            span: line.span(),
            name,
            doc,
            decorators,
            bases,
            metaclass,
            body,
        }))
    }

    /// Bases and `metaclass=` keyword of a class header
    fn class_arguments(&self, tokens: &[Token<'_>]) -> (Vec<Expression>, Option<Expression>) {
        let mut bases = Vec::new();
        let mut metaclass = None;
        for item in split_top_level(tokens, ",") {
            match item {
                [] => {}
                [star, ..] if star.is_op("*") || star.is_op("**") => {}
                [keyword, eq, value @ ..] if keyword.kind == TokenKind::Name && eq.is_op("=") => {
                    if keyword.text == "metaclass"
                        && let Some(text) = self.tokens_text(value)
                    {
                        metaclass = Some(classify(text));
                    }
                }
                _ => {
                    if let Some(text) = self.tokens_text(item) {
                        bases.push(classify(text));
                    }
                }
            }
        }
        (bases, metaclass)
    }

    /// A `cdef`/`cpdef` statement whose declaration starts at token `start`
    fn parse_native(
        &mut self,
        line: &'l LogicalLine<'s>,
        start: usize,
        overridable: bool,
        decorators: Vec<Span>,
    ) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let mut pos = start;
        if tokens.len() == pos + 1 && tokens[pos].is_op(":") {
            return self.parse_native_block(line);
        }
        while tokens
            .get(pos)
            .is_some_and(|t| t.kind == TokenKind::Name && DECLARATION_MODIFIERS.contains(&t.text))
        {
            pos += 1;
        }

        match tokens.get(pos) {
            Some(t) if t.is_name("class") => {
                return self.parse_extension_class(line, pos + 1, decorators);
            }
            Some(t) if t.is_name("enum") => return self.parse_enum(line, pos + 1, overridable),
            Some(t) if t.kind == TokenKind::Name && OPAQUE_DECLARATIONS.contains(&t.text) => {
                return Ok(self.opaque(line));
            }
            Some(_) => {}
            None => return Err(self.error(line.end(), "expected declaration")),
        }

        let declaration = &tokens[pos..];
        let Some(open) = function_paren(declaration) else {
            return Ok(self.opaque(line));
        };
        let name = declaration[open - 1].text.to_string();
        let close = matching_bracket(declaration, open)
            .ok_or_else(|| self.error(declaration[open].start, "'(' was never closed"))?;
        let parameters = self.parse_parameters(&declaration[open + 1..close])?;
        let return_base_type = base_type(&declaration[..open - 1]);
        let tail = &declaration[close + 1..];
        let has_body = line.ends_with_colon();
        let annotation_tail = if has_body {
            &tail[..tail.len().saturating_sub(1)]
        } else {
            tail
        };
        let return_annotation = self.return_annotation(annotation_tail)?;

        self.index += 1;
        let doc = if has_body {
            self.skip_body_keeping_doc(line, "function definition")?
        } else {
            None
        };
        trace!("Parsed native function {name} (overridable: {overridable})");

        Ok(Node::NativeFunction(NativeFunctionNode {
            span: line.span(),
            name,
            doc,
            decorators,
            args: parameters.args,
            return_base_type,
            return_annotation,
            overridable,
        }))
    }

    /// `cdef:` followed by an indented block of C declarations
    fn parse_native_block(&mut self, header: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        self.index += 1;
        let body_indent = self.enter_block(header, "'cdef:'")?;
        let mut nodes = Vec::new();
        while let Some(line) = self.line(self.index) {
            if line.indent < body_indent {
                break;
            }
            if line.indent > body_indent {
                return Err(self.error(line.start(), "unexpected indent"));
            }
            let node = match line.token(0) {
                Some(keyword) if keyword.is_name("cdef") || keyword.is_name("cpdef") => {
                    self.parse_native(line, 1, keyword.text == "cpdef", Vec::new())?
                }
                _ => self.parse_native(line, 0, false, Vec::new())?,
            };
            nodes.push(node);
        }
        Ok(Node::StatList(nodes))
    }

    fn parse_extension_class(
        &mut self,
        line: &'l LogicalLine<'s>,
        start: usize,
        decorators: Vec<Span>,
    ) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let mut pos = start;
        let mut name = None;
        while let Some(token) = tokens.get(pos) {
            if token.kind == TokenKind::Name {
                name = Some(token.text.to_string());
                pos += 1;
            } else if token.is_op(".") && name.is_some() {
                pos += 1;
            } else {
                break;
            }
        }
        let Some(name) = name else {
            return Err(self.error(line.start(), "expected class name"));
        };

        // `[object Foo, type FooType]` layout clause
        if tokens.get(pos).is_some_and(|t| t.is_op("[")) {
            pos = matching_bracket(tokens, pos)
                .ok_or_else(|| self.error(tokens[pos].start, "'[' was never closed"))?
                + 1;
        }
        let mut bases = Vec::new();
        if tokens.get(pos).is_some_and(|t| t.is_op("(")) {
            let close = matching_bracket(tokens, pos)
                .ok_or_else(|| self.error(tokens[pos].start, "'(' was never closed"))?;
            bases = self.class_arguments(&tokens[pos + 1..close]).0;
        }

        self.index += 1;
        let (doc, body) = if line.ends_with_colon() {
            let body_indent = self.enter_block(line, "class definition")?;
            let doc = self.take_docstring(body_indent);
            (doc, self.parse_block(body_indent)?)
        } else {
            (None, Vec::new())
        };

        Ok(Node::ExtensionClass(ClassNode {
            span: line.span(),
            name,
            doc,
            decorators,
            bases,
            metaclass: None,
            body,
        }))
    }

    fn parse_enum(
        &mut self,
        line: &'l LogicalLine<'s>,
        start: usize,
        create_wrapper: bool,
    ) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let mut pos = start;
        // Scoped `enum class` / `enum struct`
        if tokens
            .get(pos)
            .is_some_and(|t| t.is_name("class") || t.is_name("struct"))
        {
            pos += 1;
        }
        let name = tokens
            .get(pos)
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| t.text.to_string());

        self.index += 1;
        let mut members = Vec::new();
        if line.ends_with_colon() {
            self.enter_block(line, "enum definition")?;
            while let Some(body_line) = self.line(self.index) {
                if body_line.indent <= line.indent {
                    break;
                }
                for item in split_top_level(&body_line.tokens, ",") {
                    if let Some(first) = item.first()
                        && first.kind == TokenKind::Name
                        && first.text != "pass"
                    {
                        members.push(first.text.to_string());
                    }
                }
                self.index += 1;
            }
        }

        Ok(Node::Enum(EnumNode {
            span: line.span(),
            name,
            members,
            create_wrapper,
        }))
    }

    fn parse_typedef(&mut self, line: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let mut pos = 1;
        while tokens
            .get(pos)
            .is_some_and(|t| t.is_name("public") || t.is_name("api"))
        {
            pos += 1;
        }
        let declaration = &tokens[pos..];
        let is_simple = declaration.len() >= 2
            && !line.ends_with_colon()
            && declaration.iter().all(|t| {
                t.kind == TokenKind::Name && !OPAQUE_DECLARATIONS.contains(&t.text)
                    || t.is_op(".")
            })
            && !matches!(
                declaration[0].text,
                "enum" | "class" | "cppclass" | "fused"
            );
        let Some(last) = declaration.last().filter(|_| is_simple) else {
            return Ok(self.opaque(line));
        };
        let Some(base) = base_type(&declaration[..declaration.len() - 1]) else {
            return Ok(self.opaque(line));
        };

        self.index += 1;
        Ok(Node::TypeDef(TypeDefNode {
            span: line.span(),
            name: last.text.to_string(),
            base_type: base,
        }))
    }

    fn parse_import(&mut self, line: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        let kind = if line.starts_with_name("cimport") {
            ImportKind::NativeImport
        } else {
            ImportKind::Import
        };
        let names = self.imported_names(&line.tokens[1..], line, true)?;
        self.index += 1;
        Ok(Node::Import(ImportNode {
            span: line.span(),
            kind,
            module: None,
            names,
            wildcard: false,
        }))
    }

    fn parse_from_import(&mut self, line: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        let tokens = &line.tokens;
        let Some(keyword) = tokens
            .iter()
            .position(|t| t.is_name("import") || t.is_name("cimport"))
        else {
            return Err(self.error(line.end(), "expected 'import' in from-import"));
        };
        let module: String = tokens[1..keyword].iter().map(|t| t.text).collect();
        let module_is_valid = !module.is_empty()
            && tokens[1..keyword]
                .iter()
                .all(|t| t.kind == TokenKind::Name || t.is_op(".") || t.is_op("..."));
        if !module_is_valid {
            return Err(self.error(tokens[0].end, "expected module name"));
        }
        let kind = if tokens[keyword].text == "cimport" {
            ImportKind::FromNativeImport
        } else {
            ImportKind::FromImport
        };

        let mut rest = &tokens[keyword + 1..];
        let wildcard = matches!(rest, [star] if star.is_op("*"));
        let names = if wildcard {
            Vec::new()
        } else {
            if let [open, inner @ .., close] = rest
                && open.is_op("(")
                && close.is_op(")")
            {
                rest = inner;
            }
            self.imported_names(rest, line, false)?
        };

        self.index += 1;
        Ok(Node::Import(ImportNode {
            span: line.span(),
            kind,
            module: Some(module),
            names,
            wildcard,
        }))
    }

    /// `name [as alias], ...`; dotted names only for plain imports
    fn imported_names(
        &self,
        tokens: &[Token<'_>],
        line: &LogicalLine<'_>,
        allow_dotted: bool,
    ) -> Result<Vec<ImportedName>, StubgenError> {
        let mut names = Vec::new();
        for item in split_top_level(tokens, ",") {
            if item.is_empty() {
                continue;
            }
            let (path, alias) = match item {
                [path @ .., as_kw, alias] if as_kw.is_name("as") => {
                    if alias.kind != TokenKind::Name {
                        return Err(self.error(alias.start, "expected alias name"));
                    }
                    (path, Some(alias.text.to_string()))
                }
                _ => (item, None),
            };
            let is_valid = path.iter().enumerate().all(|(idx, token)| {
                if idx % 2 == 0 {
                    token.kind == TokenKind::Name
                } else {
                    allow_dotted && token.is_op(".")
                }
            }) && path.len() % 2 == 1;
            if !is_valid {
                return Err(self.error(item[0].start, "invalid import target"));
            }
            names.push(ImportedName {
                name: path.iter().map(|t| t.text).collect(),
                alias,
            });
        }
        if names.is_empty() {
            return Err(self.error(line.end(), "expected names to import"));
        }
        Ok(names)
    }

    fn parse_if(&mut self, line: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        let mut clauses = vec![self.parse_if_clause(line, "'if' statement")?];
        let mut else_body = None;
        let mut end = line.end();

        while let Some(next) = self.line(self.index) {
            if next.indent != line.indent {
                break;
            }
            if next.starts_with_name("elif") {
                clauses.push(self.parse_if_clause(next, "'elif' statement")?);
                end = next.end();
            } else if next.starts_with_name("else") && next.tokens.len() == 2 && next.ends_with_colon()
            {
                self.index += 1;
                let body_indent = self.enter_block(next, "'else' statement")?;
                else_body = Some(self.parse_block(body_indent)?);
                end = next.end();
                break;
            } else {
                break;
            }
        }

        Ok(Node::If(IfNode {
            span: Span::new(line.start(), end),
            clauses,
            else_body,
        }))
    }

    fn parse_if_clause(
        &mut self,
        line: &'l LogicalLine<'s>,
        what: &str,
    ) -> Result<IfClause, StubgenError> {
        if !line.ends_with_colon() {
            return Err(self.error(line.end(), "expected ':'"));
        }
        let condition_tokens = &line.tokens[1..line.tokens.len() - 1];
        let condition_text = self
            .tokens_text(condition_tokens)
            .ok_or_else(|| self.error(line.start(), "expected condition"))?;
        let condition = self
            .parse_expression(condition_text)
            .unwrap_or_else(|_| Expression::Other(condition_text.to_string()));

        self.index += 1;
        let body_indent = self.enter_block(line, what)?;
        let body = self.parse_block(body_indent)?;
        Ok(IfClause { condition, body })
    }

    fn parse_expression(&self, text: &str) -> Result<Expression, StubgenError> {
        CythonParser.parse_expression(text)
    }

    fn parse_simple_statement(&mut self, line: &'l LogicalLine<'s>) -> Result<Node, StubgenError> {
        if line.ends_with_colon() {
            // Compound statement whose body declares nothing we collect
            return Ok(self.opaque(line));
        }
        self.index += 1;
        let tokens = &line.tokens;

        if let Some(eq) = top_level_position(tokens, "=") {
            let (target_tokens, value_tokens) = (&tokens[..eq], &tokens[eq + 1..]);
            let Some(value_text) = self.tokens_text(value_tokens) else {
                return Err(self.error(tokens[eq].end, "expected expression after '='"));
            };
            if target_tokens.is_empty() {
                return Err(self.error(tokens[eq].start, "expected assignment target"));
            }
            if is_cascade(value_tokens) {
                return Ok(Node::Other(line.span()));
            }
            let target = match target_tokens {
                [name] if name.kind == TokenKind::Name => AssignmentTarget::Name {
                    name: name.text.to_string(),
                    annotation: None,
                },
                [name, colon, annotation @ ..]
                    if name.kind == TokenKind::Name && colon.is_op(":") && !annotation.is_empty() =>
                {
                    AssignmentTarget::Name {
                        name: name.text.to_string(),
                        annotation: self.tokens_text(annotation).map(str::to_string),
                    }
                }
                _ => AssignmentTarget::Complex,
            };
            return Ok(Node::Assignment(AssignmentNode {
                span: line.span(),
                target,
                value: classify(value_text),
            }));
        }

        if let [name, colon, annotation @ ..] = tokens.as_slice()
            && name.kind == TokenKind::Name
            && colon.is_op(":")
            && let Some(annotation) = self.tokens_text(annotation)
        {
            return Ok(Node::AnnotatedName(AnnotatedNameNode {
                span: line.span(),
                name: name.text.to_string(),
                annotation: annotation.to_string(),
            }));
        }
        Ok(Node::Other(line.span()))
    }

    /// An opaque statement, skipping its block if it opens one
    fn opaque(&mut self, line: &LogicalLine<'s>) -> Node {
        self.index += 1;
        if line.ends_with_colon() {
            self.skip_block(line.indent);
        }
        Node::Other(line.span())
    }
}

/// Split `tokens` on a separator operator outside of brackets
fn split_top_level<'t, 's>(tokens: &'t [Token<'s>], separator: &str) -> Vec<&'t [Token<'s>]> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Op {
            match token.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                text if text == separator && depth == 0 => {
                    items.push(&tokens[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
    }
    items.push(&tokens[start..]);
    items
}

/// Index of the first `op` outside of brackets
fn top_level_position(tokens: &[Token<'_>], op: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Op {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            text if text == op && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Index of the bracket closing the one at `open`
fn matching_bracket(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Op {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// A second top-level `=` outside a lambda means `a = b = value`
fn is_cascade(value: &[Token<'_>]) -> bool {
    match top_level_position(value, "=") {
        Some(eq) => !value[..eq].iter().any(|t| t.is_name("lambda")),
        None => false,
    }
}

/// Drop a trailing `not None` / `or None` argument check
fn strip_none_check<'t, 's>(tokens: &'t [Token<'s>]) -> &'t [Token<'s>] {
    match tokens {
        [rest @ .., check, none]
            if (check.is_name("not") || check.is_name("or")) && none.is_name("None") =>
        {
            rest
        }
        _ => tokens,
    }
}

/// Position of the parameter list of a C function declaration
///
/// The list must directly follow the function name and come before any
/// initializer; `(*name)(...)` function pointers are variables.
fn function_paren(declaration: &[Token<'_>]) -> Option<usize> {
    let open = declaration.iter().position(|t| t.is_op("(") || t.is_op("="))?;
    if !declaration[open].is_op("(") || open == 0 {
        return None;
    }
    let name = &declaration[open - 1];
    let is_pointer = declaration
        .get(open + 1)
        .is_some_and(|t| t.is_op("*") || t.is_op("&"));
    (name.kind == TokenKind::Name && !is_pointer).then_some(open)
}

/// Split a C argument declaration into its name and base type
///
/// An argument that names only a type (`f(int)`) is named after that type.
fn c_declaration(tokens: &[Token<'_>]) -> (String, Option<BaseType>) {
    match tokens {
        [name] => (name.text.to_string(), None),
        [type_tokens @ .., name]
            if name.kind == TokenKind::Name && !type_tokens.last().is_some_and(|t| t.is_op(".")) =>
        {
            let only_type_words = C_TYPE_NAMES.contains(&name.text)
                && type_tokens.iter().all(|t| {
                    t.kind == TokenKind::Name
                        && (TYPE_MODIFIERS.contains(&t.text) || TYPE_QUALIFIERS.contains(&t.text))
                });
            if only_type_words {
                let base = base_type(tokens).map_or_else(|| name.text.to_string(), |b| b.name);
                return (base, None);
            }
            (name.text.to_string(), base_type(type_tokens))
        }
        _ => {
            let name = tokens
                .iter()
                .rev()
                .find(|t| t.kind == TokenKind::Name)
                .map_or_else(|| "arg".to_string(), |t| t.text.to_string());
            (name, None)
        }
    }
}

/// Base type named by C type tokens, ignoring pointers and qualifiers
///
/// Templated, memoryview and ctuple types have no simple base type.
fn base_type(tokens: &[Token<'_>]) -> Option<BaseType> {
    if tokens.iter().any(|t| t.is_op("[") || t.is_op("(")) {
        return None;
    }
    let mut saw_modifier = false;
    let mut words: Vec<&Token<'_>> = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::Op if matches!(token.text, "*" | "**" | "&") => {}
            TokenKind::Name if TYPE_QUALIFIERS.contains(&token.text) => {}
            TokenKind::Name if TYPE_MODIFIERS.contains(&token.text) => saw_modifier = true,
            _ => words.push(token),
        }
    }
    if words.is_empty() {
        return saw_modifier.then(|| BaseType::simple("int"));
    }

    let is_dotted = words.len() % 2 == 1
        && words.iter().enumerate().all(|(idx, token)| {
            if idx % 2 == 0 {
                token.kind == TokenKind::Name
            } else {
                token.is_op(".")
            }
        });
    if is_dotted {
        let mut parts: Vec<String> = words
            .iter()
            .step_by(2)
            .map(|t| t.text.to_string())
            .collect();
        let name = parts.pop()?;
        return Some(BaseType {
            name,
            module_path: parts,
        });
    }
    words
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::Name)
        .map(|t| BaseType::simple(t.text))
}
