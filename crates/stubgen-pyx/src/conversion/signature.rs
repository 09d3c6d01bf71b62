//! Signature extraction for plain and native functions

use super::utils::unparse_expression;
use crate::{
    error::StubgenError,
    model::{Argument, Signature},
    syntax::{ArgumentNode, BaseType, FunctionNode, NativeFunctionNode},
};

/// Signature of a `def` / `async def` function
pub fn function_signature(node: &FunctionNode) -> Result<Signature, StubgenError> {
    let args = convert_arguments(&node.name, &node.args)?;
    let mut signature = Signature::new(args, node.num_posonly_args, node.num_kwonly_args)?;
    signature.var_arg = node
        .star_arg
        .as_ref()
        .map(|arg| convert_argument(&node.name, arg))
        .transpose()?;
    signature.kw_arg = node
        .starstar_arg
        .as_ref()
        .map(|arg| convert_argument(&node.name, arg))
        .transpose()?;
    signature.return_annotation = node.return_annotation.clone();
    Ok(signature)
}

/// Signature of a `cpdef` function
///
/// Native functions have no variadic or keyword-only parameters; the return
/// type falls back to the declared C base type.
pub fn native_function_signature(node: &NativeFunctionNode) -> Result<Signature, StubgenError> {
    let mut signature = Signature::positional(convert_arguments(&node.name, &node.args)?);
    signature.return_annotation = node
        .return_annotation
        .clone()
        .or_else(|| node.return_base_type.as_ref().map(type_name));
    Ok(signature)
}

fn convert_arguments(
    function: &str,
    args: &[ArgumentNode],
) -> Result<Vec<Argument>, StubgenError> {
    args.iter()
        .map(|arg| convert_argument(function, arg))
        .collect()
}

fn convert_argument(function: &str, arg: &ArgumentNode) -> Result<Argument, StubgenError> {
    if arg.name.is_empty() {
        return Err(StubgenError::InternalShape(format!(
            "argument without a name in function {function}"
        )));
    }
    Ok(Argument {
        name: arg.name.clone(),
        annotation: arg
            .annotation
            .clone()
            .or_else(|| arg.base_type.as_ref().map(type_name)),
        default: arg
            .default
            .as_ref()
            .map(|default| unparse_expression(default).into_owned()),
    })
}

/// Bare type name, without the module path it was written with
fn type_name(base_type: &BaseType) -> String {
    base_type.name.clone()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::syntax::{Expression, Span};

    fn function(args: Vec<ArgumentNode>, posonly: usize, kwonly: usize) -> FunctionNode {
        FunctionNode {
            span: Span::default(),
            name: "f".into(),
            is_async: false,
            doc: None,
            decorators: Vec::new(),
            args,
            star_arg: None,
            starstar_arg: None,
            num_posonly_args: posonly,
            num_kwonly_args: kwonly,
            return_annotation: None,
        }
    }

    #[test]
    fn test_annotation_precedence() {
        let typed = ArgumentNode {
            base_type: Some(BaseType {
                name: "ndarray".into(),
                module_path: vec!["np".into()],
            }),
            ..ArgumentNode::named("a")
        };
        let annotated = ArgumentNode {
            annotation: Some("list[int]".into()),
            base_type: Some(BaseType::simple("object")),
            default: Some(Expression::Other("[]".into())),
            ..ArgumentNode::named("b")
        };
        let signature = function_signature(&function(vec![typed, annotated], 0, 0)).unwrap();

        assert_eq!(
            signature.args(),
            &[
                Argument::new("a").with_annotation("ndarray"),
                Argument::new("b").with_annotation("list[int]").with_default("..."),
            ]
        );
    }

    #[test]
    fn test_variadics_and_counts() {
        let mut node = function(
            vec![ArgumentNode::named("a"), ArgumentNode::named("b")],
            1,
            1,
        );
        node.star_arg = Some(ArgumentNode {
            annotation: Some("int".into()),
            ..ArgumentNode::named("args")
        });
        node.starstar_arg = Some(ArgumentNode::named("kwargs"));
        node.return_annotation = Some("None".into());

        let signature = function_signature(&node).unwrap();
        assert_eq!(signature.num_posonly_args(), 1);
        assert_eq!(signature.num_kwonly_args(), 1);
        assert_eq!(
            signature.var_arg,
            Some(Argument::new("args").with_annotation("int"))
        );
        assert_eq!(signature.kw_arg, Some(Argument::new("kwargs")));
        assert_eq!(signature.return_annotation.as_deref(), Some("None"));
    }

    #[test]
    fn test_inconsistent_counts_are_internal_errors() {
        let node = function(vec![ArgumentNode::named("a")], 1, 1);
        assert!(matches!(
            function_signature(&node),
            Err(StubgenError::InternalShape(_))
        ));
    }

    #[test]
    fn test_native_return_type_fallback() {
        let node = NativeFunctionNode {
            span: Span::default(),
            name: "g".into(),
            doc: None,
            decorators: Vec::new(),
            args: vec![ArgumentNode {
                base_type: Some(BaseType::simple("double")),
                default: Some(Expression::Number("1.5".into())),
                ..ArgumentNode::named("x")
            }],
            return_base_type: Some(BaseType::simple("bint")),
            return_annotation: None,
            overridable: true,
        };
        let signature = native_function_signature(&node).unwrap();
        assert_eq!(
            signature.args(),
            &[Argument::new("x").with_annotation("double").with_default("1.5")]
        );
        assert_eq!(signature.return_annotation.as_deref(), Some("bint"));
    }
}
