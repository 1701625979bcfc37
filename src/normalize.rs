//! Script normalization.
//!
//! Legacy scripts hide their top level inside immediately-invoked wrappers. Before any
//! analysis runs, wrappers that take no parameters and return nothing are unwrapped
//! (repeatedly, for nested wrappers) and their bodies dedented. Module code is always
//! strict, so top-level `'use strict'` directives are dropped as well.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, Expression, FunctionBody, ReturnStatement, Statement, TemplateLiteral,
    UnaryOperator,
};
use oxc_ast_visit::Visit;
use oxc_span::GetSpan;
use oxc_syntax::scope::ScopeFlags;

use crate::edit::{apply_edits, remove_statement};
use crate::parse::parse_program;

enum Wrapper<'s, 'a> {
    Unwrappable(&'s FunctionBody<'a>),
    Unsupported(&'static str),
}

fn strip<'s, 'a>(mut expr: &'s Expression<'a>) -> &'s Expression<'a> {
    loop {
        match expr {
            Expression::ParenthesizedExpression(p) => expr = &p.expression,
            Expression::UnaryExpression(u)
                if matches!(u.operator, UnaryOperator::LogicalNot | UnaryOperator::Void) =>
            {
                expr = &u.argument
            }
            _ => return expr,
        }
    }
}

fn is_global_receiver(argument: &Argument<'_>) -> bool {
    match argument.as_expression() {
        Some(Expression::ThisExpression(_)) => true,
        Some(Expression::Identifier(id)) => id.name == "window",
        _ => false,
    }
}

fn wrapper<'s, 'a>(expr: &'s Expression<'a>) -> Option<Wrapper<'s, 'a>> {
    let Expression::CallExpression(call) = strip(expr) else {
        return None;
    };
    let (callee, via_call) = match strip(&call.callee) {
        Expression::StaticMemberExpression(m)
            if m.property.name == "call" || m.property.name == "apply" =>
        {
            (strip(&m.object), true)
        }
        other => (other, false),
    };

    let (no_params, body) = match callee {
        Expression::FunctionExpression(f) => {
            if f.r#async || f.generator {
                return None;
            }
            let body = f.body.as_ref()?;
            (f.params.items.is_empty() && f.params.rest.is_none(), &**body)
        }
        Expression::ArrowFunctionExpression(a) => {
            if a.r#async || a.expression {
                return None;
            }
            (a.params.items.is_empty() && a.params.rest.is_none(), &*a.body)
        }
        _ => return None,
    };

    let no_args = if via_call {
        call.arguments.len() <= 1 && call.arguments.iter().all(is_global_receiver)
    } else {
        call.arguments.is_empty()
    };
    if !no_params || !no_args {
        return Some(Wrapper::Unsupported("wrapper takes parameters"));
    }

    let mut finder = ReturnFinder::default();
    finder.visit_function_body(body);
    if finder.found {
        return Some(Wrapper::Unsupported("wrapper returns a value"));
    }
    Some(Wrapper::Unwrappable(body))
}

/// Finds `return` statements that belong to the function being inspected.
#[derive(Default)]
struct ReturnFinder {
    found: bool,
}

impl<'a> Visit<'a> for ReturnFinder {
    fn visit_return_statement(&mut self, _it: &ReturnStatement<'a>) {
        self.found = true;
    }

    fn visit_function(&mut self, _func: &oxc_ast::ast::Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _func: &oxc_ast::ast::ArrowFunctionExpression<'a>) {}
}

/// Finds template literals spanning several lines, which dedenting would alter.
struct MultilineTemplates<'t> {
    source: &'t str,
    found: bool,
}

impl<'a, 't> Visit<'a> for MultilineTemplates<'t> {
    fn visit_template_literal(&mut self, it: &TemplateLiteral<'a>) {
        let text = &self.source[it.span.start as usize..it.span.end as usize];
        if text.contains('\n') {
            self.found = true;
        }
        oxc_ast_visit::walk::walk_template_literal(self, it);
    }
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Drop surrounding blank lines and the common indentation.
fn dedent(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().map(str::trim_end).collect();
    let Some(first) = lines.iter().position(|l| !l.is_empty()) else {
        return Vec::new();
    };
    let last = lines.iter().rposition(|l| !l.is_empty()).unwrap_or(first);
    let lines = &lines[first..=last];
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| leading_whitespace(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent.min(leading_whitespace(l))..).unwrap_or(l).to_string())
        .collect()
}

enum Step {
    Unwrapped(String),
    Done(Vec<String>),
}

fn unwrap_once(text: &str) -> Step {
    let allocator = Allocator::default();
    let Ok(program) = parse_program(&allocator, text) else {
        return Step::Done(Vec::new());
    };

    let mut unsupported = Vec::new();
    for stmt in &program.body {
        let Statement::ExpressionStatement(expr_stmt) = stmt else {
            continue;
        };
        match wrapper(&expr_stmt.expression) {
            Some(Wrapper::Unwrappable(body)) => {
                let span = stmt.span();
                return Step::Unwrapped(splice_body(text, span.start, span.end, body));
            }
            Some(Wrapper::Unsupported(reason)) => unsupported.push(reason.to_string()),
            None => {}
        }
    }
    Step::Done(unsupported)
}

fn splice_body(text: &str, start: u32, end: u32, body: &FunctionBody<'_>) -> String {
    let (start, end) = (start as usize, end as usize);
    let inner = &text[body.span.start as usize + 1..body.span.end as usize - 1];

    let mut templates = MultilineTemplates {
        source: text,
        found: false,
    };
    templates.visit_function_body(body);

    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let indent = &text[line_start..start];
    let (from, prefix) = if indent.trim().is_empty() {
        (line_start, indent)
    } else {
        (start, "")
    };

    let replacement = if templates.found {
        inner.trim().to_string()
    } else {
        dedent(inner)
            .iter()
            .map(|l| {
                if l.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", prefix, l)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..from]);
    out.push_str(&replacement);
    out.push_str(&text[end..]);
    out
}

fn is_use_strict(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::ExpressionStatement(s) => {
            matches!(&s.expression, Expression::StringLiteral(lit) if lit.value == "use strict")
        }
        _ => false,
    }
}

fn strip_use_strict(text: &str) -> String {
    let allocator = Allocator::default();
    let Ok(program) = parse_program(&allocator, text) else {
        return text.to_string();
    };
    let mut edits = Vec::new();
    for directive in &program.directives {
        if directive.directive == "use strict" {
            edits.push(remove_statement(text, directive.span));
        }
    }
    for stmt in &program.body {
        if is_use_strict(stmt) {
            edits.push(remove_statement(text, stmt.span()));
        }
    }
    if edits.is_empty() {
        return text.to_string();
    }
    apply_edits(text, edits)
}

/// Unwrap wrappers and drop strict-mode directives. Returns the new text and one
/// message per wrapper that had to be left in place.
pub fn normalize_script(source: &str) -> (String, Vec<String>) {
    let mut text = source.to_string();
    let unsupported = loop {
        match unwrap_once(&text) {
            Step::Unwrapped(next) => text = next,
            Step::Done(unsupported) => break unsupported,
        }
    };
    (strip_use_strict(&text), unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwraps_function_wrapper() {
        let source = "(function() {\n  'use strict';\n  NS.a = 1;\n\n  NS.b = 2;\n})();";
        let (text, unsupported) = normalize_script(source);
        assert_eq!(text, "NS.a = 1;\n\nNS.b = 2;");
        assert!(unsupported.is_empty());
    }

    #[test]
    fn test_unwraps_nested_and_arrow_wrappers() {
        let source = "(() => {\n  (function() {\n    NS.a = 1;\n  }).call(this);\n})();";
        let (text, _) = normalize_script(source);
        assert_eq!(text, "NS.a = 1;");
    }

    #[test]
    fn test_bang_wrapper() {
        let (text, _) = normalize_script("!function() {\n  go();\n}();");
        assert_eq!(text, "go();");
    }

    #[test]
    fn test_wrapper_with_parameters_is_left() {
        let source = "(function(NS) {\n  NS.a = 1;\n})(window.NS);";
        let (text, unsupported) = normalize_script(source);
        assert_eq!(text, source);
        assert_eq!(unsupported, vec!["wrapper takes parameters".to_string()]);
    }

    #[test]
    fn test_wrapper_with_return_is_left() {
        let source = "(function() {\n  return 1;\n})();";
        let (text, unsupported) = normalize_script(source);
        assert_eq!(text, source);
        assert_eq!(unsupported.len(), 1);
    }

    #[test]
    fn test_nested_return_does_not_block_unwrapping() {
        let source = "(function() {\n  function f() {\n    return 1;\n  }\n})();";
        let (text, _) = normalize_script(source);
        assert_eq!(text, "function f() {\n  return 1;\n}");
    }

    #[test]
    fn test_plain_script_unchanged() {
        let source = "  console.log('hi');";
        assert_eq!(normalize_script(source).0, source);
    }
}
