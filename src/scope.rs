use oxc_ast::ast::{
    ArrowFunctionExpression, BindingIdentifier, CatchClause, Function, FunctionType,
    IdentifierReference, Program,
};
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

lazy_static::lazy_static! {
    /// Names the synthesized module text may introduce or rely on. Import aliases and
    /// export locals never take them.
    pub static ref RESERVED_NAMES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("window");
        s.insert("document");
        s.insert("undefined");
        s.insert("arguments");
        s.insert("eval");

        // Words that cannot be a binding name in module code
        for word in [
            "await", "break", "case", "catch", "class", "const", "continue", "debugger",
            "default", "delete", "do", "else", "enum", "export", "extends", "false",
            "finally", "for", "function", "if", "implements", "import", "in", "instanceof",
            "interface", "let", "new", "null", "package", "private", "protected", "public",
            "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
            "var", "void", "while", "with", "yield",
        ] {
            s.insert(word);
        }
        s
    };
}

/// Collects every identifier a program binds or references.
#[derive(Default)]
pub struct NameCollector {
    pub names: HashSet<String>,
}

impl NameCollector {
    pub fn collect(program: &Program<'_>, names: &mut HashSet<String>) {
        let mut collector = NameCollector::default();
        collector.visit_program(program);
        names.extend(collector.names);
    }
}

impl<'a> Visit<'a> for NameCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.names.insert(ident.name.to_string());
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }
}

/// `name`, or `name$1`, `name$2`, ... whichever is first not taken.
pub fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) && !RESERVED_NAMES.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}${}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// What `this` means at the current point of a walk.
///
/// Every non-arrow function pushes a frame. A frame is `Some(namespace)` when the
/// function is a method of a namespace object, `None` otherwise. Arrow functions
/// inherit the enclosing frame.
#[derive(Debug, Default)]
pub struct ThisScope {
    stack: Vec<Option<String>>,
}

impl ThisScope {
    pub fn enter_function(&mut self, start: u32, methods: &HashMap<u32, String>) {
        self.stack.push(methods.get(&start).cloned());
    }

    pub fn enter_opaque(&mut self) {
        self.stack.push(None);
    }

    pub fn exit(&mut self) {
        self.stack.pop();
    }

    pub fn is_top_level(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.stack.last().and_then(|frame| frame.as_deref())
    }
}

/// Names one function scope binds: parameters and every declaration in its body, up
/// to the nested functions, which get frames of their own.
#[derive(Default)]
struct FrameCollector {
    names: HashSet<String>,
}

impl<'a> Visit<'a> for FrameCollector {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        if matches!(func.r#type, FunctionType::FunctionDeclaration) {
            if let Some(id) = &func.id {
                self.names.insert(id.name.to_string());
            }
        }
    }

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}
}

/// Identifiers bound by the functions enclosing the current point of a walk.
///
/// Document-level bindings are not tracked: a top-level `var NS = NS || {}` names the
/// namespace itself. A block-scoped declaration counts for its whole function.
#[derive(Debug, Default)]
pub struct LocalBindings {
    frames: Vec<HashSet<String>>,
}

impl LocalBindings {
    pub fn enter_function(&mut self, func: &Function<'_>) {
        let mut collector = FrameCollector::default();
        if matches!(func.r#type, FunctionType::FunctionExpression) {
            if let Some(id) = &func.id {
                collector.names.insert(id.name.to_string());
            }
        }
        collector.visit_formal_parameters(&func.params);
        if let Some(body) = &func.body {
            collector.visit_function_body(body);
        }
        self.frames.push(collector.names);
    }

    pub fn enter_arrow(&mut self, arrow: &ArrowFunctionExpression<'_>) {
        let mut collector = FrameCollector::default();
        collector.visit_formal_parameters(&arrow.params);
        collector.visit_function_body(&arrow.body);
        self.frames.push(collector.names);
    }

    pub fn enter_catch(&mut self, clause: &CatchClause<'_>) {
        let mut collector = FrameCollector::default();
        if let Some(param) = &clause.param {
            collector.visit_binding_pattern(&param.pattern);
        }
        self.frames.push(collector.names);
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }
}
