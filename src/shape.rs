//! Top-level statement shapes that publish namespace members.
//!
//! Both the registry scan and the per-document rewrite classify statements through this
//! module, so a statement counts as a declaration in one pass if and only if it does in
//! the other.

use oxc_ast::ast::{
    AssignmentOperator, BindingPattern, Expression, LogicalOperator, ObjectExpression,
    ObjectProperty, ObjectPropertyKind, Program, PropertyKey, PropertyKind, Statement,
};
use oxc_span::Span;
use std::collections::{HashMap, HashSet};

use crate::member::{parent_path, top_level_path, MemberChain};
use crate::registry::BindingKind;
use crate::settings::{is_identifier, ConversionSettings};

pub struct ObjectMember<'s, 'a> {
    pub key: String,
    pub property: &'s ObjectProperty<'a>,
    pub kind: BindingKind,
}

/// A top-level `const|let|var name = { ... };`
#[derive(Clone, Copy)]
pub struct LocalObject<'s, 'a> {
    pub object: &'s ObjectExpression<'a>,
    pub statement: Span,
}

pub type LocalObjects<'s, 'a> = HashMap<String, LocalObject<'s, 'a>>;

pub enum Shape<'s, 'a> {
    /// `NS.sub = NS.sub || {};`
    SelfInit { path: String },
    /// `NS.member = value;`
    Member {
        path: String,
        value: &'s Expression<'a>,
    },
    /// `NS.sub = { a: 1, b() {} };`
    NamespaceObject {
        path: String,
        object: &'s ObjectExpression<'a>,
    },
    /// `NS.sub = localObject;` where `localObject` is a top-level object literal
    LocalNamespace { path: String, local: String },
    Other,
}

pub fn kind_of(value: &Expression<'_>) -> BindingKind {
    match value {
        Expression::FunctionExpression(_) | Expression::ArrowFunctionExpression(_) => {
            BindingKind::Function
        }
        Expression::ClassExpression(_) => BindingKind::Class,
        _ => BindingKind::Value,
    }
}

/// Properties of an object literal that can each become a separate export, or `None`
/// when any property is computed, spread, an accessor, or duplicated.
pub fn expandable_members<'s, 'a>(
    object: &'s ObjectExpression<'a>,
) -> Option<Vec<ObjectMember<'s, 'a>>> {
    let mut members = Vec::new();
    let mut seen = HashSet::new();
    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(p) = property else {
            return None;
        };
        if p.kind != PropertyKind::Init || p.computed {
            return None;
        }
        let key = match &p.key {
            PropertyKey::StaticIdentifier(id) => id.name.to_string(),
            PropertyKey::StringLiteral(s) if is_identifier(s.value.as_str()) => s.value.to_string(),
            _ => return None,
        };
        if !seen.insert(key.clone()) {
            return None;
        }
        members.push(ObjectMember {
            key,
            property: p,
            kind: kind_of(&p.value),
        });
    }
    Some(members)
}

pub fn local_objects<'s, 'a>(program: &'s Program<'a>) -> LocalObjects<'s, 'a> {
    let mut locals = HashMap::new();
    for stmt in &program.body {
        let Statement::VariableDeclaration(decl) = stmt else {
            continue;
        };
        if decl.declarations.len() != 1 {
            continue;
        }
        let declarator = &decl.declarations[0];
        let (BindingPattern::BindingIdentifier(id), Some(Expression::ObjectExpression(object))) =
            (&declarator.id, &declarator.init)
        else {
            continue;
        };
        locals.insert(
            id.name.to_string(),
            LocalObject {
                object,
                statement: decl.span,
            },
        );
    }
    locals
}

fn is_self_init(value: &Expression<'_>, path: &str, settings: &ConversionSettings) -> bool {
    let Expression::LogicalExpression(logical) = value else {
        return false;
    };
    if logical.operator != LogicalOperator::Or {
        return false;
    }
    if !matches!(&logical.right, Expression::ObjectExpression(o) if o.properties.is_empty()) {
        return false;
    }
    MemberChain::of_expression(&logical.left)
        .and_then(|chain| top_level_path(&chain, settings))
        .is_some_and(|left| left == path)
}

pub fn classify<'s, 'a>(
    stmt: &'s Statement<'a>,
    settings: &ConversionSettings,
    locals: &LocalObjects<'s, 'a>,
) -> Shape<'s, 'a> {
    match stmt {
        Statement::ExpressionStatement(expr_stmt) => {
            let Expression::AssignmentExpression(assign) = &expr_stmt.expression else {
                return Shape::Other;
            };
            if assign.operator != AssignmentOperator::Assign {
                return Shape::Other;
            }
            let Some(chain) = MemberChain::of_assignment_target(&assign.left) else {
                return Shape::Other;
            };
            if chain.segments.len() < 2 {
                return Shape::Other;
            }
            let Some(path) = top_level_path(&chain, settings) else {
                return Shape::Other;
            };

            if is_self_init(&assign.right, &path, settings) {
                return Shape::SelfInit { path };
            }
            if settings.reference_excludes.contains(&path) {
                return match parent_path(&path) {
                    Some(_) => Shape::Member {
                        path,
                        value: &assign.right,
                    },
                    None => Shape::Other,
                };
            }
            match &assign.right {
                Expression::ObjectExpression(object) if expandable_members(object).is_some() => {
                    return Shape::NamespaceObject { path, object };
                }
                Expression::Identifier(id) => {
                    let local = id.name.as_str();
                    if locals
                        .get(local)
                        .is_some_and(|l| expandable_members(l.object).is_some())
                    {
                        return Shape::LocalNamespace {
                            path,
                            local: local.to_string(),
                        };
                    }
                }
                _ => {}
            }
            if parent_path(&path).is_none() {
                return Shape::Other;
            }
            Shape::Member {
                path,
                value: &assign.right,
            }
        }
        // var NS = window.NS || {};
        Statement::VariableDeclaration(decl) if decl.declarations.len() == 1 => {
            let declarator = &decl.declarations[0];
            match (&declarator.id, &declarator.init) {
                (BindingPattern::BindingIdentifier(id), Some(init))
                    if settings.is_namespace_root(id.name.as_str())
                        && is_self_init(init, id.name.as_str(), settings) =>
                {
                    Shape::SelfInit {
                        path: id.name.to_string(),
                    }
                }
                _ => Shape::Other,
            }
        }
        _ => Shape::Other,
    }
}

/// Functions whose `this` is a namespace: function start offset -> namespace path.
pub fn method_contexts<'s, 'a>(
    program: &'s Program<'a>,
    settings: &ConversionSettings,
    locals: &LocalObjects<'s, 'a>,
) -> HashMap<u32, String> {
    fn add_object(methods: &mut HashMap<u32, String>, path: &str, object: &ObjectExpression<'_>) {
        for member in expandable_members(object).unwrap_or_default() {
            if let Expression::FunctionExpression(func) = &member.property.value {
                methods.insert(func.span.start, path.to_string());
            }
        }
    }

    let mut methods = HashMap::new();

    for stmt in &program.body {
        match classify(stmt, settings, locals) {
            Shape::Member {
                path,
                value: Expression::FunctionExpression(func),
            } => {
                if path.split('.').any(|s| s == "prototype") {
                    continue;
                }
                if let Some(parent) = parent_path(&path) {
                    methods.insert(func.span.start, parent.to_string());
                }
            }
            Shape::NamespaceObject { path, object } => add_object(&mut methods, &path, object),
            Shape::LocalNamespace { path, local } => {
                if let Some(l) = locals.get(&local) {
                    add_object(&mut methods, &path, l.object);
                }
            }
            _ => {}
        }
    }
    methods
}

/// Local object names published as namespaces: local name -> namespace path.
pub fn local_aliases<'s, 'a>(
    program: &'s Program<'a>,
    settings: &ConversionSettings,
    locals: &LocalObjects<'s, 'a>,
) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    for stmt in &program.body {
        if let Shape::LocalNamespace { path, local } = classify(stmt, settings, locals) {
            aliases.entry(local).or_insert(path);
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;
    use oxc_allocator::Allocator;

    fn shapes(source: &str) -> Vec<String> {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, source).unwrap();
        let settings = ConversionSettings::new().with_namespace("NS");
        let locals = local_objects(&program);
        program
            .body
            .iter()
            .map(|stmt| match classify(stmt, &settings, &locals) {
                Shape::SelfInit { path } => format!("init {}", path),
                Shape::Member { path, value } => format!("member {} {:?}", path, kind_of(value)),
                Shape::NamespaceObject { path, .. } => format!("object {}", path),
                Shape::LocalNamespace { path, local } => format!("local {} {}", path, local),
                Shape::Other => "other".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_classifies_declarations() {
        let out = shapes(
            "window.NS = window.NS || {};\n\
             NS.util = NS.util || {};\n\
             NS.a = 1;\n\
             NS.f = function() {};\n\
             NS.K = class {};\n\
             NS.obj = { x: 1, y() {} };\n\
             const L = { z: 2 };\n\
             NS.loc = L;\n\
             NS.a += 1;\n\
             other.x = 1;",
        );
        assert_eq!(
            out,
            vec![
                "init NS",
                "init NS.util",
                "member NS.a Value",
                "member NS.f Function",
                "member NS.K Class",
                "object NS.obj",
                "other",
                "local NS.loc L",
                "other",
                "other",
            ]
        );
    }

    #[test]
    fn test_computed_object_is_a_value() {
        let out = shapes("NS.obj = { [k]: 1 };");
        assert_eq!(out, vec!["member NS.obj Value"]);
    }

    #[test]
    fn test_method_contexts() {
        let allocator = Allocator::default();
        let source = "NS.util = { run() { this.x(); } };\nNS.go = function() {};";
        let program = parse_program(&allocator, source).unwrap();
        let settings = ConversionSettings::new().with_namespace("NS");
        let locals = local_objects(&program);
        let methods = method_contexts(&program, &settings, &locals);
        let mut values: Vec<&String> = methods.values().collect();
        values.sort();
        assert_eq!(values, vec!["NS", "NS.util"]);
    }
}
