//! Template relocation.
//!
//! Templates owned by element containers move into the script definition of the
//! element they belong to: a static `template` accessor on a class, or a `_template`
//! property on a factory call. Markup with no owner is re-inserted into the page by
//! script at its original position.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, BindingPattern, CallExpression, Class, ClassElement, Expression, MethodDefinitionKind,
    ObjectPropertyKind, PropertyKey, Statement, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use std::collections::{HashMap, HashSet};

use crate::document::Fragment;
use crate::edit::Edit;
use crate::imports::ImportSet;
use crate::member::MemberChain;
use crate::parse::parse_program;
use crate::settings::ConversionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionStyle {
    /// `class extends ... { static get is() { return 'x-el'; } }`
    Class,
    /// `Polymer({ is: 'x-el', ... })`
    Factory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDefinition {
    pub name: String,
    /// Offset just inside the class body or factory object
    pub insert_at: u32,
    pub style: DefinitionStyle,
}

fn key_is(key: &PropertyKey<'_>, name: &str) -> bool {
    match key {
        PropertyKey::StaticIdentifier(id) => id.name == name,
        PropertyKey::StringLiteral(s) => s.value == name,
        _ => false,
    }
}

fn string_value(expr: &Expression<'_>) -> Option<String> {
    match expr {
        Expression::StringLiteral(s) => Some(s.value.to_string()),
        Expression::TemplateLiteral(t) if t.expressions.is_empty() && t.quasis.len() == 1 => {
            Some(t.quasis[0].value.raw.to_string())
        }
        _ => None,
    }
}

/// Element name declared by a class through a static `is` getter or field.
fn static_is(class: &Class<'_>) -> Option<String> {
    for element in &class.body.body {
        match element {
            ClassElement::MethodDefinition(method)
                if method.r#static
                    && method.kind == MethodDefinitionKind::Get
                    && key_is(&method.key, "is") =>
            {
                let body = method.value.body.as_ref()?;
                for stmt in &body.statements {
                    if let Statement::ReturnStatement(ret) = stmt {
                        return ret.argument.as_ref().and_then(string_value);
                    }
                }
            }
            ClassElement::PropertyDefinition(prop) if prop.r#static && key_is(&prop.key, "is") => {
                return prop.value.as_ref().and_then(string_value);
            }
            _ => {}
        }
    }
    None
}

struct DefinitionFinder<'x> {
    settings: &'x ConversionSettings,
    /// Class name -> body insertion point
    classes: HashMap<String, u32>,
    defines: Vec<(String, String)>,
    found: Vec<ElementDefinition>,
}

impl<'a> Visit<'a> for DefinitionFinder<'_> {
    fn visit_class(&mut self, class: &Class<'a>) {
        let insert_at = class.body.span.start + 1;
        if let Some(id) = &class.id {
            self.classes.insert(id.name.to_string(), insert_at);
        }
        if let Some(name) = static_is(class) {
            self.found.push(ElementDefinition {
                name,
                insert_at,
                style: DefinitionStyle::Class,
            });
        }
        walk::walk_class(self, class);
    }

    fn visit_variable_declarator(&mut self, declarator: &VariableDeclarator<'a>) {
        if let (BindingPattern::BindingIdentifier(id), Some(Expression::ClassExpression(class))) =
            (&declarator.id, &declarator.init)
        {
            self.classes
                .insert(id.name.to_string(), class.body.span.start + 1);
        }
        walk::walk_variable_declarator(self, declarator);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        let callee = MemberChain::of_expression(&call.callee);
        let segments = callee.as_ref().map(|c| c.segments.as_slice()).unwrap_or_default();

        if segments.ends_with(&["customElements", "define"]) {
            let name = call.arguments.first().and_then(Argument::as_expression).and_then(string_value);
            match (name, call.arguments.get(1).and_then(Argument::as_expression)) {
                (Some(name), Some(Expression::Identifier(class))) => {
                    self.defines.push((name, class.name.to_string()));
                }
                (Some(name), Some(Expression::ClassExpression(class))) => {
                    self.found.push(ElementDefinition {
                        name,
                        insert_at: class.body.span.start + 1,
                        style: DefinitionStyle::Class,
                    });
                }
                _ => {}
            }
        } else if segments.len() == 1 && self.settings.factory_functions.contains(segments[0]) {
            if let Some(Expression::ObjectExpression(object)) =
                call.arguments.first().and_then(Argument::as_expression)
            {
                let name = object.properties.iter().find_map(|p| match p {
                    ObjectPropertyKind::ObjectProperty(p) if key_is(&p.key, "is") => {
                        string_value(&p.value)
                    }
                    _ => None,
                });
                if let Some(name) = name {
                    self.found.push(ElementDefinition {
                        name,
                        insert_at: object.span.start + 1,
                        style: DefinitionStyle::Factory,
                    });
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// Element definitions in a script, in source order.
pub fn element_definitions(source: &str, settings: &ConversionSettings) -> Vec<ElementDefinition> {
    let allocator = Allocator::default();
    let Ok(program) = parse_program(&allocator, source) else {
        return Vec::new();
    };
    let mut finder = DefinitionFinder {
        settings,
        classes: HashMap::new(),
        defines: Vec::new(),
        found: Vec::new(),
    };
    finder.visit_program(&program);

    let mut found = finder.found;
    for (name, class) in finder.defines {
        if let Some(&insert_at) = finder.classes.get(&class) {
            if !found.iter().any(|d| d.insert_at == insert_at) {
                found.push(ElementDefinition {
                    name,
                    insert_at,
                    style: DefinitionStyle::Class,
                });
            }
        }
    }
    found.sort_by_key(|d| d.insert_at);
    found
}

/// Escape markup for a template literal.
pub fn escape_template(content: &str) -> String {
    content
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
        .replace("</script", "<\\/script")
}

fn template_accessor(
    style: DefinitionStyle,
    content: &str,
    imports: &mut ImportSet,
    settings: &ConversionSettings,
) -> String {
    let escaped = escape_template(content);
    match (style, &settings.html_tag) {
        (DefinitionStyle::Class, Some(tag)) => {
            let html = imports.named(&tag.url, &tag.name);
            format!(
                "\n  static get template() {{\n    return {}`{}`;\n  }}\n",
                html, escaped
            )
        }
        (DefinitionStyle::Class, None) => format!(
            "\n  static get template() {{\n    const template = document.createElement('template');\n    template.innerHTML = `{}`;\n    return template;\n  }}\n",
            escaped
        ),
        (DefinitionStyle::Factory, Some(tag)) => {
            let html = imports.named(&tag.url, &tag.name);
            format!("\n  _template: {}`{}`,", html, escaped)
        }
        (DefinitionStyle::Factory, None) => format!(
            "\n  _template: Object.assign(document.createElement('template'), {{ innerHTML: `{}` }}),",
            escaped
        ),
    }
}

fn import_meta_accessor(style: DefinitionStyle) -> &'static str {
    match style {
        DefinitionStyle::Class => "\n  static get importMeta() {\n    return import.meta;\n  }\n",
        DefinitionStyle::Factory => "\n  importMeta: import.meta,",
    }
}

/// Statements that insert markup into the current page.
pub fn load_into_document(html: &str, imports: &mut ImportSet) -> String {
    let container = imports.reserve("$_documentContainer");
    format!(
        "const {c} = document.createElement('template');\n{c}.innerHTML = `{html}`;\ndocument.head.appendChild({c}.content);",
        c = container,
        html = escape_template(html)
    )
}

#[derive(Debug, Default)]
pub struct RelocationPlan {
    /// Template fragments that moved into a definition
    pub owned: HashSet<usize>,
    /// Script fragment index -> insertion edits
    pub edits: HashMap<usize, Vec<Edit>>,
}

/// Match each template to the nearest following definition of the same element and
/// produce the insertion edits for the script fragments.
pub fn plan_relocation(
    fragments: &[Fragment],
    scripts: &[usize],
    settings: &ConversionSettings,
    imports: &mut ImportSet,
) -> RelocationPlan {
    let mut plan = RelocationPlan::default();
    let definitions: Vec<(usize, ElementDefinition)> = scripts
        .iter()
        .filter_map(|&i| match &fragments[i] {
            Fragment::Script(script) => Some((i, script)),
            _ => None,
        })
        .flat_map(|(i, script)| {
            element_definitions(&script.source, settings)
                .into_iter()
                .map(move |d| (i, d))
        })
        .collect();

    let mut claimed: HashSet<usize> = HashSet::new();
    for (index, fragment) in fragments.iter().enumerate() {
        let Fragment::Template(template) = fragment else {
            continue;
        };
        let owner = definitions.iter().enumerate().find(|(n, (at, def))| {
            *at > index && def.name == template.element_id && !claimed.contains(n)
        });
        if let Some((n, (at, def))) = owner {
            claimed.insert(n);
            plan.owned.insert(index);
            let text = template_accessor(def.style, &template.content, imports, settings);
            plan.edits
                .entry(*at)
                .or_default()
                .push(Edit::insert(def.insert_at, text));
        }
    }

    if settings.add_import_meta {
        for (at, def) in &definitions {
            plan.edits
                .entry(*at)
                .or_default()
                .push(Edit::insert(def.insert_at, import_meta_accessor(def.style)));
        }
    }
    plan
}
