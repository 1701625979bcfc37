//! # Reference Rewriter
//!
//! Turns one script fragment of a converted document into module code by span edits:
//!
//! - declaring statements become export declarations,
//! - namespace references become local names or imports,
//! - `this` inside namespace methods becomes the sibling binding,
//! - top-level `this` becomes the global object.
//!
//! References between documents of the same cyclic group are left as they are.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, AssignmentExpression, BindingPattern, CatchClause, Expression,
    Function, ObjectExpression, ObjectProperty, Program, PropertyDefinition, Statement,
    StaticBlock, UnaryExpression, UnaryOperator, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

use crate::cycle::CycleAnalysis;
use crate::edit::{apply_edits, remove_statement, Edit};
use crate::error::{
    Diagnostic, Diagnostics, DIAG_IMPORTED_BINDING_REASSIGNED, DIAG_UNRESOLVED_REFERENCE,
};
use crate::imports::ImportSet;
use crate::member::{chain_path, last_segment, ChainPath, ChainRoot, MemberChain, PathContext};
use crate::parse::parse_program;
use crate::registry::{BindingKind, ExportBinding, NamespaceRegistry, Resolution, Site};
use crate::settings::ConversionSettings;
use crate::shape::{self, LocalObjects, Shape};
use crate::scope::{LocalBindings, ThisScope};

/// Per-document state shared by every fragment of one output module.
pub struct DocumentContext<'r> {
    pub url: &'r str,
    pub registry: &'r NamespaceRegistry,
    pub settings: &'r ConversionSettings,
    pub cycles: &'r CycleAnalysis,
    pub imports: ImportSet,
    pub diagnostics: Diagnostics,
    /// `export { local as name };` lines appended after the body
    pub trailer: Vec<String>,
    reported: HashSet<String>,
}

impl<'r> DocumentContext<'r> {
    pub fn new(
        url: &'r str,
        registry: &'r NamespaceRegistry,
        settings: &'r ConversionSettings,
        cycles: &'r CycleAnalysis,
    ) -> Self {
        DocumentContext {
            url,
            registry,
            settings,
            cycles,
            imports: ImportSet::new(registry.taken_names(url)),
            diagnostics: Diagnostics::new(),
            trailer: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn warn_unresolved(&mut self, path: &str) {
        if self.reported.insert(path.to_string()) {
            self.diagnostics.push(Diagnostic::warning(
                DIAG_UNRESOLVED_REFERENCE,
                self.url,
                format!("'{}' has no known declaration; left unchanged", path),
            ));
        }
    }

    fn warn_reassigned(&mut self, path: &str, owner: &str) {
        let key = format!("={}", path);
        if self.reported.insert(key) {
            self.diagnostics.push(Diagnostic::warning(
                DIAG_IMPORTED_BINDING_REASSIGNED,
                self.url,
                format!(
                    "'{}' is declared in '{}'; assignments from other modules are left unchanged",
                    path, owner
                ),
            ));
        }
    }

    /// Text standing for a binding here, or `None` when the reference must stay as is.
    fn reference_to(&mut self, id: usize) -> Option<String> {
        let registry = self.registry;
        let mut id = id;
        if registry.binding(id).document == self.url {
            id = registry.reexport_target(id);
        }
        let binding = registry.binding(id);
        if binding.document == self.url {
            return Some(binding.local_name.clone());
        }
        if self.cycles.is_degraded(self.url, &binding.document) {
            return None;
        }
        Some(self.imports.named(&binding.document, &binding.export_name))
    }

    fn warn_partial_namespace(&mut self, path: &str) {
        if self.reported.insert(format!("*{}", path)) {
            self.diagnostics.push(Diagnostic::warning(
                DIAG_UNRESOLVED_REFERENCE,
                self.url,
                format!(
                    "'{}' is not exported as a whole by its module; left unchanged",
                    path
                ),
            ));
        }
    }

    fn namespace_reference(&mut self, path: &str) -> Option<String> {
        let document = self.registry.namespace(path)?.document.as_deref()?;
        if document != self.url && self.cycles.is_degraded(self.url, document) {
            return None;
        }
        if !self.registry.is_whole_importable(path) {
            self.warn_partial_namespace(path);
            return None;
        }
        Some(self.imports.namespace(document, last_segment(path)))
    }

    /// `export` keyword for a declaration of `binding`, or an alias line in the trailer
    /// when its local name differs from the exported one.
    fn export_keyword(&mut self, binding: &ExportBinding) -> &'static str {
        if binding.local_name == binding.export_name {
            "export "
        } else {
            self.trailer.push(format!(
                "export {{ {} as {} }};",
                binding.local_name, binding.export_name
            ));
            ""
        }
    }

    /// `export let member;` lines for members declared only by writes inside functions.
    pub fn implicit_declarations(&mut self) -> Vec<String> {
        let registry = self.registry;
        let url = self.url;
        let mut lines = Vec::new();
        for binding in registry.declared_in(url).filter(|b| b.implicit) {
            let keyword = self.export_keyword(binding);
            lines.push(format!("{}let {};", keyword, binding.local_name));
        }
        lines
    }
}

/// Rewrite one script fragment. `extra` edits (template relocation) are applied in the
/// same pass. Fails with the parser message when the fragment does not parse.
pub fn rewrite_script(
    cx: &mut DocumentContext<'_>,
    fragment: usize,
    source: &str,
    extra: Vec<Edit>,
) -> Result<String, String> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, source)?;
    let locals = shape::local_objects(&program);
    let methods = shape::method_contexts(&program, cx.settings, &locals);
    let aliases = shape::local_aliases(&program, cx.settings, &locals);

    let mut rewriter = ScriptRewriter {
        cx,
        source,
        fragment,
        methods,
        aliases,
        this_scope: ThisScope::default(),
        locals: LocalBindings::default(),
        edits: Vec::new(),
    };
    rewriter.rewrite_program(&program, &locals);

    let mut edits = rewriter.edits;
    edits.extend(extra);
    Ok(apply_edits(source, edits))
}

struct ScriptRewriter<'c, 'r> {
    cx: &'c mut DocumentContext<'r>,
    source: &'c str,
    fragment: usize,
    methods: HashMap<u32, String>,
    aliases: HashMap<String, String>,
    this_scope: ThisScope,
    locals: LocalBindings,
    edits: Vec<Edit>,
}

fn is_anonymous_function<'s, 'a>(value: &'s Expression<'a>) -> Option<&'s Function<'a>> {
    match value {
        Expression::FunctionExpression(func) if func.id.is_none() => Some(func),
        _ => None,
    }
}

fn function_head(keyword: &str, func: &Function<'_>, local: &str) -> String {
    format!(
        "{}{}function{} {}",
        keyword,
        if func.r#async { "async " } else { "" },
        if func.generator { "*" } else { "" },
        local
    )
}

impl<'c, 'r> ScriptRewriter<'c, 'r> {
    fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit::replace(span, text));
    }

    fn path_context_path(&self, chain: &MemberChain<'_>) -> Option<ChainPath> {
        let cx = PathContext {
            settings: self.cx.settings,
            top_level: self.this_scope.is_top_level(),
            this_namespace: self.this_scope.namespace(),
            local_aliases: &self.aliases,
            locals: &self.locals,
        };
        chain_path(chain, &cx)
    }

    fn owns_site(&self, document: Option<&str>, site: Option<Site>, offset: u32) -> bool {
        document == Some(self.cx.url)
            && site
                == Some(Site {
                    fragment: self.fragment,
                    offset,
                })
    }

    fn rewrite_program<'s, 'a>(&mut self, program: &'s Program<'a>, locals: &LocalObjects<'s, 'a>) {
        let registry = self.cx.registry;
        let settings = self.cx.settings;

        // `const local = {...}` statements published later as namespaces
        let mut local_namespaces: HashMap<u32, String> = HashMap::new();
        for (local, path) in &self.aliases {
            let owned = registry
                .namespace(path)
                .is_some_and(|ns| ns.document.as_deref() == Some(self.cx.url));
            if let (true, Some(l)) = (owned, locals.get(local)) {
                local_namespaces.insert(l.statement.start, path.clone());
            }
        }

        for stmt in &program.body {
            let span = stmt.span();
            if let Some(path) = local_namespaces.get(&span.start).cloned() {
                if let Some(l) = locals.values().find(|l| l.statement.start == span.start) {
                    self.expand_object(span, &path, l.object);
                    continue;
                }
            }
            if self.capture_namespace(stmt) {
                continue;
            }

            match shape::classify(stmt, settings, locals) {
                Shape::SelfInit { .. } => {
                    self.edits.push(remove_statement(self.source, span));
                }
                Shape::NamespaceObject { path, object }
                    if registry.namespace(&path).is_some_and(|ns| {
                        self.owns_site(ns.document.as_deref(), ns.site, span.start)
                    }) =>
                {
                    self.expand_object(span, &path, object);
                }
                Shape::LocalNamespace { path, local }
                    if self.aliases.get(&local) == Some(&path)
                        && local_namespaces.values().any(|p| p == &path) =>
                {
                    self.edits.push(remove_statement(self.source, span));
                }
                Shape::Member { path, value } if settings.reference_excludes.contains(&path) => {
                    self.export_excluded(span, &path, value);
                }
                Shape::Member { path, value }
                    if registry.binding_at(&path).is_some_and(|b| {
                        self.owns_site(Some(b.document.as_str()), b.site, span.start)
                    }) =>
                {
                    if let Some(binding) = registry.binding_at(&path) {
                        self.export_member(span, binding, value);
                    }
                }
                _ => self.visit_statement(stmt),
            }
        }
    }

    /// `const X = NS.sub;` becomes `import * as X from '...'`. When the module does not
    /// export the namespace's members under their own names, `X` becomes a local alias
    /// instead and `X.member` reads turn into named imports.
    fn capture_namespace(&mut self, stmt: &Statement<'_>) -> bool {
        let Statement::VariableDeclaration(decl) = stmt else {
            return false;
        };
        if decl.declarations.len() != 1 {
            return false;
        }
        let declarator = &decl.declarations[0];
        let (BindingPattern::BindingIdentifier(id), Some(init)) = (&declarator.id, &declarator.init)
        else {
            return false;
        };
        let Some(chain) = MemberChain::of_expression(init) else {
            return false;
        };
        let Some(path) = self.path_context_path(&chain) else {
            return false;
        };
        let registry = self.cx.registry;
        let Resolution::Namespace { len } = registry.resolve(&path.segments, path.min_len) else {
            return false;
        };
        let namespace = path.joined(len);
        let Some(document) = registry
            .namespace(&namespace)
            .and_then(|ns| ns.document.as_deref())
        else {
            return false;
        };
        if document != self.cx.url && self.cx.cycles.is_degraded(self.cx.url, document) {
            return false;
        }
        self.edits.push(remove_statement(self.source, stmt.span()));
        if registry.is_whole_importable(&namespace) {
            self.cx.imports.namespace_as(document, id.name.as_str());
        } else {
            self.aliases.insert(id.name.to_string(), namespace);
        }
        true
    }

    fn export_member(&mut self, span: Span, binding: &ExportBinding, value: &Expression<'_>) {
        let registry = self.cx.registry;

        if binding.kind == BindingKind::ReExport {
            let target = binding
                .reexport_of
                .as_deref()
                .and_then(|t| registry.binding_id(t));
            if let Some(reference) = target.and_then(|id| self.cx.reference_to(id)) {
                let text = if reference == binding.export_name {
                    format!("export {{ {} }};", reference)
                } else {
                    format!("export {{ {} as {} }};", reference, binding.export_name)
                };
                self.replace(span, text);
                return;
            }
        }

        if !binding.mutable {
            if let Some(func) = is_anonymous_function(value) {
                let keyword = self.cx.export_keyword(binding);
                self.edits.push(Edit::range(
                    span.start,
                    func.params.span.start,
                    function_head(keyword, func, &binding.local_name),
                ));
                self.visit_function(func, ScopeFlags::Function);
                self.edits.push(Edit::remove(func.span.end, span.end));
                return;
            }
            if let Expression::ClassExpression(class) = value {
                if class.id.is_none() && class.decorators.is_empty() {
                    let keyword = self.cx.export_keyword(binding);
                    self.edits.push(Edit::range(
                        span.start,
                        class.span.start + "class".len() as u32,
                        format!("{}class {}", keyword, binding.local_name),
                    ));
                    self.visit_class(class);
                    self.edits.push(Edit::remove(class.span.end, span.end));
                    return;
                }
            }
        }

        let keyword = self.cx.export_keyword(binding);
        let declarator = if binding.mutable { "let" } else { "const" };
        self.edits.push(Edit::range(
            span.start,
            value.span().start,
            format!("{}{} {} = ", keyword, declarator, binding.local_name),
        ));
        self.visit_expression(value);
    }

    /// `NS.excluded = value;` keeps its value under the excluded name.
    fn export_excluded(&mut self, span: Span, path: &str, value: &Expression<'_>) {
        let local = self.cx.imports.reserve(&path.replace('.', "_"));
        self.edits.push(Edit::range(
            span.start,
            value.span().start,
            format!("const {} = ", local),
        ));
        self.visit_expression(value);
        self.cx
            .trailer
            .push(format!("export {{ {} as {} }};", local, last_segment(path)));
    }

    /// One export declaration per property of a namespace object literal.
    fn expand_object(&mut self, span: Span, path: &str, object: &ObjectExpression<'_>) {
        let members = shape::expandable_members(object).unwrap_or_default();
        let (Some(first), Some(last)) = (members.first(), members.last()) else {
            self.edits.push(remove_statement(self.source, span));
            return;
        };

        // Declarations land at the statement's own column.
        let line_start = self.source[..span.start as usize].rfind('\n').map_or(0, |i| i + 1);
        let column = span.start as usize - line_start;
        let lead = &self.source[span.start as usize..first.property.span.start as usize];
        let indent = lead.rsplit_once('\n').map_or(0, |(_, i)| i.len());
        let width = indent.saturating_sub(column);
        self.edits.push(Edit::remove(span.start, first.property.span.start));

        let registry = self.cx.registry;
        let mut previous: Option<(u32, bool)> = None;
        for member in &members {
            let property = member.property;
            if let Some((end, function_form)) = previous {
                let gap = &self.source[end as usize..property.span.start as usize];
                let separator = if function_form { "" } else { ";" };
                let gap = dedent(&gap.replacen(',', separator, 1), width);
                self.edits.push(Edit::range(end, property.span.start, gap));
            }
            let member_path = format!("{}.{}", path, member.key);
            let function_form = match registry.binding_at(&member_path) {
                Some(binding) => {
                    let keyword = self.cx.export_keyword(binding);
                    self.declare_property(property, keyword, &binding.local_name, binding.mutable)
                }
                None => {
                    let local = self.cx.imports.reserve(&member.key);
                    self.declare_property(property, "", &local, false)
                }
            };
            if !property.shorthand {
                let body = is_anonymous_function(&property.value)
                    .map_or(property.value.span().start, |func| func.params.span.start);
                self.dedent_lines(body, property.span.end, width);
            }
            previous = Some((property.span.end, function_form));
        }

        let tail = if previous.is_some_and(|(_, f)| f) { "" } else { ";" };
        self.edits
            .push(Edit::range(last.property.span.end, span.end, tail));
    }

    /// Strip up to `width` columns of indentation from each line starting inside
    /// `start..end`. Template literals keep their text.
    fn dedent_lines(&mut self, start: u32, end: u32, width: usize) {
        let text = &self.source[start as usize..end as usize];
        if width == 0 || text.contains('`') {
            return;
        }
        for (i, _) in text.match_indices('\n') {
            let line = start as usize + i + 1;
            let strip = self.source[line..end as usize]
                .bytes()
                .take(width)
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            if strip > 0 {
                self.edits.push(Edit::remove(line as u32, (line + strip) as u32));
            }
        }
    }

    /// Turn one property into a declaration. Returns whether it became a function
    /// declaration.
    fn declare_property(
        &mut self,
        property: &ObjectProperty<'_>,
        keyword: &str,
        local: &str,
        mutable: bool,
    ) -> bool {
        let value = &property.value;
        if let Some(func) = is_anonymous_function(value) {
            let head = if mutable {
                // methods have no `function` keyword of their own
                format!("{}let {} = {}", keyword, local, function_head("", func, "").trim_end())
            } else {
                function_head(keyword, func, local)
            };
            self.edits
                .push(Edit::range(property.span.start, func.params.span.start, head));
            self.visit_function(func, ScopeFlags::Function);
            return !mutable;
        }

        let declarator = if mutable { "let" } else { "const" };
        let head = format!("{}{} {} = ", keyword, declarator, local);
        if property.shorthand {
            self.replace(property.span, format!("{}{}", head, member_source(self.source, property)));
        } else {
            self.edits
                .push(Edit::range(property.span.start, value.span().start, head));
            self.visit_expression(value);
        }
        false
    }

    /// Rewrite a namespace chain. Returns `false` when the chain is not namespaced and
    /// its parts still need visiting.
    fn rewrite_chain(&mut self, chain: &MemberChain<'_>, write: bool) -> bool {
        let Some(path) = self.path_context_path(chain) else {
            return false;
        };
        let registry = self.cx.registry;
        let full = path.segments.len();
        let mut replaced = false;

        match registry.resolve(&path.segments, path.min_len) {
            Resolution::Excluded { len } => {
                if !write {
                    self.replace(path.span_for_prefix(chain, len), "undefined");
                    replaced = true;
                }
            }
            Resolution::Binding { id, len } => {
                let binding = registry.binding(id);
                if write && len == full && (binding.document != self.cx.url || binding.kind == BindingKind::ReExport) {
                    self.cx.warn_reassigned(&binding.path, &binding.document);
                } else if let Some(text) = self.cx.reference_to(id) {
                    self.replace(path.span_for_prefix(chain, len), text);
                    replaced = true;
                }
            }
            Resolution::Namespace { len } => {
                let namespace = path.joined(len);
                if write {
                    let owner = registry
                        .namespace(&namespace)
                        .and_then(|ns| ns.document.clone())
                        .unwrap_or_default();
                    self.cx.warn_reassigned(&namespace, &owner);
                } else if let Some(text) = self.cx.namespace_reference(&namespace) {
                    self.replace(path.span_for_prefix(chain, len), text);
                    replaced = true;
                }
            }
            Resolution::Unresolved => self.cx.warn_unresolved(&path.full()),
            Resolution::Global => return false,
        }

        if !replaced && chain.root == ChainRoot::This && self.this_scope.is_top_level() {
            let global = self.cx.settings.global_object.clone();
            self.replace(chain.spans[0], global);
        }
        true
    }
}

fn dedent(text: &str, width: usize) -> String {
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        let strip = line
            .bytes()
            .take(width)
            .take_while(|b| *b == b' ' || *b == b'\t')
            .count();
        out.push('\n');
        out.push_str(&line[strip..]);
    }
    out
}

fn member_source<'s>(source: &'s str, property: &ObjectProperty<'_>) -> &'s str {
    &source[property.value.span().start as usize..property.value.span().end as usize]
}

impl<'a> Visit<'a> for ScriptRewriter<'_, '_> {
    fn visit_expression(&mut self, expr: &Expression<'a>) {
        match expr {
            Expression::StaticMemberExpression(_) | Expression::Identifier(_) => {
                if let Some(chain) = MemberChain::of_expression(expr) {
                    if self.rewrite_chain(&chain, false) {
                        return;
                    }
                }
            }
            Expression::ThisExpression(this) => {
                if self.this_scope.is_top_level() {
                    let global = self.cx.settings.global_object.clone();
                    self.replace(this.span, global);
                }
                return;
            }
            _ => {}
        }
        walk::walk_expression(self, expr);
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        let handled = MemberChain::of_assignment_target(&expr.left)
            .is_some_and(|chain| self.rewrite_chain(&chain, true));
        if !handled {
            self.visit_assignment_target(&expr.left);
        }
        self.visit_expression(&expr.right);
    }

    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        let handled = MemberChain::of_simple_target(&expr.argument)
            .is_some_and(|chain| self.rewrite_chain(&chain, true));
        if !handled {
            walk::walk_update_expression(self, expr);
        }
    }

    fn visit_unary_expression(&mut self, expr: &UnaryExpression<'a>) {
        // `delete NS.a.b` must keep a member expression as its operand
        if expr.operator == UnaryOperator::Delete {
            if let Expression::StaticMemberExpression(member) = &expr.argument {
                self.visit_expression(&member.object);
                return;
            }
        }
        walk::walk_unary_expression(self, expr);
    }

    fn visit_object_property(&mut self, property: &ObjectProperty<'a>) {
        if property.shorthand {
            if let Expression::Identifier(id) = &property.value {
                let before = self.edits.len();
                self.visit_expression(&property.value);
                if self.edits.len() > before {
                    if let Some(last) = self.edits.last_mut() {
                        if last.start == id.span.start && last.end == id.span.end {
                            last.text = format!("{}: {}", id.name, last.text);
                        }
                    }
                }
                return;
            }
        }
        walk::walk_object_property(self, property);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.this_scope.enter_function(func.span.start, &self.methods);
        self.locals.enter_function(func);
        walk::walk_function(self, func, flags);
        self.locals.exit();
        self.this_scope.exit();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        self.locals.enter_arrow(arrow);
        walk::walk_arrow_function_expression(self, arrow);
        self.locals.exit();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        self.locals.enter_catch(clause);
        walk::walk_catch_clause(self, clause);
        self.locals.exit();
    }

    fn visit_property_definition(&mut self, def: &PropertyDefinition<'a>) {
        self.this_scope.enter_opaque();
        walk::walk_property_definition(self, def);
        self.this_scope.exit();
    }

    fn visit_static_block(&mut self, block: &StaticBlock<'a>) {
        self.this_scope.enter_opaque();
        walk::walk_static_block(self, block);
        self.this_scope.exit();
    }
}
