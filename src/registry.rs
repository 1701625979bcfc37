//! # Namespace Registry
//!
//! Global table of every namespace and every exported member discovered across the
//! graph. Built sequentially in one pass over all documents, then frozen and shared
//! read-only by the per-document rewrites.
//!
//! ## Key Invariants
//!
//! 1. **Single Owner**: each fully-qualified path is declared by at most one document.
//!    A second declaring document is a fatal conflict.
//! 2. **Mutability**: a binding is mutable iff its path is written more than once
//!    anywhere in the package.
//! 3. **Unique Locals**: within a document, local names of exported bindings never
//!    collide with each other or with any identifier already in that document.

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, AssignmentExpression, CatchClause, Function, ObjectExpression,
    PropertyDefinition, StaticBlock, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::GetSpan;
use oxc_syntax::scope::ScopeFlags;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::ConversionError;
use crate::graph::DocumentGraph;
use crate::member::{chain_path, last_segment, parent_path, top_level_path, MemberChain, PathContext};
use crate::parse::parse_program;
use crate::scope::{unique_name, LocalBindings, NameCollector, ThisScope};
use crate::settings::ConversionSettings;
use crate::shape::{self, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingKind {
    Value,
    Function,
    Class,
    /// Alias of another binding (`NS.a = NS.b`)
    ReExport,
}

/// Location of a declaring statement: script fragment index and statement start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub fragment: usize,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct ExportBinding {
    pub namespace: String,
    pub member: String,
    pub path: String,
    /// Declaring document
    pub document: String,
    pub kind: BindingKind,
    pub mutable: bool,
    /// Target path of a re-export
    pub reexport_of: Option<String>,
    /// Identifier used inside the declaring document
    pub local_name: String,
    /// Name other modules import
    pub export_name: String,
    pub site: Option<Site>,
    /// Declared by `export let` because the member is only ever assigned inside functions
    pub implicit: bool,
    /// Lives in an opaque document outside the package
    pub external: bool,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub path: String,
    /// Document that publishes the namespace as an object literal
    pub document: Option<String>,
    pub site: Option<Site>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A prefix of `len` segments is a reference exclude
    Excluded { len: usize },
    /// The longest prefix naming a binding
    Binding { id: usize, len: usize },
    /// The whole path names a namespace published by some document
    Namespace { len: usize },
    /// Namespace member with no binding behind it
    Unresolved,
    /// A bare namespace root nobody publishes
    Global,
}

#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    namespaces: IndexMap<String, Namespace>,
    bindings: Vec<ExportBinding>,
    by_path: HashMap<String, usize>,
    /// Document -> identifiers it already uses, plus its export locals
    names: HashMap<String, HashSet<String>>,
    excluded: HashSet<String>,
}

impl NamespaceRegistry {
    pub fn build(graph: &DocumentGraph, settings: &ConversionSettings) -> Result<Self, ConversionError> {
        let mut builder = RegistryBuilder::new(settings);

        for (path, url) in &settings.external_bindings {
            if let Some(id) = builder.declare(path, url, BindingKind::Value, None)? {
                builder.registry.bindings[id].external = true;
            }
        }

        for (url, document) in &graph.documents {
            let mut taken = HashSet::new();
            for (fragment, script) in document.convertible_scripts() {
                builder.scan_script(url, fragment, &script.source, !document.maintained, &mut taken)?;
            }
            builder.registry.names.insert(url.clone(), taken);
        }

        let registry = builder.finish()?;
        tracing::debug!(
            namespaces = registry.namespaces.len(),
            bindings = registry.bindings.len(),
            "namespace registry built"
        );
        Ok(registry)
    }

    pub fn binding(&self, id: usize) -> &ExportBinding {
        &self.bindings[id]
    }

    pub fn binding_id(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn binding_at(&self, path: &str) -> Option<&ExportBinding> {
        self.by_path.get(path).map(|&id| &self.bindings[id])
    }

    pub fn bindings(&self) -> &[ExportBinding] {
        &self.bindings
    }

    pub fn namespace(&self, path: &str) -> Option<&Namespace> {
        self.namespaces.get(path)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    pub fn declared_in<'r>(&'r self, url: &'r str) -> impl Iterator<Item = &'r ExportBinding> + 'r {
        self.bindings.iter().filter(move |b| b.document == url)
    }

    pub fn taken_names(&self, url: &str) -> HashSet<String> {
        self.names.get(url).cloned().unwrap_or_default()
    }

    /// Follow re-export aliases to the binding that holds the value.
    pub fn reexport_target(&self, mut id: usize) -> usize {
        for _ in 0..self.bindings.len() {
            let binding = &self.bindings[id];
            match binding.reexport_of.as_deref().and_then(|t| self.by_path.get(t)) {
                Some(&next) if binding.kind == BindingKind::ReExport && next != id => id = next,
                _ => break,
            }
        }
        id
    }

    /// Whether `import * as` of the namespace's document exposes every member of
    /// `path` under its member name.
    pub fn is_whole_importable(&self, path: &str) -> bool {
        let Some(namespace) = self.namespaces.get(path) else {
            return false;
        };
        let Some(document) = namespace.document.as_deref() else {
            return false;
        };
        let members_flat = namespace.members.iter().all(|member| {
            self.binding_at(member)
                .is_some_and(|b| b.document == document && !b.external && b.export_name == b.member)
        });
        let nested = self
            .namespaces
            .values()
            .any(|ns| ns.document.is_some() && parent_path(&ns.path) == Some(path));
        members_flat && !nested
    }

    fn has_binding_prefix(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('.').collect();
        (2..segments.len()).any(|len| self.by_path.contains_key(&segments[..len].join(".")))
    }

    /// Resolve a namespace path, considering only prefixes of at least `min_len` segments.
    pub fn resolve(&self, path: &[String], min_len: usize) -> Resolution {
        let min_len = min_len.max(1);
        if path.len() < min_len {
            return Resolution::Unresolved;
        }
        let joined = |len: usize| path[..len].join(".");

        if let Some(len) = (min_len..=path.len()).find(|&len| self.excluded.contains(&joined(len))) {
            return Resolution::Excluded { len };
        }
        for len in (min_len.max(2)..=path.len()).rev() {
            if let Some(&id) = self.by_path.get(&joined(len)) {
                return Resolution::Binding { id, len };
            }
        }
        if let Some(ns) = self.namespaces.get(&joined(path.len())) {
            if ns.document.is_some() {
                return Resolution::Namespace { len: path.len() };
            }
        }
        if path.len() == 1 {
            return Resolution::Global;
        }
        Resolution::Unresolved
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDING
// ═══════════════════════════════════════════════════════════════════════════════

struct Assignment {
    path: String,
    document: String,
    /// Inside some function body
    nested: bool,
    /// Document may declare bindings
    declaring: bool,
}

struct RegistryBuilder<'x> {
    settings: &'x ConversionSettings,
    registry: NamespaceRegistry,
    counts: HashMap<String, usize>,
    assignments: Vec<Assignment>,
    /// Binding id -> aliased path
    pending: Vec<(usize, String)>,
    /// Namespaces declared only through `NS.sub = NS.sub || {}`
    self_initialised: HashSet<String>,
}

impl<'x> RegistryBuilder<'x> {
    fn new(settings: &'x ConversionSettings) -> Self {
        let registry = NamespaceRegistry {
            excluded: settings.reference_excludes.iter().cloned().collect(),
            ..NamespaceRegistry::default()
        };
        RegistryBuilder {
            settings,
            registry,
            counts: HashMap::new(),
            assignments: Vec::new(),
            pending: Vec::new(),
            self_initialised: HashSet::new(),
        }
    }

    fn ensure_namespace(&mut self, path: &str) -> &mut Namespace {
        if let Some(parent) = parent_path(path) {
            if !self.registry.namespaces.contains_key(parent) {
                self.ensure_namespace(parent);
            }
        }
        self.registry
            .namespaces
            .entry(path.to_string())
            .or_insert_with(|| Namespace {
                path: path.to_string(),
                document: None,
                site: None,
                members: Vec::new(),
            })
    }

    fn declare_namespace(&mut self, path: &str, document: &str, site: Site) -> Result<(), ConversionError> {
        let namespace = self.ensure_namespace(path);
        match &namespace.document {
            Some(first) if first != document => Err(ConversionError::ConflictingExport {
                path: path.to_string(),
                first: first.clone(),
                second: document.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                namespace.document = Some(document.to_string());
                namespace.site = Some(site);
                Ok(())
            }
        }
    }

    /// Declare a binding. Returns its id when newly created.
    fn declare(
        &mut self,
        path: &str,
        document: &str,
        kind: BindingKind,
        site: Option<Site>,
    ) -> Result<Option<usize>, ConversionError> {
        if let Some(&id) = self.registry.by_path.get(path) {
            let first = &self.registry.bindings[id].document;
            if first != document {
                return Err(ConversionError::ConflictingExport {
                    path: path.to_string(),
                    first: first.clone(),
                    second: document.to_string(),
                });
            }
            return Ok(None);
        }
        // property write on something that is already a binding
        if self.registry.has_binding_prefix(path) || self.registry.namespaces.contains_key(path) {
            return Ok(None);
        }
        let Some(namespace) = parent_path(path) else {
            return Ok(None);
        };

        let id = self.registry.bindings.len();
        self.ensure_namespace(namespace).members.push(path.to_string());
        let member = last_segment(path).to_string();
        self.registry.bindings.push(ExportBinding {
            namespace: namespace.to_string(),
            member: member.clone(),
            path: path.to_string(),
            document: document.to_string(),
            kind,
            mutable: false,
            reexport_of: None,
            local_name: member.clone(),
            export_name: member,
            site,
            implicit: false,
            external: false,
        });
        self.registry.by_path.insert(path.to_string(), id);
        Ok(Some(id))
    }

    fn declare_object(
        &mut self,
        path: &str,
        document: &str,
        site: Site,
        object: &ObjectExpression<'_>,
    ) -> Result<(), ConversionError> {
        self.declare_namespace(path, document, site)?;
        for member in shape::expandable_members(object).unwrap_or_default() {
            let member_path = format!("{}.{}", path, member.key);
            self.declare(&member_path, document, member.kind, Some(site))?;
            *self.counts.entry(member_path).or_default() += 1;
        }
        Ok(())
    }

    fn scan_script(
        &mut self,
        url: &str,
        fragment: usize,
        source: &str,
        declaring: bool,
        taken: &mut HashSet<String>,
    ) -> Result<(), ConversionError> {
        let allocator = Allocator::default();
        let Ok(program) = parse_program(&allocator, source) else {
            // reported when the document itself is converted
            return Ok(());
        };
        NameCollector::collect(&program, taken);
        let locals = shape::local_objects(&program);
        let methods = shape::method_contexts(&program, self.settings, &locals);
        let aliases = shape::local_aliases(&program, self.settings, &locals);

        if declaring {
            for stmt in &program.body {
                let site = Site {
                    fragment,
                    offset: stmt.span().start,
                };
                match shape::classify(stmt, self.settings, &locals) {
                    Shape::SelfInit { path } => {
                        self.ensure_namespace(&path);
                        self.self_initialised.insert(path);
                    }
                    Shape::NamespaceObject { path, object } => {
                        self.declare_object(&path, url, site, object)?;
                    }
                    Shape::LocalNamespace { path, local } => {
                        if let Some(l) = locals.get(&local) {
                            self.declare_object(&path, url, site, l.object)?;
                        }
                    }
                    Shape::Member { path, value } => {
                        if self.registry.excluded.contains(&path) {
                            continue;
                        }
                        if let Some(id) = self.declare(&path, url, shape::kind_of(value), Some(site))? {
                            let target = MemberChain::of_expression(value)
                                .and_then(|chain| top_level_path(&chain, self.settings));
                            if let Some(target) = target {
                                self.pending.push((id, target));
                            }
                        }
                    }
                    Shape::Other => {}
                }
            }
        }

        let mut scanner = AssignmentScanner {
            settings: self.settings,
            methods: &methods,
            aliases: &aliases,
            this_scope: ThisScope::default(),
            locals: LocalBindings::default(),
            found: Vec::new(),
        };
        scanner.visit_program(&program);
        for (path, nested) in scanner.found {
            *self.counts.entry(path.clone()).or_default() += 1;
            self.assignments.push(Assignment {
                path,
                document: url.to_string(),
                nested,
                declaring,
            });
        }
        Ok(())
    }

    fn is_implicit_candidate(&self, path: &str) -> bool {
        let registry = &self.registry;
        if registry.by_path.contains_key(path)
            || registry.namespaces.contains_key(path)
            || registry.has_binding_prefix(path)
        {
            return false;
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if matches!(registry.resolve(&segments, 1), Resolution::Excluded { .. }) {
            return false;
        }
        parent_path(path).is_some_and(|parent| {
            registry.namespaces.contains_key(parent) || self.settings.is_namespace_root(parent)
        })
    }

    fn finish(mut self) -> Result<NamespaceRegistry, ConversionError> {
        for (id, target) in std::mem::take(&mut self.pending) {
            if target != self.registry.bindings[id].path && self.registry.by_path.contains_key(&target) {
                let binding = &mut self.registry.bindings[id];
                binding.kind = BindingKind::ReExport;
                binding.reexport_of = Some(target);
            }
        }

        // Members only ever written inside functions get declared by the first
        // document that writes them.
        let assignments = std::mem::take(&mut self.assignments);
        for assignment in assignments.iter().filter(|a| a.nested && a.declaring) {
            if self.is_implicit_candidate(&assignment.path) {
                if let Some(id) =
                    self.declare(&assignment.path, &assignment.document, BindingKind::Value, None)?
                {
                    self.registry.bindings[id].implicit = true;
                }
            }
        }

        // A self-initialised namespace belongs to the document declaring its members.
        // Repeating the idiom elsewhere claims nothing.
        let registry = &mut self.registry;
        for path in &self.self_initialised {
            let Some(namespace) = registry.namespaces.get_mut(path) else {
                continue;
            };
            if namespace.document.is_some() {
                continue;
            }
            namespace.document = namespace
                .members
                .iter()
                .filter_map(|member| registry.by_path.get(member))
                .map(|&id| &registry.bindings[id])
                .find(|binding| !binding.external)
                .map(|binding| binding.document.clone());
        }

        let counts = &self.counts;
        for binding in &mut self.registry.bindings {
            let writes = counts.get(&binding.path).copied().unwrap_or(0);
            binding.mutable = !binding.external
                && binding.kind != BindingKind::ReExport
                && (binding.implicit || writes > 1);
        }

        let mut exported: HashMap<String, HashSet<String>> = HashMap::new();
        let registry = &mut self.registry;
        for binding in &mut registry.bindings {
            if binding.external {
                continue;
            }
            let taken = registry.names.entry(binding.document.clone()).or_default();
            let local = unique_name(&binding.member, taken);
            taken.insert(local.clone());
            let names = exported.entry(binding.document.clone()).or_default();
            binding.export_name = if names.insert(binding.member.clone()) {
                binding.member.clone()
            } else {
                names.insert(local.clone());
                local.clone()
            };
            binding.local_name = local;
        }

        Ok(self.registry)
    }
}

/// Records every write to a namespace path, including `this.member` writes inside
/// namespace methods.
struct AssignmentScanner<'x> {
    settings: &'x ConversionSettings,
    methods: &'x HashMap<u32, String>,
    aliases: &'x HashMap<String, String>,
    this_scope: ThisScope,
    locals: LocalBindings,
    found: Vec<(String, bool)>,
}

impl AssignmentScanner<'_> {
    fn record(&mut self, chain: Option<MemberChain<'_>>) {
        let Some(chain) = chain else {
            return;
        };
        if chain.segments.len() < 2 {
            return;
        }
        let path = {
            let cx = PathContext {
                settings: self.settings,
                top_level: self.this_scope.is_top_level(),
                this_namespace: self.this_scope.namespace(),
                local_aliases: self.aliases,
                locals: &self.locals,
            };
            chain_path(&chain, &cx).map(|p| p.full())
        };
        if let Some(path) = path {
            self.found.push((path, !self.this_scope.is_top_level()));
        }
    }
}

impl<'a> Visit<'a> for AssignmentScanner<'_> {
    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        self.record(MemberChain::of_assignment_target(&expr.left));
        walk::walk_assignment_expression(self, expr);
    }

    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        self.record(MemberChain::of_simple_target(&expr.argument));
        walk::walk_update_expression(self, expr);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.this_scope.enter_function(func.span.start, self.methods);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn graph_of(docs: &[(&str, &str)]) -> DocumentGraph {
        let mut graph = DocumentGraph::default();
        for (url, source) in docs {
            graph
                .documents
                .insert(url.to_string(), Document::script(url, source));
        }
        graph
    }

    fn settings() -> ConversionSettings {
        ConversionSettings::new().with_namespace("NS")
    }

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_declarations_and_kinds() {
        let graph = graph_of(&[(
            "a.js",
            "NS.a = 1;\nNS.f = function() {};\nNS.K = class {};\nNS.util = { x: 1, y() {} };\nNS.alias = NS.a;",
        )]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        assert_eq!(registry.binding_at("NS.a").unwrap().kind, BindingKind::Value);
        assert_eq!(registry.binding_at("NS.f").unwrap().kind, BindingKind::Function);
        assert_eq!(registry.binding_at("NS.K").unwrap().kind, BindingKind::Class);
        assert_eq!(registry.binding_at("NS.util.y").unwrap().kind, BindingKind::Function);
        let alias = registry.binding_at("NS.alias").unwrap();
        assert_eq!(alias.kind, BindingKind::ReExport);
        assert_eq!(alias.reexport_of.as_deref(), Some("NS.a"));
        assert_eq!(
            registry.namespace("NS.util").unwrap().document.as_deref(),
            Some("a.js")
        );
    }

    #[test]
    fn test_conflicting_declarations_are_fatal() {
        let graph = graph_of(&[("a.js", "NS.x = 1;"), ("b.js", "NS.x = 2;")]);
        let err = NamespaceRegistry::build(&graph, &settings()).unwrap_err();
        assert_eq!(
            err,
            ConversionError::ConflictingExport {
                path: "NS.x".into(),
                first: "a.js".into(),
                second: "b.js".into()
            }
        );
    }

    #[test]
    fn test_mutability_counts_every_write() {
        let graph = graph_of(&[
            ("a.js", "NS.once = 1;\nNS.twice = 1;\nNS.util = { n: 0, bump() { this.n++; } };"),
            ("b.js", "function f() { NS.twice = 2; }"),
        ]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        assert!(!registry.binding_at("NS.once").unwrap().mutable);
        assert!(registry.binding_at("NS.twice").unwrap().mutable);
        assert!(registry.binding_at("NS.util.n").unwrap().mutable);
        assert!(!registry.binding_at("NS.util.bump").unwrap().mutable);
    }

    #[test]
    fn test_nested_only_write_is_implicit_declaration() {
        let graph = graph_of(&[("a.js", "NS.util = NS.util || {};\nfunction init() { NS.util.ready = true; }")]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        let binding = registry.binding_at("NS.util.ready").unwrap();
        assert!(binding.implicit);
        assert!(binding.mutable);
        assert_eq!(binding.document, "a.js");
    }

    #[test]
    fn test_local_names_avoid_document_identifiers() {
        let graph = graph_of(&[("a.js", "const foo = 1;\nNS.foo = foo;")]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        let binding = registry.binding_at("NS.foo").unwrap();
        assert_eq!(binding.local_name, "foo$1");
        assert_eq!(binding.export_name, "foo");
    }

    #[test]
    fn test_resolution_prefers_longest_binding() {
        let graph = graph_of(&[("a.js", "NS.util = { x: 1 };\nNS.y = 2;")]);
        let registry = NamespaceRegistry::build(&graph, &settings().with_reference_exclude("NS.gone")).unwrap();
        assert!(matches!(
            registry.resolve(&path("NS.util.x.toFixed"), 1),
            Resolution::Binding { len: 3, .. }
        ));
        assert_eq!(registry.resolve(&path("NS.util"), 1), Resolution::Namespace { len: 2 });
        assert_eq!(registry.resolve(&path("NS.util.z"), 1), Resolution::Unresolved);
        assert_eq!(registry.resolve(&path("NS.gone.a"), 1), Resolution::Excluded { len: 2 });
        assert_eq!(registry.resolve(&path("NS"), 1), Resolution::Global);
    }

    #[test]
    fn test_external_bindings_are_seeded() {
        let graph = graph_of(&[("a.js", "use(NS.lib.thing);")]);
        let settings = settings().with_external_binding("NS.lib.thing", "bower_components/lib/lib.html");
        let registry = NamespaceRegistry::build(&graph, &settings).unwrap();
        let binding = registry.binding_at("NS.lib.thing").unwrap();
        assert!(binding.external);
        assert_eq!(binding.document, "bower_components/lib/lib.html");
    }

    #[test]
    fn test_self_initialised_namespace_is_owned_by_its_members() {
        let graph = graph_of(&[
            ("a.js", "NS.sub = NS.sub || {};\nNS.sub.a = 1;"),
            ("b.js", "NS.sub = NS.sub || {};\nuse(NS.sub);"),
        ]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        assert_eq!(
            registry.namespace("NS.sub").unwrap().document.as_deref(),
            Some("a.js")
        );
        assert_eq!(registry.resolve(&path("NS.sub"), 1), Resolution::Namespace { len: 2 });
        assert!(registry.is_whole_importable("NS.sub"));
    }

    #[test]
    fn test_suffixed_member_blocks_whole_namespace_import() {
        let graph = graph_of(&[("a.js", "NS.other = { x: 1 };\nNS.util = { x: 2 };")]);
        let registry = NamespaceRegistry::build(&graph, &settings()).unwrap();
        assert_eq!(registry.binding_at("NS.util.x").unwrap().export_name, "x$1");
        assert!(registry.is_whole_importable("NS.other"));
        assert!(!registry.is_whole_importable("NS.util"));
    }
}
