//! Parse Module
//!
//! Turns legacy markup documents into ordered fragments (html5ever), and scripts into
//! oxc programs. Maintained documents are scanned with raw-text patterns instead so that
//! their markup can later be edited in place, byte for byte.

use html5ever::parse_document;
use html5ever::serialize::{HtmlSerializer, SerializeOpts, Serializer};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use std::collections::HashMap;
use std::io;
use tendril::TendrilSink;

use crate::document::{
    Document, DocumentKind, Fragment, Include, IncludeKind, ScriptFragment, TemplateFragment,
};
use crate::url::resolve_url;

lazy_static! {
    /// Script block regex
    static ref SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>([\s\S]*?)</script\s*>").unwrap();

    /// Link tag regex
    static ref LINK_REGEX: Regex = Regex::new(r"(?is)<link\b([^>]*)>").unwrap();

    /// Attribute regex for parsing tag attributes
    static ref ATTR_REGEX: Regex =
        Regex::new(r#"(?i)([a-z0-9-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
}

/// Element that owns a template and names it through its `id` attribute.
const ELEMENT_CONTAINER: &str = "dom-module";

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a script fragment as an ES module.
pub fn parse_program<'a>(allocator: &'a Allocator, source: &'a str) -> Result<Program<'a>, String> {
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }
    Ok(ret.program)
}

fn is_script_type(script_type: Option<&str>) -> bool {
    match script_type.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "module" | "text/javascript" | "application/javascript"
        ),
    }
}

/// Strip blank leading lines and trailing whitespace, keeping indentation.
fn tidy_script(content: &str) -> String {
    let start = content
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .filter(|(_, c)| *c == '\n')
        .last()
        .map(|(i, _)| i + 1)
        .unwrap_or(0);
    content[start..].trim_end().to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// RAW SCANNING (maintained documents)
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_attributes(attr_string: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(attr_string) {
        if let Some(name) = caps.get(1) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "true".to_string());
            attributes.insert(name.as_str().to_ascii_lowercase(), value);
        }
    }
    attributes
}

/// An inline script found by raw scanning; `span` covers only its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScript {
    pub span: (usize, usize),
    pub is_module: bool,
    pub src: Option<String>,
}

/// A `<link rel="import">` found by raw scanning; `span` covers the whole tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImportLink {
    pub span: (usize, usize),
    pub href: String,
}

pub fn raw_scripts(source: &str) -> Vec<RawScript> {
    SCRIPT_REGEX
        .captures_iter(source)
        .filter_map(|caps| {
            let attrs = parse_attributes(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
            let content = caps.get(2)?;
            let script_type = attrs.get("type").map(|s| s.as_str());
            if !is_script_type(script_type) {
                return None;
            }
            Some(RawScript {
                span: (content.start(), content.end()),
                is_module: script_type.map(|t| t.trim().eq_ignore_ascii_case("module"))
                    == Some(true),
                src: attrs.get("src").cloned(),
            })
        })
        .collect()
}

pub fn raw_import_links(source: &str) -> Vec<RawImportLink> {
    LINK_REGEX
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let attrs = parse_attributes(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
            let rel = attrs.get("rel")?;
            if !rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("import")) {
                return None;
            }
            Some(RawImportLink {
                span: (whole.start(), whole.end()),
                href: attrs.get("href")?.clone(),
            })
        })
        .collect()
}

fn parse_maintained(url: &str, source: &str) -> Document {
    let mut includes = Vec::new();
    for link in raw_import_links(source) {
        includes.push((link.span.0, Include {
            url: resolve_url(url, &link.href),
            kind: IncludeKind::HtmlImport,
        }));
    }

    let mut fragments = Vec::new();
    for script in raw_scripts(source) {
        match &script.src {
            Some(src) => includes.push((script.span.0, Include {
                url: resolve_url(url, src),
                kind: IncludeKind::Script,
            })),
            None => fragments.push(Fragment::Script(ScriptFragment {
                source: source[script.span.0..script.span.1].to_string(),
                is_module: script.is_module,
            })),
        }
    }
    includes.sort_by_key(|(pos, _)| *pos);

    Document {
        url: url.to_string(),
        kind: DocumentKind::Markup,
        source: source.to_string(),
        includes: includes.into_iter().map(|(_, include)| include).collect(),
        fragments,
        maintained: true,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

fn write_node<W: io::Write>(
    ser: &mut HtmlSerializer<W>,
    handle: &Handle,
    skip_scripts: bool,
) -> io::Result<()> {
    match &handle.data {
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            if skip_scripts && &*name.local == "script" {
                return Ok(());
            }
            let attrs = attrs.borrow();
            ser.start_elem(
                name.clone(),
                attrs.iter().map(|a| (&a.name, &a.value[..])),
            )?;
            // <template> children live in a separate fragment
            let contents = template_contents.borrow();
            let parent = contents.as_ref().unwrap_or(handle);
            for child in parent.children.borrow().iter() {
                write_node(ser, child, skip_scripts)?;
            }
            ser.end_elem(name.clone())
        }
        NodeData::Text { contents } => ser.write_text(&contents.borrow()),
        NodeData::Comment { contents } => ser.write_comment(contents),
        NodeData::Doctype { name, .. } => ser.write_doctype(name),
        NodeData::ProcessingInstruction { target, contents } => {
            ser.write_processing_instruction(target, contents)
        }
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                write_node(ser, child, skip_scripts)?;
            }
            Ok(())
        }
    }
}

fn serialize_handles<'h>(handles: impl Iterator<Item = &'h Handle>, skip_scripts: bool) -> String {
    let mut buf = Vec::new();
    {
        let mut ser = HtmlSerializer::new(&mut buf, SerializeOpts::default());
        for handle in handles {
            if write_node(&mut ser, handle, skip_scripts).is_err() {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn serialize_outer(handle: &Handle, skip_scripts: bool) -> String {
    serialize_handles(std::iter::once(handle), skip_scripts)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP WALK
// ═══════════════════════════════════════════════════════════════════════════════

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(handle: &Handle, attr_name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    for child in handle.children.borrow().iter() {
        if let NodeData::Text { contents } = &child.data {
            out.push_str(&contents.borrow());
        }
    }
    out
}

struct MarkupCollector<'u> {
    url: &'u str,
    includes: Vec<Include>,
    fragments: Vec<Fragment>,
}

impl MarkupCollector<'_> {
    fn push_markup(&mut self, html: String) {
        if html.trim().is_empty() {
            return;
        }
        if let Some(Fragment::Markup { html: previous }) = self.fragments.last_mut() {
            previous.push_str(&html);
            return;
        }
        self.fragments.push(Fragment::Markup { html });
    }

    fn walk(&mut self, handle: &Handle) {
        match &handle.data {
            NodeData::Document => self.walk_children(handle),
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if !text.trim().is_empty() {
                    self.push_markup(serialize_outer(handle, false));
                }
            }
            NodeData::Element { .. } => self.walk_element(handle),
            _ => {}
        }
    }

    fn walk_children(&mut self, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn walk_element(&mut self, handle: &Handle) {
        let tag = element_name(handle).unwrap_or_default();
        match tag.as_str() {
            "html" | "head" | "body" => self.walk_children(handle),
            "meta" | "title" | "base" => {}
            "link" => {
                let rel = attribute(handle, "rel").unwrap_or_default();
                let href = attribute(handle, "href");
                match href {
                    Some(href) if rel.split_whitespace().any(|r| r == "import") => {
                        self.includes.push(Include {
                            url: resolve_url(self.url, &href),
                            kind: IncludeKind::HtmlImport,
                        });
                    }
                    _ => self.push_markup(serialize_outer(handle, false)),
                }
            }
            "script" => {
                let script_type = attribute(handle, "type");
                if !is_script_type(script_type.as_deref()) {
                    self.push_markup(serialize_outer(handle, false));
                    return;
                }
                if let Some(src) = attribute(handle, "src") {
                    let url = resolve_url(self.url, &src);
                    self.includes.push(Include {
                        url: url.clone(),
                        kind: IncludeKind::Script,
                    });
                    self.fragments.push(Fragment::ExternalScript { url });
                    return;
                }
                let source = tidy_script(&text_content(handle));
                if !source.trim().is_empty() {
                    self.fragments.push(Fragment::Script(ScriptFragment {
                        source,
                        is_module: script_type
                            .map(|t| t.trim().eq_ignore_ascii_case("module"))
                            .unwrap_or(false),
                    }));
                }
            }
            ELEMENT_CONTAINER => self.walk_container(handle),
            _ => self.push_markup(serialize_outer(handle, false)),
        }
    }

    /// `<dom-module id="x"><template>..</template><script>..</script></dom-module>`
    fn walk_container(&mut self, handle: &Handle) {
        let id = attribute(handle, "id");
        let template = handle
            .children
            .borrow()
            .iter()
            .find(|c| element_name(c).as_deref() == Some("template"))
            .cloned();

        match (id, template) {
            (Some(element_id), Some(template)) => {
                let content = match &template.data {
                    NodeData::Element {
                        template_contents, ..
                    } => template_contents
                        .borrow()
                        .as_ref()
                        .map(|c| serialize_handles(c.children.borrow().iter(), false))
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                self.fragments.push(Fragment::Template(TemplateFragment {
                    element_id,
                    content,
                    outer_html: serialize_outer(handle, true),
                }));
            }
            _ => self.push_markup(serialize_outer(handle, true)),
        }

        // scripts nested in the container follow its template
        for child in handle.children.borrow().iter() {
            if element_name(child).as_deref() == Some("script") {
                self.walk_element(child);
            }
        }
    }
}

/// Parse a markup document into ordered fragments and include edges.
pub fn parse_markup(url: &str, source: &str, maintained: bool) -> io::Result<Document> {
    if maintained {
        return Ok(parse_maintained(url, source));
    }

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut source.as_bytes())?;

    let mut collector = MarkupCollector {
        url,
        includes: Vec::new(),
        fragments: Vec::new(),
    };
    collector.walk(&dom.document);

    Ok(Document {
        url: url.to_string(),
        kind: DocumentKind::Markup,
        source: source.to_string(),
        includes: collector.includes,
        fragments: collector.fragments,
        maintained: false,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
