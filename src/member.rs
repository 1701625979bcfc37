//! Static member chains (`a.b.c`) and their namespace paths.

use oxc_ast::ast::{AssignmentTarget, Expression, SimpleAssignmentTarget, StaticMemberExpression};
use oxc_span::Span;
use std::collections::HashMap;

use crate::scope::LocalBindings;
use crate::settings::ConversionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainRoot {
    Identifier,
    This,
}

/// A pure chain of static member accesses rooted at an identifier or `this`.
/// `spans[i]` covers `segments[0..=i]`.
#[derive(Debug, Clone)]
pub struct MemberChain<'s> {
    pub root: ChainRoot,
    pub segments: Vec<&'s str>,
    pub spans: Vec<Span>,
}

fn collect<'s>(
    mut expr: &'s Expression<'_>,
    segments: &mut Vec<&'s str>,
    spans: &mut Vec<Span>,
) -> Option<ChainRoot> {
    loop {
        match expr {
            Expression::StaticMemberExpression(m) => {
                if m.optional {
                    return None;
                }
                segments.push(m.property.name.as_str());
                spans.push(m.span);
                expr = &m.object;
            }
            Expression::Identifier(id) => {
                segments.push(id.name.as_str());
                spans.push(id.span);
                return Some(ChainRoot::Identifier);
            }
            Expression::ThisExpression(this) => {
                segments.push("this");
                spans.push(this.span);
                return Some(ChainRoot::This);
            }
            _ => return None,
        }
    }
}

impl<'s> MemberChain<'s> {
    fn finish(root: ChainRoot, mut segments: Vec<&'s str>, mut spans: Vec<Span>) -> Self {
        segments.reverse();
        spans.reverse();
        MemberChain {
            root,
            segments,
            spans,
        }
    }

    pub fn of_expression(expr: &'s Expression<'_>) -> Option<Self> {
        let mut segments = Vec::new();
        let mut spans = Vec::new();
        let root = collect(expr, &mut segments, &mut spans)?;
        Some(Self::finish(root, segments, spans))
    }

    pub fn of_static_member(member: &'s StaticMemberExpression<'_>) -> Option<Self> {
        if member.optional {
            return None;
        }
        let mut segments = vec![member.property.name.as_str()];
        let mut spans = vec![member.span];
        let root = collect(&member.object, &mut segments, &mut spans)?;
        Some(Self::finish(root, segments, spans))
    }

    pub fn of_assignment_target(target: &'s AssignmentTarget<'_>) -> Option<Self> {
        match target {
            AssignmentTarget::StaticMemberExpression(m) => Self::of_static_member(m),
            AssignmentTarget::AssignmentTargetIdentifier(id) => Some(MemberChain {
                root: ChainRoot::Identifier,
                segments: vec![id.name.as_str()],
                spans: vec![id.span],
            }),
            _ => None,
        }
    }

    pub fn of_simple_target(target: &'s SimpleAssignmentTarget<'_>) -> Option<Self> {
        match target {
            SimpleAssignmentTarget::StaticMemberExpression(m) => Self::of_static_member(m),
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => Some(MemberChain {
                root: ChainRoot::Identifier,
                segments: vec![id.name.as_str()],
                spans: vec![id.span],
            }),
            _ => None,
        }
    }
}

/// Where a chain is evaluated.
pub struct PathContext<'x> {
    pub settings: &'x ConversionSettings,
    /// Outside every function body
    pub top_level: bool,
    /// Namespace `this` stands for, inside a namespace method
    pub this_namespace: Option<&'x str>,
    /// Local object literals published as namespaces: local name -> namespace path
    pub local_aliases: &'x HashMap<String, String>,
    /// Names bound by enclosing functions, which shadow namespace roots
    pub locals: &'x LocalBindings,
}

/// A chain mapped onto a namespace path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPath {
    pub segments: Vec<String>,
    /// chain span index of a prefix of length `n` is `n - 1 + offset`
    offset: isize,
    /// Shortest prefix that stands for something in the chain
    pub min_len: usize,
    pub via_this: bool,
}

impl ChainPath {
    pub fn span_for_prefix(&self, chain: &MemberChain<'_>, len: usize) -> Span {
        let index = len as isize - 1 + self.offset;
        chain.spans[index.clamp(0, chain.spans.len() as isize - 1) as usize]
    }

    pub fn joined(&self, len: usize) -> String {
        self.segments[..len].join(".")
    }

    pub fn full(&self) -> String {
        self.segments.join(".")
    }
}

fn owned(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

fn rebased(base: &str, rest: &[&str]) -> Vec<String> {
    base.split('.')
        .map(str::to_string)
        .chain(rest.iter().map(|s| s.to_string()))
        .collect()
}

/// Map a chain onto a namespace path, stripping an explicit global-object prefix.
pub fn chain_path(chain: &MemberChain<'_>, cx: &PathContext<'_>) -> Option<ChainPath> {
    let segs = &chain.segments;
    let settings = cx.settings;
    let global_prefixed = |first_is_global: bool| {
        first_is_global && segs.len() > 1 && settings.is_namespace_root(segs[1])
    };

    match chain.root {
        ChainRoot::This => {
            if cx.top_level {
                if global_prefixed(true) {
                    return Some(ChainPath {
                        segments: owned(&segs[1..]),
                        offset: 1,
                        min_len: 1,
                        via_this: false,
                    });
                }
                return None;
            }
            let namespace = cx.this_namespace?;
            if segs.len() < 2 {
                return None;
            }
            let depth = namespace.split('.').count();
            Some(ChainPath {
                segments: rebased(namespace, &segs[1..]),
                offset: 1 - depth as isize,
                min_len: depth + 1,
                via_this: true,
            })
        }
        ChainRoot::Identifier => {
            if cx.locals.is_bound(segs[0]) {
                None
            } else if global_prefixed(segs[0] == settings.global_object) {
                Some(ChainPath {
                    segments: owned(&segs[1..]),
                    offset: 1,
                    min_len: 1,
                    via_this: false,
                })
            } else if settings.is_namespace_root(segs[0]) {
                Some(ChainPath {
                    segments: owned(segs),
                    offset: 0,
                    min_len: 1,
                    via_this: false,
                })
            } else if let Some(namespace) = cx.local_aliases.get(segs[0]) {
                let depth = namespace.split('.').count();
                Some(ChainPath {
                    segments: rebased(namespace, &segs[1..]),
                    offset: 1 - depth as isize,
                    min_len: depth,
                    via_this: false,
                })
            } else {
                None
            }
        }
    }
}

/// Namespace path of a top-level chain (no `this` namespace, no local aliases).
pub fn top_level_path(chain: &MemberChain<'_>, settings: &ConversionSettings) -> Option<String> {
    let aliases = HashMap::new();
    let locals = LocalBindings::default();
    let cx = PathContext {
        settings,
        top_level: true,
        this_namespace: None,
        local_aliases: &aliases,
        locals: &locals,
    };
    chain_path(chain, &cx).map(|p| p.full())
}

pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_program;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;

    fn with_first_expression<R>(source: &str, f: impl FnOnce(&Expression<'_>) -> R) -> R {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, source).unwrap();
        match &program.body[0] {
            Statement::ExpressionStatement(stmt) => f(&stmt.expression),
            _ => panic!("expected expression statement"),
        }
    }

    #[test]
    fn test_chain_segments_and_spans() {
        with_first_expression("window.NS.a.b;", |expr| {
            let chain = MemberChain::of_expression(expr).unwrap();
            assert_eq!(chain.segments, vec!["window", "NS", "a", "b"]);
            assert_eq!(chain.spans[1].end, 9);
            let settings = ConversionSettings::new().with_namespace("NS");
            let path = top_level_path(&chain, &settings).unwrap();
            assert_eq!(path, "NS.a.b");
        });
    }

    #[test]
    fn test_non_pure_chain_is_rejected() {
        with_first_expression("NS.f().b;", |expr| {
            assert!(MemberChain::of_expression(expr).is_none());
        });
    }

    #[test]
    fn test_this_inside_namespace_method() {
        with_first_expression("this.helper.x;", |expr| {
            let chain = MemberChain::of_expression(expr).unwrap();
            let settings = ConversionSettings::new().with_namespace("NS");
            let aliases = HashMap::new();
            let locals = LocalBindings::default();
            let cx = PathContext {
                settings: &settings,
                top_level: false,
                this_namespace: Some("NS.Util"),
                local_aliases: &aliases,
                locals: &locals,
            };
            let path = chain_path(&chain, &cx).unwrap();
            assert_eq!(path.full(), "NS.Util.helper.x");
            assert_eq!(path.min_len, 3);
            // prefix NS.Util.helper is `this.helper`
            let span = path.span_for_prefix(&chain, 3);
            assert_eq!((span.start, span.end), (0, 11));
        });
    }

    #[test]
    fn test_parent_and_last_segment() {
        assert_eq!(parent_path("NS.a.b"), Some("NS.a"));
        assert_eq!(parent_path("NS"), None);
        assert_eq!(last_segment("NS.a.b"), "b");
    }
}
