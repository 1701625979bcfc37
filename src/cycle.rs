//! Cycle Detector
//!
//! Depth-first traversal over the edges between converted documents. Every edge that
//! closes a cycle is flagged `cyclic` and reported once. Documents that share a strongly
//! connected component form a cyclic group; references between members of one group are
//! never substituted.

use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};

use crate::error::{Diagnostic, Diagnostics, DIAG_CYCLIC_DEPENDENCY};
use crate::graph::DocumentGraph;

#[derive(Debug, Default, Clone)]
pub struct CycleAnalysis {
    /// Converted documents, dependencies first
    pub order: Vec<String>,
    /// Document -> cyclic group id, only for documents that sit on a cycle
    groups: HashMap<String, usize>,
}

impl CycleAnalysis {
    /// Whether rewriting from `from` onto bindings owned by `to` must be degraded.
    pub fn is_degraded(&self, from: &str, to: &str) -> bool {
        match (self.groups.get(from), self.groups.get(to)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_cyclic(&self, url: &str) -> bool {
        self.groups.contains_key(url)
    }
}

struct Dfs<'g> {
    adjacency: HashMap<&'g str, Vec<(usize, &'g str)>>,
    visited: HashSet<&'g str>,
    on_path: IndexSet<&'g str>,
    back_edges: Vec<usize>,
    postorder: Vec<&'g str>,
}

impl<'g> Dfs<'g> {
    fn visit(&mut self, node: &'g str) {
        self.visited.insert(node);
        self.on_path.insert(node);
        let successors = self.adjacency.get(node).cloned().unwrap_or_default();
        for (edge, next) in successors {
            if self.on_path.contains(next) {
                self.back_edges.push(edge);
            } else if !self.visited.contains(next) {
                self.visit(next);
            }
        }
        self.on_path.shift_remove(node);
        self.postorder.push(node);
    }
}

/// Tarjan's strongly connected components.
struct Tarjan<'g> {
    adjacency: &'g HashMap<&'g str, Vec<(usize, &'g str)>>,
    index: usize,
    indices: HashMap<&'g str, usize>,
    lowlink: HashMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: HashSet<&'g str>,
    components: Vec<Vec<&'g str>>,
}

impl<'g> Tarjan<'g> {
    fn connect(&mut self, node: &'g str) {
        self.indices.insert(node, self.index);
        self.lowlink.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let adjacency = self.adjacency;
        for &(_, next) in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
            if !self.indices.contains_key(next) {
                self.connect(next);
                let low = self.lowlink[node].min(self.lowlink[next]);
                self.lowlink.insert(node, low);
            } else if self.on_stack.contains(next) {
                let low = self.lowlink[node].min(self.indices[next]);
                self.lowlink.insert(node, low);
            }
        }

        if self.lowlink[node] == self.indices[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

/// Flag cyclic edges, report each one once, and compute the processing order.
pub fn detect_cycles(graph: &mut DocumentGraph, diagnostics: &mut Diagnostics) -> CycleAnalysis {
    let mut cyclic_edges = Vec::new();
    let mut order = Vec::new();
    let mut groups = HashMap::new();

    {
        let mut adjacency: HashMap<&str, Vec<(usize, &str)>> = HashMap::new();
        for (i, edge) in graph.edges.iter().enumerate() {
            if graph.is_converted(&edge.from) && graph.is_converted(&edge.to) {
                adjacency
                    .entry(edge.from.as_str())
                    .or_default()
                    .push((i, edge.to.as_str()));
            }
        }

        let starts: Vec<&str> = graph
            .roots
            .iter()
            .map(String::as_str)
            .chain(graph.documents.keys().map(String::as_str))
            .filter(|url| graph.is_converted(url))
            .collect();

        let mut dfs = Dfs {
            adjacency,
            visited: HashSet::new(),
            on_path: IndexSet::new(),
            back_edges: Vec::new(),
            postorder: Vec::new(),
        };
        for &start in &starts {
            if !dfs.visited.contains(start) {
                dfs.visit(start);
            }
        }

        let mut tarjan = Tarjan {
            adjacency: &dfs.adjacency,
            index: 0,
            indices: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        };
        for &start in &starts {
            if !tarjan.indices.contains_key(start) {
                tarjan.connect(start);
            }
        }
        let components = tarjan.components;

        for (group, component) in components.iter().enumerate() {
            if component.len() > 1 {
                for member in component {
                    groups.insert(member.to_string(), group);
                }
            }
        }

        order.extend(dfs.postorder.iter().map(|s| s.to_string()));
        cyclic_edges.extend(dfs.back_edges.iter().copied());
    }

    let mut reported: HashSet<(String, String)> = HashSet::new();
    for index in cyclic_edges {
        let edge = &mut graph.edges[index];
        edge.cyclic = true;
        if reported.insert((edge.from.clone(), edge.to.clone())) {
            diagnostics.push(Diagnostic::info(
                DIAG_CYCLIC_DEPENDENCY,
                &edge.from,
                format!(
                    "cyclic dependency between '{}' and '{}'; references across this edge are not rewritten",
                    edge.from, edge.to
                ),
            ));
        }
    }

    CycleAnalysis { order, groups }
}
