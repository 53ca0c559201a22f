// SPDX-License-Identifier: MIT

//! Mermaid rendering of compiled graphs
//!
//! ```text
//! graph TD
//!     __start__((START))
//!     __end__((END))
//!     router["router"]
//!     __start__ --> router
//!     router -. "joke" .-> llm_call_2
//! ```
//!
//! Node ids keep the reserved `__start__`/`__end__` markers and are unique
//! per diagram; the label always shows the real node name.

use super::graph::{CompiledGraph, Edge, END, START};
use crate::adk::error::LatticeError;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Words the flowchart parser treats as syntax when used as an id
const KEYWORDS: &[&str] = &["end", "graph", "subgraph", "flowchart", "style", "class", "click"];

/// Render `graph` as a `graph TD` Mermaid diagram
pub fn draw_mermaid(graph: &CompiledGraph) -> String {
    let ids = MermaidIds::new(graph.node_names());
    let mut out = String::from("graph TD\n");
    let _ = writeln!(out, "    {}((START))", ids.get(START));
    let _ = writeln!(out, "    {}((END))", ids.get(END));
    for name in graph.node_names() {
        let _ = writeln!(out, "    {}[\"{}\"]", ids.get(name), escape_mermaid(name));
    }

    for (source, edge) in graph.edges() {
        let from = ids.get(source);
        match edge {
            Edge::Direct(target) => {
                let _ = writeln!(out, "    {} --> {}", from, ids.get(target));
            }
            Edge::Conditional {
                paths: Some(paths), ..
            } => {
                for (label, target) in paths {
                    if label == target {
                        let _ = writeln!(out, "    {} -.-> {}", from, ids.get(target));
                    } else {
                        let _ = writeln!(
                            out,
                            "    {} -. \"{}\" .-> {}",
                            from,
                            escape_mermaid(label),
                            ids.get(target)
                        );
                    }
                }
            }
            // No table: any node may follow
            Edge::Conditional { paths: None, .. } => {
                for target in graph.node_names().into_iter().chain([END]) {
                    let _ = writeln!(out, "    {} -.-> {}", from, ids.get(target));
                }
            }
        }
    }
    out
}

/// Write the diagram of `graph` to `path`, creating parent directories
pub fn write_mermaid(graph: &CompiledGraph, path: impl AsRef<Path>) -> Result<(), LatticeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, draw_mermaid(graph))?;
    log::info!("Wrote workflow diagram to {}", path.display());
    Ok(())
}

fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One distinct Mermaid id per node name
struct MermaidIds {
    ids: HashMap<String, String>,
}

impl MermaidIds {
    fn new(names: Vec<&str>) -> Self {
        let mut ids = HashMap::new();
        let mut taken = HashSet::new();
        for marker in [START, END] {
            ids.insert(marker.to_string(), marker.to_string());
            taken.insert(marker.to_string());
        }

        for name in names {
            let base = sanitize_id(name);
            let mut id = base.clone();
            let mut n = 1;
            while !taken.insert(id.clone()) {
                n += 1;
                id = format!("{}_{}", base, n);
            }
            ids.insert(name.to_string(), id);
        }
        Self { ids }
    }

    fn get(&self, name: &str) -> String {
        self.ids
            .get(name)
            .cloned()
            .unwrap_or_else(|| sanitize_id(name))
    }
}

/// Alphanumeric plus underscore, never empty and never a keyword
fn sanitize_id(s: &str) -> String {
    let id: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.is_empty() || KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(&id)) {
        format!("node_{}", id)
    } else {
        id
    }
}
