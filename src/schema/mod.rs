//! Schema inference over sampled documents.
//!
//! Each field path records the union of value kinds seen across the sample and
//! the number of documents the path appeared in (once per document).

use crate::database::value::ValueKind;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write;

/// Kinds observed for one dotted field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub path: String,
    pub kinds: BTreeSet<ValueKind>,
    pub occurrences: usize,
    /// Share of sampled documents containing the path, in `1..=100`.
    pub percentage: u32,
}

impl FieldSchema {
    pub fn depth(&self) -> usize {
        self.path.matches('.').count()
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

/// Inferred schema of a collection sample.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferredSchema {
    pub sample_size: usize,
    pub fields: Vec<FieldSchema>,
}

impl InferredSchema {
    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }

    pub fn field(&self, path: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Fields ordered by nesting depth, then path.
    pub fn ordered(&self) -> Vec<&FieldSchema> {
        let mut fields: Vec<&FieldSchema> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.path.cmp(&b.path)));
        fields
    }

    /// One line per field: indented leaf name, kinds and presence.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for field in self.ordered() {
            let kinds: Vec<&str> = field.kinds.iter().map(ValueKind::as_str).collect();
            let _ = writeln!(
                out,
                "{}{}: {} ({}%)",
                "  ".repeat(field.depth()),
                field.name(),
                kinds.join(" | "),
                field.percentage
            );
        }
        out.truncate(out.trim_end().len());
        out
    }
}

#[derive(Default)]
struct PathStats {
    kinds: BTreeSet<ValueKind>,
    occurrences: usize,
}

/// Accumulates per-path statistics one document at a time.
#[derive(Default)]
pub struct SchemaInferencer {
    paths: BTreeMap<String, PathStats>,
    documents: usize,
}

impl SchemaInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Infer a schema from a complete sample.
    pub fn infer(documents: &[Document]) -> InferredSchema {
        let mut inferencer = Self::new();
        for document in documents {
            inferencer.observe(document);
        }
        inferencer.finish()
    }

    pub fn observe(&mut self, document: &Document) {
        self.documents += 1;
        let mut seen = HashSet::new();
        self.walk(document, "", &mut seen);
        for path in seen {
            if let Some(stats) = self.paths.get_mut(&path) {
                stats.occurrences += 1;
            }
        }
    }

    fn walk(&mut self, document: &Document, prefix: &str, seen: &mut HashSet<String>) {
        for (key, value) in document {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };

            self.paths
                .entry(path.clone())
                .or_default()
                .kinds
                .insert(ValueKind::of(value));

            if let Bson::Document(nested) = value {
                self.walk(nested, &path, seen);
            }
            seen.insert(path);
        }
    }

    pub fn finish(self) -> InferredSchema {
        let total = self.documents;
        let fields = self
            .paths
            .into_iter()
            .map(|(path, stats)| FieldSchema {
                percentage: presence_percentage(stats.occurrences, total),
                path,
                kinds: stats.kinds,
                occurrences: stats.occurrences,
            })
            .collect();

        InferredSchema {
            sample_size: total,
            fields,
        }
    }
}

/// `round(occurrences / total * 100)`, floored at 1 for any observed path.
fn presence_percentage(occurrences: usize, total: usize) -> u32 {
    if total == 0 || occurrences == 0 {
        return 0;
    }
    let pct = (occurrences as f64 / total as f64 * 100.0).round() as u32;
    pct.clamp(1, 100)
}
