use std::collections::HashSet;

use super::types::Projection;
use crate::types::{Document, ID_FIELD};

/// Include/exclude sets derived once per query and applied to every fetched document.
#[derive(Debug, Clone, Default)]
pub struct CompiledProjection {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl CompiledProjection {
    #[must_use]
    pub fn new(projection: &Projection) -> Self {
        let mut out = Self::default();
        for (field, keep) in &projection.fields {
            if *keep {
                out.include.insert(field.clone());
            } else {
                out.exclude.insert(field.clone());
            }
        }
        out
    }

    /// Removes excluded keys, then keeps only included keys, then restores `_id`
    /// unless `_id` itself was excluded. The order of the two passes matters for mixed masks.
    #[must_use]
    pub fn apply(&self, mut doc: Document) -> Document {
        let id = doc.get(ID_FIELD).cloned();
        if !self.exclude.is_empty() {
            doc.retain(|k, _| !self.exclude.contains(k));
        }
        if !self.include.is_empty() {
            doc.retain(|k, _| self.include.contains(k));
        }
        if !self.exclude.contains(ID_FIELD) {
            if let Some(id) = id {
                doc.insert(ID_FIELD.to_string(), id);
            }
        }
        doc
    }
}
