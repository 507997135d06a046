use crate::index::{DocId, Document};
use std::collections::HashMap;

/// doc_id -> Document. Authoritative store of entry metadata and vectors.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ForwardIndex {
    docs: HashMap<DocId, Document>,
}

impl ForwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with last-write-wins semantics. Returns the replaced document, if any.
    pub fn insert(&mut self, doc: Document) -> Option<Document> {
        self.docs.insert(doc.doc_id, doc)
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(&doc_id)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.docs.contains_key(&doc_id)
    }

    /// Replace (or clear) the vector of an existing document. Returns false when the id is unknown.
    pub fn set_vector(&mut self, doc_id: DocId, vector: Option<Vec<f32>>) -> bool {
        match self.docs.get_mut(&doc_id) {
            Some(doc) => {
                doc.vector = vector;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    /// Documents ordered by ascending id, for deterministic traversal.
    pub fn sorted(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.docs.values().collect();
        docs.sort_by_key(|d| d.doc_id);
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, title: &str) -> Document {
        Document {
            doc_id: id,
            title: title.into(),
            language: "en".into(),
            forms: String::new(),
            senses: String::new(),
            url: String::new(),
            vector: None,
        }
    }

    #[test]
    fn last_write_wins() {
        let mut fwd = ForwardIndex::new();
        assert!(fwd.insert(doc(7, "first")).is_none());
        let replaced = fwd.insert(doc(7, "second")).unwrap();
        assert_eq!(replaced.title, "first");
        assert_eq!(fwd.len(), 1);
        assert_eq!(fwd.get(7).unwrap().title, "second");
    }

    #[test]
    fn set_vector_only_touches_known_ids() {
        let mut fwd = ForwardIndex::new();
        fwd.insert(doc(1, "a"));
        assert!(fwd.set_vector(1, Some(vec![1.0, 2.0])));
        assert!(!fwd.set_vector(2, Some(vec![1.0])));
        assert_eq!(fwd.get(1).unwrap().vector.as_deref(), Some(&[1.0, 2.0][..]));
        assert!(fwd.set_vector(1, None));
        assert!(fwd.get(1).unwrap().vector.is_none());
    }

    #[test]
    fn sorted_orders_by_id() {
        let mut fwd = ForwardIndex::new();
        for id in [5, 1, 3] {
            fwd.insert(doc(id, "x"));
        }
        let ids: Vec<DocId> = fwd.sorted().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
