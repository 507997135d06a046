use crate::config::WeightConfig;
use crate::index::{Document, Posting, PostingList};
use crate::tokenizer::Analyzer;
use std::collections::{BTreeMap, HashMap};

#[derive(Default, Clone, Copy)]
struct TermCounts {
    title: u32,
    body: u32,
}

/// term -> weighted postings, built from the title and forms of each document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingList>,
    num_postings: usize,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `doc.title` and `doc.forms` and append one posting per
    /// distinct term. Returns the number of postings emitted.
    ///
    /// Re-indexing the same doc_id appends again; nothing is replaced.
    pub fn index_document(&mut self, doc: &Document, analyzer: &Analyzer, weights: WeightConfig) -> usize {
        let mut counts: BTreeMap<String, TermCounts> = BTreeMap::new();
        for term in analyzer.terms(&doc.title) {
            counts.entry(term).or_default().title += 1;
        }
        for term in analyzer.terms(&doc.forms) {
            counts.entry(term).or_default().body += 1;
        }

        let emitted = counts.len();
        for (term, c) in counts {
            let weight = weights.weight(c.title, c.body);
            self.postings
                .entry(term.clone())
                .or_default()
                .push(Posting { doc_id: doc.doc_id, term, weight });
        }
        self.num_postings += emitted;
        emitted
    }

    /// Postings for an already-normalized term.
    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn num_postings(&self) -> usize {
        self.num_postings
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocId;

    fn doc(id: DocId, title: &str, forms: &str) -> Document {
        Document {
            doc_id: id,
            title: title.into(),
            language: "en".into(),
            forms: forms.into(),
            senses: "ignored senses run".into(),
            url: String::new(),
            vector: None,
        }
    }

    #[test]
    fn weights_follow_title_and_body_counts() {
        let mut inv = InvertedIndex::new();
        let analyzer = Analyzer::default();
        let emitted = inv.index_document(&doc(1, "run", "running ran run"), &analyzer, WeightConfig::default());
        assert_eq!(emitted, 3);

        let run = inv.get("run").unwrap();
        assert_eq!(run, &vec![Posting { doc_id: 1, term: "run".into(), weight: 11 }]);
        assert_eq!(inv.get("running").unwrap()[0].weight, 1);
        assert_eq!(inv.get("ran").unwrap()[0].weight, 1);
    }

    #[test]
    fn senses_are_not_indexed() {
        let mut inv = InvertedIndex::new();
        inv.index_document(&doc(1, "jump", ""), &Analyzer::default(), WeightConfig::default());
        assert!(inv.get("ignored").is_none());
        assert!(inv.get("senses").is_none());
    }

    #[test]
    fn case_and_punctuation_are_normalized() {
        let mut inv = InvertedIndex::new();
        inv.index_document(&doc(4, "Jump!", "JUMPS, jumped"), &Analyzer::default(), WeightConfig::default());
        assert_eq!(inv.get("jump").unwrap()[0].weight, 10);
        assert_eq!(inv.get("jumps").unwrap()[0].weight, 1);
        assert!(inv.get("!").is_none());
        assert!(inv.get(",").is_none());
        assert_eq!(inv.num_terms(), 3);
    }

    #[test]
    fn custom_weights_apply() {
        let mut inv = InvertedIndex::new();
        let weights = WeightConfig { title_boost: 3, body_weight: 2 };
        inv.index_document(&doc(9, "go go", "go went"), &Analyzer::default(), weights);
        assert_eq!(inv.get("go").unwrap()[0].weight, 3 * 2 + 2);
        assert_eq!(inv.get("went").unwrap()[0].weight, 2);
    }

    #[test]
    fn reindexing_same_id_appends() {
        let mut inv = InvertedIndex::new();
        let analyzer = Analyzer::default();
        inv.index_document(&doc(2, "walk", ""), &analyzer, WeightConfig::default());
        inv.index_document(&doc(2, "walk", "walked"), &analyzer, WeightConfig::default());
        let walk = inv.get("walk").unwrap();
        assert_eq!(walk.len(), 2);
        assert!(walk.iter().all(|p| p.doc_id == 2 && p.weight == 10));
        assert_eq!(inv.num_postings(), 3);
    }
}
