use lexi_core::{DocId, EngineConfig, HybridSearcher, LexiconIndex, SearchConfig, WeightConfig};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

const DIM: usize = 4;

fn corpus() -> serde_json::Value {
    json!([
        {"id": "L1", "language": "en", "lemma": "run", "forms": ["running", "ran", "runs"], "senses": ["move swiftly on foot"], "url": "https://example.org/L1"},
        {"id": "L2", "language": "en", "lemma": "jump", "forms": ["jumping", "jumped"], "senses": ["leap"]},
        {"id": "L3", "lemmas": {"en": {"value": "walk"}}, "forms": [{"representations": {"en": {"value": "walking"}}}], "senses": [{"glosses": {"en": {"value": "move on foot"}}}]},
        {"id": "L4", "lemma": "run away", "forms": ["running away", "ran away"], "senses": ["flee"]},
        {"id": "L5", "lemma": "sprint", "forms": ["sprinting"], "senses": ["run fast"]},
        {"id": "L6", "lemma": "swim", "forms": ["swimming", "swam"]}
    ])
}

fn embeddings() -> String {
    [
        "L1\trun\t1 0 0 0",
        "L2\tjump\t0 1 0 0",
        "L3\twalk\t0.8 0.2 0 0",
        "L4\trun away\t0.9 0 0.1 0",
        "L5\tsprint\t0.95 0.05 0 0 0",
        "L6\tswim\t0 0 0 1",
    ]
    .join("\n")
}

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let c = dir.join("lexemes.json");
    let e = dir.join("vectors.txt");
    fs::write(&c, serde_json::to_vec_pretty(&corpus()).unwrap()).unwrap();
    fs::write(&e, embeddings()).unwrap();
    (c, e)
}

fn build() -> Arc<LexiconIndex> {
    let dir = tempfile::tempdir().unwrap();
    let (c, e) = write_inputs(dir.path());
    Arc::new(LexiconIndex::build(&c, &e, EngineConfig { dim: DIM, ..EngineConfig::default() }).unwrap())
}

fn ids(results: &[lexi_core::ScoredDocument]) -> Vec<DocId> {
    results.iter().map(|r| r.doc_id).collect()
}

#[test]
fn forward_index_returns_document_fields() {
    let index = build();
    let doc = index.get_document(1).unwrap();
    assert_eq!(doc.title, "run");
    assert_eq!(doc.language, "en");
    assert_eq!(doc.forms, "running ran runs");
    assert_eq!(doc.senses, "move swiftly on foot");
    assert_eq!(doc.url, "https://example.org/L1");
    assert_eq!(doc.vector.as_deref(), Some(&[1.0, 0.0, 0.0, 0.0][..]));

    let walk = index.get_document(3).unwrap();
    assert_eq!(walk.forms, "walking");
    assert_eq!(walk.url, "https://www.wikidata.org/wiki/Lexeme:L3");
    assert!(index.get_document(99).is_none());
}

#[test]
fn every_posting_matches_the_weight_formula() {
    let index = build();
    let analyzer = index.analyzer();
    let weights = WeightConfig::default();
    for doc in index.forward().iter() {
        let mut expected: HashMap<String, (u32, u32)> = HashMap::new();
        for t in analyzer.terms(&doc.title) {
            expected.entry(t).or_default().0 += 1;
        }
        for t in analyzer.terms(&doc.forms) {
            expected.entry(t).or_default().1 += 1;
        }
        for (term, (title, body)) in expected {
            let list = index.postings(&term).unwrap();
            let postings: Vec<_> = list.iter().filter(|p| p.doc_id == doc.doc_id).collect();
            assert_eq!(postings.len(), 1, "term {term} in doc {}", doc.doc_id);
            assert_eq!(postings[0].weight, weights.weight(title, body));
        }
    }
    // "run" is a title term of L1 and L4: 10 each; "away" title + two forms in L4.
    let away = index.postings("away").unwrap();
    assert_eq!(away.len(), 1);
    assert_eq!(away[0].weight, 12);
}

#[test]
fn lexical_only_scores_are_normalized() {
    let searcher = HybridSearcher::with_config(build(), SearchConfig { alpha: 1.0, beta: 0.0, ..SearchConfig::default() });
    let results = searcher.search("run away", &[]);
    assert_eq!(results[0].doc_id, 4);
    assert_eq!(results[0].score, 1.0);
    let lexical = searcher.lexical_candidates("run away");
    let max = lexical.values().map(|h| h.weight).max().unwrap() as f32;
    for r in &results {
        assert!((r.score - lexical[&r.doc_id].weight as f32 / max).abs() < 1e-6);
    }
    assert_eq!(results[0].signals.matched_terms, vec!["run", "away"]);
}

#[test]
fn vector_only_matches_ann_neighbours() {
    let index = build();
    let searcher = HybridSearcher::new(index.clone());
    let query = [1.0, 0.1, 0.0, 0.0];
    let neighbours = index.vectors().search(&query, 20).unwrap();
    let results = searcher.search("", &query);
    let from_ann: BTreeSet<DocId> = neighbours.iter().map(|m| m.doc_id).collect();
    let from_search: BTreeSet<DocId> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(from_ann, from_search);
    for m in neighbours {
        let r = results.iter().find(|r| r.doc_id == m.doc_id).unwrap();
        assert!((r.score - 0.5 * m.similarity).abs() < 1e-6);
    }
    assert_eq!(results[0].doc_id, 1);
}

#[test]
fn dimension_mismatch_is_lexical_only() {
    let index = build();
    // L5 carries five components against a dimension of four.
    assert!(index.get_document(5).unwrap().vector.is_none());
    assert!(!index.vectors().contains(5));
    assert_eq!(index.report().dimension_mismatches, 1);

    let searcher = HybridSearcher::new(index);
    assert_eq!(ids(&searcher.search("sprint", &[])), vec![5]);
    let vector_hits = searcher.search("", &[0.95, 0.05, 0.0, 0.0]);
    assert!(!vector_hits.iter().any(|r| r.doc_id == 5));
    assert_eq!(vector_hits.len(), 5);
}

#[test]
fn fusion_is_the_union_of_both_paths() {
    let searcher = HybridSearcher::with_config(build(), SearchConfig { k: 1, ..SearchConfig::default() });
    let results = searcher.search("swim", &[0.0, 1.0, 0.0, 0.0]);
    let got: BTreeSet<DocId> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(got, BTreeSet::from([2, 6]));
    assert!(!got.contains(&1));
}

#[test]
fn hybrid_ranking_rewards_agreement() {
    let searcher = HybridSearcher::new(build());
    let results = searcher.search("running", &[1.0, 0.0, 0.0, 0.0]);
    // L1 matches both sides, L4 matches "running" lexically and is close in vector space.
    assert_eq!(results[0].doc_id, 1);
    assert!(results[0].signals.lexical > 0.0 && results[0].signals.vector > 0.9);
    for pair in results.windows(2) {
        assert!(pair[0].score > pair[1].score || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id));
    }
}

#[test]
fn rebuilding_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (c, e) = write_inputs(dir.path());
    let cfg = EngineConfig { dim: DIM, ..EngineConfig::default() };
    let a = Arc::new(LexiconIndex::build(&c, &e, cfg.clone()).unwrap());
    let b = Arc::new(LexiconIndex::build(&c, &e, cfg).unwrap());
    assert_eq!(a.forward(), b.forward());
    assert_eq!(a.inverted(), b.inverted());
    assert_eq!(a.report(), b.report());

    let (sa, sb) = (HybridSearcher::new(a), HybridSearcher::new(b));
    for (q, v) in [("run", vec![]), ("", vec![0.5, 0.5, 0.0, 0.0]), ("jump walking", vec![0.0, 0.0, 0.0, 1.0])] {
        assert_eq!(sa.search(q, &v), sb.search(q, &v));
    }
}

#[test]
fn concurrent_searches_agree() {
    let searcher = HybridSearcher::new(build());
    let expected = searcher.search("ran", &[0.9, 0.1, 0.0, 0.0]);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let s = searcher.clone();
            thread::spawn(move || s.search("ran", &[0.9, 0.1, 0.0, 0.0]))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

#[test]
fn two_document_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let c = dir.path().join("c.json");
    let e = dir.path().join("e.txt");
    fs::write(&c, r#"[{"id": "L1", "lemma": "run", "forms": ["running", "ran"]}, {"id": "L2", "lemma": "jump"}]"#).unwrap();
    fs::write(&e, "").unwrap();
    let searcher = HybridSearcher::new(Arc::new(LexiconIndex::build(&c, &e, EngineConfig::default()).unwrap()));

    let lexical = searcher.lexical_candidates("running");
    assert_eq!(lexical.len(), 1);
    assert_eq!(lexical[&1u64].weight, 1);
    let results = searcher.search("running", &[]);
    assert_eq!(ids(&results), vec![1]);
    assert_eq!(results[0].signals.lexical, 1.0);
}
