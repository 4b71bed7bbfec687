use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use toolhunt_core::config::EngineConfig;
use toolhunt_core::traits::Embedder;
use toolhunt_core::types::{FusionPolicy, ToolRecord};
use toolhunt_core::{Catalog, Error};
use toolhunt_embed::HashEmbedder;
use toolhunt_hybrid::{BuildOptions, HybridEngine, ResponseStatus, SearchResponse, SearchService};
use toolhunt_text::TantivyIndexer;
use toolhunt_vector::EmbeddingCache;

/// One axis per concept; texts sharing a concept are similar even when they
/// share no words. Texts with no concept words embed to the zero vector.
const CONCEPTS: &[&[&str]] = &[
    &["scan", "scanner", "scanning", "network", "port", "ports", "nmap", "masscan"],
    &["packet", "packets", "analyzer", "traffic", "wireshark", "capture", "sniffer"],
    &["sql", "injection", "sqlmap", "database"],
];

#[derive(Default)]
struct ConceptEmbedder { fail_on: Option<&'static str> }

impl Embedder for ConceptEmbedder {
    fn id(&self) -> &str { "concept:d3" }
    fn dim(&self) -> usize { CONCEPTS.len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                let lowered = t.to_lowercase();
                if let Some(word) = self.fail_on { if lowered.contains(word) { anyhow::bail!("cannot embed '{}'", t); } }
                let mut v = vec![0f32; CONCEPTS.len()];
                for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()) {
                    for (axis, words) in CONCEPTS.iter().enumerate() {
                        if words.contains(&token) { v[axis] += 1.0; }
                    }
                }
                Ok(v)
            })
            .collect()
    }
}

fn tools() -> Vec<ToolRecord> {
    vec![
        ToolRecord::new("nmap", "network scanner", "https://nmap.org"),
        ToolRecord::new("wireshark", "packet analyzer", "https://wireshark.org"),
        ToolRecord::new("sqlmap", "sql injection tool", "https://sqlmap.org"),
    ]
}

/// Lexical order disagrees with semantic order for the query "scan tool".
fn mixed_tools() -> Vec<ToolRecord> {
    vec![
        ToolRecord::new("nmap", "network scanner", ""),
        ToolRecord::new("wireshark", "packet analyzer", ""),
        ToolRecord::new("toolbox", "tool tool tool", ""),
        ToolRecord::new("sqlmap", "sql injection tool with port detection", ""),
    ]
}

fn engine_with(records: Vec<ToolRecord>, policy: FusionPolicy, embedder: ConceptEmbedder) -> HybridEngine<TantivyIndexer> {
    let config = EngineConfig { policy, ..EngineConfig::default() };
    let text = TantivyIndexer::new().expect("tantivy");
    HybridEngine::build(Catalog::from_records(records).snapshot(), text, Arc::new(embedder), config, BuildOptions::default()).expect("build")
}

fn engine(records: Vec<ToolRecord>, policy: FusionPolicy) -> HybridEngine<TantivyIndexer> {
    engine_with(records, policy, ConceptEmbedder::default())
}

fn names(records: &[ToolRecord]) -> Vec<&str> { records.iter().map(|r| r.name.as_str()).collect() }

#[test]
fn network_scan_query_ranks_nmap_first_under_both_policies() {
    for policy in [FusionPolicy::SetUnion, FusionPolicy::Rescore] {
        let engine = engine(tools(), policy);
        let results = engine.search("scan ports on a network").expect("search");
        assert_eq!(names(&results).first(), Some(&"nmap"), "{policy:?}");
    }
}

#[test]
fn unrelated_query_on_single_entry_is_empty_not_error() {
    for policy in [FusionPolicy::SetUnion, FusionPolicy::Rescore] {
        let engine = engine(vec![ToolRecord::new("hydra", "login cracker", "")], policy);
        assert!(engine.search("packet capture").expect("search").is_empty());
    }
}

#[test]
fn set_union_puts_semantic_hits_before_lexical_only_hits() {
    let engine = engine(mixed_tools(), FusionPolicy::SetUnion);
    let ranked = engine.rank("scan tool").expect("rank");
    let ids: Vec<usize> = ranked.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![0, 2, 3]);
    assert!(ranked[0].fused_score.is_some());
    assert_eq!(ranked[1].fused_score, None);
    assert_eq!(ranked[2].fused_score, None);
}

#[test]
fn rescore_orders_every_candidate_by_one_similarity() {
    let engine = engine(mixed_tools(), FusionPolicy::Rescore);
    let ranked = engine.rank("scan tool").expect("rank");
    let ids: Vec<usize> = ranked.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![0, 3, 2], "sqlmap mentions ports, toolbox shares only a word");
    let scores: Vec<f32> = ranked.iter().map(|r| r.fused_score.expect("rescored entries carry a score")).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
}

#[test]
fn policy_can_be_chosen_per_call() {
    let engine = engine(mixed_tools(), FusionPolicy::Rescore);
    let union: Vec<usize> = engine.rank_with("scan tool", FusionPolicy::SetUnion).expect("rank").iter().map(|r| r.doc_id).collect();
    assert_eq!(union, vec![0, 2, 3]);
}

#[test]
fn fused_output_never_repeats_an_id() {
    let engine = engine(mixed_tools(), FusionPolicy::SetUnion);
    for query in ["scan tool", "network scanner sql", "packet analyzer tool", "sql injection port scanning", "nmap"] {
        let ranked = engine.rank(query).expect("rank");
        let unique: HashSet<usize> = ranked.iter().map(|r| r.doc_id).collect();
        assert_eq!(unique.len(), ranked.len(), "duplicate id for '{query}'");
    }
}

#[test]
fn identical_records_stay_distinct_by_id() {
    let records = vec![
        ToolRecord::new("nmap", "network scanner", "https://nmap.org"),
        ToolRecord::new("nmap", "network scanner", "https://mirror.example/nmap"),
        ToolRecord::new("wireshark", "packet analyzer", ""),
    ];
    for policy in [FusionPolicy::SetUnion, FusionPolicy::Rescore] {
        let engine = engine(records.clone(), policy);
        let ids: Vec<usize> = engine.rank("network scanner").expect("rank").iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![0, 1], "{policy:?}");
        let urls: Vec<String> = engine.search("network scanner").expect("search").into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://nmap.org", "https://mirror.example/nmap"], "{policy:?}");
    }
}

#[test]
fn same_query_twice_gives_same_ranking() {
    for policy in [FusionPolicy::SetUnion, FusionPolicy::Rescore] {
        let engine = engine(mixed_tools(), policy);
        assert_eq!(engine.rank("Scan Tool").expect("first"), engine.rank("scan tool").expect("second"));
    }
}

#[test]
fn embedding_failure_fails_the_query() {
    let engine = engine_with(tools(), FusionPolicy::Rescore, ConceptEmbedder { fail_on: Some("boom") });
    let err = engine.rank("boom scanner").unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err}");
}

#[test]
fn blank_query_is_rejected_by_the_engine() {
    let engine = engine(tools(), FusionPolicy::Rescore);
    assert!(matches!(engine.rank("   ").unwrap_err(), Error::EmptyQuery));
}

#[test]
fn invalid_config_fails_the_build() {
    let config = EngineConfig { semantic_k: 0, ..EngineConfig::default() };
    let text = TantivyIndexer::new().expect("tantivy");
    let result = HybridEngine::build(Catalog::from_records(tools()).snapshot(), text, Arc::new(ConceptEmbedder::default()), config, BuildOptions::default());
    assert!(matches!(result.err(), Some(Error::InvalidConfig(_))));
}

#[test]
fn cached_rebuild_ranks_the_same() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = EmbeddingCache::new(tmp.path().join("cache.json"));
    let build = || {
        let text = TantivyIndexer::new().expect("tantivy");
        let opts = BuildOptions { cache: Some(&cache), show_progress: false };
        HybridEngine::build(Catalog::from_records(tools()).snapshot(), text, Arc::new(HashEmbedder::new(256)), EngineConfig::default(), opts).expect("build")
    };
    let first = build().rank("network scanner").expect("rank");
    assert!(cache.path().exists());
    let second = build().rank("network scanner").expect("rank");
    assert_eq!(first, second);
    assert_eq!(first.first().map(|r| r.doc_id), Some(0));
}

#[test]
fn service_separates_empty_query_from_empty_results() {
    let service = SearchService::with_engine(engine(vec![ToolRecord::new("hydra", "login cracker", "")], FusionPolicy::Rescore));

    let (status, body) = service.handle("  ");
    assert_eq!(status, ResponseStatus::BadRequest);
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({"error": "No query provided"}));

    let (status, body) = service.handle("packet capture");
    assert_eq!(status, ResponseStatus::Ok);
    assert_eq!(serde_json::to_value(&body).unwrap(), json!({"results": []}));
}

#[test]
fn service_serializes_records_with_link() {
    let service = SearchService::with_engine(engine(tools(), FusionPolicy::Rescore));
    let (status, body) = service.handle("scan ports on a network");
    assert_eq!(status, ResponseStatus::Ok);
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({"results": [{"name": "nmap", "description": "network scanner", "link": "https://nmap.org"}]})
    );
    let parsed: SearchResponse = serde_json::from_str(&body.to_json()).unwrap();
    assert_eq!(parsed, body);
}

#[test]
fn service_hides_internal_failures() {
    let service = SearchService::with_engine(engine_with(tools(), FusionPolicy::Rescore, ConceptEmbedder { fail_on: Some("boom") }));
    let (status, body) = service.handle("boom");
    assert_eq!(status, ResponseStatus::Failed);
    assert_eq!(body, SearchResponse::Error { error: "search failed".to_string() });
}

#[test]
fn service_without_engine_reports_unavailable() {
    let service: SearchService<TantivyIndexer> = SearchService::new();
    assert!(matches!(service.search("nmap").unwrap_err(), Error::IndexUnavailable(_)));
    assert_eq!(service.handle("nmap").0, ResponseStatus::Failed);
}

#[test]
fn publishing_swaps_engine_without_disturbing_holders() {
    let service = SearchService::with_engine(engine(tools(), FusionPolicy::Rescore));
    let held = service.engine().expect("engine");

    let previous = service.publish(engine(vec![ToolRecord::new("masscan", "fast network port scanner", "")], FusionPolicy::Rescore));
    assert!(previous.is_some());

    assert_eq!(names(&service.search("network scanner").expect("new engine")), vec!["masscan"]);
    assert_eq!(names(&held.search("network scanner").expect("old engine")).first(), Some(&"nmap"));
}

#[test]
fn concurrent_queries_during_publish_always_succeed() {
    let service = SearchService::with_engine(engine(tools(), FusionPolicy::Rescore));
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..25 {
                    let (status, body) = service.handle("network scanner");
                    assert_eq!(status, ResponseStatus::Ok);
                    match body {
                        SearchResponse::Results { results } => assert!(!results.is_empty()),
                        SearchResponse::Error { error } => panic!("unexpected error {error}"),
                    }
                }
            });
        }
        for _ in 0..5 {
            service.publish(engine(tools(), FusionPolicy::SetUnion));
        }
    });
}
