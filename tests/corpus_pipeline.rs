//! Snapshot load, identifier matching and citation building over
//! fixture corpora written to temp directories.

mod common;

use common::{counts, memory_store, paper, snapshot_line, work, write_part, write_snapshot};
use paperweave::pipeline::{load_snapshot, DEFAULT_MATCH_BATCH_SIZE};
use paperweave::source::CorpusLayout;
use paperweave::{
    CitationBuilder, GraphStore, IdentifierMatcher, KeySet, MatchStrategy, PaperColumn,
    SqliteStore, UpsertEngine,
};
use tempfile::TempDir;

const W: &str = "https://openalex.org/W";

fn wid(n: u32) -> String {
    format!("{}{}", W, n)
}

/// Five papers; four with DOIs. Two partitions, three part files:
/// works W1..W4 match DOIs, W9 matches nothing.
fn seeded() -> (SqliteStore, TempDir) {
    let store = memory_store();
    UpsertEngine::new(&store, 100).upsert_batch(&[
        paper("2401.00001", &["A One"], &["cs.AI"]).with_doi("10.1/one"),
        paper("2401.00002", &["B Two"], &["cs.AI"]).with_doi("10.1/two"),
        paper("2401.00003", &["C Three"], &["cs.LG"]).with_doi("10.1/three"),
        paper("2401.00004", &["D Four"], &["cs.LG"]).with_doi("10.1/four"),
        paper("2401.00005", &["E Five"], &["cs.LG"]),
    ]);

    let dir = tempfile::tempdir().unwrap();
    write_part(
        dir.path(),
        "2024-01-01",
        0,
        &[
            work(&wid(1), Some("10.1/one"), &[&wid(2), &wid(3), &wid(404)]),
            work(&wid(2), Some("10.1/two"), &[&wid(3)]),
        ],
    );
    write_part(
        dir.path(),
        "2024-01-01",
        1,
        &[
            work(&wid(3), Some("10.1/three"), &[]),
            work(&wid(9), Some("10.9/elsewhere"), &[&wid(1)]),
        ],
    );
    write_part(
        dir.path(),
        "2024-02-01",
        0,
        &[
            work(&wid(4), Some("10.1/four"), &[&wid(1)]),
            work(&wid(10), None, &[&wid(1)]),
        ],
    );
    (store, dir)
}

#[test]
fn corpus_layout_lists_partitions_and_parts() {
    let (_store, dir) = seeded();
    std::fs::write(dir.path().join("README"), "not a part").unwrap();

    let layout = CorpusLayout::discover(dir.path()).unwrap();
    assert_eq!(layout.partitions(), vec!["2024-01-01", "2024-02-01"]);
    assert_eq!(layout.parts().len(), 3);

    let overview = layout.overview();
    assert_eq!(overview.partitions, 2);
    assert_eq!(overview.files, 3);
    assert!(overview.total_mb > 0.0);
}

#[test]
fn strategies_produce_identical_graphs() {
    let mut results = Vec::new();
    for strategy in [MatchStrategy::StoreSide, MatchStrategy::ClientSide] {
        let (store, dir) = seeded();
        let layout = CorpusLayout::discover(dir.path()).unwrap();
        let matcher = IdentifierMatcher::new(&store, strategy, 2).unwrap();
        let stats = matcher.match_corpus(&layout, None);

        assert_eq!(stats.files, 3);
        assert_eq!(stats.lines, 6);
        assert_eq!(stats.matched, 4, "strategy {}", strategy);
        results.push((
            counts(&store),
            store.project_paper_keys(PaperColumn::OpenalexId).unwrap(),
        ));
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0.papers_with_openalex_id, 4);
}

#[test]
fn matching_twice_assigns_nothing_new() {
    let (store, dir) = seeded();
    let layout = CorpusLayout::discover(dir.path()).unwrap();
    let matcher =
        IdentifierMatcher::new(&store, MatchStrategy::StoreSide, DEFAULT_MATCH_BATCH_SIZE).unwrap();

    assert_eq!(matcher.match_corpus(&layout, None).matched, 4);
    assert_eq!(matcher.match_corpus(&layout, None).matched, 0);
    assert_eq!(counts(&store).papers_with_openalex_id, 4);
}

#[test]
fn citations_only_join_known_papers() {
    let (store, dir) = seeded();
    let layout = CorpusLayout::discover(dir.path()).unwrap();
    IdentifierMatcher::new(&store, MatchStrategy::ClientSide, 100)
        .unwrap()
        .match_corpus(&layout, None);

    let known = KeySet::load(&store, PaperColumn::OpenalexId).unwrap();
    assert_eq!(known.len(), 4);
    let builder = CitationBuilder::new(&store, &known, 1);
    let stats = builder.build_corpus(&layout, None);

    // W1→W2, W1→W3, W2→W3, W4→W1. W404 is unknown; W9 and W10 are not papers.
    assert_eq!(stats.matched, 4);
    assert_eq!(counts(&store).cites, 4);

    // Re-running merges the same edges.
    builder.build_corpus(&layout, None);
    assert_eq!(counts(&store).cites, 4);
}

#[test]
fn citations_without_matched_papers_write_nothing() {
    let (store, dir) = seeded();
    let known = KeySet::load(&store, PaperColumn::OpenalexId).unwrap();
    assert!(known.is_empty());

    let parts = CorpusLayout::discover(dir.path()).unwrap();
    let stats = CitationBuilder::new(&store, &known, 10)
        .build_file(&parts.parts()[0].path, None)
        .unwrap();
    assert_eq!(stats.lines, 2);
    assert_eq!(stats.matched, 0);
    assert_eq!(counts(&store).cites, 0);
}

#[test]
fn deleting_a_paper_drops_its_citations() {
    let (store, dir) = seeded();
    let layout = CorpusLayout::discover(dir.path()).unwrap();
    IdentifierMatcher::new(&store, MatchStrategy::StoreSide, 100)
        .unwrap()
        .match_corpus(&layout, None);
    let known = KeySet::load(&store, PaperColumn::OpenalexId).unwrap();
    CitationBuilder::new(&store, &known, 100).build_corpus(&layout, None);
    assert_eq!(counts(&store).cites, 4);

    let engine = UpsertEngine::new(&store, 100);
    let outcome = engine.upsert_batch(&[paperweave::PaperRecord::deleted("2401.00001")]);
    assert_eq!(outcome.deleted, 1);
    // W1 was on three of the four edges
    assert_eq!(counts(&store).cites, 1);
}

#[test]
fn snapshot_load_then_match() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("arxiv-metadata.json");
    write_snapshot(
        &snapshot,
        &[
            snapshot_line("0704.0001", Some("10.1/one"), &[["Balazs", "C.", ""], ["Berger", "E. L.", ""]], "hep-ph"),
            snapshot_line("0704.0002", None, &[["Streinu", "Ileana", ""]], "math.CO cs.CG"),
        ],
    );
    let mut raw = std::fs::read_to_string(&snapshot).unwrap();
    raw.push_str("{not json\n");
    std::fs::write(&snapshot, raw).unwrap();

    let store = memory_store();
    let engine = UpsertEngine::new(&store, 1);
    let stats = load_snapshot(&engine, &snapshot, None).unwrap();
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.outcome.updated, 2);

    assert_eq!(store.authors_of("0704.0001").unwrap(), vec!["C. Balazs", "E. L. Berger"]);
    assert_eq!(store.categories_of("0704.0002").unwrap(), vec!["cs.CG", "math.CO"]);

    let corpus = tempfile::tempdir().unwrap();
    let part = write_part(corpus.path(), "2024-01-01", 0, &[work(&wid(1), Some("10.1/one"), &[])]);
    let stats = IdentifierMatcher::new(&store, MatchStrategy::ClientSide, 10)
        .unwrap()
        .match_file(&part, None)
        .unwrap();
    assert_eq!(stats.matched, 1);
    assert_eq!(
        store.project_paper_keys(PaperColumn::OpenalexId).unwrap().into_iter().collect::<Vec<_>>(),
        vec![wid(1)]
    );
}
