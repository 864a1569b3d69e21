use std::fs;

use relation_miner::{
    error::DocumentError,
    nlp::segment::{self, Boundaries, MissingFiles},
};

#[test]
fn body_is_cut_between_markers() {
    let boundaries = Boundaries::new(["ABSTRACT"], ["REFERENCES"]);
    let text = "Title\nABSTRACT\nBody text.\nREFERENCES\nCitation 1";
    assert_eq!(segment::trim_to_body(text, &boundaries), "\nBody text.\n");

    let sentences = segment::split_sentences(segment::trim_to_body(text, &boundaries));
    assert_eq!(sentences, vec![" Body text".to_string(), " ".to_string()]);
    assert!(sentences.iter().all(|s| !s.contains("Title") && !s.contains("Citation")));
}

#[test]
fn missing_markers_keep_whole_text() {
    let text = "No markers here. Second one";
    assert_eq!(segment::trim_to_body(text, &Boundaries::default()), text);
    assert_eq!(segment::trim_to_body(text, &Boundaries::none()), text);
}

#[test]
fn earliest_marker_wins() {
    let boundaries = Boundaries::default();
    let text = "Header Abstract one. ABSTRACT two. References x. REFERENCES y";
    assert_eq!(
        segment::trim_to_body(text, &boundaries),
        " one. ABSTRACT two. "
    );
}

#[test]
fn paragraphs_and_line_breaks_split_as_expected() {
    let sentences = segment::split_sentences("First line\ncontinues. Next\n\nNew paragraph");
    assert_eq!(
        sentences,
        vec![
            "First line continues".to_string(),
            " Next".to_string(),
            "New paragraph".to_string(),
        ]
    );
}

#[test]
fn reading_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.txt");
    let original = "Intro\nABSTRACT\nAlpha beta. Gamma\nREFERENCES\n[1] x";
    fs::write(&path, original).unwrap();

    let sentences = segment::read_document(&path, &Boundaries::default()).unwrap();
    assert_eq!(sentences, vec![" Alpha beta".to_string(), " Gamma ".to_string()]);
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn absent_file_is_reported_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");
    match segment::read_document(&path, &Boundaries::default()) {
        Err(DocumentError::Missing(missing)) => assert_eq!(missing, path),
        other => panic!("expected missing document, got {other:?}"),
    }
}

#[test]
fn missing_report_is_deduplicated_and_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("out").join("missing_txt_files.txt");

    let mut missing = MissingFiles::default();
    missing.write_report(&report).unwrap();
    assert!(!report.exists());

    missing.record("/corpus/a.txt");
    missing.record("/corpus/b.txt");
    missing.record("/corpus/a.txt");
    assert_eq!(missing.len(), 2);
    missing.write_report(&report).unwrap();
    assert_eq!(
        fs::read_to_string(&report).unwrap(),
        "/corpus/a.txt\n/corpus/b.txt"
    );

    let mut later = MissingFiles::default();
    later.record("/corpus/c.txt");
    later.write_report(&report).unwrap();
    assert_eq!(fs::read_to_string(&report).unwrap(), "/corpus/c.txt");
}
