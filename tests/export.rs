use std::fs::{self, File};

use polars::prelude::{ParquetReader, SerReader};
use relation_miner::{
    data::export,
    nlp::relclf::Category,
    pipeline::merge::ResultRow,
};

fn rows() -> Vec<ResultRow> {
    vec![ResultRow {
        document_id: 42,
        doi: Some("10.1000/42".into()),
        url: None,
        year: Some(2020),
        author: Some("Doe, J.".into()),
        title: Some("Signals, noise".into()),
        journal: None,
        keyword_1: "gene y".into(),
        general_term_x: Some("gene".into()),
        displayed_term_x: None,
        keyword_2: "protein x".into(),
        general_term_y: None,
        displayed_term_y: Some("Protein X".into()),
        sentence: "Protein X increases Gene Y".into(),
        category: Some(Category::PositiveImpact),
    }]
}

#[test]
fn csv_export_uses_historical_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("results.csv");
    export::write_results(&path, &rows()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "doi,url,year,author,title,journal,1st_keyword,general_term_x,displayed_term_x,\
         2nd_keyword,general_term_y,displayed_term_y,sentences,category,bib_id"
    );
    assert_eq!(
        lines.next().unwrap(),
        "10.1000/42,,2020,\"Doe, J.\",\"Signals, noise\",,gene y,gene,,protein x,,Protein X,\
         Protein X increases Gene Y,POSITIVE_IMPACT,42"
    );
    assert!(lines.next().is_none());
}

#[test]
fn parquet_export_round_trips_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.parquet");
    export::write_results(&path, &rows()).unwrap();

    let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(df.width(), 15);
}
