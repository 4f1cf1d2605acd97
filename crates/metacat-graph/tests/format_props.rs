//! Property tests for facet parsing and CSV export

use metacat_graph::{parse_csv, to_csv, Paper, PaperId, TagSet, TAG_SEPARATOR};
use proptest::prelude::*;

fn paper(id: u32, title: String) -> Paper {
    Paper {
        id: PaperId(id),
        year: 2000 + i32::try_from(id % 30).unwrap_or(0),
        title,
        authors: String::new(),
        source: "journal".to_string(),
        open_access: id % 2 == 0,
        data_available: false,
    }
}

proptest! {
    #[test]
    fn prop_parsed_tags_are_trimmed_and_non_empty(joined in "[a-c ;]{0,24}") {
        let tags = TagSet::parse(&joined);
        for tag in tags.iter() {
            prop_assert!(!tag.is_empty());
            prop_assert_eq!(tag.trim(), tag.as_str());
            prop_assert!(!tag.contains(TAG_SEPARATOR));
        }
        prop_assert_eq!(TagSet::parse(&tags.joined()), tags);
    }

    #[test]
    fn prop_csv_preserves_awkward_titles(titles in prop::collection::vec("[a-z ,\"\n]{0,16}", 1..8)) {
        let papers: Vec<Paper> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| paper(u32::try_from(i).unwrap_or(0), t.clone()))
            .collect();
        let csv = to_csv(&papers, &["authors"]).unwrap();
        let rows = parse_csv(&csv).unwrap();

        prop_assert_eq!(rows.len(), papers.len() + 1);
        prop_assert_eq!(&rows[0], &vec!["id", "year", "title", "source", "open_access", "data_available"]);
        for (row, title) in rows[1..].iter().zip(&titles) {
            prop_assert_eq!(row.len(), 6);
            prop_assert_eq!(&row[2], title);
        }
    }
}
