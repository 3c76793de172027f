#[path = "../common/mod.rs"]
mod common;

use common::{engine, engine_with, ids, params, seeded_executor};
use resq::config::PaginationSettings;
use resq::pagination::PageMode;

#[test]
fn test_length_aware_last_page() {
    let executor = seeded_executor();
    let page = engine()
        .query(
            &executor,
            "posts",
            &params(&[("sort", "title"), ("page[size]", "3"), ("page[number]", "2")]),
        )
        .unwrap();

    assert_eq!(ids(&page), vec![3]);
    assert_eq!(page.total_count, Some(4));
    assert_eq!(page.last_page, Some(2));
    assert_eq!((page.page_size, page.page_number), (3, 2));
    assert!(!page.has_more);
}

#[test]
fn test_length_aware_first_page_has_more() {
    let executor = seeded_executor();
    let page = engine()
        .query(
            &executor,
            "posts",
            &params(&[("sort", "title"), ("page[size]", "3")]),
        )
        .unwrap();

    // "Draft 100% done" < "New post A" < "New post B" < "Old post"
    assert_eq!(ids(&page), vec![4, 1, 2]);
    assert!(page.has_more);
}

#[test]
fn test_page_past_the_end_is_empty() {
    let executor = seeded_executor();
    let page = engine()
        .query(&executor, "posts", &params(&[("page[number]", "5")]))
        .unwrap();

    assert!(page.rows.is_empty());
    assert_eq!(page.total_count, Some(4));
    assert_eq!(page.last_page, Some(1));
    assert!(!page.has_more);
}

#[test]
fn test_count_respects_filters() {
    let executor = seeded_executor();
    let page = engine()
        .query(
            &executor,
            "posts",
            &params(&[("filter[writer.email][like]", "example.com"), ("page[size]", "1")]),
        )
        .unwrap();

    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.total_count, Some(3));
    assert_eq!(page.last_page, Some(3));
}

#[test]
fn test_empty_result_has_one_last_page() {
    let executor = seeded_executor();
    let page = engine()
        .query(&executor, "posts", &params(&[("filter[title][like]", "nothing")]))
        .unwrap();

    assert!(page.rows.is_empty());
    assert_eq!(page.total_count, Some(0));
    assert_eq!(page.last_page, Some(1));
}

#[test]
fn test_simple_mode() {
    let executor = seeded_executor();
    let engine = engine_with(PaginationSettings {
        mode: PageMode::Simple,
        ..PaginationSettings::default()
    });

    let first = engine
        .query(
            &executor,
            "posts",
            &params(&[("sort", "title"), ("page[size]", "3")]),
        )
        .unwrap();
    assert_eq!(ids(&first), vec![4, 1, 2]);
    assert!(first.has_more);
    assert_eq!(first.total_count, None);
    assert_eq!(first.last_page, None);

    let second = engine
        .query(
            &executor,
            "posts",
            &params(&[("sort", "title"), ("page[size]", "3"), ("page[number]", "2")]),
        )
        .unwrap();
    assert_eq!(ids(&second), vec![3]);
    assert!(!second.has_more);

    let json = serde_json::to_value(&second).unwrap();
    assert!(json.get("total_count").is_none());
    assert!(json.get("last_page").is_none());
}

#[test]
fn test_default_and_max_size() {
    let executor = seeded_executor();
    let engine = engine_with(PaginationSettings {
        default_size: 2,
        max_size: 3,
        mode: PageMode::LengthAware,
    });

    let page = engine.query(&executor, "posts", &params(&[])).unwrap();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.page_size, 2);

    let page = engine
        .query(&executor, "posts", &params(&[("page[size]", "50")]))
        .unwrap();
    assert_eq!(page.rows.len(), 3);
    assert_eq!(page.page_size, 3);
}
