use resq::error::QueryError;
use resq::params::{parse, PageParams, QueryParams, SortDirection, SortKey};
use resq::schema::builtin;

fn pairs(pairs: &[(&str, &str)]) -> QueryParams {
    QueryParams::from_pairs(pairs.iter().copied())
}

#[test]
fn test_full_request_decodes_and_parses() {
    let params = pairs(&[
        ("fields[posts]", "title,writer"),
        ("sort", "-title,writer.name"),
        ("filter[title][like]", "New"),
        ("filter[published][after]", "2024-01-01"),
        ("page[size]", "5"),
        ("page[number]", "2"),
    ]);

    let parsed = parse(&builtin::posts(), &params).unwrap();

    assert_eq!(parsed.fields, vec!["title", "writer"]);
    assert_eq!(
        parsed.sort,
        vec![
            SortKey {
                field: "title".into(),
                direction: SortDirection::Descending,
            },
            SortKey {
                field: "writer.name".into(),
                direction: SortDirection::Ascending,
            },
        ]
    );
    let fields: Vec<_> = parsed.filter.iter().map(|g| g.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "published"]);
    assert_eq!(parsed.filter[0].conditions[0].operator, "like");
    assert_eq!(parsed.filter[0].conditions[0].value, "New");
    assert_eq!(
        parsed.page,
        PageParams {
            size: Some(5),
            number: Some(2),
        }
    );
}

#[test]
fn test_other_types_fieldsets_are_ignored() {
    let parsed = parse(&builtin::posts(), &pairs(&[("fields[users]", "name")])).unwrap();
    assert!(parsed.fields.is_empty());
}

#[test]
fn test_fields_must_be_keyed_by_type() {
    let err = parse(&builtin::posts(), &pairs(&[("fields", "title")])).unwrap_err();
    assert!(matches!(err, QueryError::FieldsMalformed { resource_type } if resource_type == "posts"));
}

#[test]
fn test_sort_grammar_rejections() {
    for raw in ["", "title,", ",title", "Title", "writer..name", "--title", "ti tle", "1title"] {
        let err = parse(&builtin::posts(), &pairs(&[("sort", raw)])).unwrap_err();
        assert!(
            matches!(err, QueryError::SortMalformed),
            "expected SortMalformed for {raw:?}"
        );
    }
}

#[test]
fn test_repeated_sort_is_malformed() {
    let err = parse(
        &builtin::posts(),
        &pairs(&[("sort", "title"), ("sort", "-title")]),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::SortMalformed));
}

#[test]
fn test_filter_shapes() {
    let schema = builtin::posts();

    // filter=x, filter[title]=x, and a repeated condition are all malformed
    for request in [
        vec![("filter", "x")],
        vec![("filter[title]", "x")],
        vec![("filter[title][like]", "a"), ("filter[title][like]", "b")],
    ] {
        let err = parse(&schema, &pairs(&request)).unwrap_err();
        assert!(matches!(err, QueryError::FilterMalformed), "{request:?}");
    }
}

#[test]
fn test_page_errors_name_the_parameter() {
    let schema = builtin::posts();
    let cases = [
        (("page[size]", "0"), "page[size]"),
        (("page[size]", "-1"), "page[size]"),
        (("page[number]", "abc"), "page[number]"),
        (("page", "3"), "page"),
    ];
    for ((key, value), parameter) in cases {
        let err = parse(&schema, &pairs(&[(key, value)])).unwrap_err();
        assert_eq!(err.parameter().as_deref(), Some(parameter), "{key}={value}");
    }
}

#[test]
fn test_namespaced_parameters() {
    let schema = builtin::comments();

    let parsed = parse(
        &schema,
        &pairs(&[
            ("sort[comments]", "-created"),
            ("filter[comments][content][like]", "Nice"),
        ]),
    )
    .unwrap();
    assert_eq!(parsed.sort[0].field, "created");
    assert_eq!(parsed.sort[0].direction, SortDirection::Descending);
    assert_eq!(parsed.filter[0].field, "content");

    // A bare sort string is the flat style, which comments do not accept.
    let err = parse(&schema, &pairs(&[("sort", "-created")])).unwrap_err();
    assert!(matches!(err, QueryError::SortMalformed));

    // Flat filters and other namespaces are rejected the same way.
    for bad in [
        ("filter[content][like]", "Nice"),
        ("filter[secret][equal]", "x"),
    ] {
        let err = parse(&schema, &pairs(&[bad])).unwrap_err();
        assert!(matches!(err, QueryError::FilterMalformed));
    }
}

#[test]
fn test_json_object_params() {
    let map = serde_json::json!({
        "filter": { "title": { "equal": 42 } },
        "page": { "size": 3 }
    });
    let params = QueryParams::from(map.as_object().cloned().unwrap());

    let parsed = parse(&builtin::posts(), &params).unwrap();
    assert_eq!(parsed.filter[0].conditions[0].value, "42");
    assert_eq!(parsed.page.size, Some(3));
}
