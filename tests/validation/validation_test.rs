use resq::error::{ErrorKind, QueryError, QueryResult};
use resq::operator::Operator;
use resq::params::{parse, QueryParams};
use resq::schema::{builtin, FieldTarget, RelationPath};
use resq::validate::{validate, FieldSelection, ValidatedRequest};

fn run(resource_type: &str, pairs: &[(&str, &str)]) -> QueryResult<ValidatedRequest> {
    let registry = builtin::registry().unwrap();
    let schema = registry.get(resource_type)?;
    let parsed = parse(schema, &QueryParams::from_pairs(pairs.iter().copied()))?;
    validate(registry.graph(), schema, parsed)
}

#[test]
fn test_fieldset_mixes_attributes_and_relations() {
    let request = run("posts", &[("fields[posts]", "published,writer,title")]).unwrap();
    assert_eq!(
        request.fields,
        Some(vec![
            FieldSelection::Attribute {
                token: "published".into(),
                column: "published_at".into(),
            },
            FieldSelection::Relation {
                token: "writer".into(),
                relation: "writer".into(),
            },
            FieldSelection::Attribute {
                token: "title".into(),
                column: "title".into(),
            },
        ])
    );
}

#[test]
fn test_undeclared_field() {
    let err = run("users", &[("fields[users]", "name,password")]).unwrap_err();
    assert!(matches!(
        &err,
        QueryError::FieldNotAllowed { resource_type, field }
            if resource_type == "users" && field == "password"
    ));
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert_eq!(err.status(), 400);
}

#[test]
fn test_column_names_are_not_tokens() {
    // `published_at` is the column behind `published`, not a requestable token.
    let err = run("posts", &[("fields[posts]", "published_at")]).unwrap_err();
    assert!(matches!(err, QueryError::FieldNotAllowed { .. }));

    let err = run("posts", &[("sort", "content")]).unwrap_err();
    assert!(matches!(err, QueryError::SortNotAllowed { field } if field == "content"));
}

#[test]
fn test_relation_paths_resolve_to_targets() {
    let request = run("comments", &[("sort[comments]", "post.writer.name,-created")]).unwrap();
    assert_eq!(
        request.sort[0].target,
        FieldTarget::Path {
            path: RelationPath::parse("post.writer.name").unwrap(),
        }
    );
    assert_eq!(
        request.sort[1].target,
        FieldTarget::Column {
            column: "created_at".into(),
        }
    );
}

#[test]
fn test_filter_allow_lists() {
    let err = run("posts", &[("filter[content][like]", "x")]).unwrap_err();
    assert!(matches!(err, QueryError::FilterNotAllowed { field } if field == "content"));

    let err = run("posts", &[("filter[title][greater]", "x")]).unwrap_err();
    assert_eq!(err.parameter().as_deref(), Some("filter[title][greater]"));

    // Operator tokens are case-sensitive and closed.
    let err = run("posts", &[("filter[title][LIKE]", "x")]).unwrap_err();
    assert!(matches!(err, QueryError::FilterOperatorNotAllowed { .. }));
    let err = run("posts", &[("filter[title][regex]", "x")]).unwrap_err();
    assert!(matches!(err, QueryError::FilterOperatorNotAllowed { .. }));
}

#[test]
fn test_conditions_keep_request_order() {
    let request = run(
        "posts",
        &[
            ("filter[published][notNull]", ""),
            ("filter[published][after]", "2024-01-01"),
            ("filter[published][before]", "2024-12-31"),
        ],
    )
    .unwrap();
    let ops: Vec<_> = request.filters[0]
        .conditions
        .iter()
        .map(|c| c.operator)
        .collect();
    assert_eq!(ops, vec![Operator::NotNull, Operator::After, Operator::Before]);
}

#[test]
fn test_first_violation_is_reported() {
    // Both the fieldset and the sort are invalid; fields are checked first.
    let err = run(
        "posts",
        &[("fields[posts]", "secret"), ("sort", "content")],
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::FieldNotAllowed { .. }));
}
