use resq::config::PaginationSettings;
use resq::engine::QueryEngine;
use resq::error::{QueryError, QueryResult};
use resq::operator::Operator;
use resq::params::QueryParams;
use resq::plan::{CompiledQueryPlan, Predicate, Projection};
use resq::schema::{builtin, ResourceSchema, SchemaRegistry};
use resq::sql::Dialect;
use sqlparser::dialect::{DuckDbDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn compile(resource_type: &str, pairs: &[(&str, &str)]) -> QueryResult<CompiledQueryPlan> {
    let engine = QueryEngine::new(builtin::registry().unwrap(), PaginationSettings::default());
    engine.compile(resource_type, &QueryParams::from_pairs(pairs.iter().copied()))
}

fn assert_parses(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("invalid SQL for {dialect}: {e}\n{sql}");
    }
}

#[test]
fn test_readme_request() {
    let plan = compile(
        "posts",
        &[
            ("sort", "-title"),
            ("filter[title][like]", "New"),
            ("page[size]", "1"),
            ("page[number]", "1"),
        ],
    )
    .unwrap();

    insta::assert_snapshot!(plan.to_sql(Dialect::Postgres), @r#"
    SELECT
      "posts".*
    FROM "posts"
    WHERE "posts"."title" LIKE '%New%' ESCAPE '\'
    ORDER BY "posts"."title" DESC
    LIMIT 1 OFFSET 0
    "#);
    insta::assert_snapshot!(plan.count_sql(Dialect::Postgres), @r#"
    SELECT
      COUNT(*)
    FROM "posts"
    WHERE "posts"."title" LIKE '%New%' ESCAPE '\'
    "#);
}

#[test]
fn test_values_are_always_literals() {
    let plan = compile(
        "posts",
        &[("filter[title][equal]", "x' OR '1'='1"), ("filter[writer.name][like]", "O'Brien")],
    )
    .unwrap();
    let sql = plan.to_sql(Dialect::Sqlite);

    assert!(sql.contains("\"posts\".\"title\" = 'x'' OR ''1''=''1'"), "{sql}");
    assert!(sql.contains("LIKE '%O''Brien%'"), "{sql}");
}

#[test]
fn test_like_wildcards_are_escaped() {
    let plan = compile("posts", &[("filter[title][notLike]", "100%_done")]).unwrap();
    let sql = plan.to_sql(Dialect::Sqlite);
    assert!(
        sql.contains(r"NOT LIKE '%100\%\_done%' ESCAPE '\'"),
        "{sql}"
    );
}

#[test]
fn test_dialect_date_rendering() {
    let plan = compile("posts", &[("filter[published][afterOrEqual]", "2024-01-31")]).unwrap();

    assert!(plan
        .to_sql(Dialect::Sqlite)
        .contains("DATE(\"posts\".\"published_at\") >= '2024-01-31'"));
    assert!(plan
        .to_sql(Dialect::Postgres)
        .contains("CAST(\"posts\".\"published_at\" AS DATE) >= DATE '2024-01-31'"));
    assert_parses(&plan.to_sql(Dialect::Postgres), Dialect::Postgres);
    assert_parses(&plan.to_sql(Dialect::DuckDb), Dialect::DuckDb);
}

#[test]
fn test_timestamps_accepted_as_dates() {
    let plan = compile(
        "posts",
        &[("filter[published][before]", "2024-02-01T12:30:00Z")],
    )
    .unwrap();
    assert!(plan
        .to_sql(Dialect::Sqlite)
        .contains("DATE(\"posts\".\"published_at\") < '2024-02-01'"));
}

#[test]
fn test_list_operators() {
    let plan = compile("users", &[("filter[type][in]", "admin,member")]).unwrap();
    assert!(plan
        .to_sql(Dialect::Sqlite)
        .contains("\"users\".\"type\" IN ('admin', 'member')"));

    let err = compile("users", &[("filter[type][notIn]", "admin,")]).unwrap_err();
    assert!(matches!(err, QueryError::FilterFormat { field, operator }
        if field == "type" && operator == "notIn"));
}

#[test]
fn test_sort_joins_are_shared_and_aliased() {
    let plan = compile(
        "comments",
        &[("sort[comments]", "post.writer.name,post.title,writer.name")],
    )
    .unwrap();

    let aliases: Vec<_> = plan.joins.iter().map(|j| j.alias.as_str()).collect();
    assert_eq!(
        aliases,
        vec!["comments_posts", "comments_posts_users", "comments_users"]
    );
    let sql = plan.to_sql(Dialect::Sqlite);
    assert!(sql.contains(
        "ORDER BY \"comments_posts_users\".\"name\" ASC, \"comments_posts\".\"title\" ASC, \"comments_users\".\"name\" ASC"
    ), "{sql}");
    assert_parses(&sql, Dialect::Sqlite);
}

#[test]
fn test_relation_filters_never_join() {
    let plan = compile(
        "users",
        &[("filter[posts.title][like]", "post"), ("sort", "name")],
    )
    .unwrap();

    assert!(plan.joins.is_empty());
    assert!(matches!(&plan.predicates[0], Predicate::Exists { hops, .. } if hops.len() == 1));
}

#[test]
fn test_sparse_fieldset_projection() {
    let plan = compile("comments", &[("fields[comments]", "content,post")]).unwrap();
    let Projection::Columns(columns) = &plan.projection else {
        panic!("expected explicit columns");
    };
    let names: Vec<_> = columns.iter().map(|c| c.to_string()).collect();
    assert_eq!(
        names,
        vec!["comments.id", "comments.content", "comments.post_id"]
    );
}

#[test]
fn test_every_single_field_projects_key_and_column() {
    let registry = builtin::registry().unwrap();
    for schema in registry.schemas() {
        let key = format!("fields[{}]", schema.resource_type);
        for (token, column) in &schema.fields {
            let plan = compile(&schema.resource_type, &[(key.as_str(), token.as_str())]).unwrap();
            let Projection::Columns(columns) = &plan.projection else {
                panic!("expected explicit columns for {key}={token}");
            };

            let mut expected = vec![format!("{}.{}", schema.table, schema.primary_key)];
            let own = format!("{}.{}", schema.table, column);
            if !expected.contains(&own) {
                expected.push(own);
            }
            let names: Vec<_> = columns.iter().map(|c| c.to_string()).collect();
            assert_eq!(names, expected, "{key}={token}");
        }
    }
}

fn ranges_engine() -> QueryEngine {
    let ranges = ResourceSchema::builder("ranges", "ranges")
        .fields(&["x"])
        .filterable("x", "x", &[Operator::Between, Operator::NotBetween])
        .build();
    let registry = SchemaRegistry::builder().resource(ranges).build().unwrap();
    QueryEngine::new(registry, PaginationSettings::default())
}

#[test]
fn test_range_operators() {
    let engine = ranges_engine();
    let compile = |pairs: &[(&str, &str)]| {
        engine.compile("ranges", &QueryParams::from_pairs(pairs.iter().copied()))
    };

    let sql = compile(&[("filter[x][between]", "a,m")])
        .unwrap()
        .to_sql(Dialect::Sqlite);
    assert!(sql.contains("\"ranges\".\"x\" BETWEEN 'a' AND 'm'"), "{sql}");
    assert_parses(&sql, Dialect::Sqlite);

    let sql = compile(&[("filter[x][notBetween]", "a,m")])
        .unwrap()
        .to_sql(Dialect::Postgres);
    assert!(sql.contains("\"ranges\".\"x\" NOT BETWEEN 'a' AND 'm'"), "{sql}");
    assert_parses(&sql, Dialect::Postgres);

    for bad in ["a,b,c", "a"] {
        let err = compile(&[("filter[x][between]", bad)]).unwrap_err();
        assert!(matches!(err, QueryError::FilterFormat { .. }), "{bad}: {err:?}");
        assert_eq!(err.parameter().as_deref(), Some("filter[x][between]"));
    }
}

#[test]
fn test_page_size_clamped() {
    let plan = compile("posts", &[("page[size]", "1000"), ("page[number]", "3")]).unwrap();
    assert_eq!(plan.page.size, 100);
    assert!(plan.to_sql(Dialect::Sqlite).ends_with("LIMIT 100 OFFSET 200"));
}

#[test]
fn test_plan_serializes() {
    let plan = compile("posts", &[("filter[writer.email][equal]", "a@example.com")]).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["resource_type"], "posts");
    assert!(json["predicates"][0]["exists"]["hops"].is_array());
}
