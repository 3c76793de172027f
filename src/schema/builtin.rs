//! The users / posts / comments collections.

use super::graph::RelationDecl;
use super::registry::SchemaRegistry;
use super::resource::ResourceSchema;
use crate::error::QueryResult;
use crate::operator::Operator;

use Operator::*;

const TEXT: &[Operator] = &[Like, NotLike];
const EXACT_TEXT: &[Operator] = &[Equal, NotEqual, Like, NotLike];
const DATE: &[Operator] = &[
    Null,
    NotNull,
    DateEqual,
    DateNotEqual,
    After,
    AfterOrEqual,
    Before,
    BeforeOrEqual,
];

pub fn users() -> ResourceSchema {
    ResourceSchema::builder("users", "users")
        .fields(&["name", "email", "type"])
        .relation_field("posts")
        .sortable("name", "name")
        .sortable("email", "email")
        .filterable("name", "name", TEXT)
        .filterable("email", "email", EXACT_TEXT)
        .filterable("type", "type", &[Equal, NotEqual, In, NotIn])
        .filterable("posts.title", "posts.title", TEXT)
        .build()
}

pub fn posts() -> ResourceSchema {
    ResourceSchema::builder("posts", "posts")
        .fields(&["title", "content"])
        .field("published", "published_at")
        .relation_field("writer")
        .relation_field("comments")
        .sortable("title", "title")
        .sortable("published", "published_at")
        .sortable("writer.name", "writer.name")
        .sortable("writer.email", "writer.email")
        .filterable("title", "title", EXACT_TEXT)
        .filterable("published", "published_at", DATE)
        .filterable("writer.name", "writer.name", TEXT)
        .filterable("writer.email", "writer.email", EXACT_TEXT)
        .build()
}

pub fn comments() -> ResourceSchema {
    ResourceSchema::builder("comments", "comments")
        .namespaced()
        .fields(&["content"])
        .relation_field("post")
        .relation_field("writer")
        .sortable("created", "created_at")
        .sortable("updated", "updated_at")
        .sortable("post.title", "post.title")
        .sortable("post.writer.name", "post.writer.name")
        .sortable("post.writer.email", "post.writer.email")
        .sortable("writer.name", "writer.name")
        .sortable("writer.email", "writer.email")
        .filterable("content", "content", TEXT)
        .filterable("post.title", "post.title", TEXT)
        .filterable("post.writer.name", "post.writer.name", TEXT)
        .filterable("post.writer.email", "post.writer.email", EXACT_TEXT)
        .filterable("writer.name", "writer.name", TEXT)
        .filterable("writer.email", "writer.email", EXACT_TEXT)
        .build()
}

/// Registry of the three built-in collections and their relations.
pub fn registry() -> QueryResult<SchemaRegistry> {
    SchemaRegistry::builder()
        .resource(users())
        .resource(posts())
        .resource(comments())
        .relation(RelationDecl::many_to_one("posts", "writer", "users", "writer_id"))
        .relation(RelationDecl::one_to_many("users", "posts", "posts", "writer_id"))
        .relation(RelationDecl::one_to_many("posts", "comments", "comments", "post_id"))
        .relation(RelationDecl::many_to_one("comments", "post", "posts", "post_id"))
        .relation(RelationDecl::many_to_one("comments", "writer", "users", "writer_id"))
        .build()
}
