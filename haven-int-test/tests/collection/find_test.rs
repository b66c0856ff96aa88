use haven::common::Value;
use haven::doc;
use haven::errors::ErrorKind;
use haven::filter::{all, field, text};
use haven_int_test::test_util::{
    cleanup, create_test_context, insert_story_docs, run_test,
};

fn slugs(docs: &[haven::collection::Document]) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d.get("slug").and_then(|v| v.as_str().map(String::from)))
        .collect()
}

#[test]
fn test_find_by_equality() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let published = collection.find(doc! { "status": "published" })?.to_array()?;
            assert_eq!(slugs(&published), vec!["harbor-lights", "salt-roads"]);

            let by_eq = collection
                .find(doc! { "status": { "$eq": "draft" } })?
                .to_array()?;
            assert_eq!(slugs(&by_eq), vec!["glass-orchard"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_by_nested_path() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let found = collection.find_one(doc! { "author.country": "CZ" })?.unwrap();
            assert_eq!(found.get("slug"), Some(Value::from("glass-orchard")));

            assert!(collection
                .find_one(doc! { "author.city.name": "Prague" })?
                .is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_in_and_conjunction() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let found = collection
                .find(doc! { "slug": { "$in": ["salt-roads", "glass-orchard", "missing"] } })?
                .to_array()?;
            assert_eq!(slugs(&found), vec!["glass-orchard", "salt-roads"]);

            let conjunction = collection
                .find(doc! { "$and": [ { "status": "published" }, { "views": 87 } ] })?
                .to_array()?;
            assert_eq!(slugs(&conjunction), vec!["salt-roads"]);

            let fluent = collection
                .find(field("status").eq("published").and(field("views").eq(120.0)))?
                .to_array()?;
            assert_eq!(slugs(&fluent), vec!["harbor-lights"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_array_field_matches_any_element() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let found = collection.find(doc! { "tags": "mystery" })?.to_array()?;
            assert_eq!(slugs(&found), vec!["harbor-lights"]);

            let whole = collection
                .find(doc! { "tags": ["fable"] })?
                .to_array()?;
            assert_eq!(slugs(&whole), vec!["glass-orchard"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_text_search() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let found = collection
                .find(doc! { "$text": { "$search": "MYSTERY" } })?
                .to_array()?;
            assert_eq!(slugs(&found), vec!["harbor-lights", "salt-roads"]);

            let by_summary = collection.find(text("bells"))?.to_array()?;
            assert_eq!(slugs(&by_summary), vec!["glass-orchard"]);

            assert_eq!(collection.count_documents(text("submarine"))?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_count_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            assert_eq!(collection.count_documents(all())?, 0);

            insert_story_docs(&collection)?;
            assert_eq!(collection.count_documents(doc! {})?, 3);
            assert_eq!(collection.count_documents(doc! { "status": "published" })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_operator_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let err = collection
                .find(doc! { "views": { "$gt": 10 } })
                .err()
                .unwrap();
            assert_eq!(err.kind(), &ErrorKind::InvalidFilter);
            Ok(())
        },
        cleanup,
    )
}
