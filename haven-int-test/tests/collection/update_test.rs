use haven::collection::{ReturnDocument, Update, UpdateResult};
use haven::common::Value;
use haven::doc;
use haven::errors::ErrorKind;
use haven::filter::field;
use haven::index::unique_index;
use haven_int_test::test_util::{cleanup, create_test_context, insert_story_docs, run_test};

#[test]
fn test_set_with_dot_path() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let result = collection.update_one(
                doc! { "slug": "salt-roads" },
                doc! { "$set": { "author.city": "Lagos", "meta.seo.title": "Salt" } },
            )?;
            assert_eq!(
                result,
                UpdateResult {
                    matched_count: 1,
                    modified_count: 1
                }
            );

            let stored = collection.find_one(doc! { "slug": "salt-roads" })?.unwrap();
            assert_eq!(stored.get("author.city"), Some(Value::from("Lagos")));
            assert_eq!(stored.get("author.name"), Some(Value::from("Amara")));
            assert_eq!(stored.get("meta.seo.title"), Some(Value::from("Salt")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_inc_accumulates() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;
            let filter = field("slug").eq("harbor-lights");

            collection.update_one(&filter, doc! { "$inc": { "views": 5 } })?;
            collection.update_one(&filter, Update::new().inc("views", 7))?;

            let stored = collection.find_one(&filter)?.unwrap();
            assert_eq!(stored.get("views"), Some(Value::from(132)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_inc_on_missing_field_starts_at_zero() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            collection.update_one(
                doc! { "slug": "glass-orchard" },
                doc! { "$inc": { "stats.shares": 2 } },
            )?;
            let stored = collection.find_one(doc! { "slug": "glass-orchard" })?.unwrap();
            assert_eq!(stored.get("stats.shares"), Some(Value::from(2)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_push() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            collection.update_one(
                doc! { "slug": "glass-orchard" },
                doc! { "$push": { "tags": "orchard", "comments": "lovely" } },
            )?;
            let stored = collection.find_one(doc! { "slug": "glass-orchard" })?.unwrap();
            assert_eq!(
                stored.get("tags"),
                Some(Value::Array(vec![Value::from("fable"), Value::from("orchard")]))
            );
            assert_eq!(
                stored.get("comments"),
                Some(Value::Array(vec![Value::from("lovely")]))
            );

            let err = collection
                .update_one(
                    doc! { "slug": "glass-orchard" },
                    doc! { "$push": { "status": "archived" } },
                )
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidUpdate);
            let unchanged = collection.find_one(doc! { "slug": "glass-orchard" })?.unwrap();
            assert_eq!(unchanged.get("status"), Some(Value::from("draft")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_without_match() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let result = collection.update_one(
                doc! { "slug": "missing" },
                doc! { "$set": { "status": "published" } },
            )?;
            assert_eq!(result, UpdateResult::default());

            let found = collection.find_one_and_update(
                doc! { "slug": "missing" },
                doc! { "$set": { "status": "published" } },
                ReturnDocument::After,
            )?;
            assert!(found.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_update_snapshots() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let before = collection
                .find_one_and_update(
                    doc! { "slug": "salt-roads" },
                    doc! { "$inc": { "views": 1 } },
                    ReturnDocument::Before,
                )?
                .unwrap();
            assert_eq!(before.get("views"), Some(Value::from(87)));

            let after = collection
                .find_one_and_update(
                    doc! { "slug": "salt-roads" },
                    doc! { "$inc": { "views": 1 } },
                    ReturnDocument::After,
                )?
                .unwrap();
            assert_eq!(after.get("views"), Some(Value::from(89)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_respects_unique_index() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;
            collection.create_index(&["slug"], &unique_index())?;

            let err = collection
                .update_one(
                    doc! { "slug": "salt-roads" },
                    doc! { "$set": { "slug": "harbor-lights" } },
                )
                .unwrap_err();
            assert!(err.is_duplicate_key());

            assert_eq!(collection.count_documents(doc! { "slug": "salt-roads" })?, 1);
            assert_eq!(
                collection.count_documents(doc! { "slug": "harbor-lights" })?,
                1
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_updates() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let unknown = collection
                .update_one(doc! { "slug": "salt-roads" }, doc! { "$rename": { "a": "b" } })
                .unwrap_err();
            assert_eq!(unknown.kind(), &ErrorKind::InvalidUpdate);

            let non_numeric = collection
                .update_one(doc! { "slug": "salt-roads" }, doc! { "$inc": { "views": "one" } })
                .unwrap_err();
            assert_eq!(non_numeric.kind(), &ErrorKind::InvalidUpdate);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_dot_path_never_overwrites_arrays() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            collection.insert_one(&doc! {
                "slug": "glass-orchard",
                "authors": [{ "name": "Ann" }, { "name": "Bo" }],
                "tags": ["a", "b"]
            })?;
            let filter = field("slug").eq("glass-orchard");

            let err = collection
                .update_one(&filter, Update::new().set("authors.name", "X"))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidUpdate);

            let stored = collection.find_one(&filter)?.unwrap();
            assert_eq!(
                stored.get("authors.name"),
                Some(Value::Array(vec![Value::from("Ann"), Value::from("Bo")]))
            );

            collection.update_one(&filter, Update::new().set("tags.3", "z"))?;
            let stored = collection.find_one(&filter)?.unwrap();
            assert_eq!(stored.get("tags.0"), Some(Value::from("a")));
            assert_eq!(stored.get("tags.2"), Some(Value::Null));
            assert_eq!(stored.get("tags.3"), Some(Value::from("z")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_float_over_integer_is_stored() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("numbers")?;
            collection.insert_one(&doc! { "k": "a", "x": 1 })?;
            let filter = field("k").eq("a");

            let after = collection
                .find_one_and_update(&filter, Update::new().set("x", 1.0), ReturnDocument::After)?
                .unwrap();
            let stored = collection.find_one(&filter)?.unwrap();
            assert_eq!(after.get("x").and_then(|v| v.as_f64()), Some(1.0));
            assert_eq!(stored.get("x").and_then(|v| v.as_i64()), None);
            assert_eq!(stored.get("x").and_then(|v| v.as_f64()), Some(1.0));
            Ok(())
        },
        cleanup,
    )
}
