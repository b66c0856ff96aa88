use haven::doc;
use haven::filter::{all, field};
use haven::index::unique_index;
use haven_int_test::test_util::{cleanup, create_test_context, insert_story_docs, run_test};

#[test]
fn test_delete_one() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let result = collection.delete_one(doc! { "status": "published" })?;
            assert!(result.deleted());
            assert_eq!(result.deleted_count, 1);

            // only the first match goes
            assert_eq!(collection.count_documents(all())?, 2);
            assert!(collection.find_one(doc! { "slug": "harbor-lights" })?.is_none());
            assert!(collection.find_one(doc! { "slug": "salt-roads" })?.is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_without_match() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let result = collection.delete_one(field("slug").eq("missing"))?;
            assert!(!result.deleted());
            assert_eq!(collection.count_documents(all())?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_frees_unique_key() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("users")?;
            collection.create_index(&["email"], &unique_index())?;
            collection.insert_one(&doc! { "email": "amara@example.com" })?;

            collection.delete_one(doc! { "email": "amara@example.com" })?;
            collection.insert_one(&doc! { "email": "amara@example.com" })?;
            assert_eq!(collection.count_documents(all())?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;
            collection.create_index(&["slug"], &unique_index())?;

            collection.drop()?;
            assert_eq!(collection.count_documents(all())?, 0);
            assert_eq!(collection.list_indexes()?.len(), 1);

            // the same handle stays usable
            insert_story_docs(&collection)?;
            assert_eq!(collection.count_documents(all())?, 3);
            Ok(())
        },
        cleanup,
    )
}
