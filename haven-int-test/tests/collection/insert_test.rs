use haven::collection::Document;
use haven::common::Value;
use haven::doc;
use haven::errors::ErrorKind;
use haven::filter::{all, field};
use haven_int_test::test_util::{cleanup, create_story_docs, create_test_context, run_test};

#[test]
fn test_insert() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;

            let document = doc! {
                "slug": "night-ferry",
                "name": "Night Ferry",
                "tags": ["sea"],
                "views": 0,
            };

            let result = collection.insert_one(&document)?;
            assert!(matches!(result.inserted_id, Value::Id(_)));
            assert!(!document.has_id());

            let stored = collection
                .find_one(field("_id").eq(result.inserted_id.clone()))?
                .unwrap();
            assert_eq!(stored.get("slug"), Some(Value::from("night-ferry")));
            assert_eq!(stored.get("tags.0"), Some(Value::from("sea")));
            assert_eq!(stored.id(), Some(&result.inserted_id));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_keeps_given_id() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            let result = collection.insert_one(&doc! { "_id": "story-1", "name": "One" })?;
            assert_eq!(result.inserted_id, Value::from("story-1"));

            let stored = collection.find_one(doc! { "_id": "story-1" })?.unwrap();
            assert_eq!(stored.get("name"), Some(Value::from("One")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_many() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            let result = collection.insert_many(&create_story_docs())?;
            assert_eq!(result.inserted_ids.len(), 3);
            assert_eq!(collection.count_documents(all())?, 3);

            let slugs = collection
                .find(all())?
                .to_array()?
                .iter()
                .map(|d| d.get("slug").and_then(|v| v.as_str().map(String::from)))
                .collect::<Vec<_>>();
            assert_eq!(
                slugs,
                vec![
                    Some("harbor-lights".to_string()),
                    Some("glass-orchard".to_string()),
                    Some("salt-roads".to_string())
                ]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_found_documents_are_independent_copies() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            let mut original = doc! { "name": "Copy", "author": { "name": "Ines" } };
            let inserted = collection.insert_one(&original)?;

            original.put("author.name", "Changed")?;

            let filter = field("_id").eq(inserted.inserted_id.clone());
            let mut first = collection.find_one(&filter)?.unwrap();
            assert_eq!(first.get("author.name"), Some(Value::from("Ines")));

            first.put("author.name", "Mutated")?;
            first.remove("name")?;

            let second = collection.find_one(&filter)?.unwrap();
            assert_eq!(second.get("author.name"), Some(Value::from("Ines")));
            assert_eq!(second.get("name"), Some(Value::from("Copy")));
            assert_ne!(first, second);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_duplicate_id() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            collection.insert_one(&doc! { "_id": 7, "name": "First" })?;

            let err = collection
                .insert_one(&doc! { "_id": 7, "name": "Second" })
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
            assert!(err.is_duplicate_key());

            let stored: Document = collection.find_one(doc! { "_id": 7 })?.unwrap();
            assert_eq!(stored.get("name"), Some(Value::from("First")));
            assert_eq!(collection.count_documents(all())?, 1);
            Ok(())
        },
        cleanup,
    )
}
