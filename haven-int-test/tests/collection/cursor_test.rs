use haven::collection::{Document, FindOptions};
use haven::common::{SortOrder, Value};
use haven::doc;
use haven::filter::all;
use haven_int_test::test_util::{
    cleanup, create_test_context, insert_story_docs, is_sorted, run_test,
};

fn int_field(docs: &[Document], name: &str) -> Vec<i64> {
    docs.iter()
        .filter_map(|d| d.get(name).and_then(|v| v.as_i64()))
        .collect()
}

#[test]
fn test_sort_skip_limit() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("numbers")?;
            for x in [42, 7, 19, 3, 25] {
                collection.insert_one(&doc! { "x": x })?;
            }

            let page = collection
                .find(all())?
                .sort(&doc! { "x": 1 })
                .skip(1)
                .limit(2)
                .to_array()?;
            assert_eq!(int_field(&page, "x"), vec![7, 19]);

            let descending = collection.find(all())?.sort(&doc! { "x": (-1) }).to_array()?;
            assert_eq!(int_field(&descending, "x"), vec![42, 25, 19, 7, 3]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_negative_and_zero_bounds() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("numbers")?;
            for x in 0..4 {
                collection.insert_one(&doc! { "x": x })?;
            }

            let all_docs = collection.find(all())?.skip(-3).limit(0).to_array()?;
            assert_eq!(all_docs.len(), 4);

            let clamped = collection.find(all())?.limit(-1).to_array()?;
            assert_eq!(clamped.len(), 4);

            let past_end = collection.find(all())?.skip(10).to_array()?;
            assert!(past_end.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_by_date_and_string() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let newest_first = collection
                .find(all())?
                .sort_by("published_at", SortOrder::Descending)
                .to_array()?;
            let dates = newest_first
                .iter()
                .filter_map(|d| d.get("published_at").and_then(|v| v.as_datetime().cloned()))
                .collect::<Vec<_>>();
            assert_eq!(dates.len(), 3);
            assert!(is_sorted(dates, false));

            let by_name = collection.find(all())?.sort(&doc! { "name": 1 }).to_array()?;
            let names = by_name
                .iter()
                .filter_map(|d| d.get("name").and_then(|v| v.as_str().map(String::from)))
                .collect::<Vec<_>>();
            assert_eq!(names, vec!["Harbor Lights", "Salt Roads", "The Glass Orchard"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_with_mixed_types_is_stable() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("mixed")?;
            collection.insert_one(&doc! { "n": 1, "k": "number" })?;
            collection.insert_one(&doc! { "n": "one", "k": "string" })?;
            collection.insert_one(&doc! { "k": "missing" })?;

            let sorted = collection.find(all())?.sort(&doc! { "n": 1 }).to_array()?;
            let kinds = sorted
                .iter()
                .filter_map(|d| d.get("k").and_then(|v| v.as_str().map(String::from)))
                .collect::<Vec<_>>();
            assert_eq!(kinds, vec!["number", "string", "missing"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cursor_is_a_snapshot() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("stories")?;
            insert_story_docs(&collection)?;

            let cursor = collection.find(all())?;
            collection.insert_one(&doc! { "slug": "late" })?;
            collection.delete_one(doc! { "slug": "harbor-lights" })?;

            let docs = cursor.to_array()?;
            assert_eq!(docs.len(), 3);
            assert_eq!(docs[0].get("slug"), Some(Value::from("harbor-lights")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let collection = ctx.collection("empty")?;
            assert!(collection.find(all())?.to_array()?.is_empty());
            assert!(collection
                .find(all())?
                .with_options(FindOptions::new().sort_by("x", SortOrder::Ascending).limit(5))
                .to_array()?
                .is_empty());
            Ok(())
        },
        cleanup,
    )
}
