//! In-memory store tests

use super::*;
use crate::error::Error;
use bson::doc;
use pretty_assertions::assert_eq;

fn orders_store() -> MemoryStore {
    let mut store = MemoryStore::new("shop");
    store.insert("orders", doc! { "_id": 1, "amount": 10 });
    store.insert("orders", doc! { "_id": 2, "amount": 20, "note": "x" });
    store.insert("orders", doc! { "_id": 3, "amount": 30 });
    store
}

#[tokio::test]
async fn test_list_keeps_seed_order() {
    let mut store = MemoryStore::new("shop");
    store.create_collection("orders");
    store.create_collection("customers");
    store.create_collection("archive");

    let names = store.list_collection_names().await.unwrap();
    assert_eq!(names, vec!["orders", "customers", "archive"]);
}

#[tokio::test]
async fn test_listing_failure() {
    let mut store = MemoryStore::new("shop");
    store.fail_listing("node down");

    let err = store.list_collection_names().await.unwrap_err();
    assert!(matches!(err, Error::Connectivity { .. }));
    assert!(err.to_string().contains("shop"));
}

#[tokio::test]
async fn test_open_unknown_collection() {
    let store = MemoryStore::new("shop");
    let err = store.open_collection("missing").await.unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { .. }));
}

#[tokio::test]
async fn test_sample_respects_limit() {
    let store = orders_store();
    let collection = store.open_collection("orders").await.unwrap();

    let documents = collection.sample_documents(2).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0], doc! { "_id": 1, "amount": 10 });
}

#[tokio::test]
async fn test_sample_failure() {
    let mut store = orders_store();
    store.fail_sampling("orders", "disk read failed");

    let collection = store.open_collection("orders").await.unwrap();
    let err = collection.sample_documents(10).await.unwrap_err();
    assert_eq!(err.to_string(), "disk read failed");
}

#[tokio::test]
async fn test_scan_empty_filter_returns_all() {
    let store = orders_store();
    let collection = store.open_collection("orders").await.unwrap();

    let mut stream = collection.scan(doc! {}, None).await.unwrap();
    let mut seen = Vec::new();
    while let Some(document) = stream.try_next().await.unwrap() {
        seen.push(document);
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], doc! { "_id": 3, "amount": 30 });
}

#[tokio::test]
async fn test_scan_greater_than_filter() {
    let store = orders_store();
    let collection = store.open_collection("orders").await.unwrap();

    let mut stream = collection
        .scan(doc! { "_id": { "$gt": 1 } }, None)
        .await
        .unwrap();
    let mut ids = Vec::new();
    while let Some(document) = stream.try_next().await.unwrap() {
        ids.push(document.get_i32("_id").unwrap());
    }
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn test_scan_filter_skips_documents_missing_the_field() {
    let mut store = MemoryStore::new("shop");
    store.insert("orders", doc! { "_id": 1 });
    store.insert("orders", doc! { "_id": 2, "amount": 20 });

    let collection = store.open_collection("orders").await.unwrap();
    let mut stream = collection
        .scan(doc! { "amount": { "$gt": 5 } }, None)
        .await
        .unwrap();

    let first = stream.try_next().await.unwrap().unwrap();
    assert_eq!(first.get_i32("_id").unwrap(), 2);
    assert!(stream.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_scan_equality_filter() {
    let store = orders_store();
    let collection = store.open_collection("orders").await.unwrap();

    let mut stream = collection.scan(doc! { "amount": 20 }, None).await.unwrap();
    let only = stream.try_next().await.unwrap().unwrap();
    assert_eq!(only.get_i32("_id").unwrap(), 2);
    assert!(stream.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_scan_projection_keeps_field_order() {
    let store = orders_store();
    let collection = store.open_collection("orders").await.unwrap();

    let mut stream = collection
        .scan(doc! {}, Some(doc! { "_id": 1, "note": 1 }))
        .await
        .unwrap();

    let first = stream.try_next().await.unwrap().unwrap();
    assert_eq!(first, doc! { "_id": 1 });

    let second = stream.try_next().await.unwrap().unwrap();
    assert_eq!(second, doc! { "_id": 2, "note": "x" });
}

#[tokio::test]
async fn test_scan_failure_after_bound() {
    let mut store = orders_store();
    store.fail_scan_after("orders", 1);

    let collection = store.open_collection("orders").await.unwrap();
    let mut stream = collection.scan(doc! {}, None).await.unwrap();

    assert!(stream.try_next().await.unwrap().is_some());
    let err = stream.try_next().await.unwrap_err();
    assert_eq!(err.to_string(), "scan interrupted");
}

#[tokio::test]
async fn test_probe_counts_dropped_streams() {
    let store = orders_store();
    let probe = store.probe();
    let collection = store.open_collection("orders").await.unwrap();

    let mut stream = collection.scan(doc! {}, None).await.unwrap();
    stream.try_next().await.unwrap();
    assert_eq!(probe.released(), 0);

    drop(stream);
    assert_eq!(probe.released(), 1);
}
