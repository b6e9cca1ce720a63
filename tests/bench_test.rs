//! Benchmark tests for the hot paths
//!
//! Run with: cargo test --release --test bench_test -- --ignored --nocapture

use std::time::{Duration, Instant};

use chrono::Utc;
use tempfile::{NamedTempFile, TempDir};

use dynaqr::ids;
use dynaqr::model::QrCode;
use dynaqr::resolver::{resolve, Resolution};
use dynaqr::store::{EmbeddedStore, JsonFileStore, Store};

fn report(name: &str, iterations: usize, duration: Duration) {
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn qr(id: String) -> QrCode {
    QrCode {
        id,
        name: None,
        destination_url: "https://example.com/bench".to_string(),
        folder_id: None,
        created_at: Utc::now(),
        updated_at: None,
        nfc_link: None,
        user_id: Some(1),
        deleted_at: None,
    }
}

async fn bench_store(label: &str, store: &Store, iterations: usize) {
    let start = Instant::now();
    let mut created = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let record = qr(ids::generate(ids::DEFAULT_ID_LENGTH));
        if store.insert(&record).await.unwrap() {
            created.push(record.id);
        }
    }
    report(&format!("{label}: insert"), iterations, start.elapsed());

    let start = Instant::now();
    for id in &created {
        assert!(matches!(resolve(store, id).await, Resolution::Redirect(_)));
    }
    report(&format!("{label}: resolve"), created.len(), start.elapsed());

    let start = Instant::now();
    for _ in 0..iterations {
        assert_eq!(resolve(store, "missing1").await, Resolution::NotFound);
    }
    report(&format!("{label}: resolve miss"), iterations, start.elapsed());
}

#[tokio::test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
async fn bench_embedded_store() {
    println!("\n=== Benchmark: embedded store ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let store = Store::new(EmbeddedStore::open(temp_db.path().to_str().unwrap()).unwrap());

    bench_store("embedded", &store, 1000).await;
}

#[tokio::test]
#[ignore]
async fn bench_file_store() {
    println!("\n=== Benchmark: JSON file store ===\n");

    let dir = TempDir::new().unwrap();
    let store = Store::new(JsonFileStore::new(dir.path().join("db.json")));

    // Every write rewrites the whole document
    bench_store("file", &store, 200).await;
}
