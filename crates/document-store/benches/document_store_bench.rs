use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{DocumentPath, DocumentStore, InMemoryDocumentStore, Transaction};
use serde_json::{Map, json};

fn bench_set_document(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("document_store/set_document", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                store
                    .set(&DocumentPath::new("orders", "o1"), json!({"status": "pending"}))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_commit_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("document_store/commit_10_line_reservation", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                let paths: Vec<_> = (0..10)
                    .map(|i| DocumentPath::new("products", format!("p{i}")))
                    .collect();
                for path in &paths {
                    store.seed(path.clone(), json!({"stock": 100})).await;
                }

                let mut tx = Transaction::new();
                for path in &paths {
                    store.get_in(&mut tx, path).await.unwrap();
                    let mut fields = Map::new();
                    fields.insert("stock".into(), json!(99));
                    tx.update(path.clone(), fields);
                }
                tx.set(DocumentPath::new("orders", "o1"), json!({"status": "pending"}));
                store.commit(tx).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_set_document, bench_commit_reservation);
criterion_main!(benches);
