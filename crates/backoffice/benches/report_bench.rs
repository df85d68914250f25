use backoffice::{ReportEngine, ReportScope, ReportView, write_csv};
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{DocumentPath, InMemoryDocumentStore};
use domain::collections::{ORDERS, product_path};
use serde_json::json;

async fn seeded_store(orders: usize) -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new();
    for i in 0..200 {
        store
            .seed(
                product_path(&format!("p{i:03}")),
                json!({"name": format!("Product {i}"), "purchaseCost": 3}),
            )
            .await;
    }
    for i in 0..orders {
        store
            .seed(
                DocumentPath::new(ORDERS, format!("o{i:05}")),
                json!({
                    "status": "completed",
                    "createdAt": i as i64,
                    "items": [
                        {"productId": format!("p{:03}", i % 200), "name": "Product", "price": 10, "quantity": 2},
                        {"name": format!("product {}", i % 200), "price": 5, "quantity": 1}
                    ]
                }),
            )
            .await;
    }
    store
}

fn bench_historic_report(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = ReportEngine::new(rt.block_on(seeded_store(2_000)));

    c.bench_function("report/historic_2000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine
                    .run(ReportScope::Historic { force_full: true })
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_csv_export(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = ReportEngine::new(rt.block_on(seeded_store(2_000)));
    let report = rt
        .block_on(engine.run(ReportScope::Historic { force_full: true }))
        .unwrap();
    let view = ReportView::new(1, 50);

    c.bench_function("report/csv_4000_rows", |b| {
        b.iter(|| write_csv(view.filtered(std::hint::black_box(&report))));
    });
}

criterion_group!(benches, bench_historic_report, bench_csv_export);
criterion_main!(benches);
