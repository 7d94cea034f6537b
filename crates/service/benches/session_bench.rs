use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::sync::Arc;

use service::auth::client::mock::MockAuthApi;
use service::auth::{LoginInput, LoginResponse};
use service::storage::{JsonMapStore, KvStore};
use service::SessionStore;

fn bench_session(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let path = std::env::temp_dir().join(format!("session_bench_{}.json", uuid::Uuid::new_v4()));
    let api = Arc::new(MockAuthApi::default());
    let store = rt.block_on(async {
        let storage: Arc<dyn KvStore> = JsonMapStore::<String, Value>::new(&path).await.unwrap();
        SessionStore::open(api.clone(), storage, "app_state").await
    });
    let input = LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() };

    // every iteration pays for two full snapshot writes to disk
    c.bench_function("session_login_persisted", |b| {
        b.iter(|| {
            api.push_login(Ok(LoginResponse::new("token", json!({"id": 1}))));
            rt.block_on(store.login(&input)).unwrap();
        });
    });

    c.bench_function("session_check_login", |b| {
        b.iter(|| store.check_login());
    });

    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_session);
criterion_main!(benches);
