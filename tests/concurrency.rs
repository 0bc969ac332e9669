//! Concurrent registration and dispatch against one shared router.

use std::sync::Arc;
use std::thread;

use axum::http::{Method, StatusCode};
use pathmux::Mux;
use tokio::sync::Barrier;

mod common;

use common::{body_text, request};

const ROUTES: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_are_all_dispatchable() {
    let mux = Mux::new();
    let barrier = Arc::new(Barrier::new(ROUTES));

    let tasks: Vec<_> = (0..ROUTES)
        .map(|i| {
            let mux = mux.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                mux.get(&format!("/route{i}/:id([0-9]+)"), move |ctx| {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    ctx.string(StatusCode::OK, format!("{i}:{id}"));
                });
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(mux.len(), ROUTES);
    for i in 0..ROUTES {
        let response = mux.dispatch(request(Method::GET, &format!("/route{i}/7")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, format!("{i}:7"));
    }
}

#[test]
fn test_dispatch_during_registration() {
    let mux = Mux::new();
    mux.get("/stable", |ctx| ctx.write_header(StatusCode::OK));

    let writer = {
        let mux = mux.clone();
        thread::spawn(move || {
            for i in 0..200 {
                mux.put(&format!("/w/{i}"), |_| {});
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mux = mux.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let response = mux.dispatch(request(Method::GET, "/stable"));
                    assert_eq!(response.status(), StatusCode::OK);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(mux.routes(&Method::PUT).len(), 200);
}
