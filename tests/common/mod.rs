//! Shared harness: boots the full app on an ephemeral port over
//! in-memory backends.

#![allow(clippy::panic, dead_code)]

use std::net::SocketAddr;

use chrono::{Duration, Utc};

use route_pulse::api::build_app;
use route_pulse::app_state::AppState;
use route_pulse::config::ServiceConfig;
use route_pulse::domain::Route;
use route_pulse::persistence::MemoryEventStore;
use route_pulse::prices::MemoryPriceSource;

#[derive(Debug)]
pub struct TestApp {
    pub addr: SocketAddr,
    pub store: MemoryEventStore,
    pub prices: MemoryPriceSource,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub fn route(key: &str) -> Route {
    let Ok(route) = key.parse() else {
        panic!("valid route {key}");
    };
    route
}

pub async fn spawn_app(tracked: &[&str]) -> TestApp {
    let config = ServiceConfig {
        persistence_enabled: false,
        tracked_routes: tracked.iter().map(|key| route(key)).collect(),
        ..Default::default()
    };

    let store = MemoryEventStore::new();
    let prices = MemoryPriceSource::new();
    let state = AppState::assemble(&config, store.clone().into(), prices.clone().into());

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });

    TestApp {
        addr,
        store,
        prices,
        client: reqwest::Client::new(),
    }
}

/// Five days of `baseline` history and a fresh `today` observation.
pub async fn seed_prices(prices: &MemoryPriceSource, key: &str, baseline: f64, today: f64) {
    let route = route(key);
    let now = Utc::now();
    for days_ago in 1..=5 {
        prices
            .record_price(&route, now - Duration::days(days_ago), baseline)
            .await;
    }
    prices.record_price(&route, now, today).await;
}
