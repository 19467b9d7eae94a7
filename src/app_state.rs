//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::domain::{DeltaClassifier, EventBus};
use crate::persistence::StoreBackend;
use crate::prices::PriceBackend;
use crate::service::{BadgeService, Scheduler, SchedulerSettings};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Badge snapshot owner.
    pub badge_service: Arc<BadgeService>,
    /// Scheduler trigger, for on-demand runs.
    pub scheduler: Arc<Scheduler>,
    /// Event store, read-only from handlers.
    pub store: StoreBackend,
    /// Notification bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Active classifier, reported by the config endpoint.
    pub classifier: DeltaClassifier,
}

impl AppState {
    /// Wires the badge service and scheduler over the given backends.
    #[must_use]
    pub fn assemble(config: &ServiceConfig, store: StoreBackend, prices: PriceBackend) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let classifier = DeltaClassifier::new(config.thresholds);

        let badge_service = Arc::new(BadgeService::new(
            store.clone(),
            event_bus.clone(),
            config.badge_window(),
        ));

        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            prices,
            classifier,
            Arc::clone(&badge_service),
            event_bus.clone(),
            SchedulerSettings {
                routes: config.tracked_routes.clone(),
                lookback_days: config.baseline_lookback_days,
                interval: config.scheduler_interval(),
                concurrency: config.scheduler_concurrency,
                dedupe_per_period: config.scheduler_dedupe_per_period,
            },
        ));

        Self {
            badge_service,
            scheduler,
            store,
            event_bus,
            classifier,
        }
    }
}
