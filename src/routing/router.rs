//! Route dispatch with round-robin failover.
//!
//! # Responsibilities
//! - Resolve a service name to its backend group
//! - Walk at most `n` rotation slots, each backend at most once, skipping
//!   backends whose circuit is open
//! - Forward under the per-backend deadline and classify the outcome
//! - Feed every attempt into the breaker and the metrics registry
//! - Return the first successful response, or an aggregate failure
//!
//! # Design Decisions
//! - Attempts within one request are sequential, never fanned out
//! - A skipped slot still consumes one of the `n` slots
//! - A request that cannot be turned into a backend URI is the client's fault:
//!   it is rejected without touching the breaker or the registry
//! - Dropping the `route` future abandons the in-flight call without recording
//!   it, so caller cancellation never counts as a backend failure

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GatewayConfig;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::{metrics, BreakerEvent, EventBus, MetricsRegistry};
use crate::resilience::{with_deadline, DeadlineExceeded, Transition};
use crate::routing::forwarder::Forwarder;
use crate::routing::types::{
    AttemptFailure, ForwardError, ForwardRequest, ForwardResponse, RouteError, RouteResult,
};

/// Resilient request router.
#[derive(Debug)]
pub struct Router<F> {
    pool: BackendPool,
    registry: Arc<MetricsRegistry>,
    events: EventBus,
    forwarder: F,
    backend_timeout: Duration,
}

impl<F: Forwarder> Router<F> {
    /// Build the router, its breakers and a zeroed metrics entry per backend.
    pub fn from_config(config: &GatewayConfig, forwarder: F) -> Self {
        let pool = BackendPool::new(&config.services, &config.breaker);
        let registry = Arc::new(MetricsRegistry::new());
        for backend in pool.all_backends() {
            registry.init(backend.address());
        }

        tracing::info!(
            services = pool.services().len(),
            backends = registry.len(),
            failure_threshold = config.breaker.failure_threshold,
            open_timeout_secs = config.breaker.open_timeout_secs,
            "Router initialized"
        );

        Self {
            pool,
            registry,
            events: EventBus::new(config.observability.event_buffer),
            forwarder,
            backend_timeout: config.timeouts.backend(),
        }
    }

    /// Forward `request` to a healthy backend of `service`.
    pub async fn route(&self, service: &str, request: &ForwardRequest) -> RouteResult<ForwardResponse> {
        let start = Instant::now();

        let group = match self.pool.group(service) {
            Some(group) if !group.is_empty() => group,
            _ => {
                tracing::warn!(service, "Service not found in routing table");
                // Unknown names come from clients; keep them out of metric labels.
                metrics::record_route("unknown", "not_found", start);
                return Err(RouteError::ServiceNotFound(service.to_string()));
            }
        };

        let slots = group.len();
        let mut attempted = 0;

        for (slot, backend) in group.rotation().enumerate() {
            let admission = backend.try_admit();
            self.publish(backend, admission.transition);
            if !admission.allowed {
                tracing::debug!(service, backend = backend.address(), slot, "Skipping backend, circuit open");
                metrics::record_skipped_attempt(backend.address());
                continue;
            }

            attempted += 1;
            match self.attempt(backend, request).await {
                Ok(response) => {
                    self.report(backend, true);
                    tracing::debug!(
                        service,
                        backend = backend.address(),
                        status = %response.status,
                        attempt = attempted,
                        "Backend responded"
                    );
                    metrics::record_route(service, "success", start);
                    return Ok(response);
                }
                Err(AttemptFailure::InvalidRequest(e)) => {
                    backend.release();
                    tracing::warn!(service, error = %e, "Request cannot be forwarded");
                    metrics::record_route(service, "invalid_request", start);
                    return Err(RouteError::InvalidRequest {
                        service: service.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(failure) => {
                    self.report(backend, false);
                    tracing::warn!(
                        service,
                        backend = backend.address(),
                        attempt = attempted,
                        error = %failure,
                        "Backend attempt failed"
                    );
                }
            }
        }

        tracing::warn!(service, slots, attempted, "All backends unavailable");
        metrics::record_route(service, "unavailable", start);
        Err(RouteError::AllBackendsUnavailable {
            service: service.to_string(),
            slots,
            attempted,
        })
    }

    /// One forwarded call, classified.
    async fn attempt(&self, backend: &Backend, request: &ForwardRequest) -> Result<ForwardResponse, AttemptFailure> {
        let call = self.forwarder.forward(backend.address(), request);
        match with_deadline(self.backend_timeout, call).await {
            Err(DeadlineExceeded(limit)) => Err(AttemptFailure::BackendUnreachable(ForwardError::Timeout(limit))),
            Ok(Err(e)) if e.is_request_fault() => Err(AttemptFailure::InvalidRequest(e)),
            Ok(Err(e)) => Err(AttemptFailure::BackendUnreachable(e)),
            Ok(Ok(response)) if response.is_backend_failure() => {
                Err(AttemptFailure::BackendServerError(response.status))
            }
            Ok(Ok(response)) => Ok(response),
        }
    }

    fn report(&self, backend: &Backend, success: bool) {
        let transition = if success {
            backend.mark_success()
        } else {
            backend.mark_failure()
        };
        self.publish(backend, transition);
        self.registry.record(backend.address(), success);
    }

    fn publish(&self, backend: &Backend, transition: Option<Transition>) {
        if let Some(transition) = transition {
            self.events.publish(BreakerEvent::new(backend.address(), transition));
        }
    }
}

impl<F> Router<F> {
    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn forwarder(&self) -> &F {
        &self.forwarder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;
    use axum::http::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const A: &str = "http://a:1";
    const B: &str = "http://b:1";
    const C: &str = "http://c:1";

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Respond(u16),
        Refuse,
        RefuseAfter(Duration),
        BadUri,
        Hang,
    }

    /// Answers with the backend address as body, per-backend behaviour.
    #[derive(Debug, Default)]
    struct MockForwarder {
        behaviors: Mutex<HashMap<String, Behavior>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockForwarder {
        fn set(&self, backend: &str, behavior: Behavior) {
            self.behaviors.lock().unwrap().insert(backend.to_string(), behavior);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Forwarder for MockForwarder {
        async fn forward(&self, backend: &str, _request: &ForwardRequest) -> Result<ForwardResponse, ForwardError> {
            self.calls.lock().unwrap().push(backend.to_string());
            let behavior = self
                .behaviors
                .lock()
                .unwrap()
                .get(backend)
                .copied()
                .unwrap_or(Behavior::Respond(200));

            match behavior {
                Behavior::Respond(code) => Ok(ForwardResponse::new(
                    StatusCode::from_u16(code).unwrap(),
                    backend.to_string(),
                )),
                Behavior::Refuse => Err(ForwardError::Request("connection refused".into())),
                Behavior::RefuseAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ForwardError::Request("connection reset".into()))
                }
                Behavior::BadUri => Err(ForwardError::InvalidUri {
                    uri: format!("{backend}/hello world"),
                    reason: "invalid uri character".into(),
                }),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    fn router(backends: &[&str]) -> Router<Arc<MockForwarder>> {
        router_with(backends, |_| {})
    }

    fn router_with(backends: &[&str], tweak: impl FnOnce(&mut GatewayConfig)) -> Router<Arc<MockForwarder>> {
        let mut config = GatewayConfig::default();
        config
            .services
            .insert("svc".into(), backends.iter().map(|b| b.to_string()).collect());
        config.timeouts.backend_ms = 50;
        tweak(&mut config);
        Router::from_config(&config, Arc::new(MockForwarder::default()))
    }

    fn body(response: &ForwardResponse) -> &str {
        std::str::from_utf8(&response.body).unwrap()
    }

    fn trip(router: &Router<Arc<MockForwarder>>, backend: &str) {
        let backend = router.pool().backend(backend).unwrap();
        for _ in 0..3 {
            backend.mark_failure();
        }
        assert_eq!(backend.health().state, CircuitState::Open);
    }

    #[tokio::test]
    async fn round_robin_in_configured_order() {
        let router = router(&[A, B, C]);
        let request = ForwardRequest::get("/");

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(body(&router.route("svc", &request).await.unwrap()).to_string());
        }
        assert_eq!(seen, vec![A, B, C, A]);
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let router = router(&[A]);
        let err = router.route("billing", &ForwardRequest::get("/")).await.unwrap_err();
        assert_eq!(err, RouteError::ServiceNotFound("billing".into()));
        assert!(router.forwarder().calls().is_empty());
    }

    #[tokio::test]
    async fn open_backend_is_skipped_without_metrics() {
        let router = router(&[A, B]);
        trip(&router, A);

        let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(body(&response), B);
        assert_eq!(router.forwarder().calls(), vec![B]);

        let snapshot = router.registry().snapshot();
        assert_eq!(snapshot[A].total, 0);
        assert_eq!(snapshot[B].total, 1);
        assert_eq!(snapshot[B].successes, 1);
    }

    #[tokio::test]
    async fn server_error_fails_over() {
        let router = router(&[A, B]);
        router.forwarder().set(A, Behavior::Respond(503));

        let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(body(&response), B);

        let a = router.registry().get(A).unwrap();
        assert_eq!((a.total, a.failures), (1, 1));
        assert_eq!(router.pool().backend(A).unwrap().health().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn client_errors_count_as_success() {
        let router = router(&[A, B]);
        router.forwarder().set(A, Behavior::Respond(404));

        let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(router.registry().get(A).unwrap().successes, 1);
        assert_eq!(router.forwarder().calls(), vec![A]);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let router = router(&[A, B]);
        router.forwarder().set(A, Behavior::Hang);

        let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(body(&response), B);
        assert_eq!(router.registry().get(A).unwrap().failures, 1);
    }

    #[tokio::test]
    async fn exhaustion_tries_each_backend_once() {
        let router = router(&[A, B, C]);
        for b in [A, B, C] {
            router.forwarder().set(b, Behavior::Refuse);
        }

        let err = router.route("svc", &ForwardRequest::get("/")).await.unwrap_err();
        assert_eq!(
            err,
            RouteError::AllBackendsUnavailable {
                service: "svc".into(),
                slots: 3,
                attempted: 3,
            }
        );
        let mut calls = router.forwarder().calls();
        calls.sort();
        assert_eq!(calls, vec![A, B, C]);
    }

    #[tokio::test]
    async fn all_open_makes_no_calls() {
        let router = router(&[A, B]);
        trip(&router, A);
        trip(&router, B);

        let err = router.route("svc", &ForwardRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, RouteError::AllBackendsUnavailable { attempted: 0, slots: 2, .. }));
        assert!(router.forwarder().calls().is_empty());
        assert_eq!(router.registry().snapshot().values().map(|m| m.total).sum::<u64>(), 0);
    }

    #[tokio::test]
    async fn repeated_failures_open_the_circuit_and_publish() {
        let router = router(&[A, B]);
        router.forwarder().set(A, Behavior::Refuse);
        let mut events = router.events().subscribe();

        for _ in 0..3 {
            let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
            assert_eq!(body(&response), B);
        }

        let event = events.try_recv().unwrap();
        assert_eq!(event.backend, A);
        assert_eq!((event.from, event.to), (CircuitState::Closed, CircuitState::Open));
        assert_eq!(event.consecutive_failures, 3);

        // A is now skipped: only B is called.
        let before = router.forwarder().calls().len();
        router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(router.forwarder().calls()[before..], [B.to_string(), B.to_string()]);
    }

    #[tokio::test]
    async fn unforwardable_request_records_nothing() {
        let router = router(&[A, B]);
        router.forwarder().set(A, Behavior::BadUri);

        for _ in 0..3 {
            let err = router.route("svc", &ForwardRequest::get("/")).await.unwrap_err();
            assert!(matches!(err, RouteError::InvalidRequest { .. }), "{err:?}");
            // Keep the cursor on A for the next request.
            router.pool().group("svc").unwrap().rotation().next();
        }

        let a = router.pool().backend(A).unwrap().health();
        assert_eq!((a.state, a.consecutive_failures), (CircuitState::Closed, 0));
        assert_eq!(router.registry().get(A).unwrap().total, 0);
        assert_eq!(router.forwarder().calls(), vec![A, A, A]);
    }

    #[tokio::test]
    async fn overlapping_routes_each_visit_every_backend() {
        let router = Arc::new(router(&[A, B]));
        router
            .forwarder()
            .set(A, Behavior::RefuseAfter(Duration::from_millis(20)));

        let first = {
            let router = router.clone();
            tokio::spawn(async move { router.route("svc", &ForwardRequest::get("/")).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = router.route("svc", &ForwardRequest::get("/")).await;

        // The second request advanced the cursor while the first was on A;
        // the first must still move on to B rather than wrap back to A.
        assert_eq!(body(&first.await.unwrap().unwrap()), B);
        assert_eq!(body(&second.unwrap()), B);
        assert_eq!(router.forwarder().calls(), vec![A, B, B]);
    }

    #[tokio::test]
    async fn dropped_route_records_nothing() {
        let router = router_with(&[A], |config| config.timeouts.backend_ms = 5_000);
        router.forwarder().set(A, Behavior::Hang);

        let dropped = tokio::time::timeout(
            Duration::from_millis(20),
            router.route("svc", &ForwardRequest::get("/")),
        )
        .await;
        assert!(dropped.is_err());

        assert_eq!(router.forwarder().calls(), vec![A]);
        assert_eq!(router.registry().get(A).unwrap().total, 0);
        let a = router.pool().backend(A).unwrap().health();
        assert_eq!((a.state, a.consecutive_failures), (CircuitState::Closed, 0));
    }

    #[tokio::test]
    async fn recovery_publishes_transitions_in_order() {
        let router = router_with(&[A], |config| config.breaker.open_timeout_secs = 0);
        router.forwarder().set(A, Behavior::Refuse);
        let mut events = router.events().subscribe();

        for _ in 0..3 {
            assert!(router.route("svc", &ForwardRequest::get("/")).await.is_err());
        }
        assert_eq!(router.pool().backend(A).unwrap().health().state, CircuitState::Open);

        router.forwarder().set(A, Behavior::Respond(200));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let response = router.route("svc", &ForwardRequest::get("/")).await.unwrap();
        assert_eq!(body(&response), A);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.backend, A);
            seen.push((event.from, event.to));
        }
        assert_eq!(
            seen,
            vec![
                (CircuitState::Closed, CircuitState::Open),
                (CircuitState::Open, CircuitState::HalfOpen),
                (CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_routes_share_the_cursor() {
        let router = Arc::new(router(&[A, B, C]));

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let router = router.clone();
                tokio::spawn(async move { router.route("svc", &ForwardRequest::get("/")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let snapshot = router.registry().snapshot();
        let mut totals: Vec<u64> = snapshot.values().map(|m| m.total).collect();
        totals.sort();
        assert_eq!(totals, vec![16, 17, 17]);
        assert!(snapshot.values().all(|m| m.total == m.successes + m.failures));
    }
}
