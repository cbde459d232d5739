use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::services::{
    AdminLiveViews, AlertStore, BroadcastDispatcher, DashboardLoader, DocumentStore,
    IntakeService, LiveQueries, MessagingService, PushGateway, SessionGuard, StatusLifecycle,
    UserStore,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, require_user, trace_id,
};
use crate::routes::{alerts, auth, dashboard, functions, health, incidents, live, push, sos};
use crate::services::cookies::CookieHelper;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Present when the Postgres backend is in use.
    pub pool: Option<PgPool>,
    pub store: Arc<dyn DocumentStore>,
    pub users: Arc<dyn UserStore>,
    pub lifecycle: Arc<StatusLifecycle>,
    pub messaging: Arc<MessagingService>,
    pub broadcaster: Arc<BroadcastDispatcher>,
    pub intake: Arc<IntakeService>,
    pub dashboards: Arc<DashboardLoader>,
    pub live: AdminLiveViews,
    pub guard: SessionGuard,
    pub cookies: CookieHelper,
    /// Cancelled on shutdown; ends open live streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires the services over one store and one push gateway.
    pub fn new<S>(
        config: Config,
        store: Arc<S>,
        push: Arc<dyn PushGateway>,
        pool: Option<PgPool>,
    ) -> Self
    where
        S: DocumentStore + 'static,
    {
        let documents: Arc<dyn DocumentStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let alert_log: Arc<dyn AlertStore> = store;

        let limits = config.views.limits();
        let guard = SessionGuard::new(config.session.login_page.clone());

        let messaging = Arc::new(
            MessagingService::new(documents.clone(), push.clone())
                .with_topic(config.fcm.default_topic.clone()),
        );
        let broadcaster = Arc::new(BroadcastDispatcher::new(messaging.clone(), alert_log));

        Self {
            pool,
            store: documents.clone(),
            users,
            lifecycle: Arc::new(StatusLifecycle::new(documents.clone(), push)),
            messaging,
            broadcaster,
            intake: Arc::new(IntakeService::new(documents.clone())),
            dashboards: Arc::new(DashboardLoader::new(documents.clone(), limits)),
            live: AdminLiveViews::new(guard.clone(), LiveQueries::new(documents), limits),
            guard,
            cookies: CookieHelper::new(config.session.clone()),
            shutdown: CancellationToken::new(),
            config: Arc::new(config),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        // Development: allow any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Signed-in users
    let user_routes = Router::new()
        .route(
            "/api/v1/incidents",
            post(incidents::report_issue).get(incidents::list_user_incidents),
        )
        .route("/api/v1/incidents/:id", get(incidents::get_incident_detail))
        .route("/api/v1/dashboard/user", get(dashboard::user_dashboard))
        .route("/api/v1/sos", post(sos::trigger_sos))
        .route("/api/v1/push/register", post(push::register_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    // Admins
    let admin_routes = Router::new()
        .route("/api/v1/admin/incidents", get(incidents::list_admin_incidents))
        .route(
            "/api/v1/admin/incidents/:id/status",
            patch(incidents::update_incident_status),
        )
        .route("/api/v1/admin/sos", get(sos::list_sos_requests))
        .route("/api/v1/admin/sos/:id/status", patch(sos::update_sos_status))
        .route("/api/v1/admin/alerts", get(alerts::list_alerts))
        .route("/api/v1/admin/broadcast", post(alerts::broadcast))
        .route("/api/v1/admin/dashboard", get(dashboard::admin_dashboard))
        .route("/api/v1/admin/push/register", post(push::register_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Live streams check the session themselves before subscribing
    let live_routes = Router::new()
        .route("/api/v1/admin/live/incidents", get(live::incidents))
        .route("/api/v1/admin/live/sos", get(live::sos_requests))
        .route("/api/v1/admin/live/alerts", get(live::alerts))
        .route(
            "/api/v1/admin/live/dashboard-incidents",
            get(live::dashboard_incidents),
        )
        .route(
            "/api/v1/admin/live/recent-incident-count",
            get(live::recent_incident_count),
        )
        .route("/api/v1/admin/live/dashboard-sos", get(live::dashboard_sos));

    // Messaging functions (public)
    let function_routes = Router::new()
        .route(
            "/sendNotification",
            post(functions::send_notification).fallback(functions::method_not_allowed),
        )
        .route(
            "/sendTargetedNotification",
            post(functions::send_targeted_notification).fallback(functions::method_not_allowed),
        )
        .route(
            "/getNotificationHistory",
            get(functions::get_notification_history).fallback(functions::method_not_allowed),
        )
        .route(
            "/subscribeToTopic",
            post(functions::subscribe_to_topic).fallback(functions::method_not_allowed),
        );

    let public_routes = Router::new()
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // SSE streams stay open, so the timeout only wraps the other routes
    let bounded = Router::new()
        .merge(public_routes)
        .merge(function_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    Router::new()
        .merge(bounded)
        .merge(live_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
