use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{EmailProvider, UnitOfWorkFactory};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    spawn_pruning, trace_id, RateLimiterState,
};
use crate::routes::{account, admin, contact, health, permissions, users};
use crate::services::{
    AccountService, CacheManager, EmailService, EmailTemplateRepository, InMemoryCacheProvider,
    UniqueTokenIssuer,
};

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UnitOfWorkFactory>,
    pub cache: CacheManager,
    pub email: EmailService,
    pub accounts: AccountService,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    /// Wires the service layer over `store` and `email_provider`.
    pub fn new(
        config: Config,
        store: Arc<dyn UnitOfWorkFactory>,
        email_provider: Arc<dyn EmailProvider>,
    ) -> Self {
        let config = Arc::new(config);

        let cache = CacheManager::new(Arc::new(InMemoryCacheProvider::new()), store.clone());
        let tokens = UniqueTokenIssuer::new(store.clone(), config.tokens.max_issue_attempts);
        let templates = EmailTemplateRepository::new(&config.email.templates_dir);
        let email = EmailService::new(
            store.clone(),
            cache.clone(),
            tokens,
            templates,
            email_provider,
        );
        let accounts = AccountService::new(store.clone(), cache.clone());

        // A limit of zero disables rate limiting.
        let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
            let limiter = Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
            ));
            if tokio::runtime::Handle::try_current().is_ok() {
                spawn_pruning(&limiter, RATE_LIMIT_PRUNE_INTERVAL);
            }
            limiter
        });

        Self {
            config,
            store,
            cache,
            email,
            accounts,
            rate_limiter,
        }
    }
}

pub fn create_app(
    config: Config,
    store: Arc<dyn UnitOfWorkFactory>,
    email_provider: Arc<dyn EmailProvider>,
) -> Router {
    let state = AppState::new(config, store, email_provider);
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
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

    // Anonymous routes that send email or check passwords
    let public_routes = Router::new()
        .route("/api/v1/account/login", post(account::login))
        .route("/api/v1/account/logout", post(account::logout))
        .route(
            "/api/v1/account/forgot-password",
            post(account::forgot_password),
        )
        .route("/api/v1/contact", post(contact::send_contact_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let user_routes = Router::new()
        .route(
            "/api/v1/users/:user_id/activation-email",
            post(users::send_activation_email),
        )
        .route(
            "/api/v1/users/:user_id/password-reset-email",
            post(users::send_password_reset_email),
        )
        .route("/api/v1/permissions", get(permissions::list_permissions))
        .route(
            "/api/v1/roles/:role_id/permissions",
            get(permissions::list_role_permissions),
        );

    let admin_routes = Router::new()
        .route("/api/v1/admin/cache", delete(admin::clear_cache))
        .route("/api/v1/admin/cache/:key", delete(admin::evict_cache_entry));

    let health_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Global middleware (bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
