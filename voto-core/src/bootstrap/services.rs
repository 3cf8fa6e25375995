//! Service initialization and dependency injection

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    service::{
        ClassService, ContactService, JwtService, LiveSessionService, PresentationService,
        SessionStore, SlideService, UserService,
    },
    storage::ImageStore,
    Config,
};

/// Container for all initialized services
#[derive(Clone, Debug)]
pub struct Services {
    pub user_service: UserService,
    pub class_service: ClassService,
    pub presentation_service: PresentationService,
    pub slide_service: SlideService,
    pub live_session_service: LiveSessionService,
    pub contact_service: ContactService,
    /// Login sessions behind the session cookie
    pub session_store: SessionStore,
    pub jwt_service: JwtService,
    pub image_store: ImageStore,
}

impl Services {
    /// Wire every service from an existing pool and pre-built stores
    #[must_use]
    pub fn from_parts(
        pool: PgPool,
        jwt_service: JwtService,
        session_store: SessionStore,
        image_store: ImageStore,
    ) -> Self {
        Self {
            user_service: UserService::new(pool.clone(), jwt_service.clone()),
            class_service: ClassService::new(pool.clone()),
            presentation_service: PresentationService::new(pool.clone(), image_store.clone()),
            slide_service: SlideService::new(pool.clone(), image_store.clone()),
            live_session_service: LiveSessionService::new(pool.clone()),
            contact_service: ContactService::new(pool),
            session_store,
            jwt_service,
            image_store,
        }
    }
}

/// Initialize all core services
pub fn init_services(pool: PgPool, config: &Config) -> anyhow::Result<Services> {
    info!("Initializing services...");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.token_duration_hours)?;
    info!(
        token_duration_hours = config.jwt.token_duration_hours,
        "JWT service initialized"
    );

    let session_store = if config.redis.url.is_empty() {
        warn!(
            "Session store using in-memory storage. Sessions are lost on restart \
             and are not shared between replicas. Configure Redis for production."
        );
        SessionStore::with_memory(config.session.ttl_seconds)
    } else {
        let client = redis::Client::open(config.redis.url.clone())?;
        info!("Session store initialized with Redis");
        SessionStore::with_redis(client, &config.redis.key_prefix, config.session.ttl_seconds)
    };

    let image_store = ImageStore::from_config(&config.storage)?;
    info!(backend = %config.storage.backend, "Image storage initialized");

    let services = Services::from_parts(pool, jwt_service, session_store, image_store);
    info!("All services initialized");

    Ok(services)
}
