//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, PaginatedResponse};
use super::middleware::{auth_middleware, AuthState};
use super::modules::{auth, bookings, health, metrics, parking_slots, request_id, users};
use crate::application::{BookingLifecycle, LocationMatcher, ParkingSlotService, UserService};
use crate::domain::{PricingPolicy, QrCodePublisher, RepositoryProvider};
use crate::infrastructure::crypto::jwt::JwtConfig;

/// Application services shared by the HTTP handlers
#[derive(Clone)]
pub struct ApiServices {
    pub users: Arc<UserService>,
    pub slots: Arc<ParkingSlotService>,
    pub lifecycle: Arc<BookingLifecycle>,
    pub matcher: Arc<LocationMatcher>,
}

impl ApiServices {
    /// Wire every service over one repository provider
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        jwt_config: JwtConfig,
        pricing: PricingPolicy,
        qr: Arc<dyn QrCodePublisher>,
    ) -> Self {
        let lifecycle = Arc::new(BookingLifecycle::new(repos.clone(), pricing, qr));
        Self {
            users: Arc::new(UserService::new(repos.clone(), jwt_config)),
            slots: Arc::new(ParkingSlotService::new(repos.clone())),
            matcher: Arc::new(LocationMatcher::new(repos, lifecycle.clone())),
            lifecycle,
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT from POST /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::get_current_user,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Parking slots
        parking_slots::list_slots,
        parking_slots::get_slot,
        parking_slots::add_slot,
        parking_slots::update_slot,
        parking_slots::delete_slot,
        parking_slots::count_active_slots,
        parking_slots::available_slots,
        parking_slots::available_slots_by_location,
        parking_slots::slots_by_location,
        parking_slots::slots_by_type,
        parking_slots::check_availability,
        parking_slots::slot_bookings,
        // Bookings
        bookings::create_booking,
        bookings::create_booking_by_location,
        bookings::price_quote,
        bookings::list_bookings,
        bookings::my_bookings,
        bookings::user_bookings,
        bookings::get_booking,
        bookings::get_qr_code,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::pay_booking,
        bookings::delete_booking,
    ),
    components(
        schemas(
            ApiResponse<String>,
            PaginatedResponse<users::UserDto>,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::UserInfo,
            users::UserDto,
            users::UpdateUserRequest,
            parking_slots::SlotDto,
            parking_slots::SlotRequest,
            parking_slots::LocationWindowRequest,
            parking_slots::SlotCountResponse,
            parking_slots::AvailabilityResponse,
            parking_slots::SlotBookingDto,
            parking_slots::SlotBookingsResponse,
            bookings::BookingDto,
            bookings::CreatedBookingDto,
            bookings::CreateBookingRequest,
            bookings::BookByLocationRequest,
            bookings::PriceQuoteRequest,
            bookings::PriceQuoteDto,
            bookings::PaymentReceiptDto,
            bookings::QrCodeResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Registration, login (JWT) and profile"),
        (name = "Users", description = "Account management"),
        (name = "Parking Slots", description = "Slot browsing, availability and administration"),
        (name = "Bookings", description = "Booking admission, payment, cancellation and completion"),
    ),
    info(
        title = "Parking Slot Booking API",
        version = "1.0.0",
        description = "Book parking slots by id or by location, with hourly pricing and QR tickets",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes.
///
/// `db` is only used by the health check; pass `None` when the services run
/// on the in-memory store.
pub fn create_api_router(
    services: ApiServices,
    db: Option<DatabaseConnection>,
    prometheus: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config: services.users.jwt_config().clone(),
    };
    let require_auth = middleware::from_fn_with_state(middleware_state, auth_middleware);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes
    let auth_state = auth::AuthHandlerState {
        user_service: services.users.clone(),
    };
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(auth_state.clone());
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/logout", post(auth::logout))
        .layer(require_auth.clone())
        .with_state(auth_state);

    // User routes (protected)
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(require_auth.clone())
        .with_state(users::UserHandlerState {
            user_service: services.users.clone(),
        });

    // Parking slot routes: reads are public, writes carry the auth layer
    // on their method routers only.
    let slot_routes = Router::new()
        .route(
            "/",
            get(parking_slots::list_slots)
                .merge(post(parking_slots::add_slot).route_layer(require_auth.clone())),
        )
        .route("/count", get(parking_slots::count_active_slots))
        .route("/available", get(parking_slots::available_slots))
        .route(
            "/available-by-location",
            post(parking_slots::available_slots_by_location),
        )
        .route("/location/{location}", get(parking_slots::slots_by_location))
        .route("/type/{type}", get(parking_slots::slots_by_type))
        .route(
            "/{id}",
            get(parking_slots::get_slot).merge(
                put(parking_slots::update_slot)
                    .delete(parking_slots::delete_slot)
                    .route_layer(require_auth.clone()),
            ),
        )
        .route("/{id}/availability", get(parking_slots::check_availability))
        .route("/{id}/bookings", get(parking_slots::slot_bookings))
        .with_state(parking_slots::SlotHandlerState {
            slot_service: services.slots.clone(),
        });

    // Booking routes
    let booking_state = bookings::BookingHandlerState {
        lifecycle: services.lifecycle.clone(),
        matcher: services.matcher.clone(),
    };
    let booking_public_routes = Router::new()
        .route("/price-quote", post(bookings::price_quote))
        .with_state(booking_state.clone());
    let booking_routes = Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/by-location", post(bookings::create_booking_by_location))
        .route("/me", get(bookings::my_bookings))
        .route("/user/{user_id}", get(bookings::user_bookings))
        .route(
            "/{id}",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .route("/{id}/qr", get(bookings::get_qr_code))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route("/{id}/complete", post(bookings::complete_booking))
        .route("/{id}/pay", post(bookings::pay_booking))
        .layer(require_auth)
        .with_state(booking_state);

    // Health & metrics
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db,
            slot_service: services.slots,
            started_at: Instant::now(),
        });
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics::MetricsState { handle: prometheus });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/auth", auth_routes.merge(auth_protected_routes))
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/parking-slots", slot_routes)
        .nest("/api/v1/bookings", booking_public_routes.merge(booking_routes))
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
}
