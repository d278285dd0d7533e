//! Booking API handlers
//!
//! Everything except the price quote requires a bearer token. Listing all
//! bookings, completing and deleting are admin operations.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    BookByLocationRequest, BookingDto, CreateBookingRequest, CreatedBookingDto, PaymentReceiptDto,
    PriceQuoteDto, PriceQuoteRequest, QrCodeResponse,
};
use crate::application::{BookingLifecycle, BookingOutcome, LocationMatcher};
use crate::domain::Booking;
use crate::interfaces::http::common::{
    api_error, ApiError, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::parking_slots::{parse_window, Window};

#[derive(Clone)]
pub struct BookingHandlerState {
    pub lifecycle: Arc<BookingLifecycle>,
    pub matcher: Arc<LocationMatcher>,
}

type Created = Result<(StatusCode, Json<ApiResponse<CreatedBookingDto>>), ApiError>;

fn window(start: Option<&str>, end: Option<&str>) -> Result<Window, ApiError> {
    parse_window(start, end).map_err(|msg| api_error(StatusCode::BAD_REQUEST, msg))
}

fn created(outcome: BookingOutcome) -> (StatusCode, Json<ApiResponse<CreatedBookingDto>>) {
    let message = outcome.message();
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedBookingDto::from(outcome)).with_message(message)),
    )
}

fn booking_list(bookings: Vec<Booking>) -> Vec<BookingDto> {
    bookings.into_iter().map(BookingDto::from).collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = ApiResponse<CreatedBookingDto>),
        (status = 400, description = "Invalid window or slot not active"),
        (status = 404, description = "Slot not found"),
        (status = 409, description = "Slot already booked for the window")
    )
)]
pub async fn create_booking(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Created {
    let (start, end) = window(request.start_time.as_deref(), request.end_time.as_deref())?;
    let outcome = state
        .lifecycle
        .create_booking(&caller.user_id, request.slot_id, start, end)
        .await?;
    Ok(created(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/by-location",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = BookByLocationRequest,
    responses(
        (status = 201, description = "Booking created on the first free slot", body = ApiResponse<CreatedBookingDto>),
        (status = 404, description = "No matching slots at the location"),
        (status = 409, description = "Every matching slot is booked")
    )
)]
pub async fn create_booking_by_location(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<BookByLocationRequest>,
) -> Created {
    let (start, end) = window(request.start_time.as_deref(), request.end_time.as_deref())?;
    let slot_type = request
        .slot_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let outcome = state
        .matcher
        .find_and_book(&caller.user_id, request.location.trim(), slot_type, start, end)
        .await?;
    Ok(created(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/price-quote",
    tag = "Bookings",
    request_body = PriceQuoteRequest,
    responses(
        (status = 200, description = "Price for the window", body = ApiResponse<PriceQuoteDto>),
        (status = 400, description = "Missing or invalid window")
    )
)]
pub async fn price_quote(
    State(state): State<BookingHandlerState>,
    ValidatedJson(request): ValidatedJson<PriceQuoteRequest>,
) -> ApiResult<PriceQuoteDto> {
    let (start, end) = window(request.start_time.as_deref(), request.end_time.as_deref())?;
    let quote = state.lifecycle.quote(start, end)?;
    Ok(Json(
        ApiResponse::success(PriceQuoteDto::from(quote)).with_message("Price calculated successfully"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All bookings, newest first", body = ApiResponse<Vec<BookingDto>>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_bookings(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<BookingDto>> {
    caller.require_admin()?;
    let bookings = state.lifecycle.list_bookings().await?;
    Ok(Json(ApiResponse::success(booking_list(bookings))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/me",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bookings of the caller", body = ApiResponse<Vec<BookingDto>>)
    )
)]
pub async fn my_bookings(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<BookingDto>> {
    let bookings = state.lifecycle.bookings_for_user(&caller.user_id).await?;
    Ok(Json(ApiResponse::success(booking_list(bookings))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/user/{user_id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Bookings of the user", body = ApiResponse<Vec<BookingDto>>),
        (status = 403, description = "Not your bookings")
    )
)]
pub async fn user_bookings(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<BookingDto>> {
    if !caller.can_access(&user_id) {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "You are not authorized to view these bookings",
        ));
    }
    let bookings = state.lifecycle.bookings_for_user(&user_id).await?;
    Ok(Json(ApiResponse::success(booking_list(bookings))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = ApiResponse<BookingDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking(
    State(state): State<BookingHandlerState>,
    Path(id): Path<i32>,
) -> ApiResult<BookingDto> {
    let booking = state.lifecycle.get_booking(id).await?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}/qr",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "QR code link; null when generation failed", body = ApiResponse<QrCodeResponse>),
        (status = 403, description = "Not your booking"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_qr_code(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> ApiResult<QrCodeResponse> {
    let qr_code_url = state.lifecycle.qr_code_url(&caller.user_id, id).await?;
    Ok(Json(ApiResponse::success(QrCodeResponse {
        booking_id: id,
        qr_code_url,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled, slot released", body = ApiResponse<BookingDto>),
        (status = 400, description = "Booking already finished"),
        (status = 403, description = "Not your booking"),
        (status = 404, description = "Not found")
    )
)]
pub async fn cancel_booking(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> ApiResult<BookingDto> {
    let booking = state.lifecycle.cancel_booking(&caller.user_id, id).await?;
    Ok(Json(
        ApiResponse::success(BookingDto::from(booking)).with_message("Booking cancelled successfully"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/complete",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking completed, slot released", body = ApiResponse<BookingDto>),
        (status = 400, description = "Booking already finished"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not found")
    )
)]
pub async fn complete_booking(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> ApiResult<BookingDto> {
    caller.require_admin()?;
    let booking = state.lifecycle.complete_booking(id).await?;
    Ok(Json(
        ApiResponse::success(BookingDto::from(booking)).with_message("Booking completed successfully"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/pay",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<PaymentReceiptDto>),
        (status = 400, description = "Already paid or cancelled"),
        (status = 404, description = "Not found")
    )
)]
pub async fn pay_booking(
    State(state): State<BookingHandlerState>,
    Path(id): Path<i32>,
) -> ApiResult<PaymentReceiptDto> {
    let receipt = state.lifecycle.pay_booking(id).await?;
    Ok(Json(
        ApiResponse::success(PaymentReceiptDto::from(receipt)).with_message("Payment successful"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_booking(
    State(state): State<BookingHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    caller.require_admin()?;
    state.lifecycle.delete_booking(id).await?;
    Ok(Json(ApiResponse::ok("Booking deleted successfully")))
}
