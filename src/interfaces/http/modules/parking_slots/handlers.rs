//! Parking slot API handlers
//!
//! Reads are public. Creating, updating and deleting slots is admin-only;
//! those routes sit behind the auth middleware.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    parse_window, AvailabilityResponse, LocationWindowRequest, SlotBookingsResponse,
    SlotCountResponse, SlotDto, SlotRequest, TimeWindowParams,
};
use crate::application::ParkingSlotService;
use crate::domain::DomainError;
use crate::interfaces::http::common::{
    api_error, ApiError, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct SlotHandlerState {
    pub slot_service: Arc<ParkingSlotService>,
}

fn bad_request(message: String) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

fn slot_list(slots: impl IntoIterator<Item = impl Into<SlotDto>>) -> Vec<SlotDto> {
    slots.into_iter().map(Into::into).collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots",
    tag = "Parking Slots",
    responses(
        (status = 200, description = "All slots with current occupancy", body = ApiResponse<Vec<SlotDto>>)
    )
)]
pub async fn list_slots(State(state): State<SlotHandlerState>) -> ApiResult<Vec<SlotDto>> {
    let slots = state.slot_service.list_slots().await?;
    Ok(Json(ApiResponse::success(slot_list(slots))))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    params(("id" = i32, Path, description = "Slot ID")),
    responses(
        (status = 200, description = "Slot details", body = ApiResponse<SlotDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_slot(
    State(state): State<SlotHandlerState>,
    Path(id): Path<i32>,
) -> ApiResult<SlotDto> {
    let slot = state.slot_service.get_slot(id).await?;
    Ok(Json(ApiResponse::success(slot.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    request_body = SlotRequest,
    responses(
        (status = 201, description = "Slot created", body = ApiResponse<SlotDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn add_slot(
    State(state): State<SlotHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<SlotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SlotDto>>), ApiError> {
    caller.require_admin()?;
    let is_active = request.active_flag()?;

    let slot = state
        .slot_service
        .add_slot(&request.location, &request.slot_type, is_active)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SlotDto::from(slot)).with_message("Parking slot added successfully")),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Slot ID")),
    request_body = SlotRequest,
    responses(
        (status = 200, description = "Slot updated", body = ApiResponse<SlotDto>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_slot(
    State(state): State<SlotHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<SlotRequest>,
) -> ApiResult<SlotDto> {
    caller.require_admin()?;
    let is_active = request.active_flag()?;

    let slot = state
        .slot_service
        .update_slot(id, &request.location, &request.slot_type, is_active)
        .await?;

    Ok(Json(
        ApiResponse::success(SlotDto::from(slot)).with_message("Parking slot updated successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parking-slots/{id}",
    tag = "Parking Slots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Slot ID")),
    responses(
        (status = 200, description = "Slot deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Slot has live bookings")
    )
)]
pub async fn delete_slot(
    State(state): State<SlotHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    caller.require_admin()?;
    state.slot_service.delete_slot(id).await?;
    Ok(Json(ApiResponse::ok("Parking slot deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/count",
    tag = "Parking Slots",
    responses(
        (status = 200, description = "Number of active slots", body = ApiResponse<SlotCountResponse>)
    )
)]
pub async fn count_active_slots(
    State(state): State<SlotHandlerState>,
) -> ApiResult<SlotCountResponse> {
    let count = state.slot_service.count_active().await?;
    Ok(Json(ApiResponse::success(SlotCountResponse { count })))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/available",
    tag = "Parking Slots",
    params(TimeWindowParams),
    responses(
        (status = 200, description = "Active slots free over the window", body = ApiResponse<Vec<SlotDto>>),
        (status = 400, description = "Missing or invalid window")
    )
)]
pub async fn available_slots(
    State(state): State<SlotHandlerState>,
    Query(params): Query<TimeWindowParams>,
) -> ApiResult<Vec<SlotDto>> {
    let (start, end) = params.window().map_err(bad_request)?;
    let slots = state.slot_service.available_slots(start, end).await?;
    Ok(Json(ApiResponse::success(slot_list(slots))))
}

#[utoipa::path(
    post,
    path = "/api/v1/parking-slots/available-by-location",
    tag = "Parking Slots",
    request_body = LocationWindowRequest,
    responses(
        (status = 200, description = "Active slots at the location free over the window", body = ApiResponse<Vec<SlotDto>>),
        (status = 400, description = "Missing or invalid input"),
        (status = 404, description = "Nothing available")
    )
)]
pub async fn available_slots_by_location(
    State(state): State<SlotHandlerState>,
    ValidatedJson(request): ValidatedJson<LocationWindowRequest>,
) -> ApiResult<Vec<SlotDto>> {
    let (start, end) = parse_window(request.start_time.as_deref(), request.end_time.as_deref())
        .map_err(bad_request)?;

    let slots = state
        .slot_service
        .available_slots_at(&request.location, start, end)
        .await?;
    if slots.is_empty() {
        return Err(DomainError::NoSlotsAtLocation {
            location: request.location,
            only_inactive: true,
        }
        .into());
    }
    Ok(Json(ApiResponse::success(slot_list(slots))))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/location/{location}",
    tag = "Parking Slots",
    params(("location" = String, Path, description = "Case-insensitive substring")),
    responses(
        (status = 200, description = "Slots at the location", body = ApiResponse<Vec<SlotDto>>),
        (status = 404, description = "No slots")
    )
)]
pub async fn slots_by_location(
    State(state): State<SlotHandlerState>,
    Path(location): Path<String>,
) -> ApiResult<Vec<SlotDto>> {
    let slots = state.slot_service.slots_by_location(&location).await?;
    if slots.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "No parking slots found for this location",
        ));
    }
    Ok(Json(ApiResponse::success(slot_list(slots))))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/type/{type}",
    tag = "Parking Slots",
    params(("type" = String, Path, description = "Exact slot type")),
    responses(
        (status = 200, description = "Slots of the type", body = ApiResponse<Vec<SlotDto>>),
        (status = 404, description = "No slots")
    )
)]
pub async fn slots_by_type(
    State(state): State<SlotHandlerState>,
    Path(slot_type): Path<String>,
) -> ApiResult<Vec<SlotDto>> {
    let slots = state.slot_service.slots_by_type(&slot_type).await?;
    if slots.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "No parking slots found for this type",
        ));
    }
    Ok(Json(ApiResponse::success(slot_list(slots))))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/{id}/availability",
    tag = "Parking Slots",
    params(("id" = i32, Path, description = "Slot ID"), TimeWindowParams),
    responses(
        (status = 200, description = "Whether the slot is free over the window", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Missing or invalid window")
    )
)]
pub async fn check_availability(
    State(state): State<SlotHandlerState>,
    Path(id): Path<i32>,
    Query(params): Query<TimeWindowParams>,
) -> ApiResult<AvailabilityResponse> {
    let (start, end) = params.window().map_err(bad_request)?;
    let available = state.slot_service.check_availability(id, start, end).await?;
    Ok(Json(ApiResponse::success(AvailabilityResponse {
        slot_id: id,
        available,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-slots/{id}/bookings",
    tag = "Parking Slots",
    params(("id" = i32, Path, description = "Slot ID")),
    responses(
        (status = 200, description = "Slot with its booking timeline", body = ApiResponse<SlotBookingsResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn slot_bookings(
    State(state): State<SlotHandlerState>,
    Path(id): Path<i32>,
) -> ApiResult<SlotBookingsResponse> {
    let view = state.slot_service.slot_bookings(id).await?;
    Ok(Json(ApiResponse::success(view.into())))
}
