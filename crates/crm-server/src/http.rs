//! Routes and handlers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use crm_core::filter::{QueryParams, parse_flag};
use crm_core::models::appointment::{Appointment, AppointmentInput, UpdateAppointment};
use crm_core::models::contact::{Contact, ContactFields, UpdateContact};
use crm_core::models::contact_type::{ContactType, ContactTypeInput, UpdateContactType};
use crm_core::models::driving_time::{
    AppointmentDrivingTime, DrivingTimeInput, UpdateDrivingTime,
};
use crm_core::models::note::{AppointmentNote, UpdateAppointmentNote};
use crm_core::models::notification::{
    AppointmentNotification, NotificationInput, UpdateNotification,
};
use crm_core::pagination::{CursorPage, LimitOffsetPage};
use crm_service::AppointmentView;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::Identity;
use crate::state::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;
type Params = Result<Query<QueryParams>, QueryRejection>;
type RecordId = Result<Path<Uuid>, PathRejection>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/{id}",
            get(get_contact)
                .put(update_contact)
                .patch(update_contact)
                .delete(delete_contact),
        )
        .route(
            "/api/contact-types",
            get(list_contact_types).post(create_contact_type),
        )
        .route(
            "/api/contact-types/{id}",
            get(get_contact_type)
                .put(update_contact_type)
                .patch(update_contact_type)
                .delete(delete_contact_type),
        )
        .route(
            "/api/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/api/appointments/{id}",
            get(get_appointment)
                .put(update_appointment)
                .patch(update_appointment)
                .delete(delete_appointment),
        )
        .route("/api/appointment-notes", get(list_notes))
        .route(
            "/api/appointment-notes/{id}",
            get(get_note)
                .put(update_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .route(
            "/api/appointment-notifications",
            get(list_notifications).post(create_notification),
        )
        .route(
            "/api/appointment-notifications/{id}",
            get(get_notification)
                .put(update_notification)
                .patch(update_notification)
                .delete(delete_notification),
        )
        .route(
            "/api/appointment-driving-times",
            get(list_driving_times).post(create_driving_time),
        )
        .route(
            "/api/appointment-driving-times/{id}",
            get(get_driving_time)
                .put(update_driving_time)
                .patch(update_driving_time)
                .delete(delete_driving_time),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Path and query of the request; paging links are built relative to it.
fn base_url(uri: &Uri) -> &str {
    uri.path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str())
}

// -----------------------------------------------------------------------
// Contacts
// -----------------------------------------------------------------------

async fn list_contacts(
    State(st): State<AppState>,
    Identity(identity): Identity,
    uri: Uri,
    params: Params,
) -> ApiResult<Json<LimitOffsetPage<Contact>>> {
    let Query(params) = params?;
    let page = st
        .contacts
        .list(&identity, &params, base_url(&uri))
        .await?;
    Ok(Json(page))
}

async fn create_contact(
    State(st): State<AppState>,
    Identity(identity): Identity,
    body: Body<ContactFields>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let Json(fields) = body?;
    let contact = st.contacts.create(&identity, fields).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_contact(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<Json<Contact>> {
    let Path(id) = id?;
    Ok(Json(st.contacts.get(&identity, id).await?))
}

async fn update_contact(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateContact>,
) -> ApiResult<Json<Contact>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.contacts.update(&identity, id, update).await?))
}

async fn delete_contact(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.contacts.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Contact types
// -----------------------------------------------------------------------

async fn list_contact_types(
    State(st): State<AppState>,
    Identity(identity): Identity,
    params: Params,
) -> ApiResult<Json<Vec<ContactType>>> {
    let Query(params) = params?;
    Ok(Json(st.contact_types.list(&identity, &params).await?))
}

async fn create_contact_type(
    State(st): State<AppState>,
    Identity(identity): Identity,
    body: Body<ContactTypeInput>,
) -> ApiResult<(StatusCode, Json<ContactType>)> {
    let Json(input) = body?;
    let contact_type = st.contact_types.create(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(contact_type)))
}

async fn get_contact_type(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<Json<ContactType>> {
    let Path(id) = id?;
    Ok(Json(st.contact_types.get(&identity, id).await?))
}

async fn update_contact_type(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateContactType>,
) -> ApiResult<Json<ContactType>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.contact_types.update(&identity, id, update).await?))
}

async fn delete_contact_type(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.contact_types.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Appointments
// -----------------------------------------------------------------------

async fn list_appointments(
    State(st): State<AppState>,
    Identity(identity): Identity,
    uri: Uri,
    params: Params,
) -> ApiResult<Json<CursorPage<AppointmentView>>> {
    let Query(params) = params?;
    let page = st
        .appointments
        .list(&identity, &params, base_url(&uri))
        .await?;
    Ok(Json(page))
}

async fn create_appointment(
    State(st): State<AppState>,
    Identity(identity): Identity,
    body: Body<AppointmentInput>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let Json(input) = body?;
    let appointment = st.appointments.create(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn get_appointment(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    params: Params,
) -> ApiResult<Json<AppointmentView>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let denormalize = params
        .get("denormalize")
        .is_some_and(|v| parse_flag(v));
    Ok(Json(st.appointments.get(&identity, id, denormalize).await?))
}

async fn update_appointment(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateAppointment>,
) -> ApiResult<Json<Appointment>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.appointments.update(&identity, id, update).await?))
}

async fn delete_appointment(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.appointments.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Appointment notes
// -----------------------------------------------------------------------

async fn list_notes(
    State(st): State<AppState>,
    Identity(identity): Identity,
) -> ApiResult<Json<Vec<AppointmentNote>>> {
    Ok(Json(st.notes.list(&identity).await?))
}

async fn get_note(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<Json<AppointmentNote>> {
    let Path(id) = id?;
    Ok(Json(st.notes.get(&identity, id).await?))
}

async fn update_note(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateAppointmentNote>,
) -> ApiResult<Json<AppointmentNote>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.notes.update(&identity, id, update).await?))
}

async fn delete_note(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.notes.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Appointment notifications
// -----------------------------------------------------------------------

async fn list_notifications(
    State(st): State<AppState>,
    Identity(identity): Identity,
) -> ApiResult<Json<Vec<AppointmentNotification>>> {
    Ok(Json(st.notifications.list(&identity).await?))
}

async fn create_notification(
    State(st): State<AppState>,
    Identity(identity): Identity,
    body: Body<NotificationInput>,
) -> ApiResult<(StatusCode, Json<AppointmentNotification>)> {
    let Json(input) = body?;
    let notification = st.notifications.create(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn get_notification(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<Json<AppointmentNotification>> {
    let Path(id) = id?;
    Ok(Json(st.notifications.get(&identity, id).await?))
}

async fn update_notification(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateNotification>,
) -> ApiResult<Json<AppointmentNotification>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.notifications.update(&identity, id, update).await?))
}

async fn delete_notification(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.notifications.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// Appointment driving times
// -----------------------------------------------------------------------

async fn list_driving_times(
    State(st): State<AppState>,
    Identity(identity): Identity,
) -> ApiResult<Json<Vec<AppointmentDrivingTime>>> {
    Ok(Json(st.driving_times.list(&identity).await?))
}

async fn create_driving_time(
    State(st): State<AppState>,
    Identity(identity): Identity,
    body: Body<DrivingTimeInput>,
) -> ApiResult<(StatusCode, Json<AppointmentDrivingTime>)> {
    let Json(input) = body?;
    let driving_time = st.driving_times.create(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(driving_time)))
}

async fn get_driving_time(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<Json<AppointmentDrivingTime>> {
    let Path(id) = id?;
    Ok(Json(st.driving_times.get(&identity, id).await?))
}

async fn update_driving_time(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
    body: Body<UpdateDrivingTime>,
) -> ApiResult<Json<AppointmentDrivingTime>> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(st.driving_times.update(&identity, id, update).await?))
}

async fn delete_driving_time(
    State(st): State<AppState>,
    Identity(identity): Identity,
    id: RecordId,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    st.driving_times.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
