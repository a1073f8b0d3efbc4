//! HTTP handlers. Each failure is surfaced once to the caller as a single
//! human-readable message; nothing here retries. Missing decorative assets
//! and unreachable photos degrade inside the pipeline, invisible to the
//! client except as an absent visual element.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::compose::{compose, ComposeError};
use crate::normalize::{normalize, NormalizeError};
use crate::record::{CardRecord, NewRecord, StreetNumber};
use crate::render::render_svg;
use crate::state::AppState;
use crate::store::draft::DraftRecord;
use crate::store::StoreError;

type ApiError = (StatusCode, String);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(get, path = "/health", tag = "cardgen", responses((status = 200, body = HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}

/// Fields pulled out of the multipart submission body.
#[derive(Debug, Default)]
struct Submission {
    user_id: Option<String>,
    name: Option<String>,
    photo: Option<Vec<u8>>,
    street_number: Option<String>,
    address_line: Option<String>,
    apartment_info: Option<String>,
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut sub = Submission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("bad multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("bad photo field: {e}")))?;
                if !bytes.is_empty() {
                    sub.photo = Some(bytes.to_vec());
                }
            }
            other => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("bad field {other}: {e}")))?;
                let value = (!text.trim().is_empty()).then(|| text.trim().to_string());
                match other {
                    // Clients that compress in the browser submit a data URI
                    // instead of a file part.
                    "photoBase64" => {
                        if let Some(text) = &value {
                            sub.photo = crate::util::b64_decode(text);
                        }
                    }
                    "userId" => sub.user_id = value,
                    "name" => sub.name = value,
                    "streetNumber" => sub.street_number = value,
                    "addressLine" => sub.address_line = value,
                    "apartmentInfo" => sub.apartment_info = value,
                    _ => {}
                }
            }
        }
    }
    Ok(sub)
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| (StatusCode::BAD_REQUEST, format!("{field} is required")))
}

fn parse_street(label: &str) -> Result<StreetNumber, ApiError> {
    StreetNumber::parse(label).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("unknown streetNumber: {label}"),
        )
    })
}

fn normalize_error(e: NormalizeError) -> ApiError {
    match e {
        NormalizeError::EmptyInput | NormalizeError::Decode(_) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        NormalizeError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        other => {
            error!("store failure: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path = "/residents",
    tag = "cardgen",
    request_body(content = String, content_type = "multipart/form-data", description = "userId, name, photo (file or photoBase64 data URI), streetNumber, addressLine, apartmentInfo?"),
    responses(
        (status = 200, body = CardRecord),
        (status = 400, description = "Missing or invalid field")
    )
)]
pub async fn create_resident(
    State(st): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CardRecord>, ApiError> {
    let sub = read_submission(multipart).await?;

    let photo_bytes = sub
        .photo
        .ok_or_else(|| normalize_error(NormalizeError::EmptyInput))?;
    let photo = normalize(&photo_bytes, &st.normalize).map_err(normalize_error)?;

    let owner_id = required(sub.user_id, "userId")?;
    let photo_url = st
        .photos
        .save(&owner_id, &photo)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("photo save failed: {e}")))?;

    let fields = NewRecord {
        owner_id,
        name: required(sub.name, "name")?,
        photo_url,
        street_number: parse_street(&required(sub.street_number, "streetNumber")?)?,
        address_line: required(sub.address_line, "addressLine")?,
        apartment_info: sub.apartment_info,
    };
    fields
        .validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let record = st.store.create(fields).map_err(store_error)?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub user_id: String,
}

#[utoipa::path(
    get,
    path = "/residents",
    tag = "cardgen",
    params(("userId" = String, Query, description = "Owner to list records for")),
    responses((status = 200, body = Vec<CardRecord>))
)]
pub async fn list_residents(
    State(st): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CardRecord>>, ApiError> {
    let records = st.store.list_by_owner(&params.user_id).map_err(store_error)?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/residents/{id}",
    tag = "cardgen",
    params(("id" = String, Path, description = "Record id")),
    responses((status = 200, body = CardRecord), (status = 404, description = "Not found"))
)]
pub async fn get_resident(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardRecord>, ApiError> {
    let record = st.store.get(&id).map_err(store_error)?;
    Ok(Json(record))
}

/// Append-only update: the existing record stays untouched and a fresh
/// record (new id, new resident number) is issued with the merged fields.
#[utoipa::path(
    put,
    path = "/residents/{id}",
    tag = "cardgen",
    params(("id" = String, Path, description = "Record id to base the update on")),
    request_body(content = String, content_type = "multipart/form-data", description = "Same fields as create; absent fields keep the previous value"),
    responses((status = 200, body = CardRecord), (status = 404, description = "Not found"))
)]
pub async fn update_resident(
    State(st): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<CardRecord>, ApiError> {
    let previous = st.store.get(&id).map_err(store_error)?;
    let sub = read_submission(multipart).await?;

    let photo_url = match sub.photo {
        Some(ref bytes) => {
            let photo = normalize(&bytes, &st.normalize).map_err(normalize_error)?;
            st.photos
                .save(&previous.owner_id, &photo)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("photo save failed: {e}")))?
        }
        None => previous.photo_url.clone(),
    };

    let fields = merge_submission(&previous, sub, photo_url)?;
    fields
        .validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let record = st.store.create(fields).map_err(store_error)?;
    Ok(Json(record))
}

/// Merge an update submission over the record it is based on. Absent fields
/// keep the previous value; the result is always issued as a new record.
fn merge_submission(
    previous: &CardRecord,
    sub: Submission,
    photo_url: String,
) -> Result<NewRecord, ApiError> {
    Ok(NewRecord {
        owner_id: previous.owner_id.clone(),
        name: sub.name.unwrap_or_else(|| previous.name.clone()),
        photo_url,
        street_number: match sub.street_number {
            Some(label) => parse_street(&label)?,
            None => previous.street_number,
        },
        address_line: sub.address_line.unwrap_or_else(|| previous.address_line.clone()),
        apartment_info: sub.apartment_info.or_else(|| previous.apartment_info.clone()),
    })
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub resident_id: String,
}

#[utoipa::path(
    post,
    path = "/generate-resident-card",
    tag = "cardgen",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Rendered certificate", content_type = "image/svg+xml"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Render failure")
    )
)]
pub async fn generate_card(
    State(st): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = st.store.get(&req.resident_id).map_err(store_error)?;

    // Photo fetch failures degrade to the placeholder slot.
    let photo = match st.photos.resolve(&st.http, &record.photo_url).await {
        Some(bytes) => normalize(&bytes, &st.normalize).ok(),
        None => None,
    };

    let assets = st.assets.card_assets();
    let layout = compose(&record, photo.as_ref(), &assets).map_err(|e| match e {
        ComposeError::InvalidRecord(_) => (StatusCode::BAD_REQUEST, e.to_string()),
    })?;

    let fonts = st.assets.font_set();
    let svg = render_svg(&layout, &fonts).map_err(|e| {
        error!("card render failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        svg,
    ))
}

#[utoipa::path(
    get,
    path = "/drafts/{owner}",
    tag = "cardgen",
    params(("owner" = String, Path, description = "Owner id")),
    responses((status = 200, body = DraftRecord), (status = 404, description = "No draft saved"))
)]
pub async fn get_draft(
    State(st): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<DraftRecord>, ApiError> {
    match st.drafts.load(&owner).map_err(store_error)? {
        Some(draft) => Ok(Json(draft)),
        None => Err((StatusCode::NOT_FOUND, "no draft saved".into())),
    }
}

#[utoipa::path(
    put,
    path = "/drafts/{owner}",
    tag = "cardgen",
    params(("owner" = String, Path, description = "Owner id")),
    request_body = DraftRecord,
    responses((status = 204, description = "Draft saved"))
)]
pub async fn put_draft(
    State(st): State<AppState>,
    Path(owner): Path<String>,
    Json(draft): Json<DraftRecord>,
) -> Result<StatusCode, ApiError> {
    st.drafts.save(&owner, &draft).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/drafts/{owner}",
    tag = "cardgen",
    params(("owner" = String, Path, description = "Owner id")),
    responses((status = 204, description = "Draft cleared"))
)]
pub async fn delete_draft(
    State(st): State<AppState>,
    Path(owner): Path<String>,
) -> Result<StatusCode, ApiError> {
    st.drafts.clear(&owner).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRecordStore;
    use crate::store::RecordStore;

    fn seeded_store() -> (MemoryRecordStore, CardRecord) {
        let store = MemoryRecordStore::new();
        let original = store
            .create(NewRecord {
                owner_id: "u1".into(),
                name: "花譜".into(),
                photo_url: "photos/u1/a.jpg".into(),
                street_number: StreetNumber::Second,
                address_line: "1-2-3".into(),
                apartment_info: None,
            })
            .unwrap();
        (store, original)
    }

    #[test]
    fn update_issues_a_fresh_record_and_keeps_the_old_one() {
        let (store, original) = seeded_store();

        let sub = Submission {
            name: Some("新しい名前".into()),
            ..Submission::default()
        };
        let fields =
            merge_submission(&original, sub, original.photo_url.clone()).unwrap();
        fields.validate().unwrap();
        let updated = store.create(fields).unwrap();

        assert_ne!(updated.id, original.id);
        assert_ne!(updated.resident_number, original.resident_number);
        assert_eq!(updated.name, "新しい名前");
        // Unsubmitted fields carry over.
        assert_eq!(updated.street_number, original.street_number);
        assert_eq!(updated.address_line, original.address_line);
        // The base record is untouched and still fetchable.
        let old = store.get(&original.id).unwrap();
        assert_eq!(old.name, "花譜");
    }

    #[test]
    fn merge_rejects_an_unknown_street_label() {
        let (_, original) = seeded_store();
        let sub = Submission {
            street_number: Some("漆番街".into()),
            ..Submission::default()
        };
        let err = merge_submission(&original, sub, String::new()).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
