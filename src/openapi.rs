use utoipa::OpenApi;

use crate::api;
use crate::record::{CardRecord, StreetNumber};
use crate::store::draft::DraftRecord;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health,
        api::create_resident,
        api::list_residents,
        api::get_resident,
        api::update_resident,
        api::generate_card,
        api::get_draft,
        api::put_draft,
        api::delete_draft,
    ),
    components(
        schemas(
            CardRecord,
            StreetNumber,
            DraftRecord,
            api::HealthResponse,
            api::GenerateRequest,
        )
    ),
    tags(
        (name = "cardgen", description = "Resident card backend API")
    )
)]
pub struct ApiDoc;
