use utoipa::OpenApi;

pub const USER_TAG: &str = "User";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "userbase",
        description = "User management API",
    ),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::error::ValidationFieldError,
        )
    ),
    tags(
        (name = USER_TAG, description = "User management endpoints"),
    )
)]
pub struct ApiDoc;
