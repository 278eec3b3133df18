use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBoardSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 1, max = 500))]
    pub max_sounds: Option<i32>,
    #[validate(range(min = 1))]
    pub max_file_size_bytes: Option<i64>,
    pub allow_uploads: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestAccessSchema {
    #[validate(length(max = 256))]
    pub message: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSettingsSchema {
    #[validate(range(min = 1, max = 500))]
    pub max_sounds: Option<i32>,
    #[validate(range(min = 1))]
    pub max_file_size_bytes: Option<i64>,
    pub allow_uploads: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSoundSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 16))]
    pub emoji: Option<String>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub global_volume: Option<f32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferenceSchema {
    #[validate(range(min = 0.0, max = 1.0))]
    pub volume: Option<f32>,
    pub favorite: Option<bool>,
}

/// Metadata accompanying a sound upload. The audio bytes are the request
/// body, so everything else travels in the query string.
#[derive(Debug, IntoParams, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSoundParams {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 256))]
    pub filename: String,
    /// Clip length in seconds, as measured by the uploader
    #[validate(range(min = 0.0))]
    pub duration: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub global_volume: Option<f32>,
    #[validate(length(max = 16))]
    pub emoji: Option<String>,
    /// Start of the wanted range in seconds, trims the clip when set
    pub trim_start: Option<f32>,
    /// End of the wanted range in seconds
    pub trim_end: Option<f32>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
