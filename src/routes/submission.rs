use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::{error::AppError, state::AppState, uploads::Upload};

/// A create/update body sent either as plain JSON or as `multipart/form-data`
/// with a JSON `payload` part and an optional `file` part.
pub struct Submission<T> {
    pub payload: T,
    pub upload: Option<Upload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[async_trait]
impl<T> FromRequest<AppState> for Submission<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
            return Ok(Self {
                payload,
                upload: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        let mut payload: Option<T> = None;
        let mut upload: Option<Upload> = None;

        while let Some(field) = multipart.next_field().await.map_err(|err| {
            error!(error = %err, "invalid multipart data");
            AppError::bad_request(format!("invalid multipart data: {err}"))
        })? {
            match field.name() {
                Some("payload") => {
                    let text = field.text().await.map_err(|err| {
                        AppError::bad_request(format!("invalid payload part: {err}"))
                    })?;
                    payload = Some(serde_json::from_str(&text)?);
                }
                Some("file") => {
                    let file_name = field
                        .file_name()
                        .map(str::to_string)
                        .ok_or_else(|| AppError::bad_request("file part must carry a filename"))?;
                    let bytes = field.bytes().await.map_err(|err| {
                        error!(error = %err, "failed to read file bytes");
                        AppError::bad_request(format!("failed to read file bytes: {err}"))
                    })?;
                    upload = Some(Upload { file_name, bytes });
                }
                _ => {}
            }
        }

        let payload = payload.ok_or_else(|| AppError::bad_request("payload field is required"))?;
        Ok(Self { payload, upload })
    }
}
