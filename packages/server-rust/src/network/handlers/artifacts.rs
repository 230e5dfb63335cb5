//! Multipart artifact uploads.
//!
//! Each form carries the file in one field and the target name in another.
//! When the name field is missing or blank the uploaded file name is used.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use tracing::info;

use super::{ApiError, AppState};

struct Upload {
    name: String,
    content: Bytes,
}

async fn read_upload(
    mut multipart: Multipart,
    file_field: &str,
    name_field: &str,
) -> Result<Upload, ApiError> {
    let upload_err = |e: axum::extract::multipart::MultipartError| ApiError::Upload(e.to_string());
    let mut file: Option<(Bytes, Option<String>)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_err)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(n) if n == file_field => {
                let file_name = field.file_name().map(str::to_string);
                let content = field.bytes().await.map_err(upload_err)?;
                file = Some((content, file_name));
            }
            Some(n) if n == name_field => {
                name = Some(field.text().await.map_err(upload_err)?);
            }
            _ => {}
        }
    }

    let (content, file_name) =
        file.ok_or_else(|| ApiError::Upload(format!("missing field {file_field}")))?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .or(file_name)
        .ok_or_else(|| ApiError::Upload(format!("missing field {name_field}")))?;
    Ok(Upload { name, content })
}

/// `POST /dynamic/uploadwsdl`: stores `<name>.wsdl` and seeds a route
/// record from its address when none exists yet.
///
/// # Errors
///
/// Malformed forms and bad names are answered with 400, write and store
/// failures with 500.
pub async fn upload_wsdl_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let upload = read_upload(multipart, "wsdlFile", "wsdlDetail").await?;
    let service = state
        .artifacts
        .save_wsdl(&upload.name, &upload.content)
        .await?;
    let seeded = state.manager.seed_from_wsdl(&service).await?;
    info!(service = %service, seeded, "WSDL uploaded");
    Ok(format!("WSDL received for {service}"))
}

/// `POST /dynamic/uploadxslt`: stores `<name>.xslt`.
///
/// # Errors
///
/// Malformed forms and bad names are answered with 400, write failures
/// with 500.
pub async fn upload_xslt_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let upload = read_upload(multipart, "xsltFile", "xsltDetail").await?;
    let service = state
        .artifacts
        .save_xslt(&upload.name, &upload.content)
        .await?;
    info!(service = %service, "XSLT uploaded");
    Ok(format!("XSLT received for {service}"))
}
