//! Image upload and removal through the configured image store

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidQuery};
use crate::http::server::AppState;
use crate::media::{ImageUpload, UploadedImage};

#[derive(Debug, Deserialize)]
pub struct DeleteImageQuery {
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedImage {
    pub message: &'static str,
    pub result: String,
}

/// Fields read from the multipart form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(Vec<u8>, String, Option<String>)>,
    folder: Option<String>,
    tipo: Option<String>,
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::bad_request(format!("Formulario no válido: {e}"))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((bytes.to_vec(), content_type, file_name));
            }
            Some("folder") => form.folder = Some(field.text().await.map_err(multipart_error)?),
            Some("tipo") => form.tipo = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }
    Ok(form)
}

/// POST /upload - multipart `file`, optional `folder` or `tipo`
async fn upload_image(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    multipart: Multipart,
) -> Result<Json<UploadedImage>, ApiError> {
    let form = read_form(multipart).await?;
    let (bytes, content_type, file_name) = form
        .file
        .ok_or_else(|| ApiError::bad_request("No se ha proporcionado ningún archivo"))?;

    let upload = ImageUpload::new(
        bytes,
        &content_type,
        file_name,
        form.folder.as_deref(),
        form.tipo.as_deref(),
    )?;
    let size = upload.bytes.len();
    let image = state.images.upload(upload).await?;
    tracing::info!(public_id = %image.public_id, size, uploader = %subject, "Image uploaded");
    Ok(Json(image))
}

/// DELETE /upload?public_id=
async fn delete_image(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidQuery(query): ValidQuery<DeleteImageQuery>,
) -> Result<Json<DeletedImage>, ApiError> {
    let public_id = query
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ApiError::bad_request("No se ha proporcionado el ID público de la imagen")
        })?;
    let result = state.images.delete(public_id).await?;
    Ok(Json(DeletedImage {
        message: "Imagen eliminada correctamente",
        result,
    }))
}

/// Upload routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload_image).delete(delete_image))
}

#[cfg(test)]
mod tests {
    use crate::http::routes::common::test_support::{authed, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    const BOUNDARY: &str = "yumi-boundary";

    fn multipart(parts: &[(&str, Option<(&str, &str)>, &[u8])], token: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file {
                Some((file_name, content_type)) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::post("/upload").header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn upload_requires_auth() {
        let req = multipart(&[("file", Some(("a.png", "image/png")), b"png")], None);
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upload_requires_file() {
        let req = multipart(&[("folder", None, b"recetas")], Some("user_1"));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No se ha proporcionado ningún archivo");
    }

    #[tokio::test]
    async fn upload_rejects_non_images() {
        let req = multipart(
            &[("file", Some(("notas.txt", "text/plain")), b"hola")],
            Some("user_1"),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Tipo de archivo no válido. Solo se permiten imágenes JPEG, PNG, WebP y GIF"
        );
    }

    #[tokio::test]
    async fn upload_without_store_is_502() {
        let req = multipart(
            &[("file", Some(("foto.jpg", "image/jpeg")), b"\xff\xd8\xff")],
            Some("user_1"),
        );
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn delete_requires_public_id() {
        let (status, body) = send(authed("DELETE", "/upload", "user_1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No se ha proporcionado el ID público de la imagen");
    }
}
