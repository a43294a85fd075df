use std::path::Path;

use actix_multipart::{Field, Multipart};
use actix_session::Session;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::auth::session;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::document::{self, NewDocument};
use crate::response;
use crate::time;

/// Multipart field that carries the document.
const FILE_FIELD: &str = "file";

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {err}"))
}

/// Stream one field to `dest`, refusing to write past `limit` bytes.
/// A partial file is removed on any failure.
async fn save_field(field: &mut Field, dest: &Path, limit: u64) -> Result<u64, AppError> {
    let result = async {
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_error)?;
            written += chunk.len() as u64;
            if written > limit {
                return Err(AppError::PayloadTooLarge("File size exceeds limit".to_string()));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}

/// POST /api/upload (multipart, field `file`)
pub async fn upload(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty());
        let Some(original_name) = original_name else {
            continue;
        };

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        let file_name = document::stored_file_name(&original_name);
        let dest = config.upload_dir.join(&file_name);

        let file_size = save_field(&mut field, &dest, config.max_upload_bytes).await?;
        if file_size == 0 {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(AppError::BadRequest("No file uploaded".to_string()));
        }

        let extension = document::extension_of(&original_name);
        let category = document::category_for(&extension);
        let upload_date = time::now();
        let new_doc = NewDocument {
            user_id: user.id,
            original_name: &original_name,
            file_name: &file_name,
            file_size: file_size as i64,
            category,
            extension: &extension,
            upload_date: &upload_date,
        };

        let file_id = match document::create(&pool, &new_doc).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&dest).await {
                    log::warn!("Could not remove orphaned upload {}: {rm}", dest.display());
                }
                return Err(e);
            }
        };
        log::info!("'{}' uploaded {} ({} bytes)", user.username, original_name, file_size);

        let details = json!({
            "category": category,
            "file_size": file_size,
            "summary": format!("Uploaded document '{original_name}'")
        });
        let _ = crate::audit::log(&pool, user.id, "document.uploaded", "document", file_id, details).await;

        return Ok(response::success(
            json!({
                "file_id": file_id,
                "original_name": original_name,
                "file_name": file_name,
                "file_size": file_size,
                "category": category,
                "extension": extension,
                "upload_date": upload_date,
            }),
            "File uploaded successfully",
        ));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// GET /api/documents: the caller's active documents.
pub async fn list(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    let documents = document::find_active_for_user(&pool, user.id).await?;
    Ok(response::success(documents, "Documents retrieved successfully"))
}
