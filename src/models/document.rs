use rand::Rng;
use serde::Serialize;

use crate::db::DbPool;
use crate::errors::AppError;

/// Extension lists checked in order; the first list containing the extension wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("financial", &["xlsx", "xls", "csv", "ods"]),
    ("tax", &["pdf", "doc", "docx"]),
    ("contracts", &["pdf", "doc", "docx", "txt"]),
    ("receipts", &["pdf", "jpg", "jpeg", "png", "gif", "bmp"]),
];

pub fn category_for(extension: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(_, exts)| exts.iter().any(|e| *e == extension))
        .map(|(name, _)| *name)
        .unwrap_or("other")
}

/// Lowercased text after the last '.', or empty when there is none.
pub fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Keep only `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// `<16 random hex chars>_<sanitized original>`.
pub fn stored_file_name(original: &str) -> String {
    let bytes: [u8; 8] = rand::rng().random();
    format!("{}_{}", hex::encode(bytes), sanitize_file_name(original))
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    #[sqlx(rename = "id")]
    pub file_id: i64,
    pub user_id: i64,
    pub original_name: String,
    pub file_name: String,
    pub file_size: i64,
    pub category: String,
    #[sqlx(rename = "file_extension")]
    pub extension: String,
    pub upload_date: String,
    pub status: String,
}

pub struct NewDocument<'a> {
    pub user_id: i64,
    pub original_name: &'a str,
    pub file_name: &'a str,
    pub file_size: i64,
    pub category: &'a str,
    pub extension: &'a str,
    pub upload_date: &'a str,
}

pub async fn create(pool: &DbPool, doc: &NewDocument<'_>) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        "INSERT INTO client_documents \
         (user_id, original_name, file_name, file_size, category, file_extension, upload_date, status) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active') RETURNING id",
    )
    .bind(doc.user_id)
    .bind(doc.original_name)
    .bind(doc.file_name)
    .bind(doc.file_size)
    .bind(doc.category)
    .bind(doc.extension)
    .bind(doc.upload_date)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn find_active_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Document>, AppError> {
    let rows = sqlx::query_as::<_, Document>(
        "SELECT id, user_id, original_name, file_name, file_size, category, file_extension, \
                upload_date, status \
         FROM client_documents WHERE user_id = ?1 AND status = 'active' \
         ORDER BY upload_date DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
