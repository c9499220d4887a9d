//! Response DTOs for the HTTP API.

use serde::Serialize;

use crate::datetime::to_rfc3339;
use crate::share::ShareRecord;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Public information about a downloadable share. Never exposes the blob path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfoResponse {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub upload_date: String,
    pub expiry_date: String,
    pub download_url: String,
}

impl ShareInfoResponse {
    /// Build the response for `record`.
    pub fn from_record(record: &ShareRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            size: record.size,
            upload_date: to_rfc3339(&record.upload_date),
            expiry_date: to_rfc3339(&record.expiry_date),
            download_url: format!("/download/{}", urlencoding::encode(&record.id)),
        }
    }
}
