use serde::{Deserialize, Serialize};

use crate::domain::JobStatus;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: JobStatus,
    #[serde(default)]
    pub runtime_details: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    Output,
    Log,
    Artifact,
}

#[derive(Debug, Deserialize)]
pub struct FileUploadQuery {
    #[serde(rename = "type")]
    pub upload_type: UploadType,
    #[serde(default)]
    pub base_path: String,
}

#[derive(Debug, Serialize)]
pub struct AccessInfo {
    pub cognito: CognitoAccessInfo,
}

#[derive(Debug, Serialize)]
pub struct CognitoAccessInfo {
    pub cognito_user_pool_id: String,
    pub cognito_client_id: String,
    pub cognito_region: String,
}
