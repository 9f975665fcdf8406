use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Public submission: tenant and role are required, everything else lands
/// in the schemaless field bag (fullName, email, phone, custom fields,
/// resumeUrl from the upload collaborator).
#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    #[serde(rename = "tenantId")]
    pub tenant_id: Uuid,
    #[serde(rename = "roleId")]
    pub role_id: Uuid,
    #[serde(rename = "applicantId")]
    pub applicant_id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct SubmitApplicationResponse {
    pub id: Uuid,
    pub status: String,
}
