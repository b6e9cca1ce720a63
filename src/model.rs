//! Data models for the dynamic QR service
//!
//! This module defines the stored records (QR codes, folders, users) and the
//! request/response bodies of the management API. Everything crosses the wire
//! and the JSON file backend in camelCase.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::store::Collection;

/// A value that can live in one of the record store collections
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Collection this record type is stored in
    const COLLECTION: Collection;

    /// Primary key of the record inside its collection
    fn key(&self) -> String;
}

/// A dynamic QR code: a short identifier pointing at an editable destination
///
/// Only `id` and `createdAt` are mandatory when reading stored data, so rows
/// written by older variants (no owner, no name) still load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Short identifier encoded in the QR image (e.g., "aB3dE8xY")
    pub id: String,

    /// Display label shown in the management UI
    #[serde(default)]
    pub name: Option<String>,

    /// Where scanning the code sends the visitor
    ///
    /// An empty destination never resolves.
    #[serde(default)]
    pub destination_url: String,

    /// Folder this code is filed under, `None` when unfiled
    #[serde(default)]
    pub folder_id: Option<String>,

    /// Timestamp when this QR code was generated
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last edit
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Secondary link written to NFC tags; not used for redirects
    #[serde(default)]
    pub nfc_link: Option<String>,

    /// Owner of this code
    #[serde(default)]
    pub user_id: Option<u64>,

    /// Soft-delete marker set by bulk archive
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl QrCode {
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The URL a scan should be sent to, if the code is live and has one
    pub fn redirect_target(&self) -> Option<&str> {
        if self.is_archived() || self.destination_url.is_empty() {
            return None;
        }
        Some(&self.destination_url)
    }
}

impl Record for QrCode {
    const COLLECTION: Collection = Collection::QrCodes;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A user-defined grouping of QR codes, optionally nested
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,

    /// Not unique; two folders may share a name
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub user_id: Option<u64>,

    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Record for Folder {
    const COLLECTION: Collection = Collection::Folders;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// An account allowed to sign in to the management API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,

    /// Login name, compared case-insensitively
    pub email: String,

    /// Argon2 PHC string; never leaves the server
    pub password_hash: String,

    pub role: Role,

    /// Maximum number of live QR codes this user may own
    #[serde(rename = "limit")]
    pub qr_limit: u32,

    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may see and edit a record owned by `owner`
    ///
    /// Records without an owner predate multi-user support and are shared.
    pub fn can_access(&self, owner: Option<u64>) -> bool {
        self.is_admin() || owner.is_none() || owner == Some(self.id)
    }
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Public view of a user, without the password hash
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub email: String,
    pub role: Role,
    pub limit: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            limit: user.qr_limit,
            created_at: user.created_at,
        }
    }
}

/// A QR code as returned by the API, with its full short link
///
/// # Example
/// ```json
/// {
///   "id": "aB3dE8xY",
///   "destinationUrl": "https://example.com/page",
///   "createdAt": "2026-01-17T13:40:00Z",
///   "shortUrl": "http://localhost:8080/dynamiqr/aB3dE8xY"
/// }
/// ```
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QrView {
    #[serde(flatten)]
    pub qr: QrCode,
    pub short_url: String,
}

impl QrView {
    pub fn new(qr: QrCode, public_base_url: &str) -> Self {
        let short_url = format!("{}/dynamiqr/{}", public_base_url.trim_end_matches('/'), qr.id);
        Self { qr, short_url }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(value))`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request payload for generating a new QR code
///
/// # Example
/// ```json
/// {
///   "destinationUrl": "https://example.com/page",
///   "name": "Flyer",
///   "folderId": "6f1c...",
///   "nfcLink": "https://example.com/nfc"
/// }
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateQrRequest {
    pub destination_url: Option<String>,
    pub name: Option<String>,
    pub folder_id: Option<String>,
    pub nfc_link: Option<String>,
}

/// Partial update of a QR code; omitted fields are left untouched
///
/// `folderId`, `name` and `nfcLink` accept `null` (or `""`) to clear them.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQrRequest {
    pub destination_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub folder_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub nfc_link: Option<Option<String>>,
}

/// Query parameters for listing QR codes
///
/// Query string: `?folderId=6f1c...&includeArchived=true`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QrListParams {
    pub folder_id: Option<String>,
    pub include_archived: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ArchiveRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct ArchiveResponse {
    pub archived: usize,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RenameFolderRequest {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Request payload for creating a user (admin only)
///
/// `role` stays a string so an unknown role is a validation error rather
/// than a body rejection.
#[derive(Deserialize, Debug, Default)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateUserRequest {
    pub id: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DeleteUserParams {
    pub id: Option<String>,
}
