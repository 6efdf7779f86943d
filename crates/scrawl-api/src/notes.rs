// Notes, trash, sharing, and revision endpoints
//
// Thin REST wrappers -- the business rules (ownership, sharing scope)
// live server-side. Everything here rides through the refresh-and-retry
// adapter in `client.rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;

/// A note as the server returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub trashed: bool,
}

/// Fields the client controls when creating or updating a note.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A public share link for a single note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLink {
    pub id: Uuid,
    pub note_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One saved revision of a note's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: Uuid,
    pub note_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

impl ApiClient {
    // ── Notes ────────────────────────────────────────────────────────

    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        self.get_json("/api/notes", RequestOptions::default()).await
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Note, ApiError> {
        self.get_json(&format!("/api/notes/{id}"), RequestOptions::default())
            .await
    }

    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note, ApiError> {
        self.post_json("/api/notes", draft, RequestOptions::default())
            .await
    }

    pub async fn update_note(&self, id: Uuid, draft: &NoteDraft) -> Result<Note, ApiError> {
        self.put_json(&format!("/api/notes/{id}"), draft, RequestOptions::default())
            .await
    }

    /// Move a note to the trash (recoverable).
    pub async fn trash_note(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete_unit(&format!("/api/notes/{id}"), RequestOptions::default())
            .await
    }

    // ── Trash ────────────────────────────────────────────────────────

    pub async fn list_trash(&self) -> Result<Vec<Note>, ApiError> {
        self.get_json("/api/notes/trash", RequestOptions::default())
            .await
    }

    pub async fn restore_note(&self, id: Uuid) -> Result<Note, ApiError> {
        self.post_json(
            &format!("/api/notes/{id}/restore"),
            &(),
            RequestOptions::default(),
        )
        .await
    }

    /// Permanently delete a trashed note.
    pub async fn purge_note(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete_unit(&format!("/api/notes/trash/{id}"), RequestOptions::default())
            .await
    }

    // ── Sharing ──────────────────────────────────────────────────────

    pub async fn share_note(&self, id: Uuid) -> Result<SharedLink, ApiError> {
        self.post_json(
            &format!("/api/notes/{id}/share"),
            &(),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn list_shared_links(&self) -> Result<Vec<SharedLink>, ApiError> {
        self.get_json("/api/shared-links", RequestOptions::default())
            .await
    }

    pub async fn revoke_shared_link(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete_unit(&format!("/api/shared-links/{id}"), RequestOptions::default())
            .await
    }

    // ── Revisions ────────────────────────────────────────────────────

    pub async fn list_revisions(&self, note_id: Uuid) -> Result<Vec<Revision>, ApiError> {
        self.get_json(
            &format!("/api/notes/{note_id}/revisions"),
            RequestOptions::default(),
        )
        .await
    }
}
