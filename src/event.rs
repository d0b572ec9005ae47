//! Typed events decoded from the `gerrit stream-events` output.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::object::{array_field, object_field, string_field};
use crate::object::{Account, Approval, Change, PatchSet, RefUpdate};

/// A new patch set was uploaded to a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchsetCreatedEvent {
    pub change: Change,
    pub patch_set: PatchSet,
    pub uploader: Account,
}

impl PatchsetCreatedEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<PatchsetCreatedEvent, DecodeError> {
        Ok(PatchsetCreatedEvent {
            change: Change::decode(object_field(map, "change", "change")?)?,
            patch_set: PatchSet::decode(object_field(map, "patchSet", "patch_set")?)?,
            uploader: Account::decode(object_field(map, "uploader", "uploader")?)?,
        })
    }
}

/// A change was abandoned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAbandonedEvent {
    pub change: Change,
    pub abandoner: Account,
    pub reason: String,
}

impl ChangeAbandonedEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<ChangeAbandonedEvent, DecodeError> {
        Ok(ChangeAbandonedEvent {
            change: Change::decode(object_field(map, "change", "change")?)?,
            abandoner: Account::decode(object_field(map, "abandoner", "abandoner")?)?,
            reason: string_field(map, "reason", "reason")?,
        })
    }
}

/// A previously abandoned change was restored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRestoredEvent {
    pub change: Change,
    pub restorer: Account,
    pub reason: String,
}

impl ChangeRestoredEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<ChangeRestoredEvent, DecodeError> {
        Ok(ChangeRestoredEvent {
            change: Change::decode(object_field(map, "change", "change")?)?,
            restorer: Account::decode(object_field(map, "restorer", "restorer")?)?,
            reason: string_field(map, "reason", "reason")?,
        })
    }
}

/// A change was submitted and merged into the target branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMergedEvent {
    pub change: Change,
    pub patch_set: PatchSet,
    pub submitter: Account,
}

impl ChangeMergedEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<ChangeMergedEvent, DecodeError> {
        Ok(ChangeMergedEvent {
            change: Change::decode(object_field(map, "change", "change")?)?,
            patch_set: PatchSet::decode(object_field(map, "patchSet", "patch_set")?)?,
            submitter: Account::decode(object_field(map, "submitter", "submitter")?)?,
        })
    }
}

/// A reference was updated, e.g. by a direct push or a submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdatedEvent {
    pub ref_update: RefUpdate,
}

impl RefUpdatedEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<RefUpdatedEvent, DecodeError> {
        Ok(RefUpdatedEvent {
            ref_update: RefUpdate::decode(object_field(map, "refUpdate", "ref_update")?)?,
        })
    }
}

/// Somebody reviewed a patch set and published their comments.
///
/// `comment` is the cover message; `approvals` carries the scores in wire
/// order, which is not guaranteed to be meaningful.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAddedEvent {
    pub approvals: Vec<Approval>,
    pub comment: String,
    pub change: Change,
    pub author: Account,
    pub patch_set: PatchSet,
}

impl CommentAddedEvent {
    pub fn decode(map: &Map<String, Value>) -> Result<CommentAddedEvent, DecodeError> {
        Ok(CommentAddedEvent {
            approvals: Approval::decode_list(array_field(map, "approvals", "approvals")?)?,
            comment: string_field(map, "comment", "comment")?,
            change: Change::decode(object_field(map, "change", "change")?)?,
            author: Account::decode(object_field(map, "author", "author")?)?,
            patch_set: PatchSet::decode(object_field(map, "patchSet", "patch_set")?)?,
        })
    }
}

/// One event as emitted by the `gerrit stream-events` command, tagged by its
/// `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "patchset-created")]
    PatchsetCreated(PatchsetCreatedEvent),
    #[serde(rename = "change-abandoned")]
    ChangeAbandoned(ChangeAbandonedEvent),
    #[serde(rename = "change-restored")]
    ChangeRestored(ChangeRestoredEvent),
    #[serde(rename = "change-merged")]
    ChangeMerged(ChangeMergedEvent),
    #[serde(rename = "comment-added")]
    CommentAdded(CommentAddedEvent),
    #[serde(rename = "ref-updated")]
    RefUpdated(RefUpdatedEvent),
}

impl Event {
    /// Decodes a single line of stream output into a typed event.
    ///
    /// This is the only entry point: it parses the line as a JSON object,
    /// reads the `"type"` discriminant and hands the map to the matching
    /// event decoder.
    pub fn decode(raw: &str) -> Result<Event, DecodeError> {
        let map: Map<String, Value> = serde_json::from_str(raw)?;
        let kind = string_field(&map, "type", "type")?;
        match kind.as_str() {
            "patchset-created" => Ok(Event::PatchsetCreated(PatchsetCreatedEvent::decode(&map)?)),
            "change-abandoned" => Ok(Event::ChangeAbandoned(ChangeAbandonedEvent::decode(&map)?)),
            "change-restored" => Ok(Event::ChangeRestored(ChangeRestoredEvent::decode(&map)?)),
            "change-merged" => Ok(Event::ChangeMerged(ChangeMergedEvent::decode(&map)?)),
            "comment-added" => Ok(Event::CommentAdded(CommentAddedEvent::decode(&map)?)),
            "ref-updated" => Ok(Event::RefUpdated(RefUpdatedEvent::decode(&map)?)),
            _ => Err(DecodeError::UnknownEventKind(kind)),
        }
    }

    /// The wire discriminant of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PatchsetCreated(_) => "patchset-created",
            Event::ChangeAbandoned(_) => "change-abandoned",
            Event::ChangeRestored(_) => "change-restored",
            Event::ChangeMerged(_) => "change-merged",
            Event::CommentAdded(_) => "comment-added",
            Event::RefUpdated(_) => "ref-updated",
        }
    }
}
