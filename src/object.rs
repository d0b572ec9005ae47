//! The objects Gerrit events are composed of.
//!
//! Each object decodes from the keyed map it appears as on the wire. Decoding
//! reads a fixed set of required keys and validates every field once, at
//! construction; unknown keys are ignored.

use std::convert::TryFrom;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;

fn required<'a>(map: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, DecodeError> {
    map.get(key).ok_or(DecodeError::MissingField(key))
}

pub(crate) fn string_field(
    map: &Map<String, Value>,
    key: &'static str,
    field: &'static str,
) -> Result<String, DecodeError> {
    match required(map, key)? {
        Value::String(value) => Ok(value.clone()),
        _ => Err(DecodeError::InvalidFieldType {
            field,
            expected: "a string",
        }),
    }
}

pub(crate) fn integer_field(
    map: &Map<String, Value>,
    key: &'static str,
    field: &'static str,
) -> Result<i64, DecodeError> {
    let invalid = DecodeError::InvalidFieldType {
        field,
        expected: "an integer",
    };
    match required(map, key)? {
        Value::Number(value) => value.as_i64().ok_or(invalid),
        // Old Gerrit emits numeric fields as strings; coerce before failing.
        Value::String(value) => value.parse().map_err(|_| invalid),
        _ => Err(invalid),
    }
}

pub(crate) fn unsigned_field(
    map: &Map<String, Value>,
    key: &'static str,
    field: &'static str,
) -> Result<u32, DecodeError> {
    u32::try_from(integer_field(map, key, field)?).map_err(|_| DecodeError::InvalidFieldType {
        field,
        expected: "an unsigned integer",
    })
}

pub(crate) fn object_field<'a>(
    map: &'a Map<String, Value>,
    key: &'static str,
    field: &'static str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    match required(map, key)? {
        Value::Object(value) => Ok(value),
        _ => Err(DecodeError::InvalidFieldType {
            field,
            expected: "an object",
        }),
    }
}

pub(crate) fn array_field<'a>(
    map: &'a Map<String, Value>,
    key: &'static str,
    field: &'static str,
) -> Result<&'a [Value], DecodeError> {
    match required(map, key)? {
        Value::Array(value) => Ok(value),
        _ => Err(DecodeError::InvalidFieldType {
            field,
            expected: "a list",
        }),
    }
}

/// Any person appearing in an event: an uploader, an owner, an abandoner and
/// so on are all accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub name: String,
    pub email: String,
}

impl Account {
    pub fn decode(map: &Map<String, Value>) -> Result<Account, DecodeError> {
        Ok(Account {
            name: string_field(map, "name", "name")?,
            email: string_field(map, "email", "email")?,
        })
    }
}

/// A change under review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub project: String,
    pub branch: String,
    #[serde(rename = "id")]
    pub change_id: String,
    pub number: u32,
    pub subject: String,
    pub owner: Account,
    pub url: String,
}

impl Change {
    pub fn decode(map: &Map<String, Value>) -> Result<Change, DecodeError> {
        Ok(Change {
            project: string_field(map, "project", "project")?,
            branch: string_field(map, "branch", "branch")?,
            change_id: string_field(map, "id", "change_id")?,
            number: unsigned_field(map, "number", "number")?,
            subject: string_field(map, "subject", "subject")?,
            owner: Account::decode(object_field(map, "owner", "owner")?)?,
            url: string_field(map, "url", "url")?,
        })
    }
}

/// One iteration of a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    pub number: u32,
    pub revision: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub uploader: Account,
    /// Creation time in epoch seconds.
    pub created_on: u32,
}

impl PatchSet {
    pub fn decode(map: &Map<String, Value>) -> Result<PatchSet, DecodeError> {
        Ok(PatchSet {
            number: unsigned_field(map, "number", "number")?,
            revision: string_field(map, "revision", "revision")?,
            reference: string_field(map, "ref", "ref")?,
            uploader: Account::decode(object_field(map, "uploader", "uploader")?)?,
            created_on: unsigned_field(map, "createdOn", "created_on")?,
        })
    }
}

/// A git reference that moved, e.g. by a direct push or a submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdate {
    pub old_rev: String,
    pub new_rev: String,
    pub ref_name: String,
    pub project: String,
}

impl RefUpdate {
    pub fn decode(map: &Map<String, Value>) -> Result<RefUpdate, DecodeError> {
        Ok(RefUpdate {
            old_rev: string_field(map, "oldRev", "old_rev")?,
            new_rev: string_field(map, "newRev", "new_rev")?,
            ref_name: string_field(map, "refName", "ref_name")?,
            project: string_field(map, "project", "project")?,
        })
    }
}

/// The review categories an approval can score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalKind {
    #[serde(rename = "CRVW")]
    CodeReview,
    #[serde(rename = "VRIF")]
    Verified,
}

impl ApprovalKind {
    pub fn from_wire(value: &str) -> Option<ApprovalKind> {
        match value {
            "CRVW" => Some(ApprovalKind::CodeReview),
            "VRIF" => Some(ApprovalKind::Verified),
            _ => None,
        }
    }
}

/// A single score given in a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approval {
    pub value: i32,
    #[serde(rename = "type")]
    pub kind: ApprovalKind,
    pub description: String,
}

impl Approval {
    pub fn decode(map: &Map<String, Value>) -> Result<Approval, DecodeError> {
        let value = integer_field(map, "value", "value").and_then(|value| {
            i32::try_from(value).map_err(|_| DecodeError::InvalidFieldType {
                field: "value",
                expected: "an integer",
            })
        })?;
        let kind = string_field(map, "type", "type")?;
        let kind = ApprovalKind::from_wire(&kind).ok_or(DecodeError::InvalidFieldType {
            field: "type",
            expected: "an approval kind",
        })?;
        Ok(Approval {
            value,
            kind,
            description: string_field(map, "description", "description")?,
        })
    }

    /// Decodes a wire list of approvals, preserving order. The first element
    /// that fails to decode aborts the whole list.
    pub fn decode_list(values: &[Value]) -> Result<Vec<Approval>, DecodeError> {
        values
            .iter()
            .map(|value| match value {
                Value::Object(map) => Approval::decode(map),
                _ => Err(DecodeError::InvalidFieldType {
                    field: "approvals",
                    expected: "a list of objects",
                }),
            })
            .collect()
    }
}
