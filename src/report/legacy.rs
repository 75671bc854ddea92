//! Reading duplication group records written by older releases.
//!
//! Every persisted group record carries (or, for the oldest layout, implies) a
//! schema version. Records are upgraded one version at a time through
//! [`MIGRATIONS`] until they reach [`CURRENT_SCHEMA_VERSION`], then decoded into
//! a [`GroupRecord`] and turned into a [`DuplicationGroup`] as if it had been
//! constructed with the stored fragment.
//!
//! Known layouts:
//!
//! | version | fragment field                          | members field            |
//! |---------|-----------------------------------------|--------------------------|
//! | 1       | `codeFragment`, string, null or absent  | `duplications`           |
//! | 2       | `fragment`, `"<unset>"` when empty      | `members`                |
//! | 3       | `code_fragment`                         | `duplications`           |
//!
//! Adding a layout means bumping [`CURRENT_SCHEMA_VERSION`] and appending one
//! entry to [`MIGRATIONS`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::report::duplication::DuplicationGroup;
use crate::report::FindingRef;

pub const CURRENT_SCHEMA_VERSION: u64 = 3;

/// Schema 2 wrote this instead of an empty fragment.
pub const V2_UNSET_SENTINEL: &str = "<unset>";

type Record = Map<String, Value>;

/// Errors from decoding a single persisted group record.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// The bytes are not JSON at all (or are truncated).
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The record is valid JSON but not an object.
    #[error("group record must be a JSON object, found {0}")]
    NotARecord(&'static str),

    /// `schema_version` is present but not a positive integer.
    #[error("invalid schema_version: {0}")]
    BadVersion(String),

    /// Written by a newer release than this one.
    #[error("unsupported group schema version {0} (newest known is {CURRENT_SCHEMA_VERSION})")]
    UnsupportedVersion(u64),

    /// A required field is missing or has the wrong type.
    #[error("malformed schema {version} group record: {reason}")]
    Malformed {
        /// Layout version the record was being read as.
        version: u64,
        /// What was wrong with it.
        reason: String,
    },
}

/// On-disk shape of a group in the current schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub schema_version: u64,
    pub code_fragment: String,
    pub duplications: Vec<FindingRef>,
}

impl GroupRecord {
    pub fn current(code_fragment: String, duplications: Vec<FindingRef>) -> Self {
        GroupRecord {
            schema_version: CURRENT_SCHEMA_VERSION,
            code_fragment,
            duplications,
        }
    }
}

/// Upgrades a record from `from` to `from + 1`.
pub struct Migration {
    pub from: u64,
    pub migrate: fn(Record) -> Result<Record, BridgeError>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        migrate: v1_to_v2,
    },
    Migration {
        from: 2,
        migrate: v2_to_v3,
    },
];

/// Decode one group record from raw bytes, whatever layout it was written in.
pub fn read_group(bytes: &[u8]) -> Result<DuplicationGroup, BridgeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    DuplicationGroup::try_from(value)
}

/// Bring a parsed record up to the current schema.
pub fn upgrade(value: Value) -> Result<GroupRecord, BridgeError> {
    let mut record = match value {
        Value::Object(record) => record,
        other => return Err(BridgeError::NotARecord(json_kind(&other))),
    };

    let mut version = schema_version(&record)?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(BridgeError::UnsupportedVersion(version));
    }

    while version < CURRENT_SCHEMA_VERSION {
        let migration = MIGRATIONS
            .iter()
            .find(|m| m.from == version)
            .ok_or(BridgeError::UnsupportedVersion(version))?;
        record = (migration.migrate)(record)?;
        debug!("Migrated group record from schema {} to {}", version, version + 1);
        version += 1;
    }

    serde_json::from_value(Value::Object(record)).map_err(|e| BridgeError::Malformed {
        version: CURRENT_SCHEMA_VERSION,
        reason: e.to_string(),
    })
}

/// Schema 1 records have no version field.
pub fn schema_version(record: &Record) -> Result<u64, BridgeError> {
    match record.get("schema_version") {
        None => Ok(1),
        Some(value) => match value.as_u64() {
            Some(version) if version >= 1 => Ok(version),
            _ => Err(BridgeError::BadVersion(value.to_string())),
        },
    }
}

impl TryFrom<Value> for DuplicationGroup {
    type Error = BridgeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        upgrade(value).map(DuplicationGroup::from)
    }
}

fn v1_to_v2(mut record: Record) -> Result<Record, BridgeError> {
    let fragment = match record.remove("codeFragment") {
        None | Some(Value::Null) => V2_UNSET_SENTINEL.to_string(),
        Some(Value::String(s)) if s.is_empty() => V2_UNSET_SENTINEL.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(malformed(
                1,
                format!("`codeFragment` must be a string, found {}", json_kind(&other)),
            ))
        }
    };
    let members = take_members(&mut record, 1, "duplications")?;

    let mut upgraded = Record::new();
    upgraded.insert("schema_version".into(), Value::from(2u64));
    upgraded.insert("fragment".into(), Value::String(fragment));
    upgraded.insert("members".into(), members);
    Ok(upgraded)
}

fn v2_to_v3(mut record: Record) -> Result<Record, BridgeError> {
    let fragment = match record.remove("fragment") {
        Some(Value::String(s)) if s == V2_UNSET_SENTINEL => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(malformed(
                2,
                format!("`fragment` must be a string, found {}", json_kind(&other)),
            ))
        }
        None => return Err(malformed(2, "missing field `fragment`".to_string())),
    };
    let members = take_members(&mut record, 2, "members")?;

    let mut upgraded = Record::new();
    upgraded.insert("schema_version".into(), Value::from(3u64));
    upgraded.insert("code_fragment".into(), Value::String(fragment));
    upgraded.insert("duplications".into(), members);
    Ok(upgraded)
}

/// Remove the member list, checking it is an array of finding indices.
fn take_members(record: &mut Record, version: u64, field: &str) -> Result<Value, BridgeError> {
    let members = record
        .remove(field)
        .ok_or_else(|| malformed(version, format!("missing field `{field}`")))?;

    let Value::Array(items) = &members else {
        return Err(malformed(
            version,
            format!("`{field}` must be an array, found {}", json_kind(&members)),
        ));
    };
    if let Some(bad) = items.iter().find(|item| item.as_u64().is_none()) {
        return Err(malformed(
            version,
            format!("`{field}` entries must be finding indices, found {bad}"),
        ));
    }
    Ok(members)
}

fn malformed(version: u64, reason: String) -> BridgeError {
    BridgeError::Malformed { version, reason }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs(indices: &[usize]) -> Vec<FindingRef> {
        indices.iter().copied().map(FindingRef::new).collect()
    }

    #[test]
    fn reads_schema_1_records() {
        let group = DuplicationGroup::try_from(json!({
            "codeFragment": "fragment",
            "duplications": [0, 1],
        }))
        .unwrap();

        assert_eq!(group, DuplicationGroup::new("fragment"));
        assert_eq!(group.duplications(), refs(&[0, 1]).as_slice());
    }

    #[test]
    fn schema_1_null_or_absent_fragment_is_empty() {
        for record in [
            json!({ "codeFragment": null, "duplications": [] }),
            json!({ "duplications": [3] }),
            json!({ "codeFragment": "", "duplications": [3] }),
        ] {
            let group = DuplicationGroup::try_from(record).unwrap();
            assert_eq!(group.code_fragment(), "");
            assert!(!group.has_code_fragment());
        }
    }

    #[test]
    fn reads_schema_2_records_and_maps_the_sentinel() {
        let group = DuplicationGroup::try_from(json!({
            "schema_version": 2,
            "fragment": V2_UNSET_SENTINEL,
            "members": [2],
        }))
        .unwrap();
        assert_eq!(group.code_fragment(), "");
        assert_eq!(group.duplications(), refs(&[2]).as_slice());

        let group = DuplicationGroup::try_from(json!({
            "schema_version": 2,
            "fragment": "fragment",
            "members": [0, 1],
        }))
        .unwrap();
        assert_eq!(group, DuplicationGroup::new("fragment"));
    }

    #[test]
    fn migrated_groups_keep_the_write_once_latch() {
        let mut group = DuplicationGroup::try_from(json!({
            "codeFragment": "fragment",
            "duplications": [],
        }))
        .unwrap();

        group.set_code_fragment("other");
        assert_eq!(group.code_fragment(), "fragment");

        let mut empty = DuplicationGroup::try_from(json!({ "duplications": [] })).unwrap();
        empty.set_code_fragment("late");
        assert_eq!(empty.code_fragment(), "late");
    }

    #[test]
    fn upgrade_is_idempotent() {
        let record = json!({ "codeFragment": "fragment", "duplications": [1, 0, 1] });

        let first = upgrade(record.clone()).unwrap();
        let second = upgrade(record).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(first.duplications, refs(&[1, 0, 1]));
    }

    #[test]
    fn current_records_round_trip() {
        let mut group = DuplicationGroup::new("fragment");
        group.add(FindingRef::new(5));
        let json = serde_json::to_vec(&group).unwrap();

        let restored = read_group(&json).unwrap();
        assert_eq!(restored, group);
        assert_eq!(restored.duplications(), group.duplications());
    }

    #[test]
    fn missing_members_are_rejected() {
        let err = upgrade(json!({ "codeFragment": "fragment" })).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed { version: 1, .. }), "{err}");

        let err = upgrade(json!({ "schema_version": 2, "fragment": "x" })).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed { version: 2, .. }), "{err}");

        let err = upgrade(json!({ "schema_version": 3, "code_fragment": "x" })).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed { version: 3, .. }), "{err}");
    }

    #[test]
    fn fragments_are_never_fabricated() {
        let err = upgrade(json!({ "schema_version": 2, "members": [] })).unwrap_err();
        assert!(err.to_string().contains("fragment"), "{err}");

        let err = upgrade(json!({ "codeFragment": 42, "duplications": [] })).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed { version: 1, .. }), "{err}");
    }

    #[test]
    fn member_entries_must_be_indices() {
        let err = upgrade(json!({ "codeFragment": "x", "duplications": ["DRY-1234"] })).unwrap_err();
        assert!(err.to_string().contains("finding indices"), "{err}");

        let err = upgrade(json!({ "codeFragment": "x", "duplications": {} })).unwrap_err();
        assert!(err.to_string().contains("must be an array"), "{err}");
    }

    #[test]
    fn version_errors() {
        assert!(matches!(
            upgrade(json!({ "schema_version": 99, "code_fragment": "", "duplications": [] })),
            Err(BridgeError::UnsupportedVersion(99))
        ));
        assert!(matches!(
            upgrade(json!({ "schema_version": 0, "duplications": [] })),
            Err(BridgeError::BadVersion(_))
        ));
        assert!(matches!(
            upgrade(json!({ "schema_version": "2", "duplications": [] })),
            Err(BridgeError::BadVersion(_))
        ));
        assert!(matches!(upgrade(json!([1, 2])), Err(BridgeError::NotARecord("an array"))));
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let err = read_group(br#"{"codeFragment":"frag"#).unwrap_err();
        assert!(matches!(err, BridgeError::Json(_)));
    }

    #[test]
    fn every_prior_version_has_a_migration() {
        for version in 1..CURRENT_SCHEMA_VERSION {
            assert!(
                MIGRATIONS.iter().any(|m| m.from == version),
                "no migration from schema {version}"
            );
        }
    }
}
