//! Duplication groups: one duplicated code fragment plus every finding that
//! reports an occurrence of it.
//!
//! A group does not own its findings. It stores [`FindingRef`] handles into the
//! [`ScanReport`](crate::report::ScanReport) that owns both the findings and the
//! groups, and each member finding points back at the group through its
//! side-channel slot. Neither side frees the other.
//!
//! # Mutation discipline
//! Groups are built by a single writer (the deduplication pass) and are then
//! shared read-only. Every mutating method takes `&mut self`, so there is no
//! internal locking; wrap the owning report in a lock if several threads must
//! write to it.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::report::legacy::GroupRecord;
use crate::report::FindingRef;

/// Write-once latch around the code fragment.
///
/// `Unset -> Committed(v)` happens on the first non-empty write;
/// `Committed(v)` ignores every later write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum CodeFragment {
    #[default]
    Unset,
    Committed(String),
}

impl CodeFragment {
    fn commit(&mut self, value: &str) {
        if matches!(self, CodeFragment::Unset) && !value.is_empty() {
            *self = CodeFragment::Committed(value.to_string());
        }
    }

    fn as_str(&self) -> &str {
        match self {
            CodeFragment::Unset => "",
            CodeFragment::Committed(value) => value,
        }
    }
}

/// One duplication cluster.
///
/// Equality and hashing only look at the code fragment: two groups loaded from
/// different scans are the same duplication if they carry the same text, even
/// when their membership differs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "GroupRecord", try_from = "serde_json::Value")]
pub struct DuplicationGroup {
    fragment: CodeFragment,
    duplications: Vec<FindingRef>,
}

impl DuplicationGroup {
    /// Create a group whose fragment is already committed. An empty `fragment`
    /// leaves the latch open, same as [`DuplicationGroup::default`].
    pub fn new(fragment: impl AsRef<str>) -> Self {
        let mut group = Self::default();
        group.set_code_fragment(fragment);
        group
    }

    /// The duplicated text, or `""` if none has been committed yet.
    pub fn code_fragment(&self) -> &str {
        self.fragment.as_str()
    }

    pub fn has_code_fragment(&self) -> bool {
        matches!(self.fragment, CodeFragment::Committed(_))
    }

    /// Commit `value` as the fragment unless one is already committed, in which
    /// case the call does nothing.
    pub fn set_code_fragment(&mut self, value: impl AsRef<str>) {
        self.fragment.commit(value.as_ref());
    }

    /// Append a member. Repeats are kept.
    pub fn add(&mut self, finding: FindingRef) {
        self.duplications.push(finding);
    }

    /// Members in insertion order.
    pub fn duplications(&self) -> &[FindingRef] {
        &self.duplications
    }

    pub fn len(&self) -> usize {
        self.duplications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duplications.is_empty()
    }
}

impl PartialEq for DuplicationGroup {
    fn eq(&self, other: &Self) -> bool {
        self.code_fragment() == other.code_fragment()
    }
}

impl Eq for DuplicationGroup {}

impl Hash for DuplicationGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code_fragment().hash(state);
    }
}

impl From<DuplicationGroup> for GroupRecord {
    fn from(group: DuplicationGroup) -> Self {
        GroupRecord::current(group.code_fragment().to_string(), group.duplications)
    }
}

impl From<GroupRecord> for DuplicationGroup {
    fn from(record: GroupRecord) -> Self {
        let mut group = DuplicationGroup::new(&record.code_fragment);
        for finding in record.duplications {
            group.add(finding);
        }
        group
    }
}
