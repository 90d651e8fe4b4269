use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::enums::{MergeMode, ValueOrigin};
use super::ModelError;

/// Version shown until the protocol or the user supplies one.
pub const DEFAULT_VERSION: &str = "DRAFT";

/// One metadata slot of a Randomization Plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    KorTitle,
    EngTitle,
    ProtocolNo,
    Version,
    Phase,
    Site,
    Pi,
    Sponsor,
    Arms,
    Sequences,
    NPerArm,
}

impl FieldKey {
    pub const ALL: [FieldKey; 11] = [
        Self::KorTitle,
        Self::EngTitle,
        Self::ProtocolNo,
        Self::Version,
        Self::Phase,
        Self::Site,
        Self::Pi,
        Self::Sponsor,
        Self::Arms,
        Self::Sequences,
        Self::NPerArm,
    ];

    /// Session-facing name (`protocolNo`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::KorTitle => "korTitle",
            Self::EngTitle => "engTitle",
            Self::ProtocolNo => "protocolNo",
            Self::Version => "version",
            Self::Phase => "phase",
            Self::Site => "site",
            Self::Pi => "pi",
            Self::Sponsor => "sponsor",
            Self::Arms => "arms",
            Self::Sequences => "sequences",
            Self::NPerArm => "nPerArm",
        }
    }

    /// Canonical template token (`PROTOCOL_NO`).
    pub fn token(&self) -> &'static str {
        match self {
            Self::KorTitle => "KOR_TITLE",
            Self::EngTitle => "ENG_TITLE",
            Self::ProtocolNo => "PROTOCOL_NO",
            Self::Version => "VERSION",
            Self::Phase => "PHASE",
            Self::Site => "SITE",
            Self::Pi => "PI",
            Self::Sponsor => "SPONSOR",
            Self::Arms => "ARMS",
            Self::Sequences => "SEQUENCES",
            Self::NPerArm => "N_PER_ARM",
        }
    }

    /// Human-readable labels that older templates use as token names.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::KorTitle => &["국문 시험제목", "시험제목", "국문제목"],
            Self::EngTitle => &["영문 시험제목", "영문제목", "Title"],
            Self::ProtocolNo => &[
                "시험계획서 번호 (Protocol No.)",
                "시험계획서 번호",
                "Protocol No.",
                "Protocol No",
            ],
            Self::Version => &["버전 (Version)", "버전", "Version"],
            Self::Phase => &["시험단계 (Phase)", "시험단계", "Phase"],
            Self::Site => &["임상시험실시기관 (Site)", "임상시험실시기관", "Site"],
            Self::Pi => &["시험책임자 (PI)", "시험책임자", "Principal Investigator"],
            Self::Sponsor => &["임상시험의뢰자 (Sponsor)", "임상시험의뢰자", "의뢰자", "Sponsor"],
            Self::Arms => &["Arms", "투여군"],
            Self::Sequences => &["Sequences", "순서군"],
            Self::NPerArm => &["N per arm", "군당 대상자수"],
        }
    }

    /// Resolve a session name, canonical token or alias label.
    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|key| {
            key.name() == name || key.token() == name || key.aliases().contains(&name)
        })
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| ModelError::UnknownField(s.to_string()))
    }
}

/// Current value of one field plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub value: String,
    pub origin: ValueOrigin,
}

/// Per-field view returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSnapshot {
    pub key: FieldKey,
    pub token: &'static str,
    pub value: String,
    pub origin: ValueOrigin,
}

/// The editable metadata of one session.
///
/// Every key is always present and always a string; "absent" is spelled as
/// the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    entries: BTreeMap<FieldKey, FieldEntry>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMap {
    pub fn new() -> Self {
        let entries = FieldKey::ALL
            .into_iter()
            .map(|key| {
                let value = match key {
                    FieldKey::Version => DEFAULT_VERSION.to_string(),
                    _ => String::new(),
                };
                (
                    key,
                    FieldEntry {
                        value,
                        origin: ValueOrigin::Default,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: FieldKey) -> &str {
        self.entries
            .get(&key)
            .map(|e| e.value.as_str())
            .unwrap_or_default()
    }

    pub fn origin(&self, key: FieldKey) -> ValueOrigin {
        self.entries
            .get(&key)
            .map(|e| e.origin)
            .unwrap_or(ValueOrigin::Default)
    }

    /// Apply a user edit. Always wins, including an explicit empty string.
    pub fn set_user(&mut self, key: FieldKey, value: impl Into<String>) {
        self.entries.insert(
            key,
            FieldEntry {
                value: value.into(),
                origin: ValueOrigin::User,
            },
        );
    }

    /// Whether an automatic pass may write `key` under `mode`.
    /// `Overwrite` replaces user edits too; only `FillEmpty` protects them.
    pub fn accepts_extraction(&self, key: FieldKey, mode: MergeMode) -> bool {
        match mode {
            MergeMode::Overwrite => true,
            MergeMode::FillEmpty => {
                self.get(key).trim().is_empty() || self.origin(key) == ValueOrigin::Default
            }
        }
    }

    /// Merge automatically extracted values. Empty values never overwrite
    /// anything. Returns the keys whose value actually changed.
    pub fn merge_extracted<'a>(
        &mut self,
        values: impl IntoIterator<Item = (FieldKey, &'a str)>,
        mode: MergeMode,
    ) -> Vec<FieldKey> {
        let mut changed = Vec::new();
        for (key, value) in values {
            let value = value.trim();
            if value.is_empty() || !self.accepts_extraction(key, mode) {
                continue;
            }
            if self.get(key) != value {
                changed.push(key);
            }
            self.entries.insert(
                key,
                FieldEntry {
                    value: value.to_string(),
                    origin: ValueOrigin::Extracted,
                },
            );
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.entries.iter().map(|(k, e)| (*k, e.value.as_str()))
    }

    pub fn snapshot(&self) -> Vec<FieldSnapshot> {
        self.entries
            .iter()
            .map(|(key, entry)| FieldSnapshot {
                key: *key,
                token: key.token(),
                value: entry.value.clone(),
                origin: entry.origin,
            })
            .collect()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(k, v)| (k.name(), v)))
    }
}
