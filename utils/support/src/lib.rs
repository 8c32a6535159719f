pub mod path;
pub mod state_machine;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyStringError;

impl std::fmt::Display for EmptyStringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value must be non-empty")
    }
}

impl std::error::Error for EmptyStringError {}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    pub fn try_new(value: String) -> Result<Self, EmptyStringError> {
        if value.is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Zero-based index of a rendered page, as used on the render-target wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Ord,
    PartialOrd,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PageIndex(usize);

impl PageIndex {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub const fn number(self) -> PageNumber {
        PageNumber(self.0 + 1)
    }

    /// Index for a signed candidate, rejecting anything outside `0..page_count`.
    pub fn checked(candidate: i64, page_count: usize) -> Option<Self> {
        let raw = usize::try_from(candidate).ok()?;
        (raw < page_count).then_some(Self(raw))
    }
}

/// One-based page number, as emitted by the typesetting trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
pub struct PageNumber(usize);

impl PageNumber {
    pub const fn try_new(raw: usize) -> Option<Self> {
        if raw > 0 { Some(Self(raw)) } else { None }
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub const fn index(self) -> PageIndex {
        PageIndex(self.0 - 1)
    }
}

/// One-based line in the source document. Line 0 is never attributable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceLine(u32);

impl SourceLine {
    pub const fn try_new(raw: u32) -> Option<Self> {
        if raw > 0 { Some(Self(raw)) } else { None }
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Page-local font number assigned by the page decoder.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Ord,
    PartialOrd,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct FontNumber(u32);

impl FontNumber {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Ord,
    PartialOrd,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct GlyphId(u32);

impl GlyphId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}
