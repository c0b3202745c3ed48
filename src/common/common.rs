// SPDX-License-Identifier: GPL-2.0-or-later

mod bbox;
mod hoi;

pub use bbox::*;
pub use hoi::*;

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, num::NonZeroU32, ops::Deref, str::FromStr, sync::Arc};
use thiserror::Error;

#[macro_export]
macro_rules! impl_deserialize_try_from_and_display {
    ($type:ident) => {
        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                String::deserialize(deserializer)?
                    .try_into()
                    .map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

pub const IMAGE_ID_MAX_LENGTH: usize = 64;

/// Dataset-global image identifier e.g. "HICO_train2015_00000001".
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImageId(String);
impl_deserialize_try_from_and_display!(ImageId);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageIdError {
    #[error("empty string")]
    Empty,

    #[error("bad char: '{0}'")]
    BadChar(char),

    #[error("max length {IMAGE_ID_MAX_LENGTH}: {0}")]
    TooLong(String),
}

impl TryFrom<String> for ImageId {
    type Error = ParseImageIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        use ParseImageIdError::*;
        if s.is_empty() {
            return Err(Empty);
        }
        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                return Err(BadChar(c));
            }
        }
        if s.len() > IMAGE_ID_MAX_LENGTH {
            return Err(TooLong(s));
        }
        Ok(Self(s))
    }
}

impl FromStr for ImageId {
    type Err = ParseImageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

impl Deref for ImageId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Dense 1-based interaction category identifier.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CategoryId(NonZeroU32);

impl CategoryId {
    #[must_use]
    pub fn new(v: u32) -> Option<Self> {
        Some(Self(NonZeroU32::new(v)?))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Zero-based offset into catalog-ordered tables.
    #[must_use]
    pub fn index(self) -> usize {
        usize::try_from(self.0.get() - 1).expect("u32 should fit usize")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCategoryIdError {
    #[error("category id cannot be zero")]
    Zero,

    #[error("bad category id: '{0}'")]
    NotANumber(String),
}

impl TryFrom<u32> for CategoryId {
    type Error = ParseCategoryIdError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::new(v).ok_or(ParseCategoryIdError::Zero)
    }
}

impl From<CategoryId> for u32 {
    fn from(v: CategoryId) -> Self {
        v.get()
    }
}

// Catalog files store ids as zero-padded digit strings e.g. "001".
impl FromStr for CategoryId {
    type Err = ParseCategoryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ParseCategoryIdError::*;
        let v: u32 = s.parse().map_err(|_| NotANumber(s.to_owned()))?;
        Self::new(v).ok_or(Zero)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

const INTERACTION_WORD_MAX_LENGTH: usize = 64;

fn parse_interaction_word(s: &str) -> Result<(), ParseInteractionWordError> {
    use ParseInteractionWordError::*;
    if s.is_empty() {
        return Err(Empty);
    }
    for c in s.chars() {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_' {
            return Err(BadChar(c));
        }
    }
    if s.len() > INTERACTION_WORD_MAX_LENGTH {
        return Err(TooLong(s.to_owned()));
    }
    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseInteractionWordError {
    #[error("empty string")]
    Empty,

    #[error("bad char: '{0}'")]
    BadChar(char),

    #[error("max length {INTERACTION_WORD_MAX_LENGTH}: {0}")]
    TooLong(String),
}

/// Interaction verb e.g. "ride" or "no_interaction".
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize)]
pub struct Verb(String);
impl_deserialize_try_from_and_display!(Verb);

impl TryFrom<String> for Verb {
    type Error = ParseInteractionWordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_interaction_word(&s)?;
        Ok(Self(s))
    }
}

impl FromStr for Verb {
    type Err = ParseInteractionWordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

/// Interaction object class e.g. "bicycle" or "sports_ball".
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize)]
pub struct ObjectClass(String);
impl_deserialize_try_from_and_display!(ObjectClass);

impl TryFrom<String> for ObjectClass {
    type Error = ParseInteractionWordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_interaction_word(&s)?;
        Ok(Self(s))
    }
}

impl FromStr for ObjectClass {
    type Err = ParseInteractionWordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

pub const SPLIT_NAME_MAX_LENGTH: usize = 16;

/// Dataset split e.g. "train" or "test".
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize)]
pub struct SplitName(String);
impl_deserialize_try_from_and_display!(SplitName);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSplitNameError {
    #[error("empty string")]
    Empty,

    #[error("bad char: '{0}'")]
    BadChar(char),

    #[error("max length {SPLIT_NAME_MAX_LENGTH}: {0}")]
    TooLong(String),
}

impl TryFrom<String> for SplitName {
    type Error = ParseSplitNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        use ParseSplitNameError::*;
        if s.is_empty() {
            return Err(Empty);
        }
        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                return Err(BadChar(c));
            }
        }
        if s.len() > SPLIT_NAME_MAX_LENGTH {
            return Err(TooLong(s));
        }
        Ok(Self(s))
    }
}

impl FromStr for SplitName {
    type Err = ParseSplitNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

impl Deref for SplitName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub type ArcLogger = Arc<dyn ILogger + Send + Sync>;

pub trait ILogger {
    /// Send log.
    fn log(&self, _: LogEntry) {}
}

/// Log entry. See `EntryWithTime`.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub source: LogSource,
    pub image_id: Option<ImageId>,
    pub message: LogMessage,
}

impl LogEntry {
    #[allow(clippy::needless_pass_by_value)]
    #[must_use]
    pub fn new(
        level: LogLevel,
        source: &'static str,
        image_id: Option<ImageId>,
        message: String,
    ) -> Self {
        let source: LogSource = source
            .to_owned()
            .try_into()
            .expect("source should be valid");
        let message = match LogMessage::try_from(message) {
            Ok(v) => v,
            Err(e) => LogMessage::try_from(format!("bad message: {e}"))
                .expect("error message should be a valid log message"),
        };
        Self {
            level,
            source,
            image_id,
            message,
        }
    }
}

/// Severity of the log message.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Something requires attention.
    Error,

    /// Something may require attention.
    Warning,

    /// Standard information.
    Info,

    /// Verbose debugging information.
    Debug,
}

#[derive(Debug, Error)]
pub enum ParseLogLevelError {
    #[error("unknown log level: '{0}'")]
    UnknownLevel(String),
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(ParseLogLevelError::UnknownLevel(s.to_owned())),
        }
    }
}

pub const LOG_SOURCE_MAX_LENGTH: usize = 8;

#[repr(transparent)]
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub struct LogSource(Cow<'static, str>);
impl_deserialize_try_from_and_display!(LogSource);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLogSourceError {
    #[error("empty string")]
    Empty,

    #[error("invalid characters: '{0}'")]
    InvalidChars(String),

    #[error("too long")]
    TooLong,
}

impl TryFrom<String> for LogSource {
    type Error = ParseLogSourceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        use ParseLogSourceError::*;
        if s.is_empty() {
            return Err(Empty);
        }
        if !s.chars().all(char::is_alphanumeric) {
            return Err(InvalidChars(s));
        }
        if s.len() > LOG_SOURCE_MAX_LENGTH {
            return Err(TooLong);
        }
        Ok(Self(Cow::Owned(s)))
    }
}

impl FromStr for LogSource {
    type Err = ParseLogSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

impl Deref for LogSource {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[repr(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogMessage(String);
impl_deserialize_try_from_and_display!(LogMessage);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLogMessageError {
    #[error("empty string")]
    Empty,

    #[error("too long")]
    TooLong,
}

const LOG_MESSAGE_MAX_LENGTH: usize = 1024 * 4;

impl TryFrom<String> for LogMessage {
    type Error = ParseLogMessageError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(ParseLogMessageError::Empty);
        }
        if s.len() > LOG_MESSAGE_MAX_LENGTH {
            return Err(ParseLogMessageError::TooLong);
        }
        Ok(Self(s))
    }
}

impl FromStr for LogMessage {
    type Err = ParseLogMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

impl Deref for LogMessage {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
