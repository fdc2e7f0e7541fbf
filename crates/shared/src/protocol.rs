use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DeveloperId, Gender, LevelId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRequest {
    pub level: String,
}

/// A level as the backend returns it. The backend embeds full
/// [`DeveloperPayload`]s; readers only rely on [`NestedDeveloper`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPayload<D = NestedDeveloper> {
    pub id: LevelId,
    #[serde(alias = "name")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developers: Option<Vec<D>>,
}

/// Developer embedded under a level. Everything but membership is ignored,
/// and the parent level is authoritative over `id_level`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedDeveloper {
    #[serde(default)]
    pub id: Option<DeveloperId>,
    #[serde(default)]
    pub id_level: Option<LevelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperRequest {
    pub id_level: LevelId,
    pub name: String,
    pub gender: Gender,
    #[serde(with = "date_birth")]
    pub date_birth: NaiveDate,
    pub age: i64,
    pub hobby: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperPayload {
    pub id: DeveloperId,
    pub id_level: LevelId,
    pub name: String,
    pub gender: Gender,
    #[serde(with = "date_birth")]
    pub date_birth: NaiveDate,
    pub age: u32,
    pub hobby: String,
}

/// Collection bodies as backends have shaped them: a bare array, a
/// `{ "data": [...] }` wrapper, or a `[rows, total]` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
    Counted(Vec<T>, u64),
}

impl<T> Collection<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Collection::Bare(rows) | Collection::Wrapped { data: rows } => rows,
            Collection::Counted(rows, _) => rows,
        }
    }
}

/// `date_birth` goes out as `YYYY-MM-DD`; on the way in an RFC 3339 timestamp
/// is also accepted and read as its UTC calendar date.
pub mod date_birth {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date_birth '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT).ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        })
    }
}
