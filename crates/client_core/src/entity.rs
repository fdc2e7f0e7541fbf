use std::{fmt, hash::Hash};

use chrono::NaiveDate;
use shared::{
    domain::{DeveloperId, Gender, LevelId, HOBBY_MAX_CHARS},
    protocol::{date_birth, DeveloperPayload, DeveloperRequest, LevelPayload, LevelRequest},
};

use crate::validation::{check_name, check_required_text, ValidationErrors};

/// Display date format of the grid's birth date column.
const GRID_DATE_FORMAT: &str = "%d/%m/%Y";

/// User-facing strings of one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLabels {
    pub created: &'static str,
    pub updated: &'static str,
    pub removed: &'static str,
    pub delete_title: &'static str,
    pub delete_message: &'static str,
}

/// A record type managed by one console page.
///
/// `Context` is the auxiliary data a page fetches next to its own collection
/// (the developer roster for levels, the level catalog for developers). The
/// store hands it to [`Entity::derive`] whenever records or context change, and
/// forms validate drafts against it.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Draft: Clone + Default + fmt::Debug + Send + Sync + 'static;
    type Fields: Clone + fmt::Debug + Send + Sync + 'static;
    type Context: Clone + Default + fmt::Debug + Send + Sync + 'static;

    const LABELS: EntityLabels;

    fn id(&self) -> Self::Id;

    /// Draft pre-filled from a stored record, used by update forms.
    fn to_draft(&self) -> Self::Draft;

    fn validate(draft: &Self::Draft, context: &Self::Context)
        -> Result<Self::Fields, ValidationErrors>;

    /// Recomputes client-side fields. Server values for them are never trusted.
    fn derive(&mut self, _context: &Self::Context) {}

    fn columns() -> &'static [&'static str];

    fn cells(&self, context: &Self::Context) -> Vec<String>;
}

/// A fetched collection plus the context the same response carried, if any.
#[derive(Debug, Clone)]
pub struct Fetched<E: Entity> {
    pub records: Vec<E>,
    pub context: Option<E::Context>,
}

impl<E: Entity> Fetched<E> {
    pub fn new(records: Vec<E>) -> Self {
        Self {
            records,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<E::Context>) -> Self {
        self.context = context;
        self
    }
}

/// Anything that belongs to exactly one level.
pub trait LevelMember {
    fn level_id(&self) -> LevelId;
}

impl LevelMember for LevelId {
    fn level_id(&self) -> LevelId {
        *self
    }
}

/// Number of developers whose level reference equals `level_id`.
pub fn developer_count<D: LevelMember>(level_id: LevelId, developers: &[D]) -> usize {
    developers
        .iter()
        .filter(|developer| developer.level_id() == level_id)
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub developer_count: usize,
}

impl Level {
    /// The count starts at zero; the owning store derives it from its roster.
    pub fn from_payload(payload: LevelPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.level,
            developer_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelDraft {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFields {
    pub name: String,
}

impl LevelFields {
    pub fn request(&self) -> LevelRequest {
        LevelRequest {
            level: self.name.clone(),
        }
    }
}

/// Level reference of every developer known to the levels page, used to
/// derive per-level counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeveloperRoster(Vec<LevelId>);

impl DeveloperRoster {
    pub fn from_developers(developers: &[Developer]) -> Self {
        Self(developers.iter().map(LevelMember::level_id).collect())
    }

    /// Flattens nested `developers` arrays, counting each element under its
    /// parent. `None` when no level carried one.
    pub fn from_levels(levels: &[LevelPayload]) -> Option<Self> {
        if levels.iter().all(|level| level.developers.is_none()) {
            return None;
        }
        let members = levels
            .iter()
            .flat_map(|level| {
                let nested = level.developers.as_ref().map_or(0, Vec::len);
                std::iter::repeat(level.id).take(nested)
            })
            .collect();
        Some(Self(members))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_for(&self, level_id: LevelId) -> usize {
        developer_count(level_id, &self.0)
    }
}

impl Entity for Level {
    type Id = LevelId;
    type Draft = LevelDraft;
    type Fields = LevelFields;
    type Context = DeveloperRoster;

    const LABELS: EntityLabels = EntityLabels {
        created: "Level created!",
        updated: "Level updated!",
        removed: "Level removed!",
        delete_title: "The level will be removed!",
        delete_message: "Are you sure you want to remove it?",
    };

    fn id(&self) -> LevelId {
        self.id
    }

    fn to_draft(&self) -> LevelDraft {
        LevelDraft {
            name: self.name.clone(),
        }
    }

    fn validate(draft: &LevelDraft, _roster: &DeveloperRoster) -> Result<LevelFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = check_name(&mut errors, "level", "Level", &draft.name);
        errors.into_result(|| LevelFields { name })
    }

    fn derive(&mut self, roster: &DeveloperRoster) {
        self.developer_count = roster.count_for(self.id);
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Description", "Developers"]
    }

    fn cells(&self, _roster: &DeveloperRoster) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.developer_count.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Developer {
    pub id: DeveloperId,
    pub level_id: LevelId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub hobby: String,
}

impl LevelMember for Developer {
    fn level_id(&self) -> LevelId {
        self.level_id
    }
}

impl Developer {
    pub fn from_payload(payload: DeveloperPayload) -> Self {
        Self {
            id: payload.id,
            level_id: payload.id_level,
            name: payload.name,
            gender: payload.gender,
            date_of_birth: payload.date_birth,
            age: payload.age,
            hobby: payload.hobby,
        }
    }
}

/// Raw form input. Fields stay optional or textual until validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeveloperDraft {
    pub level_id: Option<LevelId>,
    pub name: String,
    pub gender: Option<Gender>,
    pub date_of_birth: String,
    pub age: Option<i64>,
    pub hobby: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperFields {
    pub level_id: LevelId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub hobby: String,
}

impl DeveloperFields {
    pub fn request(&self) -> DeveloperRequest {
        DeveloperRequest {
            id_level: self.level_id,
            name: self.name.clone(),
            gender: self.gender,
            date_birth: self.date_of_birth,
            age: i64::from(self.age),
            hobby: self.hobby.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOption {
    pub id: LevelId,
    pub name: String,
}

/// Levels offered by the developer form and shown in the level column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelCatalog(pub Vec<LevelOption>);

impl LevelCatalog {
    pub fn from_levels(levels: &[LevelPayload]) -> Self {
        Self(
            levels
                .iter()
                .map(|level| LevelOption {
                    id: level.id,
                    name: level.level.clone(),
                })
                .collect(),
        )
    }

    pub fn contains(&self, id: LevelId) -> bool {
        self.0.iter().any(|option| option.id == id)
    }

    pub fn label(&self, id: LevelId) -> Option<&str> {
        self.0
            .iter()
            .find(|option| option.id == id)
            .map(|option| option.name.as_str())
    }

    pub fn options(&self) -> &[LevelOption] {
        &self.0
    }
}

impl Entity for Developer {
    type Id = DeveloperId;
    type Draft = DeveloperDraft;
    type Fields = DeveloperFields;
    type Context = LevelCatalog;

    const LABELS: EntityLabels = EntityLabels {
        created: "Developer created!",
        updated: "Developer updated!",
        removed: "Developer removed!",
        delete_title: "The developer will be removed!",
        delete_message: "Are you sure you want to remove it?",
    };

    fn id(&self) -> DeveloperId {
        self.id
    }

    fn to_draft(&self) -> DeveloperDraft {
        DeveloperDraft {
            level_id: Some(self.level_id),
            name: self.name.clone(),
            gender: Some(self.gender),
            date_of_birth: self.date_of_birth.format(date_birth::FORMAT).to_string(),
            age: Some(i64::from(self.age)),
            hobby: self.hobby.clone(),
        }
    }

    fn validate(
        draft: &DeveloperDraft,
        catalog: &LevelCatalog,
    ) -> Result<DeveloperFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let level_id = match draft.level_id {
            None => {
                errors.push("level", "Level is required");
                None
            }
            Some(id) if !catalog.contains(id) => {
                errors.push("level", "Level must reference an existing level");
                None
            }
            Some(id) => Some(id),
        };

        let name = check_name(&mut errors, "name", "Name", &draft.name);

        if draft.gender.is_none() {
            errors.push("gender", "Gender is required");
        }

        let date_of_birth = if draft.date_of_birth.trim().is_empty() {
            errors.push("date_birth", "Date of birth is required");
            None
        } else {
            let parsed = date_birth::parse(&draft.date_of_birth);
            if parsed.is_none() {
                errors.push("date_birth", "Date of birth must be a date (YYYY-MM-DD)");
            }
            parsed
        };

        let age = match draft.age {
            None => {
                errors.push("age", "Age is required");
                None
            }
            Some(age) if age <= 0 => {
                errors.push("age", "Age must be a positive number");
                None
            }
            Some(age) => {
                let age = u32::try_from(age).ok();
                if age.is_none() {
                    errors.push("age", "Age is out of range");
                }
                age
            }
        };

        let hobby = check_required_text(&mut errors, "hobby", "Hobby", &draft.hobby, HOBBY_MAX_CHARS);

        match (level_id, draft.gender, date_of_birth, age) {
            (Some(level_id), Some(gender), Some(date_of_birth), Some(age)) if errors.is_empty() => {
                Ok(DeveloperFields {
                    level_id,
                    name,
                    gender,
                    date_of_birth,
                    age,
                    hobby,
                })
            }
            _ => Err(errors),
        }
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Name", "Level", "Gender", "Date of birth", "Age", "Hobby"]
    }

    fn cells(&self, catalog: &LevelCatalog) -> Vec<String> {
        let level = catalog
            .label(self.level_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.level_id));
        vec![
            self.id.to_string(),
            self.name.clone(),
            level,
            self.gender.label().to_string(),
            self.date_of_birth.format(GRID_DATE_FORMAT).to_string(),
            self.age.to_string(),
            self.hobby.clone(),
        ]
    }
}

#[cfg(test)]
#[path = "tests/entity_tests.rs"]
mod tests;
