use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use shared::{
    domain::{char_len, DeveloperId, LevelId, HOBBY_MAX_CHARS, NAME_MAX_CHARS, NAME_MIN_CHARS},
    error::ApiError,
    protocol::{DeveloperPayload, DeveloperRequest, LevelPayload, LevelRequest},
};
use storage::{DeveloperFields, Storage, StoredDeveloper, StoredLevel};
use tracing::info;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.storage.health_check().await.map_err(internal)
}

/// Levels with their developers embedded, so list views can derive counts
/// without a second request.
pub async fn list_levels(
    ctx: &ApiContext,
) -> Result<Vec<LevelPayload<DeveloperPayload>>, ApiError> {
    let levels = ctx.storage.list_levels().await.map_err(internal)?;
    let developers = ctx.storage.list_developers().await.map_err(internal)?;

    let mut by_level: HashMap<LevelId, Vec<DeveloperPayload>> = HashMap::new();
    for developer in developers {
        by_level
            .entry(developer.level_id)
            .or_default()
            .push(developer_payload(developer));
    }

    Ok(levels
        .into_iter()
        .map(|level| {
            let developers = by_level.remove(&level.level_id).unwrap_or_default();
            LevelPayload {
                developers: Some(developers),
                ..level_payload(level)
            }
        })
        .collect())
}

pub async fn create_level(ctx: &ApiContext, req: LevelRequest) -> Result<LevelPayload, ApiError> {
    let name = validate_level_name(&req.level)?;
    let level = ctx.storage.create_level(&name).await.map_err(internal)?;
    info!(level_id = level.level_id.0, "level created");
    Ok(level_payload(level))
}

pub async fn update_level(
    ctx: &ApiContext,
    level_id: LevelId,
    req: LevelRequest,
) -> Result<LevelPayload, ApiError> {
    let name = validate_level_name(&req.level)?;
    let level = ctx
        .storage
        .update_level(level_id, &name)
        .await
        .map_err(internal)?
        .ok_or_else(|| level_not_found(level_id))?;
    info!(level_id = level_id.0, "level updated");
    Ok(level_payload(level))
}

pub async fn delete_level(ctx: &ApiContext, level_id: LevelId) -> Result<(), ApiError> {
    ctx.storage
        .level(level_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| level_not_found(level_id))?;

    let referencing = ctx
        .storage
        .count_developers_for_level(level_id)
        .await
        .map_err(internal)?;
    if referencing > 0 {
        return Err(ApiError::conflict(format!(
            "level {level_id} still has {referencing} developer(s)"
        )));
    }

    if !ctx.storage.delete_level(level_id).await.map_err(internal)? {
        return Err(level_not_found(level_id));
    }
    info!(level_id = level_id.0, "level deleted");
    Ok(())
}

pub async fn list_developers(ctx: &ApiContext) -> Result<Vec<DeveloperPayload>, ApiError> {
    let developers = ctx.storage.list_developers().await.map_err(internal)?;
    Ok(developers.into_iter().map(developer_payload).collect())
}

pub async fn create_developer(
    ctx: &ApiContext,
    req: DeveloperRequest,
) -> Result<DeveloperPayload, ApiError> {
    let fields = validate_developer(&req)?;
    ensure_level_exists(ctx, fields.level_id).await?;
    let developer = ctx
        .storage
        .create_developer(&fields)
        .await
        .map_err(internal)?;
    info!(
        developer_id = developer.developer_id.0,
        level_id = developer.level_id.0,
        "developer created"
    );
    Ok(developer_payload(developer))
}

pub async fn update_developer(
    ctx: &ApiContext,
    developer_id: DeveloperId,
    req: DeveloperRequest,
) -> Result<DeveloperPayload, ApiError> {
    let fields = validate_developer(&req)?;
    ensure_level_exists(ctx, fields.level_id).await?;
    let developer = ctx
        .storage
        .update_developer(developer_id, &fields)
        .await
        .map_err(internal)?
        .ok_or_else(|| developer_not_found(developer_id))?;
    info!(developer_id = developer_id.0, "developer updated");
    Ok(developer_payload(developer))
}

pub async fn delete_developer(ctx: &ApiContext, developer_id: DeveloperId) -> Result<(), ApiError> {
    if !ctx
        .storage
        .delete_developer(developer_id)
        .await
        .map_err(internal)?
    {
        return Err(developer_not_found(developer_id));
    }
    info!(developer_id = developer_id.0, "developer deleted");
    Ok(())
}

pub fn validate_level_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    validate_name("level", name)?;
    Ok(name.to_string())
}

pub fn validate_developer(req: &DeveloperRequest) -> Result<DeveloperFields, ApiError> {
    let name = req.name.trim();
    validate_name("name", name)?;

    let hobby = req.hobby.trim();
    if hobby.is_empty() {
        return Err(ApiError::validation("hobby is required"));
    }
    if char_len(hobby) > HOBBY_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "hobby must have at most {HOBBY_MAX_CHARS} characters"
        )));
    }

    let age = u32::try_from(req.age)
        .ok()
        .filter(|age| *age > 0)
        .ok_or_else(|| ApiError::validation("age must be a positive integer"))?;

    if req.date_birth > today() {
        return Err(ApiError::validation("date_birth cannot be in the future"));
    }

    Ok(DeveloperFields {
        level_id: req.id_level,
        name: name.to_string(),
        gender: req.gender,
        date_of_birth: req.date_birth,
        age,
        hobby: hobby.to_string(),
    })
}

fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    let len = char_len(value);
    if len == 0 {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if len < NAME_MIN_CHARS {
        return Err(ApiError::validation(format!(
            "{field} must have at least {NAME_MIN_CHARS} characters"
        )));
    }
    if len > NAME_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "{field} must have at most {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

async fn ensure_level_exists(ctx: &ApiContext, level_id: LevelId) -> Result<(), ApiError> {
    ctx.storage
        .level(level_id)
        .await
        .map_err(internal)?
        .map(|_| ())
        .ok_or_else(|| ApiError::validation(format!("level {level_id} does not exist")))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn level_payload<D>(level: StoredLevel) -> LevelPayload<D> {
    LevelPayload {
        id: level.level_id,
        level: level.name,
        developers: None,
    }
}

fn developer_payload(developer: StoredDeveloper) -> DeveloperPayload {
    DeveloperPayload {
        id: developer.developer_id,
        id_level: developer.level_id,
        name: developer.name,
        gender: developer.gender,
        date_birth: developer.date_of_birth,
        age: developer.age,
        hobby: developer.hobby,
    }
}

fn level_not_found(level_id: LevelId) -> ApiError {
    ApiError::not_found(format!("level {level_id} not found"))
}

fn developer_not_found(developer_id: DeveloperId) -> ApiError {
    ApiError::not_found(format!("developer {developer_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{domain::Gender, error::ErrorCode};

    async fn setup() -> ApiContext {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        ApiContext { storage }
    }

    fn developer_request(level_id: LevelId) -> DeveloperRequest {
        DeveloperRequest {
            id_level: level_id,
            name: "Ana".to_string(),
            gender: Gender::Female,
            date_birth: NaiveDate::from_ymd_opt(1990, 5, 1).expect("date"),
            age: 34,
            hobby: "chess".to_string(),
        }
    }

    #[tokio::test]
    async fn list_levels_embeds_developers_per_level() {
        let ctx = setup().await;
        let junior = create_level(&ctx, LevelRequest { level: "Junior".into() })
            .await
            .expect("level");
        let senior = create_level(&ctx, LevelRequest { level: "Senior".into() })
            .await
            .expect("level");
        create_developer(&ctx, developer_request(junior.id))
            .await
            .expect("developer");

        let levels = list_levels(&ctx).await.expect("levels");
        let count = |id: LevelId| {
            levels
                .iter()
                .find(|level| level.id == id)
                .and_then(|level| level.developers.as_ref())
                .map(Vec::len)
        };
        assert_eq!(count(junior.id), Some(1));
        assert_eq!(count(senior.id), Some(0));
    }

    #[tokio::test]
    async fn short_level_names_are_rejected() {
        let ctx = setup().await;
        let err = create_level(&ctx, LevelRequest { level: "ab".into() })
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn update_of_missing_level_is_not_found() {
        let ctx = setup().await;
        let err = update_level(&ctx, LevelId(9), LevelRequest { level: "Senior".into() })
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn referenced_level_cannot_be_deleted() {
        let ctx = setup().await;
        let level = create_level(&ctx, LevelRequest { level: "Junior".into() })
            .await
            .expect("level");
        let developer = create_developer(&ctx, developer_request(level.id))
            .await
            .expect("developer");

        let err = delete_level(&ctx, level.id).await.expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Conflict);

        delete_developer(&ctx, developer.id).await.expect("delete");
        delete_level(&ctx, level.id).await.expect("delete");
    }

    #[tokio::test]
    async fn developer_requires_existing_level_and_positive_age() {
        let ctx = setup().await;
        let err = create_developer(&ctx, developer_request(LevelId(77)))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);

        let level = create_level(&ctx, LevelRequest { level: "Junior".into() })
            .await
            .expect("level");
        let mut req = developer_request(level.id);
        req.age = -1;
        let err = create_developer(&ctx, req).await.expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn deleting_missing_developer_is_not_found() {
        let ctx = setup().await;
        let err = delete_developer(&ctx, DeveloperId(3))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
