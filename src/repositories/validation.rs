//! # Validation Repository
//!
//! Records, edits and resolves backup validations. Listings are built with
//! [`ValidationQuery`](crate::filters::ValidationQuery); this repository turns
//! the resulting rows into [`ValidationRecord`]s with every display relation
//! loaded in a fixed number of queries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{FixedOffset, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    JoinType, ModelTrait, QueryFilter, RelationTrait, Set,
};

use crate::error::RepositoryError;
use crate::repositories::contains_pattern;
use crate::filters::{ValidationFilter, ValidationQuery};
use crate::models::backup_validation::{
    self, ActiveModel as ValidationActiveModel, Entity as BackupValidation,
    Model as ValidationModel, ValidationStatus,
};
use crate::models::{backup_routine, backup_tool, client, routine_server, server, user};

/// Seconds between creation and last update after which a validation
/// counts as edited even without a recorded editor.
pub const EDIT_GRACE_SECONDS: i64 = 60;

/// Editor label used when a validation changed without a recorded editor.
pub const SYSTEM_EDITOR: &str = "system";

/// Data for recording a new validation
#[derive(Debug, Clone)]
pub struct NewValidation {
    pub routine_id: i32,
    pub user_id: i32,
    pub status: ValidationStatus,
    pub notes: String,
    /// Stored evidence path relative to the media root
    pub evidence_path: String,
}

/// Editable validation fields
#[derive(Debug, Clone)]
pub struct ValidationUpdate {
    pub status: ValidationStatus,
    pub notes: String,
}

/// Audit trail summary shown next to a validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditInfo {
    pub edited: bool,
    /// Editor username, or [`SYSTEM_EDITOR`] when none was recorded
    pub editor: Option<String>,
    pub edited_at: Option<DateTimeWithTimeZone>,
}

/// A validation with its routine, tool, client, first server and users resolved
#[derive(Debug, Clone)]
pub struct ValidationRecord {
    pub validation: ValidationModel,
    pub routine: backup_routine::Model,
    pub tool_name: String,
    pub client: Option<client::Model>,
    /// Lowest-ID server of the routine
    pub first_server: Option<server::Model>,
    pub user: Option<user::Model>,
    pub editor: Option<user::Model>,
}

impl ValidationRecord {
    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.trade_name.as_str())
    }

    pub fn server_hostname(&self) -> Option<&str> {
        self.first_server.as_ref().map(|s| s.hostname.as_str())
    }

    pub fn validator_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn routine_label(&self) -> String {
        self.routine.label(&self.tool_name)
    }

    pub fn audit(&self) -> AuditInfo {
        audit_info(&self.validation, self.editor.as_ref())
    }
}

/// A validation is edited when it has an editor or was updated more than
/// [`EDIT_GRACE_SECONDS`] after creation.
pub fn audit_info(validation: &ValidationModel, editor: Option<&user::Model>) -> AuditInfo {
    let drift = validation.updated_at - validation.created_at;
    let edited = validation.edited_by_id.is_some() || drift.num_seconds() > EDIT_GRACE_SECONDS;

    if !edited {
        return AuditInfo {
            edited: false,
            editor: None,
            edited_at: None,
        };
    }

    AuditInfo {
        edited: true,
        editor: Some(
            editor
                .map(|u| u.username.clone())
                .unwrap_or_else(|| SYSTEM_EDITOR.to_string()),
        ),
        edited_at: Some(validation.updated_at),
    }
}

/// Criteria for the administrative validation list
#[derive(Debug, Clone, Default)]
pub struct AdminValidationFilter {
    pub filter: ValidationFilter,
    pub tool_id: Option<i32>,
    /// Case-insensitive match on routine description, validator username or client trade name
    pub search: Option<String>,
}

/// Repository for validation database operations
pub struct ValidationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ValidationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a validation. Timestamps come from the server clock.
    pub async fn create(&self, input: NewValidation) -> Result<ValidationModel, RepositoryError> {
        if backup_routine::Entity::find_by_id(input.routine_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .is_none()
        {
            return Err(RepositoryError::field("routine_id", "Select a valid routine"));
        }

        let now = Utc::now();
        let model = ValidationActiveModel {
            routine_id: Set(input.routine_id),
            user_id: Set(input.user_id),
            edited_by_id: Set(None),
            status: Set(input.status),
            notes: Set(input.notes.trim().to_string()),
            evidence_path: Set(input.evidence_path),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)?;

        tracing::info!(
            validation_id = model.id,
            routine_id = model.routine_id,
            user_id = model.user_id,
            status = %model.status,
            "Recorded backup validation"
        );

        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<ValidationModel>, RepositoryError> {
        BackupValidation::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn require(&self, id: i32) -> Result<ValidationModel, RepositoryError> {
        self.get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Validation {id} not found")))
    }

    /// Edit status and notes, stamping the acting user as editor.
    pub async fn update(
        &self,
        id: i32,
        update: ValidationUpdate,
        editor_id: i32,
    ) -> Result<ValidationModel, RepositoryError> {
        let mut active = self.require(id).await?.into_active_model();

        active.status = Set(update.status);
        active.notes = Set(update.notes.trim().to_string());
        active.edited_by_id = Set(Some(editor_id));
        active.updated_at = Set(Utc::now().into());

        let model = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(validation_id = id, editor_id, "Edited backup validation");
        Ok(model)
    }

    /// Delete a validation, returning its evidence path for cleanup.
    pub async fn delete(&self, id: i32) -> Result<String, RepositoryError> {
        let validation = self.require(id).await?;
        let evidence_path = validation.evidence_path.clone();

        validation
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(validation_id = id, "Deleted backup validation");
        Ok(evidence_path)
    }

    /// Build the administrative listing query.
    pub fn admin_query(&self, criteria: &AdminValidationFilter, offset: &FixedOffset) -> ValidationQuery {
        let mut query = criteria
            .filter
            .query(offset)
            .join(JoinType::InnerJoin, backup_validation::Relation::User.def());

        if let Some(tool_id) = criteria.tool_id {
            query = query.filter(backup_routine::Column::ToolId.eq(tool_id));
        }

        if let Some(term) = criteria.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            let lower = |col: Expr| Expr::expr(Func::lower(col));
            query = query.filter(
                Condition::any()
                    .add(
                        lower(Expr::col((backup_routine::Entity, backup_routine::Column::Description)))
                            .like(pattern.clone()),
                    )
                    .add(lower(Expr::col((user::Entity, user::Column::Username))).like(pattern.clone()))
                    .add(lower(Expr::col((client::Entity, client::Column::TradeName))).like(pattern.clone())),
            );
        }

        query
    }

    /// Resolve a single validation by ID.
    pub async fn record(&self, id: i32) -> Result<ValidationRecord, RepositoryError> {
        let validation = self.require(id).await?;
        self.resolve(vec![validation])
            .await?
            .pop()
            .ok_or_else(|| RepositoryError::not_found(format!("Validation {id} not found")))
    }

    /// Batch-load display relations, preserving the input order.
    pub async fn resolve(
        &self,
        validations: Vec<ValidationModel>,
    ) -> Result<Vec<ValidationRecord>, RepositoryError> {
        if validations.is_empty() {
            return Ok(Vec::new());
        }

        let routine_ids: BTreeSet<i32> = validations.iter().map(|v| v.routine_id).collect();
        let user_ids: BTreeSet<i32> = validations
            .iter()
            .flat_map(|v| std::iter::once(v.user_id).chain(v.edited_by_id))
            .collect();

        let routines: HashMap<i32, backup_routine::Model> = backup_routine::Entity::find()
            .filter(backup_routine::Column::Id.is_in(routine_ids.iter().copied()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let tool_ids: BTreeSet<i32> = routines.values().map(|r| r.tool_id).collect();
        let tools: HashMap<i32, String> = backup_tool::Entity::find()
            .filter(backup_tool::Column::Id.is_in(tool_ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let client_ids: BTreeSet<i32> = routines.values().filter_map(|r| r.client_id).collect();
        let clients: HashMap<i32, client::Model> = if client_ids.is_empty() {
            HashMap::new()
        } else {
            client::Entity::find()
                .filter(client::Column::Id.is_in(client_ids))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        // Lowest server ID per routine.
        let mut first_server_ids: BTreeMap<i32, i32> = BTreeMap::new();
        for link in routine_server::Entity::find()
            .filter(routine_server::Column::RoutineId.is_in(routine_ids.iter().copied()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
        {
            first_server_ids
                .entry(link.routine_id)
                .and_modify(|current| *current = (*current).min(link.server_id))
                .or_insert(link.server_id);
        }

        let servers: HashMap<i32, server::Model> = if first_server_ids.is_empty() {
            HashMap::new()
        } else {
            server::Entity::find()
                .filter(server::Column::Id.is_in(first_server_ids.values().copied()))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };

        let users: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut records = Vec::with_capacity(validations.len());
        for validation in validations {
            let Some(routine) = routines.get(&validation.routine_id).cloned() else {
                // Routine deleted between the listing and this lookup.
                continue;
            };

            records.push(ValidationRecord {
                tool_name: tools.get(&routine.tool_id).cloned().unwrap_or_default(),
                client: routine.client_id.and_then(|id| clients.get(&id).cloned()),
                first_server: first_server_ids
                    .get(&routine.id)
                    .and_then(|id| servers.get(id).cloned()),
                user: users.get(&validation.user_id).cloned(),
                editor: validation.edited_by_id.and_then(|id| users.get(&id).cloned()),
                routine,
                validation,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn validation(created_offset_secs: i64, edited_by: Option<i32>) -> ValidationModel {
        let created = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        ValidationModel {
            id: 1,
            routine_id: 1,
            user_id: 1,
            edited_by_id: edited_by,
            status: ValidationStatus::Success,
            notes: String::new(),
            evidence_path: "evidencias/x.txt".to_string(),
            created_at: created.into(),
            updated_at: (created + Duration::seconds(created_offset_secs)).into(),
        }
    }

    fn admin() -> user::Model {
        user::Model {
            id: 2,
            username: "admin".to_string(),
            is_staff: true,
            api_token_hash: "0".repeat(64),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn fresh_validation_is_not_edited() {
        let info = audit_info(&validation(30, None), None);
        assert!(!info.edited);
        assert_eq!(info.editor, None);
    }

    #[test]
    fn exactly_sixty_seconds_is_not_edited() {
        assert!(!audit_info(&validation(60, None), None).edited);
    }

    #[test]
    fn late_update_without_editor_is_system() {
        let info = audit_info(&validation(61, None), None);
        assert!(info.edited);
        assert_eq!(info.editor.as_deref(), Some(SYSTEM_EDITOR));
    }

    #[test]
    fn recorded_editor_wins() {
        let editor = admin();
        let info = audit_info(&validation(5, Some(2)), Some(&editor));
        assert!(info.edited);
        assert_eq!(info.editor.as_deref(), Some("admin"));
    }
}
