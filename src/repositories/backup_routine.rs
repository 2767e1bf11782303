//! # Backup Routine Repository
//!
//! Routines link a client, a tool and a set of that client's servers. The
//! repository keeps the routine's client consistent with its servers: when
//! the client is omitted it is inferred from the servers, and servers that
//! belong to another client are refused.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, JoinType, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};

use crate::error::RepositoryError;
use crate::repositories::contains_pattern;
use crate::models::backup_routine::{
    self, ActiveModel as RoutineActiveModel, Entity as BackupRoutine, Frequency,
    Model as RoutineModel,
};
use crate::models::{backup_tool, client, routine_server, server};

/// Writable routine fields
#[derive(Debug, Clone)]
pub struct RoutineInput {
    /// Owning client; inferred from the servers when omitted
    pub client_id: Option<i32>,
    pub tool_id: i32,
    pub description: String,
    pub frequency: Frequency,
    pub execution_time: NaiveTime,
    pub retention_days: i32,
    pub server_ids: Vec<i32>,
}

/// Listing criteria for the routine admin list
#[derive(Debug, Clone, Default)]
pub struct RoutineListFilter {
    pub client_id: Option<i32>,
    pub tool_id: Option<i32>,
    pub frequency: Option<Frequency>,
    /// Case-insensitive match on description, tool name or client trade name
    pub search: Option<String>,
}

/// A routine with its display relations resolved
#[derive(Debug, Clone)]
pub struct RoutineSummary {
    pub routine: RoutineModel,
    pub tool_name: String,
    pub client_name: Option<String>,
    pub server_count: u64,
}

impl RoutineSummary {
    pub fn label(&self) -> String {
        self.routine.label(&self.tool_name)
    }
}

/// A routine with its servers
#[derive(Debug, Clone)]
pub struct RoutineDetail {
    pub summary: RoutineSummary,
    pub servers: Vec<server::Model>,
}

/// Repository for backup routine database operations
pub struct BackupRoutineRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> BackupRoutineRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Validate the input and resolve the routine's client.
    async fn resolve_client<C>(&self, conn: &C, input: &RoutineInput) -> Result<Option<i32>, RepositoryError>
    where
        C: sea_orm::ConnectionTrait,
    {
        let description = input.description.trim();
        if description.is_empty() {
            return Err(RepositoryError::field("description", "This field is required"));
        }
        if description.chars().count() > 200 {
            return Err(RepositoryError::field(
                "description",
                "Ensure this value has at most 200 characters",
            ));
        }
        if input.retention_days < 0 {
            return Err(RepositoryError::field(
                "retention_days",
                "Retention must be zero or more days",
            ));
        }

        if backup_tool::Entity::find_by_id(input.tool_id)
            .one(conn)
            .await
            .map_err(RepositoryError::database_error)?
            .is_none()
        {
            return Err(RepositoryError::field("tool_id", "Select a valid backup tool"));
        }

        if let Some(client_id) = input.client_id
            && client::Entity::find_by_id(client_id)
                .one(conn)
                .await
                .map_err(RepositoryError::database_error)?
                .is_none()
        {
            return Err(RepositoryError::field("client_id", "Select a valid client"));
        }

        let wanted: BTreeSet<i32> = input.server_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(input.client_id);
        }

        let servers = server::Entity::find()
            .filter(server::Column::Id.is_in(wanted.iter().copied()))
            .all(conn)
            .await
            .map_err(RepositoryError::database_error)?;

        if servers.len() != wanted.len() {
            let found: BTreeSet<i32> = servers.iter().map(|s| s.id).collect();
            let missing: Vec<String> = wanted
                .difference(&found)
                .map(|id| id.to_string())
                .collect();
            return Err(RepositoryError::field(
                "server_ids",
                format!("Unknown server(s): {}", missing.join(", ")),
            ));
        }

        let owners: BTreeSet<i32> = servers.iter().map(|s| s.client_id).collect();
        if owners.len() > 1 {
            return Err(RepositoryError::field(
                "server_ids",
                "All servers of a routine must belong to the same client",
            ));
        }

        let owner = owners.into_iter().next();
        match (input.client_id, owner) {
            (Some(client_id), Some(owner)) if client_id != owner => Err(RepositoryError::field(
                "server_ids",
                "The selected servers do not belong to the routine's client",
            )),
            (Some(client_id), _) => Ok(Some(client_id)),
            (None, owner) => Ok(owner),
        }
    }

    async fn replace_servers(
        txn: &DatabaseTransaction,
        routine_id: i32,
        server_ids: &[i32],
    ) -> Result<(), RepositoryError> {
        routine_server::Entity::delete_many()
            .filter(routine_server::Column::RoutineId.eq(routine_id))
            .exec(txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let unique: BTreeSet<i32> = server_ids.iter().copied().collect();
        if unique.is_empty() {
            return Ok(());
        }

        let links = unique.into_iter().map(|server_id| routine_server::ActiveModel {
            routine_id: Set(routine_id),
            server_id: Set(server_id),
        });
        routine_server::Entity::insert_many(links)
            .exec_without_returning(txn)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    pub async fn create(&self, input: RoutineInput) -> Result<RoutineModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;
        let client_id = self.resolve_client(&txn, &input).await?;
        let now = Utc::now();

        let routine = RoutineActiveModel {
            client_id: Set(client_id),
            tool_id: Set(input.tool_id),
            description: Set(input.description.trim().to_string()),
            frequency: Set(input.frequency),
            execution_time: Set(input.execution_time),
            retention_days: Set(input.retention_days),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        Self::replace_servers(&txn, routine.id, &input.server_ids).await?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        tracing::info!(routine_id = routine.id, client_id = ?routine.client_id, "Created backup routine");
        Ok(routine)
    }

    pub async fn update(&self, id: i32, input: RoutineInput) -> Result<RoutineModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;
        let existing = BackupRoutine::find_by_id(id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found(format!("Backup routine {id} not found")))?;

        let client_id = self.resolve_client(&txn, &input).await?;

        let mut active = existing.into_active_model();
        active.client_id = Set(client_id);
        active.tool_id = Set(input.tool_id);
        active.description = Set(input.description.trim().to_string());
        active.frequency = Set(input.frequency);
        active.execution_time = Set(input.execution_time);
        active.retention_days = Set(input.retention_days);
        active.updated_at = Set(Utc::now().into());

        let routine = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        Self::replace_servers(&txn, routine.id, &input.server_ids).await?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(routine)
    }

    /// Delete a routine together with its validations.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let routine = self.require(id).await?;
        routine
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(routine_id = id, "Deleted backup routine");
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<Option<RoutineModel>, RepositoryError> {
        BackupRoutine::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn require(&self, id: i32) -> Result<RoutineModel, RepositoryError> {
        self.get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Backup routine {id} not found")))
    }

    /// Fetch a routine that belongs to `client_id`, as a field error on `routine_id`.
    pub async fn require_for_client(
        &self,
        client_id: i32,
        routine_id: i32,
    ) -> Result<RoutineModel, RepositoryError> {
        match self.get(routine_id).await? {
            Some(routine) if routine.client_id == Some(client_id) => Ok(routine),
            _ => Err(RepositoryError::field(
                "routine_id",
                "Select a valid routine for this client",
            )),
        }
    }

    /// Servers attached to a routine, ordered by ID.
    pub async fn servers(&self, routine_id: i32) -> Result<Vec<server::Model>, RepositoryError> {
        server::Entity::find()
            .join(JoinType::InnerJoin, server::Relation::RoutineServer.def())
            .filter(routine_server::Column::RoutineId.eq(routine_id))
            .order_by_asc(server::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn detail(&self, id: i32) -> Result<RoutineDetail, RepositoryError> {
        let routine = self.require(id).await?;
        let mut summaries = self.summarize(vec![routine]).await?;
        let summary = summaries
            .pop()
            .ok_or_else(|| RepositoryError::not_found(format!("Backup routine {id} not found")))?;
        let servers = self.servers(id).await?;

        Ok(RoutineDetail { summary, servers })
    }

    /// Routines a validation can be recorded against for `client_id`.
    pub async fn for_client(&self, client_id: i32) -> Result<Vec<RoutineSummary>, RepositoryError> {
        let routines = BackupRoutine::find()
            .filter(backup_routine::Column::ClientId.eq(client_id))
            .order_by_asc(backup_routine::Column::Description)
            .order_by_asc(backup_routine::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        self.summarize(routines).await
    }

    pub async fn list(&self, filter: &RoutineListFilter) -> Result<Vec<RoutineSummary>, RepositoryError> {
        let mut query = BackupRoutine::find()
            .join(JoinType::InnerJoin, backup_routine::Relation::BackupTool.def())
            .join(JoinType::LeftJoin, backup_routine::Relation::Client.def());

        if let Some(client_id) = filter.client_id {
            query = query.filter(backup_routine::Column::ClientId.eq(client_id));
        }
        if let Some(tool_id) = filter.tool_id {
            query = query.filter(backup_routine::Column::ToolId.eq(tool_id));
        }
        if let Some(frequency) = filter.frequency {
            query = query.filter(backup_routine::Column::Frequency.eq(frequency));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            let lower = |col: Expr| Expr::expr(Func::lower(col));
            query = query.filter(
                Condition::any()
                    .add(
                        lower(Expr::col((backup_routine::Entity, backup_routine::Column::Description)))
                            .like(pattern.clone()),
                    )
                    .add(lower(Expr::col((backup_tool::Entity, backup_tool::Column::Name))).like(pattern.clone()))
                    .add(lower(Expr::col((client::Entity, client::Column::TradeName))).like(pattern.clone())),
            );
        }

        let routines = query
            .order_by_asc(backup_tool::Column::Name)
            .order_by_asc(backup_routine::Column::Description)
            .order_by_asc(backup_routine::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        self.summarize(routines).await
    }

    /// Batch-load tool, client and server count for each routine.
    async fn summarize(&self, routines: Vec<RoutineModel>) -> Result<Vec<RoutineSummary>, RepositoryError> {
        if routines.is_empty() {
            return Ok(Vec::new());
        }

        let tool_ids: BTreeSet<i32> = routines.iter().map(|r| r.tool_id).collect();
        let client_ids: BTreeSet<i32> = routines.iter().filter_map(|r| r.client_id).collect();
        let routine_ids: Vec<i32> = routines.iter().map(|r| r.id).collect();

        let tools: HashMap<i32, String> = backup_tool::Entity::find()
            .filter(backup_tool::Column::Id.is_in(tool_ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let clients: HashMap<i32, String> = if client_ids.is_empty() {
            HashMap::new()
        } else {
            client::Entity::find()
                .filter(client::Column::Id.is_in(client_ids))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(|c| (c.id, c.trade_name))
                .collect()
        };

        let mut counts: HashMap<i32, u64> = HashMap::new();
        for link in routine_server::Entity::find()
            .filter(routine_server::Column::RoutineId.is_in(routine_ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
        {
            *counts.entry(link.routine_id).or_default() += 1;
        }

        Ok(routines
            .into_iter()
            .map(|routine| RoutineSummary {
                tool_name: tools.get(&routine.tool_id).cloned().unwrap_or_default(),
                client_name: routine.client_id.and_then(|id| clients.get(&id).cloned()),
                server_count: counts.get(&routine.id).copied().unwrap_or(0),
                routine,
            })
            .collect())
    }
}
