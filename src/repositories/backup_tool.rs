//! # Backup Tool Repository

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::error::RepositoryError;
use crate::repositories::contains_pattern;
use crate::models::backup_routine;
use crate::models::backup_tool::{
    self, ActiveModel as ToolActiveModel, Entity as BackupTool, Model as ToolModel,
};

/// Repository for backup tool database operations
pub struct BackupToolRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> BackupToolRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str) -> Result<ToolModel, RepositoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::field("name", "This field is required"));
        }
        if name.chars().count() > 50 {
            return Err(RepositoryError::field(
                "name",
                "Ensure this value has at most 50 characters",
            ));
        }

        ToolActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: i32) -> Result<Option<ToolModel>, RepositoryError> {
        BackupTool::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// List tools by name, optionally narrowed by a case-insensitive search.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<ToolModel>, RepositoryError> {
        let mut query = BackupTool::find();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(backup_tool::Column::Name)))
                    .like(contains_pattern(term)),
            );
        }

        query
            .order_by_asc(backup_tool::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Delete a tool. Tools still used by a routine are protected.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let tool = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Backup tool {id} not found")))?;

        let in_use = backup_routine::Entity::find()
            .filter(backup_routine::Column::ToolId.eq(id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Backup tool '{}' is used by {} routine(s) and cannot be deleted",
                tool.name, in_use
            )));
        }

        tool.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}
