//! Shared filter/sort engine for validation listings.
//!
//! History, report panel, exports, dashboard and the admin list all build
//! their data from [`ValidationQuery`], so every view agrees on what a given
//! set of query parameters selects and in which order.

use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::RepositoryError;
use crate::models::{ValidationStatus, backup_routine, backup_validation, client};

/// Date format accepted by `data_inicio` / `data_fim`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ordering applied to a validation listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SortKey {
    /// Newest first
    #[default]
    #[serde(rename = "recente")]
    Recent,
    /// Oldest first
    #[serde(rename = "antigo")]
    Oldest,
    /// Client trade name A-Z
    #[serde(rename = "cliente_az")]
    ClientAz,
    /// Client trade name Z-A
    #[serde(rename = "cliente_za")]
    ClientZa,
    /// Most severe status first
    #[serde(rename = "status")]
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Recent,
        SortKey::Oldest,
        SortKey::ClientAz,
        SortKey::ClientZa,
        SortKey::Status,
    ];

    /// Parse a sort key; unknown or empty keys fall back to [`SortKey::Recent`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "antigo" => SortKey::Oldest,
            "cliente_az" => SortKey::ClientAz,
            "cliente_za" => SortKey::ClientZa,
            "status" => SortKey::Status,
            _ => SortKey::Recent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recent => "recente",
            SortKey::Oldest => "antigo",
            SortKey::ClientAz => "cliente_az",
            SortKey::ClientZa => "cliente_za",
            SortKey::Status => "status",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Recent => "Mais recentes",
            SortKey::Oldest => "Mais antigos",
            SortKey::ClientAz => "Cliente (A-Z)",
            SortKey::ClientZa => "Cliente (Z-A)",
            SortKey::Status => "Status (Erro primeiro)",
        }
    }
}

/// Raw filter query parameters shared by history, reports and exports.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidationFilterParams {
    /// Client ID
    pub cliente: Option<String>,
    /// Status (`success`, `warning`, `error`)
    pub status: Option<String>,
    /// Start date, inclusive (`YYYY-MM-DD`)
    pub data_inicio: Option<String>,
    /// End date, inclusive (`YYYY-MM-DD`)
    pub data_fim: Option<String>,
    /// Sort key (`recente`, `antigo`, `cliente_az`, `cliente_za`, `status`)
    pub ordenacao: Option<String>,
}

/// Parsed, validated filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationFilter {
    pub client_id: Option<i32>,
    pub status: Option<ValidationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort: SortKey,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| RepositoryError::field(field, format!("Invalid date '{raw}', use YYYY-MM-DD")))
}

impl TryFrom<&ValidationFilterParams> for ValidationFilter {
    type Error = RepositoryError;

    fn try_from(params: &ValidationFilterParams) -> Result<Self, Self::Error> {
        let client_id = present(&params.cliente)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| RepositoryError::field("cliente", format!("Invalid client id '{raw}'")))
            })
            .transpose()?;

        let status = present(&params.status)
            .map(|raw| {
                ValidationStatus::from_str(raw).map_err(|message| RepositoryError::field("status", message))
            })
            .transpose()?;

        let start_date = present(&params.data_inicio)
            .map(|raw| parse_date("data_inicio", raw))
            .transpose()?;
        let end_date = present(&params.data_fim)
            .map(|raw| parse_date("data_fim", raw))
            .transpose()?;

        let sort = present(&params.ordenacao)
            .map(SortKey::parse)
            .unwrap_or_default();

        Ok(Self {
            client_id,
            status,
            start_date,
            end_date,
            sort,
        })
    }
}

/// Midnight of `date` in `offset`, expressed at UTC.
fn local_midnight(date: NaiveDate, offset: &FixedOffset) -> Option<DateTimeWithTimeZone> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    let local: DateTime<FixedOffset> = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc).fixed_offset())
}

impl ValidationFilter {
    /// Build the filtered, ordered query; nothing runs until it is executed.
    pub fn query(&self, offset: &FixedOffset) -> ValidationQuery {
        let mut select = backup_validation::Entity::find()
            .join(
                JoinType::InnerJoin,
                backup_validation::Relation::BackupRoutine.def(),
            )
            .join(JoinType::LeftJoin, backup_routine::Relation::Client.def());

        if let Some(client_id) = self.client_id {
            select = select.filter(backup_routine::Column::ClientId.eq(client_id));
        }

        if let Some(status) = self.status {
            select = select.filter(backup_validation::Column::Status.eq(status));
        }

        if let Some(start) = self.start_date.and_then(|d| local_midnight(d, offset)) {
            select = select.filter(backup_validation::Column::CreatedAt.gte(start));
        }

        if let Some(end) = self
            .end_date
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| local_midnight(d, offset))
        {
            select = select.filter(backup_validation::Column::CreatedAt.lt(end));
        }

        ValidationQuery::from_select(select).sorted(self.sort)
    }
}

fn status_severity() -> SimpleExpr {
    let status = || Expr::col((backup_validation::Entity, backup_validation::Column::Status));
    Expr::case(
        status().eq(ValidationStatus::Error.as_str()),
        ValidationStatus::Error.severity_rank(),
    )
    .case(
        status().eq(ValidationStatus::Warning.as_str()),
        ValidationStatus::Warning.severity_rank(),
    )
    .finally(ValidationStatus::Success.severity_rank())
    .into()
}

fn client_name_lower() -> SimpleExpr {
    SimpleExpr::from(Func::lower(Expr::col((
        client::Entity,
        client::Column::TradeName,
    ))))
}

/// An unexecuted validation listing.
#[derive(Debug, Clone)]
pub struct ValidationQuery {
    select: Select<backup_validation::Entity>,
}

impl ValidationQuery {
    /// Every validation, newest first.
    pub fn recent() -> Self {
        ValidationFilter::default().query(&Utc.fix())
    }

    fn from_select(select: Select<backup_validation::Entity>) -> Self {
        Self { select }
    }

    fn sorted(self, sort: SortKey) -> Self {
        use backup_validation::Column;

        let select = match sort {
            SortKey::Recent => self
                .select
                .order_by_desc(Column::CreatedAt)
                .order_by_desc(Column::Id),
            SortKey::Oldest => self
                .select
                .order_by_asc(Column::CreatedAt)
                .order_by_asc(Column::Id),
            SortKey::ClientAz | SortKey::ClientZa => {
                let direction = if sort == SortKey::ClientAz {
                    Order::Asc
                } else {
                    Order::Desc
                };
                self.select
                    .order_by(
                        Expr::col((client::Entity, client::Column::Id)).is_null(),
                        Order::Asc,
                    )
                    .order_by(client_name_lower(), direction)
                    .order_by_desc(Column::CreatedAt)
                    .order_by_desc(Column::Id)
            }
            SortKey::Status => self
                .select
                .order_by(status_severity(), Order::Asc)
                .order_by_desc(Column::CreatedAt)
                .order_by_desc(Column::Id),
        };

        Self { select }
    }

    /// Restrict to validations of routines owned by `client_id`.
    pub fn for_client(self, client_id: i32) -> Self {
        Self {
            select: self
                .select
                .filter(backup_routine::Column::ClientId.eq(client_id)),
        }
    }

    /// Apply an extra condition (used by the admin search).
    pub fn filter<F>(self, condition: F) -> Self
    where
        F: sea_orm::sea_query::IntoCondition,
    {
        Self {
            select: self.select.filter(condition),
        }
    }

    /// Join an extra relation onto the listing.
    pub fn join(self, join: JoinType, relation: sea_orm::RelationDef) -> Self {
        Self {
            select: self.select.join(join, relation),
        }
    }

    pub async fn count(&self, db: &DatabaseConnection) -> Result<u64, DbErr> {
        self.select.clone().count(db).await
    }

    pub async fn all(self, db: &DatabaseConnection) -> Result<Vec<backup_validation::Model>, DbErr> {
        self.select.all(db).await
    }

    pub async fn limit(
        self,
        db: &DatabaseConnection,
        limit: u64,
    ) -> Result<Vec<backup_validation::Model>, DbErr> {
        self.select.limit(limit).all(db).await
    }

    /// Fetch page `number` (1-based) of `size` items.
    pub async fn page(
        self,
        db: &DatabaseConnection,
        number: u64,
        size: u64,
    ) -> Result<Vec<backup_validation::Model>, DbErr> {
        self.select
            .offset(number.saturating_sub(1) * size)
            .limit(size)
            .all(db)
            .await
    }
}

/// Page position inside a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageWindow {
    /// Current page (1-based)
    pub number: u64,
    pub num_pages: u64,
    pub page_size: u64,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Resolve a requested page; non-numeric input yields page 1 and
    /// out-of-range numbers clamp to the nearest valid page.
    pub fn resolve(requested: Option<&str>, total: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let num_pages = total.div_ceil(page_size).max(1);
        let number = match requested.map(str::trim) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => n.clamp(1, num_pages as i64) as u64,
                // Digits too large for any page still mean "past the end".
                Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => num_pages,
                Err(_) => 1,
            },
            None => 1,
        };

        Self {
            number,
            num_pages,
            page_size,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
        }
    }
}
