//! # Client Repository
//!
//! CRUD for clients and the servers they own.

use std::net::IpAddr;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    ModelTrait, Order, QueryFilter, QueryOrder, Set,
};

use crate::error::RepositoryError;
use crate::repositories::contains_pattern;
use crate::models::client::{self, ActiveModel as ClientActiveModel, Entity as Client, Model as ClientModel};
use crate::models::server::{self, ActiveModel as ServerActiveModel, Entity as Server, Model as ServerModel};

/// Writable client fields
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub technical_contact: String,
    pub contact_email: String,
    pub active: bool,
}

/// Writable server fields
#[derive(Debug, Clone)]
pub struct ServerInput {
    pub hostname: String,
    pub ip_address: String,
    pub operating_system: String,
    pub description: String,
}

/// Listing criteria for the client admin list
#[derive(Debug, Clone, Default)]
pub struct ClientListFilter {
    /// Case-insensitive match on trade name, legal name or tax id
    pub search: Option<String>,
    pub active: Option<bool>,
}

fn required(field: &'static str, value: &str, max_len: usize) -> Result<String, RepositoryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RepositoryError::field(field, "This field is required"));
    }
    if value.chars().count() > max_len {
        return Err(RepositoryError::field(
            field,
            format!("Ensure this value has at most {max_len} characters"),
        ));
    }
    Ok(value.to_string())
}

impl ClientInput {
    fn validated(self) -> Result<Self, RepositoryError> {
        let contact_email = required("contact_email", &self.contact_email, 254)?;
        match contact_email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(RepositoryError::field("contact_email", "Enter a valid email address")),
        }

        Ok(Self {
            legal_name: required("legal_name", &self.legal_name, 200)?,
            trade_name: required("trade_name", &self.trade_name, 150)?,
            tax_id: required("tax_id", &self.tax_id, 18)?,
            technical_contact: required("technical_contact", &self.technical_contact, 100)?,
            contact_email,
            active: self.active,
        })
    }
}

impl ServerInput {
    fn validated(self) -> Result<Self, RepositoryError> {
        let ip_address = self.ip_address.trim().to_string();
        if ip_address.parse::<IpAddr>().is_err() {
            return Err(RepositoryError::field(
                "ip_address",
                "Enter a valid IPv4 or IPv6 address",
            ));
        }

        Ok(Self {
            hostname: required("hostname", &self.hostname, 100)?,
            ip_address,
            operating_system: required("operating_system", &self.operating_system, 100)?,
            description: self.description.trim().to_string(),
        })
    }
}

/// Repository for client and server database operations
pub struct ClientRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ClientRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: ClientInput) -> Result<ClientModel, RepositoryError> {
        let input = input.validated()?;
        let now = Utc::now();

        let client = ClientActiveModel {
            legal_name: Set(input.legal_name),
            trade_name: Set(input.trade_name),
            tax_id: Set(input.tax_id),
            technical_contact: Set(input.technical_contact),
            contact_email: Set(input.contact_email),
            active: Set(input.active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        client
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: i32) -> Result<Option<ClientModel>, RepositoryError> {
        Client::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Fetch a client or fail with `NotFound`.
    pub async fn require(&self, id: i32) -> Result<ClientModel, RepositoryError> {
        self.get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Client {id} not found")))
    }

    /// List clients ordered by trade name, case-insensitively.
    pub async fn list(&self, filter: &ClientListFilter) -> Result<Vec<ClientModel>, RepositoryError> {
        let mut query = Client::find();

        if let Some(active) = filter.active {
            query = query.filter(client::Column::Active.eq(active));
        }

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(client::Column::TradeName))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(client::Column::LegalName))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(client::Column::TaxId))).like(pattern.clone())),
            );
        }

        query
            .order_by(SimpleExpr::from(Func::lower(Expr::col(client::Column::TradeName))), Order::Asc)
            .order_by_asc(client::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active clients ordered by trade name, case-insensitively.
    pub async fn list_active(&self) -> Result<Vec<ClientModel>, RepositoryError> {
        self.list(&ClientListFilter {
            active: Some(true),
            ..Default::default()
        })
        .await
    }

    pub async fn update(&self, id: i32, input: ClientInput) -> Result<ClientModel, RepositoryError> {
        let input = input.validated()?;
        let mut active = self.require(id).await?.into_active_model();

        active.legal_name = Set(input.legal_name);
        active.trade_name = Set(input.trade_name);
        active.tax_id = Set(input.tax_id);
        active.technical_contact = Set(input.technical_contact);
        active.contact_email = Set(input.contact_email);
        active.active = Set(input.active);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Delete a client; its servers go with it and its routines lose their client.
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let client = self.require(id).await?;
        client
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(client_id = id, "Deleted client");
        Ok(())
    }

    /// Servers of a client ordered by hostname.
    pub async fn servers(&self, client_id: i32) -> Result<Vec<ServerModel>, RepositoryError> {
        Server::find()
            .filter(server::Column::ClientId.eq(client_id))
            .order_by_asc(server::Column::Hostname)
            .order_by_asc(server::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_server(&self, id: i32) -> Result<Option<ServerModel>, RepositoryError> {
        Server::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn add_server(
        &self,
        client_id: i32,
        input: ServerInput,
    ) -> Result<ServerModel, RepositoryError> {
        let input = input.validated()?;
        self.require(client_id).await?;
        let now = Utc::now();

        let server = ServerActiveModel {
            client_id: Set(client_id),
            hostname: Set(input.hostname),
            ip_address: Set(input.ip_address),
            operating_system: Set(input.operating_system),
            description: Set(input.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        server
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_server(
        &self,
        id: i32,
        input: ServerInput,
    ) -> Result<ServerModel, RepositoryError> {
        let input = input.validated()?;
        let mut active = self
            .get_server(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Server {id} not found")))?
            .into_active_model();

        active.hostname = Set(input.hostname);
        active.ip_address = Set(input.ip_address);
        active.operating_system = Set(input.operating_system);
        active.description = Set(input.description);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete_server(&self, id: i32) -> Result<(), RepositoryError> {
        let server = self
            .get_server(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Server {id} not found")))?;

        server
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ClientInput {
        ClientInput {
            legal_name: "Acme Ltda".to_string(),
            trade_name: "Acme".to_string(),
            tax_id: "12.345.678/0001-90".to_string(),
            technical_contact: "Joana".to_string(),
            contact_email: "ti@acme.com.br".to_string(),
            active: true,
        }
    }

    #[test]
    fn client_input_trims_and_accepts() {
        let mut raw = input();
        raw.trade_name = "  Acme  ".to_string();
        let validated = raw.validated().unwrap();
        assert_eq!(validated.trade_name, "Acme");
    }

    #[test]
    fn client_input_rejects_bad_email_and_blank_names() {
        let mut raw = input();
        raw.contact_email = "not-an-email".to_string();
        assert!(matches!(
            raw.validated(),
            Err(RepositoryError::InvalidField { field: "contact_email", .. })
        ));

        let mut raw = input();
        raw.trade_name = "   ".to_string();
        assert!(matches!(
            raw.validated(),
            Err(RepositoryError::InvalidField { field: "trade_name", .. })
        ));
    }

    #[test]
    fn server_input_requires_ip() {
        let server = ServerInput {
            hostname: "srv-db01".to_string(),
            ip_address: "10.0.0.300".to_string(),
            operating_system: "Debian 12".to_string(),
            description: String::new(),
        };
        assert!(matches!(
            server.validated(),
            Err(RepositoryError::InvalidField { field: "ip_address", .. })
        ));

        let server = ServerInput {
            hostname: "srv-db01".to_string(),
            ip_address: "fe80::1".to_string(),
            operating_system: "Debian 12".to_string(),
            description: String::new(),
        };
        assert!(server.validated().is_ok());
    }
}
