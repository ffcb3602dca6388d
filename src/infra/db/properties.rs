use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePropertyParams, PropertiesRepo, PropertiesWriteRepo, RepoError, UpdatePropertyParams,
};
use crate::domain::entities::PropertyRecord;

use super::{PostgresRepositories, map_sqlx_error};

const PROPERTY_COLUMNS: &str =
    "id, title, description, price::text AS price, location, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: Uuid,
    title: String,
    description: String,
    price: String,
    location: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PropertyRow> for PropertyRecord {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PropertiesRepo for PostgresRepositories {
    async fn list_all(&self) -> Result<Vec<PropertyRecord>, RepoError> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, PropertyRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PropertyRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PropertyRecord>, RepoError> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PropertyRecord::from))
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PropertiesWriteRepo for PostgresRepositories {
    async fn create_property(
        &self,
        params: CreatePropertyParams,
    ) -> Result<PropertyRecord, RepoError> {
        let CreatePropertyParams { fields } = params;
        let sql = format!(
            "INSERT INTO properties (id, title, description, price, location) \
             VALUES ($1, $2, $3, $4::numeric, $5) \
             RETURNING {PROPERTY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(fields.title)
            .bind(fields.description)
            .bind(fields.price)
            .bind(fields.location)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PropertyRecord::from(row))
    }

    async fn update_property(
        &self,
        params: UpdatePropertyParams,
    ) -> Result<PropertyRecord, RepoError> {
        let UpdatePropertyParams { id, fields } = params;
        let sql = format!(
            "UPDATE properties \
             SET title = $2, description = $3, price = $4::numeric, location = $5, \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {PROPERTY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(id)
            .bind(fields.title)
            .bind(fields.description)
            .bind(fields.price)
            .bind(fields.location)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PropertyRecord::from(row))
    }

    async fn delete_property(&self, id: Uuid) -> Result<PropertyRecord, RepoError> {
        let sql = format!("DELETE FROM properties WHERE id = $1 RETURNING {PROPERTY_COLUMNS}");
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PropertyRecord::from(row))
    }
}
