use chrono::NaiveDateTime;
use log::{debug, info};
use sea_orm::sea_query::{
    Alias, ColumnDef, Expr, Index, OnConflict, Order, Query, Table,
};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, FromQueryResult,
    SqlxMySqlConnector, TransactionTrait,
};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use crate::configuration::DatabaseSettings;
use crate::error_handling::types::StorageError;
use crate::storage::db_entities::{FrameColumn, FrameRow, UNIQUE_CAPTURE_INDEX};
use crate::storage::storage_trait::FrameStore;
use crate::storage::types::CapturedFrame;

/// Frame store on a relational database through SeaORM.
///
/// Production runs use MySQL; any backend SeaORM connects to by URL works,
/// which is how the tests run against a temporary SQLite file.
pub struct DatabaseStorage {
    db: DatabaseConnection,
    table: String,
}

impl DatabaseStorage {
    /// Opens a single MySQL connection with a `utf8mb4` session charset.
    pub async fn connect_mysql(settings: &DatabaseSettings) -> Result<Self, StorageError> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .charset("utf8mb4");
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        info!(
            "Connected to MySQL {}:{}/{}",
            settings.host, settings.port, settings.database
        );
        Ok(Self {
            db: SqlxMySqlConnector::from_sqlx_mysql_pool(pool),
            table: settings.table.clone(),
        })
    }

    /// Connects with a SeaORM database URL, e.g. `sqlite://frames.db?mode=rwc`.
    pub async fn connect_url(url: &str, table: &str) -> Result<Self, StorageError> {
        let db = Database::connect(url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }
}

fn write_failed(e: DbErr) -> StorageError {
    StorageError::WriteFailed(e.to_string())
}

impl FrameStore for DatabaseStorage {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let mut create = Table::create();
        create
            .table(Alias::new(self.table.as_str()))
            .if_not_exists()
            .col(
                ColumnDef::new(FrameColumn::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(FrameColumn::ResortId).string_len(64).not_null())
            .col(ColumnDef::new(FrameColumn::ResortName).string_len(255).not_null())
            .col(ColumnDef::new(FrameColumn::SlopeName).string_len(255).not_null())
            .col(ColumnDef::new(FrameColumn::StreamUrl).text())
            .col(ColumnDef::new(FrameColumn::CapturedAt).date_time().not_null())
            .col(ColumnDef::new(FrameColumn::ImageFormat).string_len(8).not_null())
            .col(
                ColumnDef::new(FrameColumn::ImageBytes)
                    .custom(Alias::new("LONGBLOB"))
                    .not_null(),
            )
            .col(
                ColumnDef::new(FrameColumn::CreatedAt)
                    .timestamp()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .index(
                Index::create()
                    .name(UNIQUE_CAPTURE_INDEX)
                    .unique()
                    .col(FrameColumn::ResortId)
                    .col(FrameColumn::SlopeName)
                    .col(FrameColumn::CapturedAt),
            );
        if self.backend() == DbBackend::MySql {
            create.character_set("utf8mb4");
        }

        self.db
            .execute(self.backend().build(&create))
            .await
            .map_err(|e| StorageError::SchemaFailed(e.to_string()))?;
        debug!("Ensured frame table {}", self.table);
        Ok(())
    }

    async fn save_frame(&self, frame: &CapturedFrame) -> Result<(), StorageError> {
        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(self.table.as_str()))
            .columns([
                FrameColumn::ResortId,
                FrameColumn::ResortName,
                FrameColumn::SlopeName,
                FrameColumn::StreamUrl,
                FrameColumn::CapturedAt,
                FrameColumn::ImageFormat,
                FrameColumn::ImageBytes,
            ])
            .values([
                frame.resort_id.clone().into(),
                frame.resort_name.clone().into(),
                frame.slope_name.clone().into(),
                frame.stream_url.clone().into(),
                frame.captured_at.into(),
                frame.image_format.clone().into(),
                frame.image_bytes.clone().into(),
            ])
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?
            .on_conflict(
                OnConflict::columns([
                    FrameColumn::ResortId,
                    FrameColumn::SlopeName,
                    FrameColumn::CapturedAt,
                ])
                .update_columns([
                    FrameColumn::StreamUrl,
                    FrameColumn::ImageFormat,
                    FrameColumn::ImageBytes,
                ])
                .to_owned(),
            );
        let statement = self.backend().build(&insert);

        let txn = self.db.begin().await.map_err(write_failed)?;
        txn.execute(statement).await.map_err(write_failed)?;
        txn.commit().await.map_err(write_failed)?;
        debug!(
            "Saved {} bytes for {} ({}) at {}",
            frame.image_bytes.len(),
            frame.resort_id,
            frame.slope_name,
            frame.captured_at
        );
        Ok(())
    }

    async fn frames_at(
        &self,
        captured_at: NaiveDateTime,
    ) -> Result<Vec<CapturedFrame>, StorageError> {
        let mut select = Query::select();
        select
            .columns([
                FrameColumn::ResortId,
                FrameColumn::ResortName,
                FrameColumn::SlopeName,
                FrameColumn::StreamUrl,
                FrameColumn::CapturedAt,
                FrameColumn::ImageFormat,
                FrameColumn::ImageBytes,
            ])
            .from(Alias::new(self.table.as_str()))
            .and_where(Expr::col(FrameColumn::CapturedAt).eq(captured_at))
            .order_by(FrameColumn::Id, Order::Asc);

        let rows = FrameRow::find_by_statement(self.backend().build(&select))
            .all(&self.db)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(rows.into_iter().map(CapturedFrame::from).collect())
    }

    async fn close(self) -> Result<(), StorageError> {
        self.db
            .close()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))
    }
}
