//! `PostgreSQL` implementation of the `SessionStore` port.

use super::{
    models::{ChatSessionRow, NewChatSessionRow},
    schema::chat_sessions,
};
use crate::chat::{
    domain::{PersistedSession, Session, SessionId, Turn},
    ports::{SessionStore, StorageError, StorageResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

const CREATE_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_chat_sessions/up.sql");

/// `PostgreSQL` connection pool type used by the session store.
pub type ChatPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed session store.
///
/// Sessions are stored one row each with the turn list in a JSONB column,
/// mirroring the document shape exposed by the history endpoint.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: ChatPgPool,
}

impl PostgresSessionStore {
    /// Creates a store from an existing connection pool.
    #[must_use]
    pub const fn new(pool: ChatPgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool for `database_url` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Persistence`] when the pool cannot establish
    /// its initial connections.
    pub fn connect(database_url: &str) -> StorageResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .map_err(StorageError::persistence)?;
        Ok(Self::new(pool))
    }

    /// Creates the `chat_sessions` table and index when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Persistence`] when the DDL fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(CREATE_SCHEMA_SQL)
                .map_err(StorageError::persistence)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StorageError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StorageError::persistence)?
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn get(&self, id: &SessionId) -> StorageResult<Option<Session>> {
        let id_val = id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = chat_sessions::table
                .filter(chat_sessions::id.eq(&id_val))
                .select(ChatSessionRow::as_select())
                .first::<ChatSessionRow>(connection)
                .optional()
                .map_err(StorageError::persistence)?;
            row.map(row_to_session).transpose()
        })
        .await
    }

    async fn persist(&self, session: &Session) -> StorageResult<()> {
        let new_row = to_new_row(session)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(chat_sessions::table)
                .values(&new_row)
                .on_conflict(chat_sessions::id)
                .do_update()
                .set((
                    chat_sessions::messages.eq(&new_row.messages),
                    chat_sessions::last_activity.eq(new_row.last_activity),
                ))
                .execute(connection)
                .map_err(StorageError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        self.run_blocking(move |connection| {
            diesel::delete(chat_sessions::table.filter(chat_sessions::last_activity.lt(cutoff)))
                .execute(connection)
                .map_err(StorageError::persistence)
        })
        .await
    }
}

fn to_new_row(session: &Session) -> StorageResult<NewChatSessionRow> {
    let messages = serde_json::to_value(session.messages()).map_err(StorageError::persistence)?;
    Ok(NewChatSessionRow {
        id: session.session_id().as_str().to_owned(),
        messages,
        created_at: session.created_at(),
        last_activity: session.last_activity(),
    })
}

fn row_to_session(row: ChatSessionRow) -> StorageResult<Session> {
    let ChatSessionRow {
        id,
        messages,
        created_at,
        last_activity,
    } = row;

    let session_id = SessionId::new(id).map_err(StorageError::invalid_persisted_data)?;
    let turns: Vec<Turn> =
        serde_json::from_value(messages).map_err(StorageError::invalid_persisted_data)?;

    Ok(Session::from_persisted(PersistedSession {
        session_id,
        messages: turns,
        created_at,
        last_activity,
    }))
}
