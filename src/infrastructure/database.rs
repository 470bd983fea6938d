use crate::domain::{Document, DocumentStatus, Placement, SignatureRecord};
use crate::error::SigningError;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Document not found")]
    NotFound,

    #[error("Duplicate document token")]
    DuplicateToken,

    #[error("Illegal status transition {from} -> {to}")]
    IllegalTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Database connection lock poisoned")]
    Poisoned,
}

impl From<DatabaseError> for SigningError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => SigningError::NotFound,
            other => SigningError::Database(other.to_string()),
        }
    }
}

/// Token registry: documents keyed by their signing token.
///
/// Status writes are guarded by the status the caller last read, so two
/// writers racing on one token cannot both win.
pub trait DocumentRepository: Send + Sync {
    fn insert(&self, doc: &Document) -> Result<(), DatabaseError>;
    fn find_by_token(&self, token: &str) -> Result<Document, DatabaseError>;
    fn find_by_id(&self, id: &str) -> Result<Document, DatabaseError>;
    /// Moves `token` from `from` to `to` if it is still in `from`. `SIGNED`
    /// is only reachable through [`DocumentRepository::commit_signature`].
    fn transition_status(
        &self,
        token: &str,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<bool, DatabaseError>;
    /// `PENDING -> SIGNED` plus the signature fields, in one guarded update.
    fn commit_signature(&self, token: &str, record: &SignatureRecord)
        -> Result<bool, DatabaseError>;
    fn count_documents(&self) -> Result<usize, DatabaseError>;
    fn list_by_admin(&self, admin_id: &str) -> Result<Vec<Document>, DatabaseError>;
}

const COLUMNS: &str = "id, token, title, file_name, original_ref, original_hash, page_count,
    placement_x, placement_y, placement_width, placement_height, page_number, pdf_width, pdf_height,
    recipient_name, recipient_email, admin_id, status, created_at, expires_at,
    signed_at, signer_ip, signed_content_ref, signed_content_hash";

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                token TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                file_name TEXT NOT NULL,
                original_ref TEXT NOT NULL,
                original_hash TEXT NOT NULL,
                page_count INTEGER NOT NULL,
                placement_x REAL NOT NULL,
                placement_y REAL NOT NULL,
                placement_width REAL NOT NULL,
                placement_height REAL NOT NULL,
                page_number INTEGER NOT NULL CHECK (page_number >= 1 AND page_number <= page_count),
                pdf_width REAL NOT NULL,
                pdf_height REAL NOT NULL,
                recipient_name TEXT,
                recipient_email TEXT,
                admin_id TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                signed_at INTEGER,
                signer_ip TEXT,
                signed_content_ref TEXT,
                signed_content_hash TEXT,
                CHECK ((status = 'SIGNED') = (signed_at IS NOT NULL AND signed_content_ref IS NOT NULL))
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_admin_created ON documents(admin_id, created_at)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_status ON documents(status)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    fn find_one(&self, column: &str, value: &str) -> Result<Document, DatabaseError> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM documents WHERE {column} = ?1"),
                params![value],
                Self::row_to_document,
            )
            .optional()?;

        doc.ok_or(DatabaseError::NotFound)
    }

    fn row_to_document(row: &rusqlite::Row) -> Result<Document, rusqlite::Error> {
        let status: String = row.get(17)?;
        let status = status
            .parse::<DocumentStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(17, Type::Text, e.into()))?;

        let signed_at: Option<i64> = row.get(20)?;
        let signed_content_ref: Option<String> = row.get(22)?;
        let signature = match (signed_at, signed_content_ref) {
            (Some(signed_at), Some(signed_content_ref)) => Some(SignatureRecord {
                signed_at: from_millis(20, signed_at)?,
                signer_ip: row.get::<_, Option<String>>(21)?.unwrap_or_default(),
                signed_content_ref,
                signed_content_hash: row.get::<_, Option<String>>(23)?.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Document {
            id: row.get(0)?,
            token: row.get(1)?,
            title: row.get(2)?,
            file_name: row.get(3)?,
            original_ref: row.get(4)?,
            original_hash: row.get(5)?,
            page_count: row.get(6)?,
            placement: Placement {
                x: row.get(7)?,
                y: row.get(8)?,
                width: row.get(9)?,
                height: row.get(10)?,
                page_number: row.get(11)?,
                pdf_width: row.get(12)?,
                pdf_height: row.get(13)?,
            },
            recipient_name: row.get(14)?,
            recipient_email: row.get(15)?,
            admin_id: row.get(16)?,
            status,
            created_at: from_millis(18, row.get(18)?)?,
            expires_at: from_millis(19, row.get(19)?)?,
            signature,
        })
    }
}

fn from_millis(idx: usize, millis: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {millis}").into(),
        )
    })
}

impl DocumentRepository for SqliteRepository {
    fn insert(&self, doc: &Document) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let p = &doc.placement;
        match conn.execute(
            &format!(
                "INSERT INTO documents ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18, ?19, ?20, NULL, NULL, NULL, NULL)"
            ),
            params![
                &doc.id,
                &doc.token,
                &doc.title,
                &doc.file_name,
                &doc.original_ref,
                &doc.original_hash,
                doc.page_count,
                p.x,
                p.y,
                p.width,
                p.height,
                p.page_number,
                p.pdf_width,
                p.pdf_height,
                &doc.recipient_name,
                &doc.recipient_email,
                &doc.admin_id,
                DocumentStatus::Pending.as_str(),
                doc.created_at.timestamp_millis(),
                doc.expires_at.timestamp_millis(),
            ],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                if err.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.as_deref().map_or(false, |m| m.contains("UNIQUE"))
                {
                    Err(DatabaseError::DuplicateToken)
                } else {
                    Err(rusqlite::Error::SqliteFailure(err, msg).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_token(&self, token: &str) -> Result<Document, DatabaseError> {
        self.find_one("token", token)
    }

    fn find_by_id(&self, id: &str) -> Result<Document, DatabaseError> {
        self.find_one("id", id)
    }

    fn transition_status(
        &self,
        token: &str,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<bool, DatabaseError> {
        if to == DocumentStatus::Signed || !from.can_transition_to(to) {
            return Err(DatabaseError::IllegalTransition { from, to });
        }
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents SET status = ?3 WHERE token = ?1 AND status = ?2",
            params![token, from.as_str(), to.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn commit_signature(
        &self,
        token: &str,
        record: &SignatureRecord,
    ) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents
             SET status = 'SIGNED', signed_at = ?2, signer_ip = ?3,
                 signed_content_ref = ?4, signed_content_hash = ?5
             WHERE token = ?1 AND status = 'PENDING'",
            params![
                token,
                record.signed_at.timestamp_millis(),
                &record.signer_ip,
                &record.signed_content_ref,
                &record.signed_content_hash,
            ],
        )?;
        Ok(changed == 1)
    }

    fn count_documents(&self) -> Result<usize, DatabaseError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn list_by_admin(&self, admin_id: &str) -> Result<Vec<Document>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM documents WHERE admin_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![admin_id], Self::row_to_document)?;
        let docs = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }
}
