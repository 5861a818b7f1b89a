use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoNextError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Migration {id} ({name}) failed: {source}")]
    Migration {
        id: i64,
        name: String,
        source: rusqlite::Error,
    },

    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database connection lock was poisoned")]
    Lock,
}

impl GoNextError {
    /// True for failures the user can fix by correcting what they typed or
    /// which file they picked, as opposed to storage or I/O faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            GoNextError::InvalidBackupFormat(_)
                | GoNextError::InvalidInput(_)
                | GoNextError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GoNextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(GoNextError::InvalidBackupFormat("version".into()).is_user_facing());
        assert!(GoNextError::InvalidInput("name".into()).is_user_facing());
        assert!(!GoNextError::Lock.is_user_facing());
        assert!(!GoNextError::Storage(rusqlite::Error::QueryReturnedNoRows).is_user_facing());
    }

    #[test]
    fn test_migration_error_message_names_migration() {
        let err = GoNextError::Migration {
            id: 2,
            name: "place-coordinates-text".into(),
            source: rusqlite::Error::QueryReturnedNoRows,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Migration 2 (place-coordinates-text) failed"));
    }
}
