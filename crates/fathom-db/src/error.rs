use sqlx::error::ErrorKind;
use thiserror::Error;

/// Repository error surface.
///
/// Writes that break uniqueness or foreign-key constraints surface as
/// [`RepositoryError::ConstraintViolation`]; read/update/delete misses are
/// absent results or `false`, never errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return RepositoryError::ConstraintViolation(db_err.to_string());
                }
                _ => {}
            }
        }
        RepositoryError::Database(err)
    }
}
