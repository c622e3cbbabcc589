use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("FETCH_FAILED: {0}")]
    Fetch(String),
    #[error("CREATE_FAILED: {0}")]
    Create(String),
    #[error("UPDATE_FAILED: {0}")]
    Update(String),
    #[error("DELETE_FAILED: {0}")]
    Delete(String),
    #[error("PERMISSION_DENIED: {0}")]
    Permission(String),
}

impl StoreError {
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
