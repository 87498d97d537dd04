use thiserror::Error;

use crate::{db::traits::LedgerError, db_types::OrderId};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Donation {0} already exists")]
    DuplicateDonation(String),
    #[error("Gateway order {0} is already bound to a donation")]
    DuplicateOrder(OrderId),
    #[error("Program {0} does not exist")]
    ProgramNotFound(String),
    #[error("Referral code {0} does not exist")]
    ReferralCodeNotFound(String),
    #[error("Invalid record: {0}")]
    CorruptRecord(String),
}

impl From<SqliteDatabaseError> for LedgerError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateDonation(id) => LedgerError::DonationAlreadyExists(id.into()),
            SqliteDatabaseError::DuplicateOrder(id) => LedgerError::OrderAlreadyBound(id),
            SqliteDatabaseError::ProgramNotFound(id) => LedgerError::ProgramNotFound(id),
            SqliteDatabaseError::ReferralCodeNotFound(id) => LedgerError::ReferralCodeNotFound(id),
            SqliteDatabaseError::CorruptRecord(s) => LedgerError::CorruptRecord(s),
            e => LedgerError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
