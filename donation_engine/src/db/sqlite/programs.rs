use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{MinorUnits, NewProgram, Program, ProgramId},
};

pub async fn insert_program(program: NewProgram, conn: &mut SqliteConnection) -> Result<Program, SqliteDatabaseError> {
    let program = sqlx::query_as::<_, Program>(
        "INSERT INTO programs (id, name, target_amount) VALUES (?1, ?2, ?3) RETURNING *;",
    )
    .bind(program.id)
    .bind(program.name)
    .bind(program.target_amount)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Program {} ({}) has been created", program.id, program.name);
    Ok(program)
}

pub async fn fetch_program(id: &ProgramId, conn: &mut SqliteConnection) -> Result<Option<Program>, SqliteDatabaseError> {
    let program = sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = ?1").bind(id).fetch_optional(conn).await?;
    Ok(program)
}

/// Adds `amount` and `count` (either may be negative) to the program's running totals. Neither total drops below zero.
///
/// Returns `ProgramNotFound` if the program does not exist.
pub async fn adjust_totals(
    id: &ProgramId,
    amount: MinorUnits,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE programs SET
                raised_amount = MAX(raised_amount + ?1, 0),
                donation_count = MAX(donation_count + ?2, 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?3;
        "#,
    )
    .bind(amount)
    .bind(count)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::ProgramNotFound(id.to_string()));
    }
    debug!("🗃️ Program {id} totals adjusted by {amount} ({count:+} donations)");
    Ok(())
}

/// Rebuilds the program's totals from its successful donations. Journal entries that have not been applied yet are
/// discounted, so that applying them afterwards lands on the correct total.
pub async fn recompute_totals(id: &ProgramId, conn: &mut SqliteConnection) -> Result<Program, SqliteDatabaseError> {
    let program = sqlx::query_as::<_, Program>(
        r#"
            UPDATE programs SET
                raised_amount = MAX(
                    (SELECT COALESCE(SUM(amount), 0) FROM donations WHERE program_id = ?1 AND status = 'SUCCESS') -
                    (SELECT COALESCE(SUM(amount * direction), 0) FROM propagation_journal
                        WHERE program_id = ?1 AND applied_at IS NULL),
                    0
                ),
                donation_count = MAX(
                    (SELECT COUNT(*) FROM donations WHERE program_id = ?1 AND status = 'SUCCESS') -
                    (SELECT COALESCE(SUM(direction), 0) FROM propagation_journal
                        WHERE program_id = ?1 AND applied_at IS NULL),
                    0
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| SqliteDatabaseError::ProgramNotFound(id.to_string()))?;
    debug!("🗃️ Program {id} totals recomputed: {} from {} donations", program.raised_amount, program.donation_count);
    Ok(program)
}
