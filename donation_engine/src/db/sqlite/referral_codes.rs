use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{MinorUnits, NewReferralCode, ReferralCode, ReferralCodeId, ResolvedReferral},
};

pub async fn insert_referral_code(
    code: NewReferralCode,
    conn: &mut SqliteConnection,
) -> Result<ReferralCode, SqliteDatabaseError> {
    let code = sqlx::query_as::<_, ReferralCode>(
        r#"
            INSERT INTO referral_codes (id, code, owner_account_id, parent_code_id, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *;
        "#,
    )
    .bind(code.id)
    .bind(code.code)
    .bind(code.owner_account_id)
    .bind(code.parent_code_id)
    .bind(code.active)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Referral code {} ({}) has been created for {}", code.id, code.code, code.owner_account_id);
    Ok(code)
}

pub async fn fetch_referral_code(
    id: &ReferralCodeId,
    conn: &mut SqliteConnection,
) -> Result<Option<ReferralCode>, SqliteDatabaseError> {
    let code = sqlx::query_as::<_, ReferralCode>("SELECT * FROM referral_codes WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(code)
}

/// Exact, case-sensitive match on active codes.
pub async fn resolve(code: &str, conn: &mut SqliteConnection) -> Result<Option<ResolvedReferral>, SqliteDatabaseError> {
    trace!("🗃️ Resolving referral code '{code}'");
    let resolved = sqlx::query_as::<_, ResolvedReferral>(
        r#"
            SELECT id AS referral_code_id, owner_account_id, parent_code_id
            FROM referral_codes
            WHERE code = ?1 AND active = TRUE;
        "#,
    )
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(resolved)
}

/// Adds `amount` and `count` (either may be negative) to the code's running totals, clamped at zero. Credits also
/// stamp `last_used`.
pub async fn adjust_totals(
    id: &ReferralCodeId,
    amount: MinorUnits,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let last_used = if count > 0 { Some(Utc::now()) } else { None };
    let result = sqlx::query(
        r#"
            UPDATE referral_codes SET
                total_amount = MAX(total_amount + ?1, 0),
                total_donations = MAX(total_donations + ?2, 0),
                last_used = COALESCE(?3, last_used),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?4;
        "#,
    )
    .bind(amount)
    .bind(count)
    .bind(last_used)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::ReferralCodeNotFound(id.to_string()));
    }
    debug!("🗃️ Referral code {id} totals adjusted by {amount} ({count:+} donations)");
    Ok(())
}

pub async fn recompute_totals(
    id: &ReferralCodeId,
    conn: &mut SqliteConnection,
) -> Result<ReferralCode, SqliteDatabaseError> {
    let code = sqlx::query_as::<_, ReferralCode>(
        r#"
            UPDATE referral_codes SET
                total_amount = MAX(
                    (SELECT COALESCE(SUM(amount), 0) FROM donations WHERE referral_code_id = ?1 AND status = 'SUCCESS') -
                    (SELECT COALESCE(SUM(amount * direction), 0) FROM propagation_journal
                        WHERE referral_code_id = ?1 AND applied_at IS NULL),
                    0
                ),
                total_donations = MAX(
                    (SELECT COUNT(*) FROM donations WHERE referral_code_id = ?1 AND status = 'SUCCESS') -
                    (SELECT COALESCE(SUM(direction), 0) FROM propagation_journal
                        WHERE referral_code_id = ?1 AND applied_at IS NULL),
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
    .ok_or_else(|| SqliteDatabaseError::ReferralCodeNotFound(id.to_string()))?;
    debug!("🗃️ Referral code {id} totals recomputed: {} from {} donations", code.total_amount, code.total_donations);
    Ok(code)
}
