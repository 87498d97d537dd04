//! The propagation journal. Every committed funding transition writes exactly one entry here, in the same
//! transaction as the status change. An entry is pending until its delta has been applied to the aggregates.
use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{
        AggregateDelta,
        Direction,
        DonationId,
        MinorUnits,
        ProgramId,
        PropagationTicket,
        ReferralCodeId,
        TransitionKind,
    },
};

#[derive(Debug, Clone, FromRow)]
struct JournalRow {
    id: i64,
    donation_id: DonationId,
    payment_id: String,
    kind: TransitionKind,
    program_id: Option<ProgramId>,
    referral_code_id: Option<ReferralCodeId>,
    amount: MinorUnits,
    direction: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<JournalRow> for PropagationTicket {
    type Error = SqliteDatabaseError;

    fn try_from(row: JournalRow) -> Result<Self, Self::Error> {
        let direction = Direction::from_signum(row.direction).ok_or_else(|| {
            SqliteDatabaseError::CorruptRecord(format!("Journal entry {} has direction {}", row.id, row.direction))
        })?;
        Ok(PropagationTicket {
            id: row.id,
            donation_id: row.donation_id,
            payment_id: row.payment_id,
            kind: row.kind,
            delta: AggregateDelta {
                program_id: row.program_id,
                referral_code_id: row.referral_code_id,
                amount: row.amount,
                direction,
            },
            created_at: row.created_at,
        })
    }
}

/// Writes a journal entry. Entries are unique per `(donation, payment, kind)`; if one already exists, nothing is
/// written and `None` is returned.
pub async fn insert_ticket(
    donation_id: &DonationId,
    payment_id: &str,
    kind: TransitionKind,
    delta: &AggregateDelta,
    conn: &mut SqliteConnection,
) -> Result<Option<PropagationTicket>, SqliteDatabaseError> {
    let row = sqlx::query_as::<_, JournalRow>(
        r#"
            INSERT OR IGNORE INTO propagation_journal (
                donation_id,
                payment_id,
                kind,
                program_id,
                referral_code_id,
                amount,
                direction
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, donation_id, payment_id, kind, program_id, referral_code_id, amount, direction, created_at;
        "#,
    )
    .bind(donation_id)
    .bind(payment_id)
    .bind(kind)
    .bind(delta.program_id.as_ref())
    .bind(delta.referral_code_id.as_ref())
    .bind(delta.amount)
    .bind(delta.direction.signum())
    .fetch_optional(conn)
    .await?;
    match row {
        Some(row) => {
            let ticket = PropagationTicket::try_from(row)?;
            debug!("🗃️ Journal entry #{} issued for donation {donation_id}: {}", ticket.id, ticket.delta);
            Ok(Some(ticket))
        },
        None => {
            debug!("🗃️ A {kind} journal entry for donation {donation_id} / {payment_id} already exists");
            Ok(None)
        },
    }
}

/// Marks the entry as applied. Returns `false` if it had already been applied (or does not exist), in which case the
/// caller must not touch the aggregates.
pub async fn claim_ticket(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE propagation_journal SET applied_at = CURRENT_TIMESTAMP WHERE id = ?1 AND applied_at IS NULL;",
    )
    .bind(id)
    .execute(conn)
    .await?;
    let claimed = result.rows_affected() > 0;
    trace!("🗃️ Journal entry #{id} claimed: {claimed}");
    Ok(claimed)
}

pub async fn fetch_pending(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<PropagationTicket>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, JournalRow>(
        r#"
            SELECT id, donation_id, payment_id, kind, program_id, referral_code_id, amount, direction, created_at
            FROM propagation_journal
            WHERE applied_at IS NULL
            ORDER BY id ASC
            LIMIT ?1;
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(PropagationTicket::try_from).collect()
}
