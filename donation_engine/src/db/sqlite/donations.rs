use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Donation, DonationId, DonationLookup, NewDonation, OrderId, PaymentId, StatusChange},
};

/// Inserts a new `PENDING` donation. Both the donation id and the gateway order id are unique, so a second insert for
/// either fails with the matching duplicate error.
pub async fn insert_donation(donation: NewDonation, conn: &mut SqliteConnection) -> Result<Donation, SqliteDatabaseError> {
    let id = donation.id.clone();
    let order_id = donation.gateway_order_id.clone();
    let record = sqlx::query_as::<_, Donation>(
        r#"
            INSERT INTO donations (
                id,
                amount,
                currency,
                donor_name,
                donor_email,
                donor_phone,
                gateway_order_id,
                program_id,
                referral_code_id,
                referral_owner_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *;
        "#,
    )
    .bind(donation.id)
    .bind(donation.amount)
    .bind(donation.currency)
    .bind(donation.donor_name)
    .bind(donation.donor_email)
    .bind(donation.donor_phone)
    .bind(donation.gateway_order_id)
    .bind(donation.program_id)
    .bind(donation.referral_code_id)
    .bind(donation.referral_owner_id)
    .fetch_one(&mut *conn)
    .await;
    match record {
        Ok(record) => {
            debug!("🗃️ {record} has been saved");
            Ok(record)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            match fetch_donation(&DonationLookup::ByOrderId(order_id.clone()), conn).await? {
                Some(_) => Err(SqliteDatabaseError::DuplicateOrder(order_id)),
                None => Err(SqliteDatabaseError::DuplicateDonation(id.to_string())),
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_donation(
    lookup: &DonationLookup,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, SqliteDatabaseError> {
    trace!("🗃️ Fetching donation by {lookup}");
    let query = match lookup {
        DonationLookup::ById(id) => sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE id = ?1").bind(id),
        DonationLookup::ByOrderId(id) => {
            sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE gateway_order_id = ?1").bind(id)
        },
        // A donation that captured the payment always wins over any other row carrying the same id
        DonationLookup::ByPaymentId(id) => sqlx::query_as::<_, Donation>(
            r#"
                SELECT * FROM donations WHERE gateway_payment_id = ?1
                ORDER BY CASE WHEN status IN ('SUCCESS', 'REFUNDED') THEN 0 ELSE 1 END, updated_at DESC, id ASC
                LIMIT 1
            "#,
        )
        .bind(id),
    };
    let donation = query.fetch_optional(conn).await?;
    Ok(donation)
}

pub async fn fetch_donation_by_id(
    id: &DonationId,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, SqliteDatabaseError> {
    fetch_donation(&DonationLookup::ById(id.clone()), conn).await
}

/// The conditional status write. The `WHERE status = ?` clause is what makes concurrent reconciliation safe: of any
/// number of writers that observed the same `from` status, exactly one sees a row come back.
///
/// A `SUCCESS` write replaces the recorded payment id with the captured one. Any other write only fills it in if it is
/// missing.
pub async fn conditional_update_status(
    change: &StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, SqliteDatabaseError> {
    let donation = sqlx::query_as::<_, Donation>(
        r#"
            UPDATE donations SET
                status = ?1,
                gateway_payment_id = CASE
                    WHEN ?2 IS NULL THEN gateway_payment_id
                    WHEN ?1 = 'SUCCESS' THEN ?2
                    ELSE COALESCE(gateway_payment_id, ?2)
                END,
                failure_reason = COALESCE(?3, failure_reason),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?4 AND status = ?5
            RETURNING *;
        "#,
    )
    .bind(change.to)
    .bind(change.payment_id.as_ref())
    .bind(change.reason.as_deref())
    .bind(&change.donation_id)
    .bind(change.from)
    .fetch_optional(conn)
    .await?;
    match &donation {
        Some(d) => debug!("🗃️ Donation {} moved {} -> {}", d.id, change.from, change.to),
        None => debug!(
            "🗃️ Donation {} was no longer {}. The {} write was not applied",
            change.donation_id, change.from, change.to
        ),
    }
    Ok(donation)
}

/// Records a pre-capture payment id on a pending donation that does not have one yet.
pub async fn record_authorized_payment(
    order_id: &OrderId,
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Donation>, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE donations SET
                gateway_payment_id = ?1,
                updated_at = CURRENT_TIMESTAMP
            WHERE gateway_order_id = ?2 AND status = 'PENDING' AND gateway_payment_id IS NULL;
        "#,
    )
    .bind(payment_id)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ Authorized payment {payment_id} recorded against order {order_id}");
    }
    fetch_donation(&DonationLookup::ByOrderId(order_id.clone()), conn).await
}
