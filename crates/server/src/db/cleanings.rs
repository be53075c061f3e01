//! Booking repository.
//!
//! Lists and detail views join the customer and employee summaries in SQL
//! and attach reviews and payments with one extra query each.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgConnection, PgPool, Postgres};

use sparkure_core::{
    CleaningId, CleaningStatus, Page, PaymentId, PaymentMethod, PaymentStatus, Priority, ReviewId,
    ServiceType, UserId,
};

use super::RepositoryError;
use crate::models::{
    Cleaning, CleaningDetail, HistorySummary, NewCleaning, PaymentSummary, ReviewAuthor,
    ReviewSummary, ServiceTypeCount, UserSummary,
};

const CLEANING_COLUMNS: &str = "c.id, c.customer_id, c.employee_id, c.service_type, c.status, \
                                c.date, c.address, c.note, c.price, c.duration, c.priority, \
                                c.created_at, c.updated_at";

const JOINED_FROM: &str = "FROM cleanings c \
                           JOIN users cu ON cu.id = c.customer_id \
                           LEFT JOIN users em ON em.id = c.employee_id";

const PARTY_COLUMNS: &str = "cu.full_name AS customer_full_name, cu.email AS customer_email, \
                             cu.phone AS customer_phone, \
                             em.full_name AS employee_full_name, em.email AS employee_email, \
                             em.phone AS employee_phone";

const FILTER_WHERE: &str = "WHERE ($1::int4 IS NULL OR c.customer_id = $1) \
                            AND ($2::int4 IS NULL OR c.employee_id = $2) \
                            AND ($3::cleaning_status IS NULL OR c.status = $3) \
                            AND ($4::service_type IS NULL OR c.service_type = $4) \
                            AND ($5::timestamptz IS NULL OR c.date >= $5) \
                            AND ($6::timestamptz IS NULL OR c.date <= $6)";

#[derive(Debug, sqlx::FromRow)]
struct CleaningRow {
    id: CleaningId,
    customer_id: UserId,
    employee_id: Option<UserId>,
    service_type: ServiceType,
    status: CleaningStatus,
    date: DateTime<Utc>,
    address: String,
    note: Option<String>,
    price: Option<Decimal>,
    duration: Option<i32>,
    priority: Priority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CleaningRow> for Cleaning {
    fn from(row: CleaningRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            employee_id: row.employee_id,
            service_type: row.service_type,
            status: row.status,
            date: row.date,
            address: row.address,
            note: row.note,
            price: row.price,
            duration: row.duration,
            priority: row.priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    cleaning: CleaningRow,
    customer_full_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    employee_full_name: Option<String>,
    employee_email: Option<String>,
    employee_phone: Option<String>,
}

impl JoinedRow {
    fn into_detail(self) -> CleaningDetail {
        let customer = UserSummary {
            id: self.cleaning.customer_id,
            full_name: self.customer_full_name,
            email: self.customer_email,
            phone: self.customer_phone,
        };
        let employee = match (self.cleaning.employee_id, self.employee_full_name, self.employee_email)
        {
            (Some(id), Some(full_name), Some(email)) => Some(UserSummary {
                id,
                full_name,
                email,
                phone: self.employee_phone,
            }),
            _ => None,
        };

        CleaningDetail {
            cleaning: self.cleaning.into(),
            customer,
            employee,
            reviews: Vec::new(),
            payments: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    cleaning_id: CleaningId,
    rating: i16,
    comment: Option<String>,
    is_public: bool,
    created_at: DateTime<Utc>,
    customer_full_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    cleaning_id: CleaningId,
    amount: Decimal,
    status: PaymentStatus,
    method: PaymentMethod,
}

/// Row filter shared by the booking list and the history view.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningFilter {
    pub customer_id: Option<UserId>,
    pub employee_id: Option<UserId>,
    pub status: Option<CleaningStatus>,
    pub service_type: Option<ServiceType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl CleaningFilter {
    fn bind<'q, O>(
        self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.customer_id)
            .bind(self.employee_id)
            .bind(self.status)
            .bind(self.service_type)
            .bind(self.date_from)
            .bind(self.date_to)
    }
}

/// The resolved set of column changes for one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningChanges {
    pub status: Option<CleaningStatus>,
    pub employee_id: Option<UserId>,
    pub date: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub price: Option<Decimal>,
    pub duration: Option<i32>,
    pub priority: Option<Priority>,
}

/// Repository for booking database operations.
pub struct CleaningRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CleaningRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a booking in `SCHEDULED` state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_on(
        conn: &mut PgConnection,
        customer_id: UserId,
        new: &NewCleaning,
    ) -> Result<Cleaning, RepositoryError> {
        let row = sqlx::query_as::<_, CleaningRow>(&format!(
            r"
            INSERT INTO cleanings AS c
                (customer_id, service_type, date, address, note, price, duration, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CLEANING_COLUMNS}
            "
        ))
        .bind(customer_id)
        .bind(new.service_type)
        .bind(new.date)
        .bind(&new.address)
        .bind(new.note.as_deref())
        .bind(new.price)
        .bind(new.duration)
        .bind(new.priority)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.into())
    }

    /// Read a booking and hold its row lock until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_on(
        conn: &mut PgConnection,
        id: CleaningId,
    ) -> Result<Option<Cleaning>, RepositoryError> {
        let row = sqlx::query_as::<_, CleaningRow>(&format!(
            "SELECT {CLEANING_COLUMNS} FROM cleanings c WHERE c.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Fetch one booking with customer, employee, reviews and payments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: CleaningId) -> Result<Option<CleaningDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::get_detail_on(&mut conn, id).await
    }

    /// [`Self::get_detail`] on an existing connection or transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail_on(
        conn: &mut PgConnection,
        id: CleaningId,
    ) -> Result<Option<CleaningDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, JoinedRow>(&format!(
            "SELECT {CLEANING_COLUMNS}, {PARTY_COLUMNS} {JOINED_FROM} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut details = vec![row.into_detail()];
        attach_reviews_and_payments(conn, &mut details).await?;
        Ok(details.pop())
    }

    /// List bookings matching `filter`, newest date first.
    ///
    /// Returns the page of bookings and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: CleaningFilter,
        page: Page,
    ) -> Result<(Vec<CleaningDetail>, i64), RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {CLEANING_COLUMNS}, {PARTY_COLUMNS} {JOINED_FROM} {FILTER_WHERE} \
             ORDER BY c.date DESC, c.id DESC LIMIT $7 OFFSET $8"
        );
        let rows = filter
            .bind(sqlx::query_as::<_, JoinedRow>(&sql))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM cleanings c {FILTER_WHERE}");
        let (total,): (i64,) = filter
            .bind(sqlx::query_as(&count_sql))
            .fetch_one(&mut *conn)
            .await?;

        let mut details: Vec<CleaningDetail> = rows.into_iter().map(JoinedRow::into_detail).collect();
        attach_reviews_and_payments(&mut conn, &mut details).await?;
        Ok((details, total))
    }

    /// Total price and per-service counts over every booking matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn summarize(&self, filter: CleaningFilter) -> Result<HistorySummary, RepositoryError> {
        let sum_sql = format!("SELECT COALESCE(SUM(c.price), 0) FROM cleanings c {FILTER_WHERE}");
        let (total_spent,): (Decimal,) = filter
            .bind(sqlx::query_as(&sum_sql))
            .fetch_one(self.pool)
            .await?;

        let counts_sql = format!(
            "SELECT c.service_type, COUNT(*) AS count FROM cleanings c {FILTER_WHERE} \
             GROUP BY c.service_type ORDER BY c.service_type"
        );
        let service_type_counts = filter
            .bind(sqlx::query_as::<_, ServiceTypeCount>(&counts_sql))
            .fetch_all(self.pool)
            .await?;

        Ok(HistorySummary {
            total_spent,
            service_type_counts,
        })
    }

    /// Write the given column changes and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the booking vanished.
    pub async fn update_on(
        conn: &mut PgConnection,
        id: CleaningId,
        changes: &CleaningChanges,
    ) -> Result<Cleaning, RepositoryError> {
        let row = sqlx::query_as::<_, CleaningRow>(&format!(
            r"
            UPDATE cleanings AS c SET
                status = COALESCE($2, c.status),
                employee_id = COALESCE($3, c.employee_id),
                date = COALESCE($4, c.date),
                address = COALESCE($5, c.address),
                note = COALESCE($6, c.note),
                price = COALESCE($7, c.price),
                duration = COALESCE($8, c.duration),
                priority = COALESCE($9, c.priority),
                updated_at = NOW()
            WHERE c.id = $1
            RETURNING {CLEANING_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.employee_id)
        .bind(changes.date)
        .bind(changes.address.as_deref())
        .bind(changes.note.as_deref())
        .bind(changes.price)
        .bind(changes.duration)
        .bind(changes.priority)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a booking that is still `SCHEDULED`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such booking remains.
    pub async fn delete_scheduled_on(
        conn: &mut PgConnection,
        id: CleaningId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cleanings WHERE id = $1 AND status = 'SCHEDULED'")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn attach_reviews_and_payments(
    conn: &mut PgConnection,
    details: &mut [CleaningDetail],
) -> Result<(), RepositoryError> {
    if details.is_empty() {
        return Ok(());
    }
    let ids: Vec<CleaningId> = details.iter().map(|d| d.cleaning.id).collect();

    let reviews = sqlx::query_as::<_, ReviewRow>(
        r"
        SELECT r.id, r.cleaning_id, r.rating, r.comment, r.is_public, r.created_at,
               u.full_name AS customer_full_name
        FROM reviews r
        JOIN users u ON u.id = r.customer_id
        WHERE r.cleaning_id = ANY($1)
        ORDER BY r.created_at DESC
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let payments = sqlx::query_as::<_, PaymentRow>(
        r"
        SELECT id, cleaning_id, amount, status, method
        FROM payments
        WHERE cleaning_id = ANY($1)
        ORDER BY created_at DESC
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_id: HashMap<CleaningId, &mut CleaningDetail> =
        details.iter_mut().map(|d| (d.cleaning.id, d)).collect();

    for r in reviews {
        if let Some(detail) = by_id.get_mut(&r.cleaning_id) {
            detail.reviews.push(ReviewSummary {
                id: r.id,
                rating: r.rating,
                comment: r.comment,
                is_public: r.is_public,
                created_at: r.created_at,
                customer: ReviewAuthor {
                    full_name: r.customer_full_name,
                },
            });
        }
    }
    for p in payments {
        if let Some(detail) = by_id.get_mut(&p.cleaning_id) {
            detail.payments.push(PaymentSummary {
                id: p.id,
                amount: p.amount,
                status: p.status,
                method: p.method,
            });
        }
    }

    Ok(())
}
