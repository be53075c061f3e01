//! Booking models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sparkure_core::{
    CleaningId, CleaningStatus, PaymentId, PaymentMethod, PaymentStatus, Priority, Resource,
    ReviewId, ServiceType, UserId,
};

use super::{UserSummary, timestamp};

/// A booked cleaning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleaning {
    pub id: CleaningId,
    pub customer_id: UserId,
    pub employee_id: Option<UserId>,
    pub service_type: ServiceType,
    pub status: CleaningStatus,
    pub date: DateTime<Utc>,
    pub address: String,
    pub note: Option<String>,
    pub price: Option<Decimal>,
    /// Minutes.
    pub duration: Option<i32>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cleaning {
    /// The access-control view of this booking.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        Resource::Cleaning {
            customer_id: self.customer_id,
            employee_id: self.employee_id,
            status: self.status,
        }
    }
}

/// A booking with the people and records attached to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningDetail {
    #[serde(flatten)]
    pub cleaning: Cleaning,
    pub customer: UserSummary,
    pub employee: Option<UserSummary>,
    pub reviews: Vec<ReviewSummary>,
    pub payments: Vec<PaymentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub id: ReviewId,
    pub rating: i16,
    pub comment: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub customer: ReviewAuthor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: PaymentId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
}

/// Booking form as posted. Required fields are optional here so a missing
/// one is reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningForm {
    pub service_type: Option<ServiceType>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub date: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub price: Option<Decimal>,
    pub duration: Option<i32>,
    pub priority: Option<Priority>,
}

impl CleaningForm {
    /// Check required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first problem found.
    pub fn validated(self) -> Result<NewCleaning, String> {
        let service_type = self.service_type.ok_or("serviceType is required")?;
        let date = self.date.ok_or("date is required")?;
        let address = self
            .address
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .ok_or("address is required")?;
        validate_price(self.price)?;
        validate_duration(self.duration)?;

        Ok(NewCleaning {
            service_type,
            date,
            address,
            note: self.note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
            price: self.price,
            duration: self.duration,
            priority: self.priority.unwrap_or_default(),
        })
    }
}

/// Largest amount the `NUMERIC(10,2)` price column holds.
fn validate_price(price: Option<Decimal>) -> Result<(), String> {
    // NUMERIC(10,2)
    let max_price = Decimal::new(9_999_999_999, 2);
    match price {
        Some(p) if p.is_sign_negative() => Err("price must not be negative".to_owned()),
        Some(p) if p > max_price => Err(format!("price must not exceed {max_price}")),
        Some(p) if p.normalize().scale() > 2 => {
            Err("price must have at most 2 decimal places".to_owned())
        }
        _ => Ok(()),
    }
}

fn validate_duration(duration: Option<i32>) -> Result<(), String> {
    match duration {
        Some(d) if d <= 0 => Err("duration must be a positive number of minutes".to_owned()),
        _ => Ok(()),
    }
}

/// Fields a customer supplies when booking.
#[derive(Debug, Clone)]
pub struct NewCleaning {
    pub service_type: ServiceType,
    pub date: DateTime<Utc>,
    pub address: String,
    pub note: Option<String>,
    pub price: Option<Decimal>,
    pub duration: Option<i32>,
    pub priority: Priority,
}

/// Sparse update to a booking. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningPatch {
    pub status: Option<CleaningStatus>,
    pub employee_id: Option<UserId>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub date: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub price: Option<Decimal>,
    pub duration: Option<i32>,
    pub priority: Option<Priority>,
}

impl CleaningPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.employee_id.is_none()
            && self.date.is_none()
            && self.address.is_none()
            && self.note.is_none()
            && self.price.is_none()
            && self.duration.is_none()
            && self.priority.is_none()
    }

    /// Range checks shared with [`CleaningForm`].
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first problem found.
    pub fn check_ranges(&self) -> Result<(), String> {
        if self.address.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err("address must not be blank".to_owned());
        }
        validate_price(self.price)?;
        validate_duration(self.duration)
    }
}

/// Aggregates over a customer's completed bookings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total_spent: Decimal,
    pub service_type_counts: Vec<ServiceTypeCount>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeCount {
    pub service_type: ServiceType,
    pub count: i64,
}
