//! Contact form submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkure_core::{ContactSubmissionId, Email, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: ContactSubmissionId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// The contact form as posted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_CHARS: usize = 10;
const MIN_MESSAGE_CHARS: usize = 10;

impl NewContactSubmission {
    /// Trim and validate the form.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message describing the first invalid field.
    pub fn validated(self) -> Result<Self, String> {
        let first_name = self.first_name.trim().to_owned();
        let last_name = self.last_name.trim().to_owned();
        let phone = self.phone.trim().to_owned();
        let message = self.message.trim().to_owned();

        if first_name.chars().count() < MIN_NAME_CHARS {
            return Err(format!("First name must be at least {MIN_NAME_CHARS} characters"));
        }
        if last_name.chars().count() < MIN_NAME_CHARS {
            return Err(format!("Last name must be at least {MIN_NAME_CHARS} characters"));
        }
        let email = Email::parse(&self.email)
            .map_err(|_| "Please enter a valid email address".to_owned())?;
        if phone.chars().count() < MIN_PHONE_CHARS {
            return Err(format!(
                "Phone number must be at least {MIN_PHONE_CHARS} characters"
            ));
        }
        if message.chars().count() < MIN_MESSAGE_CHARS {
            return Err(format!(
                "Message must be at least {MIN_MESSAGE_CHARS} characters"
            ));
        }

        Ok(Self {
            first_name,
            last_name,
            email: email.into_inner(),
            phone,
            message,
        })
    }
}
