//! Employee application models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sparkure_core::{ApplicationId, ApplicationStatus, UserId};

use super::UserSummary;

/// A customer's request to become an employee.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub phone: String,
    pub address: String,
    pub experience: String,
    pub skills: Vec<String>,
    pub availability: String,
    pub status: ApplicationStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithApplicant {
    #[serde(flatten)]
    pub application: EmployeeApplication,
    pub user: UserSummary,
}

/// Application form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewApplication {
    pub phone: String,
    pub address: String,
    pub experience: String,
    pub skills: Vec<String>,
    pub availability: String,
}

impl NewApplication {
    /// Trim every field and drop blank skills.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            experience: self.experience.trim().to_owned(),
            skills: self
                .skills
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
            availability: self.availability.trim().to_owned(),
        }
    }

    /// The first missing field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("phone", self.phone.is_empty()),
            ("address", self.address.is_empty()),
            ("experience", self.experience.is_empty()),
            ("skills", self.skills.is_empty()),
            ("availability", self.availability.is_empty()),
        ]
        .into_iter()
        .find_map(|(name, missing)| missing.then_some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> NewApplication {
        NewApplication {
            phone: " 555-0100 ".to_owned(),
            address: "1 Elm St".to_owned(),
            experience: "3 years".to_owned(),
            skills: vec!["windows".to_owned(), "  ".to_owned()],
            availability: "weekdays".to_owned(),
        }
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_skills() {
        let app = form().normalized();
        assert_eq!(app.phone, "555-0100");
        assert_eq!(app.skills, vec!["windows".to_owned()]);
        assert_eq!(app.missing_field(), None);
    }

    #[test]
    fn test_missing_field_reports_first_gap() {
        let mut app = form();
        app.skills = vec![" ".to_owned()];
        assert_eq!(app.normalized().missing_field(), Some("skills"));

        let mut app = form();
        app.experience = "   ".to_owned();
        assert_eq!(app.normalized().missing_field(), Some("experience"));
    }
}
