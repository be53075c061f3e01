//! Employee applications: submission by customers, review by admins.

use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use sparkure_core::{ApplicationId, ApplicationStatus, NotificationType, Page, PageInfo, Role, UserId};

use crate::db::{ApplicationRepository, NotificationRepository, RepositoryError, UserRepository};
use crate::models::{
    ApplicationWithApplicant, EmployeeApplication, NewApplication, NewNotification, User,
};

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("user is already an employee")]
    AlreadyEmployee,

    /// Only customer accounts can apply or be promoted.
    #[error("only customers can apply to become employees")]
    NotCustomer,

    #[error("a pending application already exists")]
    DuplicatePending,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("application not found")]
    NotFound,

    #[error("application has already been reviewed")]
    AlreadyReviewed,

    /// The review decision was not APPROVED or REJECTED.
    #[error("decision must be APPROVED or REJECTED")]
    InvalidDecision,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ApplicationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

pub struct ApplicationService<'a> {
    pool: &'a PgPool,
    applications: ApplicationRepository<'a>,
}

impl<'a> ApplicationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            applications: ApplicationRepository::new(pool),
        }
    }

    /// Submit an application for `user`.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::AlreadyEmployee` for employees,
    /// `ApplicationError::NotCustomer` for administrators,
    /// `ApplicationError::DuplicatePending` while another application is
    /// pending, `ApplicationError::MissingField` for blank fields.
    #[instrument(skip(self, user, form), fields(user_id = %user.id))]
    pub async fn apply(
        &self,
        user: &User,
        form: NewApplication,
    ) -> Result<ApplicationWithApplicant, ApplicationError> {
        match user.role {
            Role::User => {}
            Role::Employee => return Err(ApplicationError::AlreadyEmployee),
            Role::Admin => return Err(ApplicationError::NotCustomer),
        }
        let form = form.normalized();
        if let Some(field) = form.missing_field() {
            return Err(ApplicationError::MissingField(field));
        }
        if self.applications.has_pending(user.id).await? {
            return Err(ApplicationError::DuplicatePending);
        }

        let created = self
            .applications
            .create(user.id, &form)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ApplicationError::DuplicatePending,
                other => ApplicationError::Repository(other),
            })?;

        tracing::info!(application_id = %created.application.id, "Employee application submitted");
        Ok(created)
    }

    /// The user's most recent application, if any.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Repository` if the query fails.
    pub async fn latest(
        &self,
        user_id: UserId,
    ) -> Result<Option<EmployeeApplication>, ApplicationError> {
        Ok(self.applications.latest_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApplicationError::Repository` if a query fails.
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        page: Page,
    ) -> Result<(Vec<ApplicationWithApplicant>, PageInfo), ApplicationError> {
        let (items, total) = self.applications.list(status, page).await?;
        Ok((items, page.info(total)))
    }

    /// Decide a pending application.
    ///
    /// Approval updates the application, promotes the applicant (copying
    /// phone and address onto their profile) and notifies them, all in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound`, `ApplicationError::AlreadyReviewed`
    /// or `ApplicationError::InvalidDecision`. Approval returns
    /// `ApplicationError::NotCustomer` and changes nothing when the applicant
    /// is no longer a customer.
    #[instrument(skip(self, notes))]
    pub async fn review(
        &self,
        reviewer: UserId,
        id: ApplicationId,
        decision: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<ApplicationWithApplicant, ApplicationError> {
        if !decision.is_decision() {
            return Err(ApplicationError::InvalidDecision);
        }
        let notes = notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());

        let mut tx = self.pool.begin().await?;

        let application = ApplicationRepository::lock_on(&mut tx, id)
            .await?
            .ok_or(ApplicationError::NotFound)?;
        if application.status != ApplicationStatus::Pending {
            return Err(ApplicationError::AlreadyReviewed);
        }

        ApplicationRepository::record_review_on(&mut tx, id, decision, reviewer, notes.as_deref())
            .await?;

        if decision == ApplicationStatus::Approved {
            UserRepository::promote_to_employee_on(
                &mut tx,
                application.user_id,
                &application.phone,
                &application.address,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ApplicationError::NotCustomer,
                other => ApplicationError::Repository(other),
            })?;
        }

        NotificationRepository::insert_on(&mut tx, &decision_notice(&application, decision))
            .await?;

        let reviewed = ApplicationRepository::get_with_applicant_on(&mut tx, id)
            .await?
            .ok_or(ApplicationError::NotFound)?;
        tx.commit().await?;

        tracing::info!(application_id = %id, decision = %decision, "Employee application reviewed");
        Ok(reviewed)
    }
}

fn decision_notice(application: &EmployeeApplication, decision: ApplicationStatus) -> NewNotification {
    let (title, message) = if decision == ApplicationStatus::Approved {
        (
            "Application approved",
            "Welcome aboard! Your employee application was approved. Sign in again to open the employee dashboard.",
        )
    } else {
        (
            "Application rejected",
            "Your employee application was not approved this time.",
        )
    };
    NewNotification::new(
        application.user_id,
        NotificationType::SystemUpdate,
        title,
        message,
    )
    .with_data(json!({ "applicationId": application.id, "status": decision }))
}
