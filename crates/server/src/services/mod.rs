//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts, session tokens, admin bootstrap and invitation redemption
//! - `applications` - Employee application submission and review
//! - `chat` - Direct messaging with message notifications
//! - `cleanings` - Booking lifecycle under the access policy
//! - `invitations` - Admin invitation issuance and housekeeping
//!
//! Services own their transactions. Repositories expose `*_on` functions
//! taking a `&mut PgConnection` so several of them can share one.

pub mod applications;
pub mod auth;
pub mod chat;
pub mod cleanings;
pub mod invitations;

pub use applications::{ApplicationError, ApplicationService};
pub use auth::{AuthError, AuthService, Claims, TokenError, TokenService};
pub use chat::{ChatError, ChatService};
pub use cleanings::{CleaningError, CleaningService};
pub use invitations::{InvitationError, InvitationService, IssuedInvitation};
