//! Domain models returned by repositories and serialized to clients.
//!
//! JSON field names are camelCase. Password hashes and invitation tokens
//! never appear in any serialized model.

pub mod application;
pub mod chat;
pub mod cleaning;
pub mod contact;
pub mod invitation;
pub mod notification;
pub mod timestamp;
pub mod user;

pub use application::{ApplicationWithApplicant, EmployeeApplication, NewApplication};
pub use chat::{ChatMember, ChatMessage, ChatParticipant, ChatRoom, ChatRoomOverview};
pub use cleaning::{
    Cleaning, CleaningDetail, CleaningForm, CleaningPatch, HistorySummary, NewCleaning, PaymentSummary,
    ReviewAuthor, ReviewSummary, ServiceTypeCount,
};
pub use contact::{ContactSubmission, NewContactSubmission};
pub use invitation::{AdminInvitation, PendingInvitation};
pub use notification::{NewNotification, Notification};
pub use user::{ProfileUpdate, User, UserSummary};
