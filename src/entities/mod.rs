//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod blog;
pub mod conversation;
pub mod enterprise;
pub mod enums;
pub mod message;
pub mod notification;
pub mod product;
pub mod review;
pub mod user;

// Re-exports per facilitare l'import
pub use blog::Article;
pub use conversation::{Conversation, Participant};
pub use enterprise::{Adresse, Entreprise, EntrepriseDetail};
pub use enums::{
    AdminNotificationType, ConversationType, MessageType, NotificationType, OfferType, Priority,
    ProductStatus, ReportReason, ReportStatus, ReviewStatus, Role, UserStatus, VerificationStatus,
};
pub use message::{Attachment, Message};
pub use notification::{AdminNotification, Notification};
pub use product::{Category, Product, ProductImage, popularity_score};
pub use review::{Review, ReviewReport, ReviewResponse};
pub use user::User;
