//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod analytics;
pub mod blog;
pub mod enterprise;
pub mod message;
pub mod notification;
pub mod product;
pub mod query;
pub mod review;
pub mod user;
pub mod ws_event;

// Re-exports per facilitare l'import
pub use analytics::{
    CategoryStatDTO, ClickAction, ClickDTO, Counter, DailyStatDTO, GlobalStatsDTO,
    GlobalTotalsDTO, ProductStatsDTO, ProductSummaryDTO, StatsTotalsDTO, TopProductDTO,
};
pub use blog::{ArticleDTO, CreateArticleDTO, FeaturedQuery, RecentQuery, ShareDTO};
pub use enterprise::{EntrepriseListItemDTO, EntrepriseQuery, VerifyEntrepriseDTO};
pub use message::{
    ConversationDetailDTO, ConversationListQuery, ConversationSummaryDTO,
    ConversationWithCreatorDTO, CreateConversationDTO, LimitQuery, MessageDTO,
    MessageNotificationDTO, MessageRowDTO, MessageSearchQuery, MuteDTO, NewAttachment,
    ParticipantDTO, SearchResultDTO, SendMessageForm,
};
pub use notification::{
    AdminNotificationCountsDTO, AdminNotificationQuery, NewAdminNotification, NewNotification,
    NotificationCountsDTO, NotificationQuery, counts_map,
};
pub use product::{
    AddFavoriteDTO, CategoryWithCountDTO, CreateProductDTO, FavoriteStatsDTO, OfferPricing,
    PopularQuery, ProductDetailDTO, ProductListItemDTO, ProductQuery, SpecialOfferDTO,
    SpecialOfferQuery, UpdateProductDTO,
};
pub use query::{PageQuery, PageRequest, Pagination, Period, PeriodQuery};
pub use review::{
    CreateReviewDTO, ModerateReviewDTO, RatingStats, ReportQuery, ReportReviewDTO,
    ReviewListItemDTO, ReviewQuery, ReviewReplyDTO, ReviewReportItemDTO,
};
pub use user::{
    AdminUserQuery, AdminUserRowDTO, AuthResponseDTO, ChangePasswordDTO, CreateUserDTO, LoginDTO,
    ProfileDTO, RegisterDTO, RegisterEntrepriseDTO, UpdateProfileDTO, UpdateUserStatusDTO,
    UserDTO,
};
pub use ws_event::WsEventDTO;
