pub mod class;
pub mod contact;
pub mod id;
pub mod presentation;
pub mod response;
pub mod slide;
pub mod user;

pub use class::{Class, ClassMember, CreateClassRequest, UpdateClassRequest};
pub use contact::{ContactMessage, EmailSignup};
pub use id::{generate_id, ClassId, PresentationId, SlideId, UserId};
pub use presentation::{
    ActiveSession, CreatePresentationRequest, Presentation, PresentationFilter,
    PresentationListQuery, UpdatePresentationRequest, RECENT_PRESENTATIONS_LIMIT,
};
pub use response::{Response, ResponseWithUser, SaveResponseRequest};
pub use slide::{NewSlide, SaveSlidesOutcome, Slide, SlideInput};
pub use user::{
    AuthenticatedUser, CreateUserRequest, LoginRequest, Principal, UpdatePasswordRequest, User,
    UserType,
};
