pub mod auth;
pub mod class;
pub mod contact;
pub mod live_session;
pub mod presentation;
pub mod session;
pub mod slide;
pub mod user;

pub use auth::{Claims, JwtService};
pub use class::{parse_allow_access, ClassService};
pub use contact::ContactService;
pub use live_session::{LiveSessionService, RecordedResponse};
pub use presentation::PresentationService;
pub use session::{SessionData, SessionStore};
pub use slide::SlideService;
pub use user::UserService;
