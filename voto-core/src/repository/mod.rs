pub mod class;
pub mod contact;
pub mod presentation;
pub mod response;
pub mod slide;
pub mod user;

pub use class::ClassRepository;
pub use contact::ContactRepository;
pub use presentation::PresentationRepository;
pub use response::ResponseRepository;
pub use slide::SlideRepository;
pub use user::UserRepository;
