//! Operations shared by the HTTP routes and the WebSocket handler

pub mod live;

pub use live::LiveControl;
