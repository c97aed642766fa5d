mod attachment;
mod backend;
mod event;
mod generation_config;
mod message;
mod session;
mod slash_commands;
mod stream_event;
mod surface;

pub use attachment::*;
pub use backend::*;
pub use event::*;
pub use generation_config::*;
pub use message::*;
pub use session::*;
pub use slash_commands::*;
pub use stream_event::*;
pub use surface::*;
