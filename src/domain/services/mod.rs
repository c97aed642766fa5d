mod attachments;
mod code_blocks;
pub mod content_renderer;
mod generation;
mod html;
mod markdown;
mod math_blocks;
mod message_log;
mod sessions;
mod stream_consumer;
mod think;

pub use attachments::*;
pub use code_blocks::*;
pub use generation::*;
pub use html::*;
pub use markdown::*;
pub use message_log::*;
pub use sessions::*;
pub use stream_consumer::*;
pub use think::*;
