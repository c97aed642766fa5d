pub mod console;
pub mod html;

pub use console::ConsoleSurface;
pub use html::HtmlSurface;
