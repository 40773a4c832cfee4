pub mod actions;
pub mod caption_injector;
pub mod pacing;

pub use actions::UiActionRunner;
pub use caption_injector::CaptionInjector;
pub use pacing::Pacing;
