pub mod events;

pub use events::{LoggingPublisher, WebhookPublisher};
