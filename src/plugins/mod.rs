pub mod platform_registry;
pub mod simulated_publisher;
pub mod webhook_publisher;

pub use platform_registry::{PlatformRegistry, PlatformTarget};
pub use simulated_publisher::SimulatedPublisher;
pub use webhook_publisher::WebhookPublisher;
