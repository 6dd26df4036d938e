pub mod fake_gateway;
pub mod fake_interaction;
pub mod fixtures;

pub use fake_gateway::{FakeChildren, FakeGateway, FakeGatewayStats};
pub use fake_interaction::ScriptedInteraction;
