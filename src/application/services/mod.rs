//! Business logic services for the application layer.

pub mod click_accumulator;
pub mod key_issuer;
pub mod link_service;

pub use click_accumulator::ClickAccumulator;
pub use key_issuer::KeyIssuer;
pub use link_service::LinkService;
