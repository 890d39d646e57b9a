//! Provider records touched by onboarding.

pub mod model;

pub use model::{
    NewAvailabilityRule, NewService, ProfileUpdate, ProviderProfile, Service, SubscriptionStatus,
};
