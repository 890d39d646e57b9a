//! Beauty Book: provider onboarding readiness and route guarding.

pub mod accounts;
pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod onboarding;
pub mod pages;
pub mod providers;
pub mod store;
