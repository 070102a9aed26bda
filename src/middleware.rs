pub mod auth;
pub mod i18n;
pub mod modules;
pub mod tenancy;
