pub mod accounts;
pub mod auth;
pub mod fiscal;
pub mod journal;
pub mod modules;
pub mod reports;
pub mod tenancy;
