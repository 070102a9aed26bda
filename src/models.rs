pub mod auth;
pub mod tenancy;
pub mod modules;
pub mod fiscal;
pub mod accounts;
pub mod journal;
pub mod reports;
