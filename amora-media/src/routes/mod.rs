pub mod admin;
pub mod health;
pub mod internal;
pub mod photos;
pub mod reports;
pub mod verification;
pub mod voice;
