pub mod config;
pub mod errors;
pub mod hash;
pub mod health;
pub mod photos;
pub mod storage;
