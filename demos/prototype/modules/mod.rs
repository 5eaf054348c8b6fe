pub mod health;
pub mod storage;
