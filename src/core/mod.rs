pub mod calculator;
pub mod constants;
pub mod editor;
pub mod errors;
pub mod models;
pub mod money;
pub mod netting;
pub mod records;
pub mod services;
pub mod settlement;
pub mod wallet;
