pub mod config;
pub mod consts;
pub mod driver;
pub mod engine;
pub mod input;
pub mod logger;
pub mod protocol;
pub mod region;
