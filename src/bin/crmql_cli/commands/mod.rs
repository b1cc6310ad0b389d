pub mod connect;
pub mod exec;
pub mod seed;
pub mod tables;
