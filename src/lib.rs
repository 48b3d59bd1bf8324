pub mod config;
pub mod evolution;
pub mod export;
pub mod trail;
pub mod tree;
