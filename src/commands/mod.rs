// src/commands/mod.rs
pub mod common;
pub mod decode;
pub mod inspect;
pub mod version;
