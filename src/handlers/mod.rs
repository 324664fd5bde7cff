pub mod access;
pub mod callbacks;
pub mod commands;
