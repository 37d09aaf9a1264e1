pub mod hasher;
pub mod import;
pub mod upload;
