pub mod ask;
pub mod auth;
pub mod image;
pub mod upload;
pub mod voice;
