pub mod comment;
pub mod post;
pub mod upload;
pub mod user;
