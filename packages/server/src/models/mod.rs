pub mod comment;
pub mod post;
pub mod shared;
pub mod upload;
pub mod user;
