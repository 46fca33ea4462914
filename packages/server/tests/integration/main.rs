mod posts;
mod sql;
mod upload;
mod users;
