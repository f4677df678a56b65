pub mod booking;
pub mod tour;
pub mod user;
