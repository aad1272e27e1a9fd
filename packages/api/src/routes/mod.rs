pub mod admin;
pub mod health;
pub mod matches;
pub mod matchmaking;
