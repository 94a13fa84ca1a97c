pub mod body;
pub mod error;
pub mod health;
pub mod session;
pub mod welcome;
