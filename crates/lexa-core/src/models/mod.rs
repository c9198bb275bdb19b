pub mod failure;
pub mod message;
pub mod search;
