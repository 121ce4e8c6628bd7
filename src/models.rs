pub mod database;
pub mod issue;
pub mod ticket;
