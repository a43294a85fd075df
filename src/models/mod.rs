pub mod account;
pub mod client;
pub mod common;
pub mod dashboard;
pub mod department;
pub mod document;
pub mod feedback;
pub mod invoice;
pub mod money;
pub mod report;
pub mod task;
pub mod transaction;
pub mod user;
