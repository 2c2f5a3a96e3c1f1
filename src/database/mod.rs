pub mod activity_repo;
pub mod registration_repo;
pub mod schema;
pub mod waitlist_repo;
