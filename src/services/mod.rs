pub mod activity_service;
pub mod checkin_service;
pub mod conflict_service;
pub mod registration_service;
