pub mod activities;
pub mod checkin;
pub mod registrations;
