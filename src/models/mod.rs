pub mod activity;
pub mod registration;
pub mod waitlist;

pub use activity::{
    ActivityOverviewRow, ActivityRow, ActivitySnapshot, ActivityStatus, ConflictingActivity,
    TimeWindow,
};
pub use registration::{CheckInRow, RegistrationRow, RegistrationStatus, StudentRegistrationRow};
pub use waitlist::WaitlistRow;
