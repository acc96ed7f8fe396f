pub mod complaints;
pub mod otp;
pub mod rest;
pub mod session;
pub mod views;

pub use complaints::update_complaint_status;
pub use otp::{OtpCooldown, OTP_RESEND_COOLDOWN};
pub use rest::RestPageFetcher;
pub use session::{AdminSession, DEFAULT_REQUEST_TIMEOUT};
pub use views::{
    complaint_list, staff_list, student_list, ComplaintFilters, ComplaintFiltersPatch,
    ComplaintList, StaffList, StudentList,
};
