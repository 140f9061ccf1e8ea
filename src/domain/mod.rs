mod company_name;
mod event_title;
mod event_window;
mod mobile_number;
mod profile_name;
mod subscription_status;
mod user_email;

pub use company_name::CompanyName;
pub use event_title::EventTitle;
pub use event_window::EventWindow;
pub(crate) use event_window::parse_timestamp;
pub use mobile_number::MobileNumber;
pub use profile_name::ProfileName;
pub use subscription_status::SubscriptionStatus;
pub use user_email::UserEmail;
