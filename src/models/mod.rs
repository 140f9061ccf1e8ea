mod agenda_event;
mod notification;
mod profile;
mod subscription;
mod transcription;
mod user;

pub use agenda_event::*;
pub use notification::*;
pub use profile::*;
pub use subscription::*;
pub use transcription::*;
pub use user::*;
