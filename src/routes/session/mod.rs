mod handler;
mod model;

pub use handler::{avatars, current, leave, login, report, sos};
pub use model::{LoginRequest, ReportRequest, SosRequest};
