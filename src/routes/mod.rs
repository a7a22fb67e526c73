pub mod sensor;
pub mod session;
