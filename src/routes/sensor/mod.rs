mod handler;
mod model;

pub use handler::push_sample;
pub use model::{SampleRequest, SampleResponse};
