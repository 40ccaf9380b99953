mod test_source;
mod webcam;

pub use test_source::*;
pub use webcam::*;
