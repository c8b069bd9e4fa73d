mod internal;

pub use internal::{ConnectionServiceClient, UpstreamFailure};
