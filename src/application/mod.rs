pub mod materializer;
pub mod router;
