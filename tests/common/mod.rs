//! Integration test common infrastructure.
//!
//! Provides an in-process switchboard with the core components loaded,
//! test clients that drain their outbound queue, and a serializer that
//! counts how often it is asked to encode.

pub mod client;
pub mod serializer;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use serializer::RecordingSerializer;
#[allow(unused_imports)]
pub use server::TestServer;
