//! HTTP adapters for the backend's serverless functions.
//!
//! - [`sse`]: incremental decoding of the chat event stream
//! - [`chat_transport`]: `ChatTransport` over the `chat` function
//! - [`text_generator`]: one-shot prompt-template generation
//! - [`image_generator`]: image rendering from a description

pub mod chat_transport;
pub mod image_generator;
pub mod sse;
pub mod text_generator;

pub use chat_transport::{FunctionsChatTransport, streaming_client_builder};
pub use image_generator::ImageGenerator;
pub use sse::{DecoderLimits, StreamDecoder, fragment_stream};
pub use text_generator::{PromptTemplate, TextGenerator, oneshot_client_builder};
