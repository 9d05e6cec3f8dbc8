mod cleanup_stream;

pub use cleanup_stream::CleanupStream;
