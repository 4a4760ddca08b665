mod utf8_buffer;

pub use utf8_buffer::Utf8StreamDecoder;
