//! Test module for exchange-logger
//!
//! Behavioral tests for the dispatcher, the interceptor hooks and the
//! in-process pipeline, plus property-based tests using proptest.



#[cfg(test)]
pub mod pipeline_tests;


#[cfg(test)]
pub(crate) mod support {
    use std::io::{self, Read};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::RenderError;
    use crate::logging::Renderable;

    /// Payload that counts how often it is rendered.
    #[derive(Debug, Clone, Default)]
    pub struct CountingBody {
        pub renders: Arc<AtomicUsize>,
    }

    impl CountingBody {
        pub fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    impl Renderable for CountingBody {
        fn render_to_text(&self) -> Result<String, RenderError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok("counted".to_string())
        }
    }

    /// Payload that can never be rendered.
    #[derive(Debug, Clone, Copy)]
    pub struct UnrenderableBody;

    impl Renderable for UnrenderableBody {
        fn render_to_text(&self) -> Result<String, RenderError> {
            Err(RenderError::custom("body is encrypted"))
        }
    }

    /// Stream that counts reads.
    pub struct CountingStream {
        pub inner: io::Cursor<Vec<u8>>,
        pub reads: Arc<AtomicUsize>,
    }

    impl Read for CountingStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    /// Stream that panics when read.
    pub struct PanickingStream;

    impl Read for PanickingStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("stream exploded");
        }
    }
}
