//! Shared fixtures for the scenario tests
//!
//! Every scenario runs a [`client::App`] over a [`client::DummyFace`]:
//! tests inject full packets and assert the exact bytes the app sends.

use std::sync::Arc;
use std::time::Duration;

use client::{App, DummyFace, Face};
use tokio::task::JoinHandle;
use types::varnum::parse_tl_num;

/// An app wired to a dummy face with its dispatcher running
pub struct TestBed {
    pub app: App,
    pub face: Arc<DummyFace>,
    dispatcher: JoinHandle<()>,
}

impl TestBed {
    pub async fn start() -> Self {
        let face = Arc::new(DummyFace::new());
        let app = App::new(face.clone());
        face.open().await.expect("dummy face opens");
        let dispatcher = {
            let app = app.clone();
            tokio::spawn(async move {
                let _ = app.main_loop().await;
            })
        };
        // Let the dispatcher take its intake channel before packets flow
        tokio::task::yield_now().await;
        Self {
            app,
            face,
            dispatcher,
        }
    }

    /// Shut the face down and wait for the dispatcher to drain
    pub async fn stop(self) {
        self.app.shutdown();
        let _ = self.dispatcher.await;
    }
}

/// Forward everything `from` sends into `to`, splitting packet boundaries
///
/// With `from` and `to` on the same face this is a loopback: the app talks
/// to itself, letting one process play both producer and consumer.
pub fn pump(from: Arc<DummyFace>, to: Arc<DummyFace>, wait: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let buffer = from.take_output(wait).await;
            let mut offset = 0;
            while offset < buffer.len() {
                let Ok((_, size_typ)) = parse_tl_num(&buffer, offset) else {
                    return;
                };
                let Ok((length, size_len)) = parse_tl_num(&buffer, offset + size_typ) else {
                    return;
                };
                let end = offset + size_typ + size_len + length as usize;
                if end > buffer.len() {
                    return;
                }
                let _ = to.input_packet(&buffer[offset..end]);
                offset = end;
            }
        }
    })
}
