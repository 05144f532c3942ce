//! Render Command Queue
//!
//! All overlay state is owned by the rendering thread. Other threads never
//! touch it; they submit closures that the rendering thread runs in
//! submission order, interleaved with frame work submitted the same way.
//!
//! ```text
//!  game / editor threads               rendering thread
//!  ─────────────────────               ─────────────────────────────
//!  queue.enqueue(add proxy)  ──┐
//!  queue.enqueue(frame)      ──┼──▶  [FIFO] ──▶ cmd(&mut VolumeRenderer)
//!  queue.enqueue(release)    ──┘
//! ```
//!
//! Two ways to consume the queue:
//! - [`RenderThread::spawn`] moves the renderer onto a dedicated thread.
//! - Hosts with their own render loop call [`RenderCommandReceiver::drain`]
//!   inside a [`RenderingThreadScope`].

use std::cell::Cell;
use std::marker::PhantomData;
use std::thread::JoinHandle;

use crate::errors::{OverlayError, Result};
use crate::overlay::VolumeRenderer;

/// A unit of render-thread work.
pub type RenderCommand = Box<dyn FnOnce(&mut VolumeRenderer) + Send + 'static>;

enum RenderMessage {
    Run(&'static str, RenderCommand),
    Flush(flume::Sender<()>),
    Shutdown,
}

thread_local! {
    static IS_RENDERING_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread currently acts as the rendering thread.
#[inline]
#[must_use]
pub fn is_in_rendering_thread() -> bool {
    IS_RENDERING_THREAD.with(Cell::get)
}

/// Marks the current thread as the rendering thread until dropped.
pub struct RenderingThreadScope {
    previous: bool,
    // Tied to the thread it was created on.
    _not_send: PhantomData<*const ()>,
}

impl RenderingThreadScope {
    #[must_use]
    pub fn enter() -> Self {
        let previous = IS_RENDERING_THREAD.with(|flag| flag.replace(true));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for RenderingThreadScope {
    fn drop(&mut self) {
        IS_RENDERING_THREAD.with(|flag| flag.set(self.previous));
    }
}

/// Creates a connected queue / receiver pair.
#[must_use]
pub fn render_command_queue() -> (RenderCommandQueue, RenderCommandReceiver) {
    let (tx, rx) = flume::unbounded();
    (RenderCommandQueue { tx }, RenderCommandReceiver { rx })
}

// ============================================================================
// Producer side
// ============================================================================

/// Submits work to the rendering thread. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct RenderCommandQueue {
    tx: flume::Sender<RenderMessage>,
}

impl RenderCommandQueue {
    /// Appends `command` after every previously submitted command.
    pub fn enqueue<F>(&self, name: &'static str, command: F) -> Result<()>
    where
        F: FnOnce(&mut VolumeRenderer) + Send + 'static,
    {
        self.tx
            .send(RenderMessage::Run(name, Box::new(command)))
            .map_err(|_| OverlayError::RenderThreadDisconnected)
    }

    /// Runs `command` on the rendering thread and waits for its result.
    ///
    /// Must not be called from the rendering thread itself.
    pub fn call<T, F>(&self, name: &'static str, command: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut VolumeRenderer) -> T + Send + 'static,
    {
        debug_assert!(!is_in_rendering_thread(), "{name}: blocking call from the rendering thread");

        let (reply_tx, reply_rx) = flume::bounded(1);
        self.enqueue(name, move |renderer| {
            // The caller may have given up waiting; nothing to do then.
            let _ = reply_tx.send(command(renderer));
        })?;
        reply_rx.recv().map_err(|_| OverlayError::RenderThreadDisconnected)
    }

    /// Blocks until every command submitted before this call has run.
    pub fn flush(&self) -> Result<()> {
        debug_assert!(!is_in_rendering_thread(), "flush from the rendering thread");

        let (done_tx, done_rx) = flume::bounded(1);
        self.tx
            .send(RenderMessage::Flush(done_tx))
            .map_err(|_| OverlayError::RenderThreadDisconnected)?;
        done_rx.recv().map_err(|_| OverlayError::RenderThreadDisconnected)
    }

    fn shutdown(&self) -> Result<()> {
        self.tx
            .send(RenderMessage::Shutdown)
            .map_err(|_| OverlayError::RenderThreadDisconnected)
    }
}

// ============================================================================
// Consumer side
// ============================================================================

pub struct RenderCommandReceiver {
    rx: flume::Receiver<RenderMessage>,
}

/// Whether the consumer keeps going after a message.
enum Flow {
    Continue,
    Stop,
}

fn execute(message: RenderMessage, renderer: &mut VolumeRenderer) -> Flow {
    match message {
        RenderMessage::Run(name, command) => {
            log::trace!("Render command: {name}");
            command(renderer);
            Flow::Continue
        }
        RenderMessage::Flush(done) => {
            let _ = done.send(());
            Flow::Continue
        }
        RenderMessage::Shutdown => Flow::Stop,
    }
}

impl RenderCommandReceiver {
    /// Runs every pending command. Returns the number of messages handled.
    ///
    /// Must be called from the rendering thread.
    pub fn drain(&self, renderer: &mut VolumeRenderer) -> usize {
        debug_assert!(is_in_rendering_thread(), "drain outside the rendering thread");

        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            handled += 1;
            if let Flow::Stop = execute(message, renderer) {
                break;
            }
        }
        handled
    }

    fn run(self, mut renderer: VolumeRenderer) -> VolumeRenderer {
        let _scope = RenderingThreadScope::enter();
        while let Ok(message) = self.rx.recv() {
            if let Flow::Stop = execute(message, &mut renderer) {
                break;
            }
        }
        log::debug!("Render thread stopped");
        renderer
    }
}

// ============================================================================
// Dedicated thread
// ============================================================================

/// Owns a [`VolumeRenderer`] on its own thread.
pub struct RenderThread {
    queue: RenderCommandQueue,
    handle: Option<JoinHandle<VolumeRenderer>>,
}

impl RenderThread {
    /// Moves `renderer` onto a new thread consuming `receiver`.
    pub fn spawn(
        renderer: VolumeRenderer,
        queue: RenderCommandQueue,
        receiver: RenderCommandReceiver,
    ) -> Result<Self> {
        let handle = std::thread::Builder::new()
            .name("vdb-render".into())
            .spawn(move || receiver.run(renderer))?;

        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &RenderCommandQueue {
        &self.queue
    }

    /// Runs everything already queued, stops the thread and hands the
    /// renderer back.
    pub fn shutdown(mut self) -> Result<VolumeRenderer> {
        self.queue.shutdown()?;
        let handle = self.handle.take().ok_or(OverlayError::RenderThreadDisconnected)?;
        handle.join().map_err(|_| OverlayError::RenderThreadDisconnected)
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.queue.shutdown();
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}
