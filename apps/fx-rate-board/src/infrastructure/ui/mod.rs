//! UI Context
//!
//! Single-threaded owner of the presentation state and the bridge that
//! carries published rates onto it.
//!
//! # Data Flow
//!
//! ```text
//! MarketHub::publish ──► UiSubscriber ──► UiDispatcher ──► UiContext::run
//!  (producer thread)     (clone rate)     (mpsc, FIFO)     (owns the list)
//!                                              ▲                 │
//!                                              │  DecayStep       │ restart
//!                                              └── decay timer ◄──┘
//! ```

mod adapter;
mod context;
mod decay;
mod dispatcher;
/// Plain-text board rendering.
pub mod render;

pub use adapter::UiSubscriber;
pub use context::UiContext;
pub use dispatcher::{DispatchError, UiDispatcher, UiMessage, UiTask};
