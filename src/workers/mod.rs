//! Camera workers: the [`Scanner`] abstraction and its supervision spec.
//!
//! - [`Scanner`] one camera; [`ScannerRef`] is `Arc<dyn Scanner>`
//! - [`ScannerFn`] closure-backed scanner
//! - [`WorkerSpec`] scanner + restart/backoff policies

mod scanner;
mod scanner_fn;
mod spec;

pub use scanner::{BoxScanFuture, Scanner, ScannerRef};
pub use scanner_fn::ScannerFn;
pub use spec::WorkerSpec;
