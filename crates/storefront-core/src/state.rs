//! Observable state cells behind the session and catalog containers.
//!
//! Each container keeps its state in a `tokio::sync::watch` channel so that
//! front-ends can subscribe to changes while the container alone mutates it.

use tokio::sync::watch;

use crate::api::ApiError;

/// State that tracks an in-flight operation and its last failure.
pub trait OperationState {
    fn set_loading(&mut self, loading: bool);

    fn set_error(&mut self, error: Option<ApiError>);
}

pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + OperationState> StateCell<T> {
    /// Mark an operation as started: `loading` on, previous error cleared.
    /// `loading` goes back off when the guard drops, whatever the outcome.
    pub fn begin(&self) -> LoadingGuard<'_, T> {
        self.modify(|state| {
            state.set_loading(true);
            state.set_error(None);
        });
        LoadingGuard { cell: self }
    }

    /// Store a failure as the last error and hand the result back unchanged.
    pub fn record<R>(&self, result: Result<R, ApiError>) -> Result<R, ApiError> {
        if let Err(ref err) = result {
            let err = err.clone();
            self.modify(|state| state.set_error(Some(err)));
        }
        result
    }
}

pub struct LoadingGuard<'a, T: Clone + OperationState> {
    cell: &'a StateCell<T>,
}

impl<T: Clone + OperationState> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.cell.modify(|state| state.set_loading(false));
    }
}
