use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::handler::SharedHandler;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

/// One request/response exchange and the handler chain working on it.
///
/// A `Context` lives exactly as long as its connection. Besides the request
/// and the response it carries a side table for handlers to pass values to
/// each other, and the chain cursor that [`Context::next`] advances.
pub struct Context {
    pub request: Request,
    pub response: Response,

    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    chain: Vec<SharedHandler>,
    // index of the handler currently running, `None` before the first
    cursor: Option<usize>,
}

impl Context {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            values: HashMap::new(),
            chain: Vec::new(),
            cursor: None,
        }
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn set<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Looks up a value stored with [`Context::set`].
    ///
    /// The caller names the type it expects. A value stored under the same
    /// key with a different type is indistinguishable from a missing one:
    /// both return `None`.
    pub fn get<T>(&self, key: &str) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.values.get(key)?.downcast_ref::<T>()
    }

    pub fn get_mut<T>(&mut self, key: &str) -> Option<&mut T>
    where
        T: Any + Send + Sync,
    {
        self.values.get_mut(key)?.downcast_mut::<T>()
    }

    /// Removes a value, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Inserts handlers right after the one currently running (or at the
    /// front when the chain has not started), so the next call to
    /// [`Context::next`] runs them first.
    pub fn extend_chain<I>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = SharedHandler>,
    {
        let at = self.cursor.map_or(0, |index| index + 1).min(self.chain.len());
        self.chain.splice(at..at, handlers);
    }

    /// Runs the rest of the chain.
    ///
    /// The cursor moves one step, then every remaining handler runs in turn.
    /// A middleware that calls `next` once gets control back after
    /// everything downstream has finished; one that never calls it still
    /// lets the loop here carry on with the handlers after it.
    ///
    /// The cursor only moves forward, so by the time a nested `next`
    /// returns the chain is exhausted and a second call from the same
    /// handler finds nothing left to run.
    pub fn next(&mut self) {
        self.step();
        while let Some(index) = self.cursor.filter(|&index| index < self.chain.len()) {
            let handler = Arc::clone(&self.chain[index]);
            handler.serve(self);
            self.step();
        }
    }

    /// Skips every handler that has not run yet.
    pub fn abort(&mut self) {
        self.cursor = Some(self.chain.len());
    }

    pub fn is_aborted(&self) -> bool {
        self.cursor.is_some_and(|index| index >= self.chain.len())
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    fn step(&mut self) {
        self.cursor = Some(self.cursor.map_or(0, |index| index + 1));
    }

    /// Sets the status line from the request version, a plain-text content
    /// type, and appends `text` to the body.
    pub fn response_text(&mut self, status: StatusCode, text: &str) {
        self.respond(status, "text/plain; charset=utf-8");
        self.response.write(text);
    }

    pub fn response_html(&mut self, status: StatusCode, html: &str) {
        self.respond(status, "text/html; charset=utf-8");
        self.response.write(html);
    }

    pub fn response_json<T>(&mut self, status: StatusCode, value: &T) -> serde_json::Result<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(value)?;
        self.respond(status, "application/json; charset=utf-8");
        self.response.write(json);
        Ok(())
    }

    fn respond(&mut self, status: StatusCode, content_type: &str) {
        let version = self.request.version.clone();
        self.response.set_status_line(&version, status);
        self.response.set_header("Content-Type", content_type);
    }
}
