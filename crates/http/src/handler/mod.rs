//! The seam between the connection engine and the application.
//!
//! A [`Handler`] turns one parsed [`Request`] into a [`Reply`]. Both live in
//! the worker's arena: the handler may allocate there (canonical paths, file
//! contents, compressed bodies) and borrow the result in its reply.

use crate::arena::Arena;
use crate::protocol::{Reply, Request};

pub trait Handler {
    /// Produces the reply for `request`.
    ///
    /// Handlers never fail: every error is expressed as a reply status.
    fn call<'a>(&self, request: &mut Request<'a>, arena: &'a Arena) -> Reply<'a>;
}

impl<H: Handler + ?Sized> Handler for &H {
    fn call<'a>(&self, request: &mut Request<'a>, arena: &'a Arena) -> Reply<'a> {
        (**self).call(request, arena)
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&mut Request<'a>, &'a Arena) -> Reply<'a>,
{
    fn call<'a>(&self, request: &mut Request<'a>, arena: &'a Arena) -> Reply<'a> {
        (self.f)(request, arena)
    }
}

/// Wraps a function as a [`Handler`].
pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&mut Request<'a>, &'a Arena) -> Reply<'a>,
{
    HandlerFn { f }
}
