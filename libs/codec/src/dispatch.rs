//! Double dispatch from a decoded message to a handler
//!
//! Message sets generated by [`message_set!`](crate::message_set) implement
//! [`Dispatch`] for every type implementing their handler trait. Resolution
//! is a single `match` over the set's enum; handlers run synchronously and
//! may keep state between calls.

/// A message that knows which handler method matches its concrete type
pub trait Dispatch<H: ?Sized> {
    fn dispatch(&self, handler: &mut H);
}

/// Invoke the handler method matching the concrete type of `message`
pub fn dispatch<M, H>(message: &M, handler: &mut H)
where
    M: Dispatch<H> + ?Sized,
    H: ?Sized,
{
    message.dispatch(handler);
}
