//! Opcode to handler table.

use runewire_codec::Frame;

/// A frame handler. Handlers decode the payload and mutate the context.
pub type Handler<C, E> = fn(&mut Frame, &mut C) -> Result<(), E>;

/// Fixed 256-entry handler table indexed by opcode.
pub struct Dispatcher<C, E> {
    handlers: [Option<Handler<C, E>>; 256],
}

impl<C, E> Default for Dispatcher<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> std::fmt::Debug for Dispatcher<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<usize> = self
            .handlers
            .iter()
            .enumerate()
            .filter_map(|(opcode, handler)| handler.map(|_| opcode))
            .collect();
        f.debug_struct("Dispatcher")
            .field("registered", &registered)
            .finish()
    }
}

impl<C, E> Dispatcher<C, E> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Installs `handler` for `opcode`, returning the one it replaces.
    pub fn register(&mut self, opcode: u8, handler: Handler<C, E>) -> Option<Handler<C, E>> {
        self.handlers[usize::from(opcode)].replace(handler)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, opcode: u8, handler: Handler<C, E>) -> Self {
        self.register(opcode, handler);
        self
    }

    pub fn is_registered(&self, opcode: u8) -> bool {
        self.handlers[usize::from(opcode)].is_some()
    }

    /// Runs the handler for `frame.opcode`. Returns `Ok(false)` when none is
    /// registered.
    pub fn dispatch(&self, frame: &mut Frame, context: &mut C) -> Result<bool, E> {
        match self.handlers[usize::from(frame.opcode)] {
            Some(handler) => handler(frame, context).map(|()| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        seen: Vec<u8>,
    }

    fn record(frame: &mut Frame, log: &mut Log) -> Result<(), String> {
        let byte = frame.payload.read_u8().map_err(|e| e.to_string())?;
        log.seen.push(byte);
        Ok(())
    }

    fn fail(_: &mut Frame, _: &mut Log) -> Result<(), String> {
        Err("boom".into())
    }

    #[test]
    fn test_dispatch_to_registered_handler() {
        let dispatcher = Dispatcher::new().with(7, record);
        let mut log = Log::default();
        let mut frame = Frame::new(7);
        frame.payload.write_u8(42);
        frame.payload.set_position(0);

        assert_eq!(dispatcher.dispatch(&mut frame, &mut log), Ok(true));
        assert_eq!(log.seen, vec![42]);
    }

    #[test]
    fn test_unregistered_opcode_is_not_an_error() {
        let dispatcher: Dispatcher<Log, String> = Dispatcher::new();
        let mut frame = Frame::new(200);
        let handled = dispatcher.dispatch(&mut frame, &mut Log::default());
        assert_eq!(handled, Ok(false));
    }

    #[test]
    fn test_handler_errors_propagate() {
        let dispatcher = Dispatcher::new().with(1, fail);
        let mut frame = Frame::new(1);
        assert_eq!(
            dispatcher.dispatch(&mut frame, &mut Log::default()),
            Err("boom".to_string())
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut dispatcher: Dispatcher<Log, String> = Dispatcher::new();
        assert!(dispatcher.register(3, record).is_none());
        assert!(dispatcher.register(3, fail).is_some());
        assert!(dispatcher.is_registered(3));
        assert!(!dispatcher.is_registered(4));
    }
}
