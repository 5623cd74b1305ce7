use log::Level;
use std::cell::RefCell;
use std::rc::Rc;

/// Destination for finished trace lines.
pub trait TraceSink {
    fn emit(&self, line: &str);
}

/// Forwards every line through the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: Level,
}

/// Keeps lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink(Rc<RefCell<Vec<String>>>);

impl LogSink {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self { level: Level::Info }
    }
}

impl TraceSink for LogSink {
    fn emit(&self, line: &str) {
        log::log!(target: "plantrace", self.level, "{}", line);
    }
}

impl BufferSink {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Drains the buffer.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl TraceSink for BufferSink {
    fn emit(&self, line: &str) {
        self.0.borrow_mut().push(line.to_string());
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn emit(&self, line: &str) {
        (**self).emit(line)
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Rc<T> {
    fn emit(&self, line: &str) {
        (**self).emit(line)
    }
}
