//! Sizing and oversized-value policy of a [`LookaheadBuffer`](super::LookaheadBuffer).

use std::fmt;

use crate::constants::MAXIMUM_VALUE_SIZE;
use crate::error::{IonError, IonResult};

/// Callback invoked once per oversized value or symbol table.
pub type OversizedHandler = Box<dyn FnMut()>;

/// Smallest legal initial buffer: room for a version marker plus one byte.
pub const MINIMUM_BUFFER_SIZE: usize = 5;

pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 32 * 1024;

/// Buffer limits and the handlers notified when a value does not fit.
///
/// Without handlers an oversized value is an [`IonError::ResourceLimit`].
pub struct BufferConfiguration {
    initial_buffer_size: usize,
    maximum_buffer_size: usize,
    oversized_value_handler: Option<OversizedHandler>,
    oversized_symbol_table_handler: Option<OversizedHandler>,
}

impl Default for BufferConfiguration {
    fn default() -> Self {
        Self {
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            maximum_buffer_size: MAXIMUM_VALUE_SIZE,
            oversized_value_handler: None,
            oversized_symbol_table_handler: None,
        }
    }
}

impl fmt::Debug for BufferConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferConfiguration")
            .field("initial_buffer_size", &self.initial_buffer_size)
            .field("maximum_buffer_size", &self.maximum_buffer_size)
            .field("oversized_value_handler", &self.oversized_value_handler.is_some())
            .field(
                "oversized_symbol_table_handler",
                &self.oversized_symbol_table_handler.is_some(),
            )
            .finish()
    }
}

impl BufferConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    pub fn with_maximum_buffer_size(mut self, size: usize) -> Self {
        self.maximum_buffer_size = size;
        self
    }

    /// Called when a user value is skipped because it cannot be buffered.
    pub fn on_oversized_value(mut self, handler: impl FnMut() + 'static) -> Self {
        self.oversized_value_handler = Some(Box::new(handler));
        self
    }

    /// Called when a symbol table cannot be buffered. Reading stops there.
    pub fn on_oversized_symbol_table(mut self, handler: impl FnMut() + 'static) -> Self {
        self.oversized_symbol_table_handler = Some(Box::new(handler));
        self
    }

    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    pub fn maximum_buffer_size(&self) -> usize {
        self.maximum_buffer_size
    }

    pub fn validate(&self) -> IonResult<()> {
        if self.initial_buffer_size < MINIMUM_BUFFER_SIZE {
            return Err(IonError::usage(format!(
                "initial buffer size {} is below the minimum of {MINIMUM_BUFFER_SIZE}",
                self.initial_buffer_size
            )));
        }
        if self.initial_buffer_size > self.maximum_buffer_size {
            return Err(IonError::usage(format!(
                "initial buffer size {} exceeds maximum {}",
                self.initial_buffer_size, self.maximum_buffer_size
            )));
        }
        Ok(())
    }

    pub(crate) fn into_handlers(self) -> (Option<OversizedHandler>, Option<OversizedHandler>) {
        (self.oversized_value_handler, self.oversized_symbol_table_handler)
    }
}
