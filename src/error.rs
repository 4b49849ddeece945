//! Error types for the fallible (`try_*`) surface.
//!
//! The ordinary container operations never return these: exceeding a fixed
//! capacity with overflow disabled panics, and overflow-allocator failure is
//! routed to [`std::alloc::handle_alloc_error`].

use core::alloc::Layout;

use thiserror::Error;

/// The overflow allocator could not satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("overflow allocator failed to provide {size} bytes aligned to {align}")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

impl AllocError {
    pub fn new(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Rebuilds the layout that failed, for [`std::alloc::handle_alloc_error`].
    pub fn layout(&self) -> Layout {
        Layout::from_size_align(self.size, self.align).unwrap_or_else(|_| Layout::new::<u8>())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FixedError {
    /// The request does not fit the embedded buffer and overflow is disabled.
    #[error("fixed capacity of {capacity} exceeded (requested {requested})")]
    CapacityExceeded { capacity: usize, requested: usize },
    /// The requested capacity does not fit in `isize::MAX` bytes.
    #[error("capacity overflow")]
    CapacityOverflow,
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Diverges for a capacity error raised by an infallible operation.
#[cold]
#[inline(never)]
pub(crate) fn fail(err: FixedError) -> ! {
    match err {
        FixedError::Alloc(err) => std::alloc::handle_alloc_error(err.layout()),
        FixedError::CapacityExceeded {
            capacity,
            requested,
        } => panic!("fixed capacity exceeded: capacity is {capacity}, requested {requested}"),
        FixedError::CapacityOverflow => panic!("capacity overflow"),
    }
}
