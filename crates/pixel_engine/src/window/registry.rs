//! Reference-counted ownership of a process-wide resource
//!
//! Windowing libraries have one session per process that must outlive every
//! window created from it. [`Registry`] holds that session, creates it on the
//! first [`acquire_with`](Registry::acquire_with) and drops it when the last
//! holder calls [`release`](Registry::release).

/// A lazily created resource shared by a counted number of holders
#[derive(Debug)]
pub struct Registry<T> {
    resource: Option<T>,
    count: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Empty registry with no holders
    pub const fn new() -> Self {
        Self { resource: None, count: 0 }
    }

    /// Register one holder, creating the resource with `init` if none exists
    ///
    /// When `init` fails the count is left unchanged.
    pub fn acquire_with<E>(&mut self, init: impl FnOnce() -> Result<T, E>) -> Result<&mut T, E> {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => {
                let resource = init()?;
                log::debug!("Registry resource created");
                resource
            }
        };
        self.count += 1;
        Ok(self.resource.insert(resource))
    }

    /// Drop one holder; the resource is released with the last one
    ///
    /// Returns true if this call released the resource. Releasing an empty
    /// registry does nothing.
    pub fn release(&mut self) -> bool {
        match self.count {
            0 => false,
            1 => {
                self.count = 0;
                self.resource = None;
                log::debug!("Registry resource released");
                true
            }
            _ => {
                self.count -= 1;
                false
            }
        }
    }

    /// Release the resource regardless of how many holders remain
    pub fn teardown(&mut self) {
        if self.count > 0 {
            log::debug!("Registry torn down with {} holders", self.count);
        }
        self.count = 0;
        self.resource = None;
    }

    /// Number of current holders
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The resource, if any holder exists
    pub const fn get(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    /// Mutable access to the resource
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.resource.as_mut()
    }
}
