//! MutexUtil is a helper trait to simplify the error handling
//! when locking a Mutex.

use std::sync::{Mutex, MutexGuard};

use crate::error::Error;

pub trait MutexUtil<T> {
    fn acquire_mutex(&self) -> Result<MutexGuard<'_, T>, Error>;
}

impl<T> MutexUtil<T> for Mutex<T> {
    fn acquire_mutex(&self) -> Result<MutexGuard<'_, T>, Error> {
        self.lock().map_err(|_| Error::poisoned_mutex())
    }
}
