//! Length-prefixed buffers for driver-enumerated lists.
//!
//! Vulkan reports variable-length lists through a two-call protocol: the
//! first call returns the element count, the second fills a caller-sized
//! buffer and may report fewer elements than were asked for.

use crate::error::{GpuError, Result};
use ash::vk;
use std::ops::Deref;

/// A zero-initialised, contiguous buffer whose element count is authoritative
/// for every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynArray<T> {
    items: Vec<T>,
}

impl<T: Default + Clone> DynArray<T> {
    /// Allocate `count` default-initialised elements.
    ///
    /// Reports [`GpuError::OutOfMemory`] instead of aborting when the
    /// allocation cannot be satisfied.
    pub fn zeroed(count: u32) -> Result<Self> {
        let len = count as usize;
        let mut items = Vec::new();
        items
            .try_reserve_exact(len)
            .map_err(|_| GpuError::OutOfMemory)?;
        items.resize(len, T::default());
        Ok(Self { items })
    }
}

impl<T> DynArray<T> {
    /// Number of valid elements.
    pub fn count(&self) -> u32 {
        // Counts originate from the driver as u32.
        self.items.len() as u32
    }

    /// Reduce the element count in place; growing is not possible.
    pub fn shrink_to_count(&mut self, count: u32) {
        self.items.truncate(count as usize);
    }

    /// Mutable view of the payload for the driver to fill.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Consume the array, keeping its elements.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for DynArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Run the two-call enumeration protocol.
///
/// `call` receives the in/out count and, on the second call, the buffer to
/// fill. `INCOMPLETE` is accepted and the array is shrunk to the count the
/// driver actually wrote.
pub fn enumerate<T, F>(mut call: F) -> Result<DynArray<T>>
where
    T: Default + Clone,
    F: FnMut(&mut u32, Option<&mut [T]>) -> vk::Result,
{
    let mut count = 0;
    call(&mut count, None).result()?;

    let mut array = DynArray::zeroed(count)?;
    let mut written = count;
    match call(&mut written, Some(array.as_mut_slice())) {
        vk::Result::SUCCESS | vk::Result::INCOMPLETE => {}
        error => return Err(GpuError::Vulkan(error)),
    }

    array.shrink_to_count(written.min(count));
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_array_is_default_filled() {
        let array = DynArray::<u32>::zeroed(4).unwrap();
        assert_eq!(array.count(), 4);
        assert!(array.iter().all(|&v| v == 0));
    }

    #[test]
    fn oversized_allocation_reports_out_of_memory() {
        // 256 KiB per element, far beyond any address space at u32::MAX elements.
        let result = DynArray::<[[[u64; 32]; 32]; 32]>::zeroed(u32::MAX);
        assert_eq!(result.unwrap_err(), GpuError::OutOfMemory);
    }

    #[test]
    fn enumerate_fills_reported_elements() {
        let source = [7u32, 8, 9];
        let array = enumerate(|count, out| {
            match out {
                None => *count = source.len() as u32,
                Some(out) => out.copy_from_slice(&source[..*count as usize]),
            }
            vk::Result::SUCCESS
        })
        .unwrap();
        assert_eq!(&*array, &source);
    }

    #[test]
    fn incomplete_second_call_shrinks_count() {
        let array = enumerate(|count, out| match out {
            None => {
                *count = 5;
                vk::Result::SUCCESS
            }
            Some(out) => {
                out[0] = 1;
                out[1] = 2;
                *count = 2;
                vk::Result::INCOMPLETE
            }
        })
        .unwrap();
        assert_eq!(array.count(), 2);
        assert_eq!(array.into_vec(), vec![1u32, 2]);
    }

    #[test]
    fn enumerate_propagates_driver_errors() {
        let error = enumerate::<u32, _>(|_, out| {
            if out.is_some() {
                vk::Result::ERROR_DEVICE_LOST
            } else {
                vk::Result::SUCCESS
            }
        })
        .unwrap_err();
        assert_eq!(error, GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
    }

    #[test]
    fn empty_enumeration_is_valid() {
        let array = enumerate::<u32, _>(|count, _| {
            *count = 0;
            vk::Result::SUCCESS
        })
        .unwrap();
        assert_eq!(array.count(), 0);
    }
}
