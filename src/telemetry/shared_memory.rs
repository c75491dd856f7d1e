//! Read-only views of the named shared memory blocks the simulators export.

use std::ffi::OsStr;
use std::marker::PhantomData;
use std::os::windows::ffi::OsStrExt;

use thiserror::Error;
use windows::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, PWSTR};
use windows::Win32::System::Memory::{
    MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_READ,
};

#[derive(Debug, Error)]
pub enum MapError {
    #[error("shared memory block {0:?} is not available")]
    NotAvailable(String),
}

struct PwString {
    content: Vec<u16>,
}

impl PwString {
    fn from(input: &str) -> PwString {
        let content: Vec<u16> = OsStr::new(input).encode_wide().chain(Some(0)).collect();
        PwString { content }
    }

    fn pwstr(&mut self) -> PWSTR {
        PWSTR(self.content.as_mut_ptr())
    }
}

/// One mapped block. Frames are read as whole-struct copies, so a torn
/// update can never leave a reference dangling into the view.
pub struct SharedMemoryMap<T: Copy> {
    handle: HANDLE,
    view: *const u8,
    _layout: PhantomData<T>,
}

unsafe impl<T: Copy> Send for SharedMemoryMap<T> {}

impl<T: Copy> SharedMemoryMap<T> {
    pub fn open(tag: &str) -> Result<SharedMemoryMap<T>, MapError> {
        let mut name = PwString::from(tag);
        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ.0, false, name.pwstr()) };
        let view = unsafe { MapViewOfFile(handle, FILE_MAP_READ, 0, 0, 0) };
        if view.is_null() {
            debug!["Unable to map {}: {:?}", tag, unsafe { GetLastError() }];
            unsafe { CloseHandle(handle) };
            return Err(MapError::NotAvailable(tag.to_string()));
        }
        info!["Shared memory mapped: {}", tag];
        Ok(SharedMemoryMap {
            handle,
            view: view as *const u8,
            _layout: PhantomData,
        })
    }

    pub fn read(&self) -> T {
        unsafe { std::ptr::read_unaligned(self.view as *const T) }
    }
}

impl<T: Copy> Drop for SharedMemoryMap<T> {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(self.view as *mut std::ffi::c_void);
            CloseHandle(self.handle);
        }
    }
}
