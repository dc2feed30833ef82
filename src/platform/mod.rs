//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind one small API: free space, permission
//! fixes for trash directories and secure log-file opening.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    free_space_bytes, make_dir_writable, open_log_file_secure_append, process_alive, set_dir_mode_0700,
};

#[cfg(not(unix))]
pub use windows::{
    free_space_bytes, make_dir_writable, open_log_file_secure_append, process_alive, set_dir_mode_0700,
};
