// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
This module exists purely for other languages to interface with
`mwa_obs_ctx`.

It's very difficult to provide errors to external callers, as rust's concept
of ownership means that any strings made by rust must also be deallocated by
rust. For now, the caller must use these interfaces correctly, and the
correctness of this crate is verified by using rust directly.
*/

use libc::{c_char, c_float, size_t};
use std::ffi::{CStr, CString};
use std::slice;

use crate::correlator_context::CorrelatorContext;
use crate::metafits_context::MetafitsContext;

/// Generic helper for every FFI function below: writes `in_message` into an
/// already-allocated caller buffer, truncating (and NUL-terminating) if it
/// doesn't fit.
///
/// # Safety
/// `error_buffer_ptr` must point to at least `error_buffer_len` allocated
/// bytes, or be null (in which case this is a no-op).
fn set_error_message(in_message: &str, error_buffer_ptr: *mut u8, error_buffer_len: size_t) {
    if error_buffer_ptr.is_null() {
        return;
    }
    if error_buffer_len as i32 - 1 < 1 {
        return;
    }

    let message = if in_message.len() >= error_buffer_len {
        &in_message[..error_buffer_len - 1]
    } else {
        in_message
    };

    let error_message = match CString::new(message) {
        Ok(c) => c,
        Err(_) => return,
    };
    let error_message_bytes = error_message.as_bytes_with_nul();

    unsafe {
        let error_message_slice = slice::from_raw_parts_mut(error_buffer_ptr, error_buffer_len);
        error_message_slice[..error_message_bytes.len()].copy_from_slice(error_message_bytes);
    }
}

/// Free a rust-allocated CString.
///
/// # Safety
/// `rust_cstring` must not have already been freed and must point to a Rust
/// string allocated by this crate.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_free_rust_cstring(rust_cstring: *mut c_char) -> i32 {
    if rust_cstring.is_null() {
        return 0;
    }
    drop(CString::from_raw(rust_cstring));
    0
}

/// Create and return a pointer to a [`MetafitsContext`] given only a
/// metafits filename.
///
/// # Safety
/// * `error_message` *must* point to an already allocated buffer of at least
///   `error_message_length` bytes.
/// * Caller *must* call `mwa_obs_ctx_metafits_context_free` to release the
///   returned pointer.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_metafits_context_new(
    metafits_filename: *const c_char,
    out_metafits_context_ptr: &mut *mut MetafitsContext,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    let filename = match CStr::from_ptr(metafits_filename).to_str() {
        Ok(s) => s,
        Err(_) => {
            set_error_message(
                "mwa_obs_ctx_metafits_context_new() ERROR: metafits_filename is not valid UTF-8",
                error_message,
                error_message_length,
            );
            return 1;
        }
    };

    match MetafitsContext::new(filename) {
        Ok(context) => {
            *out_metafits_context_ptr = Box::into_raw(Box::new(context));
            0
        }
        Err(e) => {
            set_error_message(&format!("{e}"), error_message, error_message_length);
            1
        }
    }
}

/// Print a [`MetafitsContext`] to stdout.
///
/// # Safety
/// `metafits_context_ptr` must point to a context created by
/// `mwa_obs_ctx_metafits_context_new` and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_metafits_context_display(
    metafits_context_ptr: *const MetafitsContext,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    if metafits_context_ptr.is_null() {
        set_error_message(
            "mwa_obs_ctx_metafits_context_display() ERROR: null pointer for metafits_context_ptr",
            error_message,
            error_message_length,
        );
        return 1;
    }

    println!("{}", &*metafits_context_ptr);
    0
}

/// Free a previously-allocated [`MetafitsContext`].
///
/// # Safety
/// `metafits_context_ptr` must point to a context created by
/// `mwa_obs_ctx_metafits_context_new`, and must not have already been freed.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_metafits_context_free(
    metafits_context_ptr: *mut MetafitsContext,
) -> i32 {
    if metafits_context_ptr.is_null() {
        return 0;
    }
    drop(Box::from_raw(metafits_context_ptr));
    0
}

/// Create and return a pointer to a [`CorrelatorContext`] given a metafits
/// filename and a set of gpubox filenames.
///
/// # Safety
/// * `gpubox_filenames` must point to `gpubox_count` valid, readable
///   `char*` C strings.
/// * `error_message` *must* point to an already allocated buffer of at
///   least `error_message_length` bytes.
/// * Caller *must* call `mwa_obs_ctx_correlator_context_free` to release the
///   returned pointer.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_new(
    metafits_filename: *const c_char,
    gpubox_filenames: *const *const c_char,
    gpubox_count: size_t,
    allow_integration_time_mismatch: i32,
    out_correlator_context_ptr: &mut *mut CorrelatorContext,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    let metafits_filename = match CStr::from_ptr(metafits_filename).to_str() {
        Ok(s) => s.to_string(),
        Err(_) => {
            set_error_message(
                "mwa_obs_ctx_correlator_context_new() ERROR: metafits_filename is not valid UTF-8",
                error_message,
                error_message_length,
            );
            return 1;
        }
    };

    let gpubox_slice = slice::from_raw_parts(gpubox_filenames, gpubox_count);
    let mut gpubox_filenames = Vec::with_capacity(gpubox_count);
    for &g in gpubox_slice {
        match CStr::from_ptr(g).to_str() {
            Ok(s) => gpubox_filenames.push(s.to_string()),
            Err(_) => {
                set_error_message(
                    "mwa_obs_ctx_correlator_context_new() ERROR: a gpubox filename is not valid UTF-8",
                    error_message,
                    error_message_length,
                );
                return 1;
            }
        }
    }

    let options = crate::correlator_context::ContextOptions {
        allow_integration_time_mismatch: allow_integration_time_mismatch != 0,
    };

    match CorrelatorContext::new_with_options(&metafits_filename, &gpubox_filenames, options) {
        Ok(context) => {
            *out_correlator_context_ptr = Box::into_raw(Box::new(context));
            0
        }
        Err(e) => {
            set_error_message(&format!("{e}"), error_message, error_message_length);
            1
        }
    }
}

/// Print a [`CorrelatorContext`] to stdout.
///
/// # Safety
/// `correlator_context_ptr` must point to a context created by
/// `mwa_obs_ctx_correlator_context_new` and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_display(
    correlator_context_ptr: *const CorrelatorContext,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    if correlator_context_ptr.is_null() {
        set_error_message(
            "mwa_obs_ctx_correlator_context_display() ERROR: null pointer for correlator_context_ptr",
            error_message,
            error_message_length,
        );
        return 1;
    }

    println!("{}", &*correlator_context_ptr);
    0
}

/// Reads one (timestep, coarse channel) tile as `[baseline][fine_chan][pol][re,im]`
/// into a caller-supplied buffer.
///
/// `out_had_warning` is set to `1` if the HDU was missing (the buffer was
/// zero-filled rather than erroring) and `0` otherwise.
///
/// # Safety
/// * `correlator_context_ptr` must point to a context created by
///   `mwa_obs_ctx_correlator_context_new`.
/// * `buffer_ptr` must point to at least `buffer_len` allocated `c_float`s.
/// * `error_message` must point to an already allocated buffer of at least
///   `error_message_length` bytes.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_read_by_baseline(
    correlator_context_ptr: *mut CorrelatorContext,
    timestep_index: usize,
    coarse_chan_index: usize,
    buffer_ptr: *mut c_float,
    buffer_len: size_t,
    out_had_warning: *mut i32,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    read_into_c_buffer(
        correlator_context_ptr,
        timestep_index,
        coarse_chan_index,
        buffer_ptr,
        buffer_len,
        out_had_warning,
        error_message,
        error_message_length,
        true,
    )
}

/// As `mwa_obs_ctx_correlator_context_read_by_baseline`, but in
/// `[fine_chan][baseline][pol][re,im]` order.
///
/// # Safety
/// Same requirements as `mwa_obs_ctx_correlator_context_read_by_baseline`.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_read_by_frequency(
    correlator_context_ptr: *mut CorrelatorContext,
    timestep_index: usize,
    coarse_chan_index: usize,
    buffer_ptr: *mut c_float,
    buffer_len: size_t,
    out_had_warning: *mut i32,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    read_into_c_buffer(
        correlator_context_ptr,
        timestep_index,
        coarse_chan_index,
        buffer_ptr,
        buffer_len,
        out_had_warning,
        error_message,
        error_message_length,
        false,
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn read_into_c_buffer(
    correlator_context_ptr: *mut CorrelatorContext,
    timestep_index: usize,
    coarse_chan_index: usize,
    buffer_ptr: *mut c_float,
    buffer_len: size_t,
    out_had_warning: *mut i32,
    error_message: *mut u8,
    error_message_length: size_t,
    by_baseline: bool,
) -> i32 {
    if correlator_context_ptr.is_null() || buffer_ptr.is_null() {
        set_error_message(
            "ERROR: null pointer passed to a read_by_baseline/read_by_frequency function",
            error_message,
            error_message_length,
        );
        return 1;
    }

    let context = &mut *correlator_context_ptr;
    let buffer = slice::from_raw_parts_mut(buffer_ptr, buffer_len);

    let result = if by_baseline {
        context.read_by_baseline_into_buffer(timestep_index, coarse_chan_index, buffer)
    } else {
        context.read_by_frequency_into_buffer(timestep_index, coarse_chan_index, buffer)
    };

    match result {
        Ok(warning) => {
            if !out_had_warning.is_null() {
                *out_had_warning = warning.is_some() as i32;
            }
            0
        }
        Err(e) => {
            set_error_message(&format!("{e}"), error_message, error_message_length);
            1
        }
    }
}

/// Free a previously-allocated [`CorrelatorContext`].
///
/// # Safety
/// `correlator_context_ptr` must point to a context created by
/// `mwa_obs_ctx_correlator_context_new`, and must not have already been
/// freed.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_free(
    correlator_context_ptr: *mut CorrelatorContext,
) -> i32 {
    if correlator_context_ptr.is_null() {
        return 0;
    }
    drop(Box::from_raw(correlator_context_ptr));
    0
}

/// Number of timesteps common to every supplied gpubox file.
///
/// # Safety
/// `correlator_context_ptr` must point to a live context.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_get_num_timesteps(
    correlator_context_ptr: *const CorrelatorContext,
) -> size_t {
    if correlator_context_ptr.is_null() {
        return 0;
    }
    (&*correlator_context_ptr).num_timesteps
}

/// Writes the UNIX time (in milliseconds) of timestep `index` into
/// `out_unix_time_ms`.
///
/// # Safety
/// `correlator_context_ptr` must point to a live context.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_get_timestep_unix_time_ms(
    correlator_context_ptr: *const CorrelatorContext,
    index: usize,
    out_unix_time_ms: *mut u64,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    if correlator_context_ptr.is_null() || out_unix_time_ms.is_null() {
        set_error_message(
            "mwa_obs_ctx_correlator_context_get_timestep_unix_time_ms() ERROR: null pointer",
            error_message,
            error_message_length,
        );
        return 1;
    }

    let context = &*correlator_context_ptr;
    match context.timesteps.get(index) {
        Some(t) => {
            *out_unix_time_ms = t.unix_time_ms;
            0
        }
        None => {
            set_error_message(
                &format!(
                    "mwa_obs_ctx_correlator_context_get_timestep_unix_time_ms() ERROR: index {index} is out of range (have {})",
                    context.num_timesteps
                ),
                error_message,
                error_message_length,
            );
            1
        }
    }
}

/// Number of coarse channels actually present in this observation.
///
/// # Safety
/// `correlator_context_ptr` must point to a live context.
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_get_num_coarse_channels(
    correlator_context_ptr: *const CorrelatorContext,
) -> size_t {
    if correlator_context_ptr.is_null() {
        return 0;
    }
    (&*correlator_context_ptr).num_coarse_channels
}

/// A plain-data view of one [`crate::coarse_channel::CoarseChannel`], for
/// callers who can't walk a Rust `Vec`.
#[repr(C)]
pub struct CCoarseChannel {
    pub correlator_index: size_t,
    pub receiver_channel_number: size_t,
    pub gpubox_number: size_t,
    pub channel_width_hz: u32,
    pub channel_start_hz: u32,
    pub channel_centre_hz: u32,
    pub channel_end_hz: u32,
}

/// Writes coarse channel `index`'s metadata into `out_coarse_channel`.
///
/// # Safety
/// `correlator_context_ptr` must point to a live context; `out_coarse_channel`
/// must point to valid, writable memory for one [`CCoarseChannel`].
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_correlator_context_get_coarse_channel(
    correlator_context_ptr: *const CorrelatorContext,
    index: usize,
    out_coarse_channel: *mut CCoarseChannel,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    if correlator_context_ptr.is_null() || out_coarse_channel.is_null() {
        set_error_message(
            "mwa_obs_ctx_correlator_context_get_coarse_channel() ERROR: null pointer",
            error_message,
            error_message_length,
        );
        return 1;
    }

    let context = &*correlator_context_ptr;
    match context.coarse_channels.get(index) {
        Some(c) => {
            *out_coarse_channel = CCoarseChannel {
                correlator_index: c.correlator_index,
                receiver_channel_number: c.receiver_channel_number,
                gpubox_number: c.gpubox_number,
                channel_width_hz: c.width_hz,
                channel_start_hz: c.start_hz,
                channel_centre_hz: c.centre_hz,
                channel_end_hz: c.end_hz,
            };
            0
        }
        None => {
            set_error_message(
                &format!(
                    "mwa_obs_ctx_correlator_context_get_coarse_channel() ERROR: index {index} is out of range (have {})",
                    context.num_coarse_channels
                ),
                error_message,
                error_message_length,
            );
            1
        }
    }
}

/// A plain-data view of one [`crate::baseline::Baseline`].
#[repr(C)]
pub struct CBaseline {
    pub ant1_index: size_t,
    pub ant2_index: size_t,
}

/// Writes baseline `index`'s antenna indices into `out_baseline`.
///
/// # Safety
/// `metafits_context_ptr` must point to a live context; `out_baseline`
/// must point to valid, writable memory for one [`CBaseline`].
#[no_mangle]
pub unsafe extern "C" fn mwa_obs_ctx_metafits_context_get_baseline(
    metafits_context_ptr: *const MetafitsContext,
    index: usize,
    out_baseline: *mut CBaseline,
    error_message: *mut u8,
    error_message_length: size_t,
) -> i32 {
    if metafits_context_ptr.is_null() || out_baseline.is_null() {
        set_error_message(
            "mwa_obs_ctx_metafits_context_get_baseline() ERROR: null pointer",
            error_message,
            error_message_length,
        );
        return 1;
    }

    let context = &*metafits_context_ptr;
    match context.baselines.get(index) {
        Some(b) => {
            *out_baseline = CBaseline {
                ant1_index: b.ant1_index,
                ant2_index: b.ant2_index,
            };
            0
        }
        None => {
            set_error_message(
                &format!(
                    "mwa_obs_ctx_metafits_context_get_baseline() ERROR: index {index} is out of range (have {})",
                    context.num_baselines
                ),
                error_message,
                error_message_length,
            );
            1
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_set_error_message_truncates() {
        let mut buf = vec![0u8; 4];
        set_error_message("hello world", buf.as_mut_ptr(), buf.len());
        let s = CStr::from_bytes_until_nul(&buf).unwrap();
        assert_eq!(s.to_str().unwrap().len(), 3);
    }

    #[test]
    fn test_set_error_message_null_is_noop() {
        set_error_message("hello", std::ptr::null_mut(), 10);
    }

    #[test]
    fn test_metafits_context_new_reports_open_error() {
        let filename = CString::new("this_file_does_not_exist.metafits").unwrap();
        let mut ctx_ptr: *mut MetafitsContext = std::ptr::null_mut();
        let mut error_message = vec![0u8; 256];

        let result = unsafe {
            mwa_obs_ctx_metafits_context_new(
                filename.as_ptr(),
                &mut ctx_ptr,
                error_message.as_mut_ptr(),
                error_message.len(),
            )
        };

        assert_eq!(result, 1);
        assert!(ctx_ptr.is_null());
    }
}
