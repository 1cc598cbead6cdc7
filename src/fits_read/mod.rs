// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Thin wrapper over `fitsio`/`fitsio-sys`: open a file, locate an HDU, read a
keyword, read a column cell, read a 2-D float image. Every helper forwards
`file!()`/`line!()` through to `FitsError` so a failure always names the
call site that triggered it. `fitsio::FitsFile` no longer exposes the
filename it was opened from, so callers thread it through explicitly
alongside the handle.
*/

pub mod error;
pub use error::FitsError;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ReadImage;
use fitsio::tables::ReadsCol;
use fitsio::FitsFile;
use std::ffi::CString;
use std::path::Path;
use std::str::FromStr;

/// Open a FITS file, mapping any `fitsio` error into a [`FitsError`].
#[macro_export]
macro_rules! fits_open {
    ($filename:expr) => {
        $crate::fits_read::_open_fits($filename, file!(), line!())
    };
}

/// Open an HDU by its 0-indexed number.
#[macro_export]
macro_rules! fits_open_hdu {
    ($fptr:expr, $filename:expr, $hdu_num:expr) => {
        $crate::fits_read::_open_hdu($fptr, $filename, $hdu_num, file!(), line!())
    };
}

/// Read a mandatory keyword, failing if it is absent or unparsable.
#[macro_export]
macro_rules! get_required_fits_key {
    ($fptr:expr, $filename:expr, $hdu:expr, $keyword:expr) => {
        $crate::fits_read::_get_required_fits_key($fptr, $filename, $hdu, $keyword, file!(), line!())
    };
}

/// Read an optional keyword, returning `None` if it is absent.
#[macro_export]
macro_rules! get_optional_fits_key {
    ($fptr:expr, $filename:expr, $hdu:expr, $keyword:expr) => {
        $crate::fits_read::_get_optional_fits_key($fptr, $filename, $hdu, $keyword, file!(), line!())
    };
}

/// Read a CONTINUE-keyword long string, failing if it is absent.
#[macro_export]
macro_rules! get_required_fits_key_long_string {
    ($fptr:expr, $filename:expr, $hdu:expr, $keyword:expr) => {
        $crate::fits_read::_get_required_fits_key_long_string(
            $fptr, $filename, $hdu, $keyword, file!(), line!(),
        )
    };
}

/// Read a CONTINUE-keyword long string, returning `None` if it is absent.
#[macro_export]
macro_rules! get_optional_fits_key_long_string {
    ($fptr:expr, $filename:expr, $hdu:expr, $keyword:expr) => {
        $crate::fits_read::_get_optional_fits_key_long_string(
            $fptr, $filename, $hdu, $keyword, file!(), line!(),
        )
    };
}

/// Read a single table cell from the current HDU.
#[macro_export]
macro_rules! get_fits_col {
    ($fptr:expr, $filename:expr, $hdu:expr, $col_name:expr, $row:expr) => {
        $crate::fits_read::_get_fits_col($fptr, $filename, $hdu, $col_name, $row, file!(), line!())
    };
}

/// Read the NAXISn dimensions of an image HDU, outer-to-inner.
#[macro_export]
macro_rules! get_hdu_image_size {
    ($fptr:expr, $filename:expr, $hdu:expr) => {
        $crate::fits_read::_get_hdu_image_size($fptr, $filename, $hdu, file!(), line!())
    };
}

/// Read a whole image HDU into a flat `Vec`.
#[macro_export]
macro_rules! get_fits_image {
    ($fptr:expr, $filename:expr, $hdu:expr) => {
        $crate::fits_read::_get_fits_image($fptr, $filename, $hdu, file!(), line!())
    };
}

pub fn _open_fits<P: AsRef<Path>>(
    filename: P,
    source_file: &'static str,
    source_line: u32,
) -> Result<FitsFile, FitsError> {
    FitsFile::open(&filename).map_err(|e| FitsError::Open {
        fits_error: e,
        fits_filename: filename.as_ref().to_path_buf(),
        source_file,
        source_line,
    })
}

pub fn _open_hdu(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu_num: usize,
    source_file: &'static str,
    source_line: u32,
) -> Result<FitsHdu, FitsError> {
    fptr.hdu(hdu_num).map_err(|e| FitsError::Fitsio {
        fits_error: e,
        fits_filename: filename.to_path_buf(),
        hdu_num,
        source_file,
        source_line,
    })
}

pub fn _get_required_fits_key<T: FromStr>(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    keyword: &str,
    source_file: &'static str,
    source_line: u32,
) -> Result<T, FitsError> {
    let unparsed: String = hdu
        .read_key(fptr, keyword)
        .map_err(|_| FitsError::MissingKey {
            key: keyword.to_string(),
            fits_filename: filename.to_path_buf(),
            hdu_num: hdu.number,
            source_file,
            source_line,
        })?;

    unparsed.parse().map_err(|_| FitsError::Parse {
        key: keyword.to_string(),
        fits_filename: filename.to_path_buf(),
        hdu_num: hdu.number,
        source_file,
        source_line,
    })
}

pub fn _get_optional_fits_key<T: FromStr>(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    keyword: &str,
    source_file: &'static str,
    source_line: u32,
) -> Result<Option<T>, FitsError> {
    let unparsed: Option<String> = match hdu.read_key(fptr, keyword) {
        Ok(v) => Some(v),
        Err(fitsio::errors::Error::Fits(e)) if e.status == 202 || e.status == 204 => None,
        Err(e) => {
            return Err(FitsError::Fitsio {
                fits_error: e,
                fits_filename: filename.to_path_buf(),
                hdu_num: hdu.number,
                source_file,
                source_line,
            })
        }
    };

    match unparsed {
        Some(s) => s.parse().map(Some).map_err(|_| FitsError::Parse {
            key: keyword.to_string(),
            fits_filename: filename.to_path_buf(),
            hdu_num: hdu.number,
            source_file,
            source_line,
        }),
        None => Ok(None),
    }
}

/// CONTINUE-keyword long strings need raw `fitsio-sys` access; the safe
/// `fitsio` crate doesn't stitch CONTINUE cards back together.
unsafe fn get_fits_long_string(
    fptr: *mut fitsio_sys::fitsfile,
    keyword: &str,
) -> Result<Option<String>, i32> {
    let c_keyword = CString::new(keyword).unwrap();
    let mut status = 0;
    let mut long_string_ptr: *mut libc::c_char = std::ptr::null_mut();

    fitsio_sys::ffgkls(
        fptr,
        c_keyword.as_ptr() as *mut libc::c_char,
        &mut long_string_ptr,
        std::ptr::null_mut(),
        &mut status,
    );

    if status == 202 || status == 204 {
        return Ok(None);
    }
    if status != 0 {
        return Err(status);
    }

    let c_str = std::ffi::CStr::from_ptr(long_string_ptr);
    let result = c_str.to_string_lossy().into_owned();
    fitsio_sys::fffree(long_string_ptr as *mut libc::c_void, &mut status);

    Ok(Some(result))
}

pub fn _get_optional_fits_key_long_string(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    keyword: &str,
    source_file: &'static str,
    source_line: u32,
) -> Result<Option<String>, FitsError> {
    let result = fptr.with_raw(|raw_fptr| unsafe { get_fits_long_string(raw_fptr, keyword) });

    result.map_err(|_| FitsError::LongString {
        key: keyword.to_string(),
        fits_filename: filename.to_path_buf(),
        hdu_num: hdu.number,
        source_file,
        source_line,
    })
}

pub fn _get_required_fits_key_long_string(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    keyword: &str,
    source_file: &'static str,
    source_line: u32,
) -> Result<String, FitsError> {
    match _get_optional_fits_key_long_string(fptr, filename, hdu, keyword, source_file, source_line)?
    {
        Some(s) => Ok(s),
        None => Err(FitsError::MissingKey {
            key: keyword.to_string(),
            fits_filename: filename.to_path_buf(),
            hdu_num: hdu.number,
            source_file,
            source_line,
        }),
    }
}

pub fn _get_fits_col<T: ReadsCol>(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    col_name: &str,
    row: usize,
    _source_file: &'static str,
    _source_line: u32,
) -> Result<T, FitsError> {
    hdu.read_cell_value(fptr, col_name, row)
        .map_err(|_| FitsError::ReadCell {
            fits_filename: filename.to_path_buf(),
            hdu_num: hdu.number,
            row_num: row,
            col_name: col_name.to_string(),
        })
}

/// Returns the NAXISn dimensions of an image HDU, slowest-varying axis first
/// (i.e. `[NAXIS2, NAXIS1]` for a 2-D image).
pub fn _get_hdu_image_size(
    _fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    source_file: &'static str,
    source_line: u32,
) -> Result<Vec<usize>, FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape.clone()),
        _ => Err(FitsError::NotImage {
            fits_filename: filename.to_path_buf(),
            hdu_num: hdu.number,
            source_file,
            source_line,
        }),
    }
}

pub fn _get_fits_image<T: ReadImage>(
    fptr: &mut FitsFile,
    filename: &Path,
    hdu: &FitsHdu,
    source_file: &'static str,
    source_line: u32,
) -> Result<T, FitsError> {
    hdu.read_image(fptr).map_err(|e| FitsError::Fitsio {
        fits_error: e,
        fits_filename: filename.to_path_buf(),
        hdu_num: hdu.number,
        source_file,
        source_line,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_doesnt_exist() {
        let result = fits_open!("this_file_does_not_exist.fits");
        assert!(result.is_err());
    }
}
