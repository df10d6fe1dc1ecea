//! C-compatible FFI API for the job dispatcher and other language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Strings returned through `out_*` pointers are allocated on the Rust heap.
//! - Callers **must** free them with `pc_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions return a `c_int` (0 = success, non-zero = error).
//! - A fallback outcome is a success: the job still prints, and the returned
//!   JSON carries `"status": "fallback"`.
//! - Error details can be retrieved via `pc_last_error`.
//!
//! ## Thread safety
//! - The pipeline holds no shared mutable state; `pc_last_error` uses a
//!   thread-local, so every function is safe to call from multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lprint_compose
//! // extern int pc_process_file(const char* path, const char* layout,
//! //                            const char* config_json, char** out_json);
//! // extern const char* pc_last_error();
//! // extern void pc_free_string(char* s);
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use crate::config::PipelineConfig;
use crate::layout_spec::LayoutId;
use crate::pipeline::{Pipeline, PrintJob};
use crate::plan::compute_plan;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Borrow an optional C string as UTF-8.
///
/// # Safety
/// `p`, if non-null, must point to a valid null-terminated string that
/// outlives the returned borrow.
unsafe fn opt_str<'a>(p: *const c_char) -> Result<Option<&'a str>, String> {
    if p.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(p)
        .to_str()
        .map(Some)
        .map_err(|e| format!("Invalid UTF-8: {e}"))
}

/// Parse an optional JSON config; `NULL` means defaults.
fn config_from_json(json: Option<&str>) -> Result<PipelineConfig, String> {
    match json {
        None => Ok(PipelineConfig::default()),
        Some(s) => PipelineConfig::from_json(s).map_err(|e| e.to_string()),
    }
}

/// Hand a JSON string to the caller.
///
/// # Safety
/// `out` must be a valid pointer.
unsafe fn write_json(out: *mut *mut c_char, json: String) -> c_int {
    match CString::new(json) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(_) => {
            set_last_error("JSON contained null byte");
            *out = ptr::null_mut();
            5
        }
    }
}

fn run_job(job: &PrintJob, config: PipelineConfig) -> Result<String, String> {
    let pipeline = Pipeline::new(config).map_err(|e| e.to_string())?;
    pipeline
        .process_one(job)
        .map(|outcome| outcome.to_json())
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Compose a print layout for one image file.
///
/// # Parameters
/// - `path`: null-terminated UTF-8 path to the source image
/// - `layout`: layout identifier (`a5`, `fullA5`, `two4x6`, `twoA6`); `NULL`
///   or unknown values use `a5`
/// - `config_json`: optional pipeline config JSON; `NULL` for defaults
/// - `out_json`: on success, receives the job outcome JSON
///
/// # Returns
/// `0` on success (processed or fallback), non-zero on error. On error, call
/// `pc_last_error`.
///
/// # Safety
/// - String arguments, if non-null, must be valid null-terminated strings.
/// - `out_json` must be a valid pointer; free `*out_json` with `pc_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pc_process_file(
    path: *const c_char,
    layout: *const c_char,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    if path.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let (path, layout, config_json) =
        match (opt_str(path), opt_str(layout), opt_str(config_json)) {
            (Ok(Some(p)), Ok(l), Ok(c)) => (p, l, c),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                set_last_error(&e);
                return 2;
            }
            (Ok(None), _, _) => {
                set_last_error("Null pointer argument");
                return 1;
            }
        };

    let config = match config_from_json(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e);
            return 3;
        }
    };

    let source = Path::new(path);
    let id = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("job")
        .to_string();
    let job = PrintJob {
        layout: Some(LayoutId::parse_or_default(layout).as_str().to_string()),
        ..PrintJob::new(id, source, LayoutId::default())
    };

    match run_job(&job, config) {
        Ok(json) => write_json(out_json, json),
        Err(e) => {
            set_last_error(&e);
            4
        }
    }
}

/// Process a job described as JSON (`{"id", "source", "layout", "options"}`).
///
/// # Returns
/// `0` on success (processed or fallback), non-zero on error.
///
/// # Safety
/// Same as `pc_process_file`.
#[no_mangle]
pub unsafe extern "C" fn pc_process_job(
    job_json: *const c_char,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    if job_json.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let (job_json, config_json) = match (opt_str(job_json), opt_str(config_json)) {
        (Ok(Some(j)), Ok(c)) => (j, c),
        (Err(e), _) | (_, Err(e)) => {
            set_last_error(&e);
            return 2;
        }
        (Ok(None), _) => {
            set_last_error("Null pointer argument");
            return 1;
        }
    };

    let job: PrintJob = match serde_json::from_str(job_json) {
        Ok(j) => j,
        Err(e) => {
            set_last_error(&format!("Invalid job JSON: {e}"));
            return 3;
        }
    };
    let config = match config_from_json(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e);
            return 3;
        }
    };

    match run_job(&job, config) {
        Ok(json) => write_json(out_json, json),
        Err(e) => {
            set_last_error(&e);
            4
        }
    }
}

/// Compute only the composition plan for a layout (no pixel work). Returns
/// JSON.
///
/// # Safety
/// `layout`, if non-null, must be a valid null-terminated string. `out_json`
/// must be a valid pointer; free `*out_json` with `pc_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pc_compute_plan(layout: *const c_char, out_json: *mut *mut c_char) -> c_int {
    if out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let layout = match opt_str(layout) {
        Ok(l) => LayoutId::parse_or_default(l),
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    match compute_plan(layout) {
        Ok(plan) => write_json(out_json, plan.to_json()),
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a string returned through an `out_json` pointer.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn pc_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `pc_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn pc_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn pc_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn take_json(p: *mut c_char) -> String {
        let json = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        unsafe { pc_free_string(p) };
        json
    }

    #[test]
    fn ffi_compute_plan() {
        let layout = CString::new("twoA6").unwrap();
        let mut json_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe { pc_compute_plan(layout.as_ptr(), &mut json_ptr) };

        assert_eq!(rc, 0);
        assert!(!json_ptr.is_null());
        let json = take_json(json_ptr);
        assert!(json.contains("\"two4x6\""));
        assert!(json.contains("\"slots\""));
    }

    #[test]
    fn ffi_compute_plan_null_layout_uses_default() {
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { pc_compute_plan(ptr::null(), &mut json_ptr) };
        assert_eq!(rc, 0);
        assert!(take_json(json_ptr).contains("\"a5\""));
    }

    #[test]
    fn ffi_null_input() {
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { pc_process_file(ptr::null(), ptr::null(), ptr::null(), &mut out) };
        assert_ne!(rc, 0, "Should fail on null input");
        let err = unsafe { CStr::from_ptr(pc_last_error()) }.to_str().unwrap();
        assert_eq!(err, "Null pointer argument");
    }

    #[test]
    fn ffi_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.jpg");
        std::fs::write(&src, b"not an image").unwrap();
        let cfg = PipelineConfig::with_output_dir(dir.path().join("out")).to_json();

        let path = CString::new(src.to_str().unwrap()).unwrap();
        let cfg = CString::new(cfg).unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { pc_process_file(path.as_ptr(), ptr::null(), cfg.as_ptr(), &mut out) };

        assert_eq!(rc, 0);
        let json = take_json(out);
        assert!(json.contains("\"fallback\""), "{json}");
    }

    #[test]
    fn ffi_missing_file_is_error() {
        let path = CString::new("/nonexistent/photo.jpg").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { pc_process_file(path.as_ptr(), ptr::null(), ptr::null(), &mut out) };
        assert_eq!(rc, 4);
        assert!(!pc_last_error().is_null());
    }

    #[test]
    fn ffi_bad_job_json() {
        let job = CString::new("{ \"id\": 1 }").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { pc_process_job(job.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, 3);
    }

    #[test]
    fn ffi_version() {
        let v = pc_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
