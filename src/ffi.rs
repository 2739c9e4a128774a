//! C FFI bindings for u-partition.
//!
//! Exposes the partitioning pipeline via a C-compatible interface.
//!
//! # Design
//!
//! - **Opaque handle**: `*mut PartitionContext` owns one finished run
//! - **Integer error codes**: 0 = success, negative = error
//! - **Thread-local error message**: `partition_last_error()`
//! - **`catch_unwind`**: All FFI entry points wrapped to prevent panic propagation
//!
//! # Safety
//!
//! All functions use `catch_unwind` to prevent panics from crossing the FFI boundary.
//! Null pointer arguments return error code -1.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic;
use std::ptr;
use std::slice;

use crate::classify::DateStrategy;
use crate::clustering::DbscanConfig;
use crate::loader::CsvLoader;
use crate::pipeline::{run, PartitionConfig, PartitionOutcome};
use crate::report::PartitionReport;

// ── Error handling ────────────────────────────────────────────────────

/// Error codes returned by FFI functions.
pub const PARTITION_OK: i32 = 0;
pub const PARTITION_ERR_NULL_PTR: i32 = -1;
pub const PARTITION_ERR_INVALID_INPUT: i32 = -2;
pub const PARTITION_ERR_PANIC: i32 = -99;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg).ok();
    });
}

/// Returns the last error message, or null if no error.
/// The returned string is valid until the next FFI call on this thread.
///
/// # Safety
/// The caller must not free the returned pointer.
#[no_mangle]
pub extern "C" fn partition_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cstr) => cstr.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn partition_clear_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

// ── Partition Context (opaque handle) ────────────────────────────────

/// Opaque handle for one finished partition run.
pub struct PartitionContext {
    outcome: PartitionOutcome,
}

unsafe fn read_str<'a>(p: *const c_char, what: &str) -> Result<&'a str, String> {
    if p.is_null() {
        return Err(format!("null {what} pointer"));
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|e| format!("invalid UTF-8 in {what}: {e}"))
}

unsafe fn partition_impl(
    csv_data: *const c_char,
    numgroups: u32,
    columns: *const *const c_char,
    n_columns: u32,
    dates: DateStrategy,
) -> *mut PartitionContext {
    if csv_data.is_null() || (columns.is_null() && n_columns > 0) {
        set_last_error("null pointer");
        return ptr::null_mut();
    }
    let csv = match unsafe { read_str(csv_data, "csv_data") } {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    let raw_columns: &[*const c_char] = if n_columns == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(columns, n_columns as usize) }
    };
    let mut names = Vec::with_capacity(raw_columns.len());
    for (i, &p) in raw_columns.iter().enumerate() {
        match unsafe { read_str(p, &format!("columns[{i}]")) } {
            Ok(s) => names.push(s.to_string()),
            Err(e) => {
                set_last_error(&e);
                return ptr::null_mut();
            }
        }
    }

    let df = match CsvLoader::new().load_str(csv) {
        Ok(df) => df,
        Err(e) => {
            set_last_error(&format!("CSV parse error: {e}"));
            return ptr::null_mut();
        }
    };

    let config = PartitionConfig::new(numgroups as usize, names).date_strategy(dates);
    match run(df, &config) {
        Ok(outcome) => Box::into_raw(Box::new(PartitionContext { outcome })),
        Err(e) => {
            set_last_error(&format!("partition failed: {e}"));
            ptr::null_mut()
        }
    }
}

/// Partitions a CSV string into `numgroups` groups over the named columns.
/// Date-like columns are interval-binned.
///
/// An infeasible (unbalanced) result still returns a handle; check it with
/// `partition_is_feasible`.
///
/// # Safety
/// - `csv_data` must be a valid null-terminated UTF-8 string.
/// - `columns` must point to `n_columns` valid null-terminated UTF-8 strings.
/// - The returned handle must be freed with `partition_free`.
#[no_mangle]
pub unsafe extern "C" fn partition_csv(
    csv_data: *const c_char,
    numgroups: u32,
    columns: *const *const c_char,
    n_columns: u32,
) -> *mut PartitionContext {
    let result = panic::catch_unwind(|| unsafe {
        partition_impl(csv_data, numgroups, columns, n_columns, DateStrategy::Bin)
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in partition_csv");
            ptr::null_mut()
        }
    }
}

/// Like `partition_csv`, but date-like columns are encoded with DBSCAN
/// (`epsilon` in days, `min_samples` >= 2).
///
/// # Safety
/// Same as `partition_csv`.
#[no_mangle]
pub unsafe extern "C" fn partition_csv_clustered(
    csv_data: *const c_char,
    numgroups: u32,
    columns: *const *const c_char,
    n_columns: u32,
    epsilon: f64,
    min_samples: u32,
) -> *mut PartitionContext {
    let result = panic::catch_unwind(|| unsafe {
        let dates = DateStrategy::Cluster(DbscanConfig::new(epsilon, min_samples as usize));
        partition_impl(csv_data, numgroups, columns, n_columns, dates)
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in partition_csv_clustered");
            ptr::null_mut()
        }
    }
}

/// Frees a partition context.
///
/// # Safety
/// `ctx` must be a valid pointer from `partition_csv`, or null.
#[no_mangle]
pub unsafe extern "C" fn partition_free(ctx: *mut PartitionContext) {
    if !ctx.is_null() {
        let _ = unsafe { Box::from_raw(ctx) };
    }
}

/// Returns 1 if the group sizes passed the fairness check, 0 if not,
/// -1 for a null context.
///
/// # Safety
/// `ctx` must be a valid partition context or null.
#[no_mangle]
pub unsafe extern "C" fn partition_is_feasible(ctx: *const PartitionContext) -> i32 {
    if ctx.is_null() {
        set_last_error("null context");
        return PARTITION_ERR_NULL_PTR;
    }
    let ctx = unsafe { &*ctx };
    i32::from(ctx.outcome.is_feasible())
}

/// Returns the number of rows partitioned.
///
/// # Safety
/// `ctx` must be a valid partition context or null.
#[no_mangle]
pub unsafe extern "C" fn partition_row_count(ctx: *const PartitionContext) -> i64 {
    if ctx.is_null() {
        set_last_error("null context");
        return -1;
    }
    let ctx = unsafe { &*ctx };
    ctx.outcome.partition.row_count() as i64
}

/// Returns the number of groups.
///
/// # Safety
/// `ctx` must be a valid partition context or null.
#[no_mangle]
pub unsafe extern "C" fn partition_group_count(ctx: *const PartitionContext) -> i64 {
    if ctx.is_null() {
        set_last_error("null context");
        return -1;
    }
    let ctx = unsafe { &*ctx };
    ctx.outcome.group_count() as i64
}

/// Writes each group's size into `out[0..len]`, in group order.
///
/// # Safety
/// `ctx` must be valid. `out` must point to `len` writable `u64`s, where
/// `len` equals `partition_group_count(ctx)`.
#[no_mangle]
pub unsafe extern "C" fn partition_group_sizes(
    ctx: *const PartitionContext,
    out: *mut u64,
    len: u32,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() || out.is_null() {
            set_last_error("null pointer");
            return PARTITION_ERR_NULL_PTR;
        }
        let ctx = unsafe { &*ctx };
        let sizes = ctx.outcome.partition.sizes();
        if len as usize != sizes.len() {
            set_last_error(&format!(
                "buffer holds {len} sizes, partition has {} groups",
                sizes.len()
            ));
            return PARTITION_ERR_INVALID_INPUT;
        }

        let out = unsafe { slice::from_raw_parts_mut(out, sizes.len()) };
        for (dst, &size) in out.iter_mut().zip(&sizes) {
            *dst = size as u64;
        }
        PARTITION_OK
    });

    result.unwrap_or_else(|_| {
        set_last_error("panic in partition_group_sizes");
        PARTITION_ERR_PANIC
    })
}

/// Writes each row's 1-based group number into `out[0..len]`, in original
/// row order.
///
/// # Safety
/// `ctx` must be valid. `out` must point to `len` writable `u32`s, where
/// `len` equals `partition_row_count(ctx)`.
#[no_mangle]
pub unsafe extern "C" fn partition_assignments(
    ctx: *const PartitionContext,
    out: *mut u32,
    len: u32,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() || out.is_null() {
            set_last_error("null pointer");
            return PARTITION_ERR_NULL_PTR;
        }
        let ctx = unsafe { &*ctx };
        let assignments = &ctx.outcome.partition.assignments;
        if len as usize != assignments.len() {
            set_last_error(&format!(
                "buffer holds {len} rows, partition has {}",
                assignments.len()
            ));
            return PARTITION_ERR_INVALID_INPUT;
        }

        let out = unsafe { slice::from_raw_parts_mut(out, assignments.len()) };
        for (dst, &group) in out.iter_mut().zip(assignments) {
            *dst = group as u32;
        }
        PARTITION_OK
    });

    result.unwrap_or_else(|_| {
        set_last_error("panic in partition_assignments");
        PARTITION_ERR_PANIC
    })
}

/// Returns the partition report as a JSON string, or null on error.
///
/// # Safety
/// `ctx` must be valid. The returned string must be freed with
/// `partition_string_free`.
#[no_mangle]
pub unsafe extern "C" fn partition_report_json(ctx: *const PartitionContext) -> *mut c_char {
    let result = panic::catch_unwind(|| {
        if ctx.is_null() {
            set_last_error("null context");
            return ptr::null_mut();
        }
        let ctx = unsafe { &*ctx };
        let json = match PartitionReport::from_outcome(&ctx.outcome) {
            Ok(report) => report.to_json().map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match json.and_then(|s| CString::new(s).map_err(|e| e.to_string())) {
            Ok(c) => c.into_raw(),
            Err(e) => {
                set_last_error(&format!("report failed: {e}"));
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(ptr) => ptr,
        Err(_) => {
            set_last_error("panic in partition_report_json");
            ptr::null_mut()
        }
    }
}

/// Frees a string returned by `partition_report_json`.
///
/// # Safety
/// `s` must come from `partition_report_json`, or be null.
#[no_mangle]
pub unsafe extern "C" fn partition_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = unsafe { CString::from_raw(s) };
    }
}

// ── Version ──────────────────────────────────────────────────────────

/// Returns the version string of u-partition.
///
/// # Safety
/// The returned string is a static string literal. Do not free it.
#[no_mangle]
pub extern "C" fn partition_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const CSV: &str = "city,price\nOslo,10\nRome,40\nOslo,20\nLima,30\n";

    fn columns(names: &[&str]) -> Vec<CString> {
        names.iter().map(|n| CString::new(*n).unwrap()).collect()
    }

    unsafe fn run_csv(csv: &str, numgroups: u32, names: &[&str]) -> *mut PartitionContext {
        let csv = CString::new(csv).unwrap();
        let owned = columns(names);
        let ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        unsafe { partition_csv(csv.as_ptr(), numgroups, ptrs.as_ptr(), ptrs.len() as u32) }
    }

    fn last_error() -> String {
        let p = partition_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_version() {
        let v = partition_version();
        let s = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(s, "0.1.0");
    }

    #[test]
    fn ffi_error_lifecycle() {
        partition_clear_error();
        assert!(partition_last_error().is_null());

        set_last_error("test error");
        assert_eq!(last_error(), "test error");

        partition_clear_error();
        assert!(partition_last_error().is_null());
    }

    #[test]
    fn ffi_partition_roundtrip() {
        let ctx = unsafe { run_csv(CSV, 2, &["price", "city"]) };
        assert!(!ctx.is_null());

        assert_eq!(unsafe { partition_row_count(ctx) }, 4);
        assert_eq!(unsafe { partition_group_count(ctx) }, 2);
        assert_eq!(unsafe { partition_is_feasible(ctx) }, 1);

        let mut sizes = [0u64; 2];
        let rc = unsafe { partition_group_sizes(ctx, sizes.as_mut_ptr(), 2) };
        assert_eq!(rc, PARTITION_OK);
        assert_eq!(sizes, [2, 2]);

        let mut groups = [0u32; 4];
        let rc = unsafe { partition_assignments(ctx, groups.as_mut_ptr(), 4) };
        assert_eq!(rc, PARTITION_OK);
        // price 10, 40, 20, 30
        assert_eq!(groups, [1, 2, 1, 2]);

        unsafe { partition_free(ctx) };
    }

    #[test]
    fn ffi_report_json() {
        let ctx = unsafe { run_csv(CSV, 2, &["city"]) };
        assert!(!ctx.is_null());

        let json = unsafe { partition_report_json(ctx) };
        assert!(!json.is_null());
        let text = unsafe { CStr::from_ptr(json) }.to_str().unwrap().to_string();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_rows"], 4);
        assert_eq!(value["key"]["column"], "city_encoded");

        unsafe {
            partition_string_free(json);
            partition_free(ctx);
        }
    }

    #[test]
    fn ffi_infeasible_still_returns_handle() {
        let ctx = unsafe { run_csv(CSV, 3, &["price"]) };
        assert!(!ctx.is_null());
        assert_eq!(unsafe { partition_is_feasible(ctx) }, 0);
        unsafe { partition_free(ctx) };
    }

    #[test]
    fn ffi_clustered_dates() {
        let csv = CString::new("d\n2021-01-01\n2021-01-02\n2021-05-01\n2021-05-02\n").unwrap();
        let owned = columns(&["d"]);
        let ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        let ctx = unsafe { partition_csv_clustered(csv.as_ptr(), 2, ptrs.as_ptr(), 1, 3.0, 2) };
        assert!(!ctx.is_null());
        let mut groups = [0u32; 4];
        unsafe { partition_assignments(ctx, groups.as_mut_ptr(), 4) };
        assert_eq!(groups, [1, 1, 2, 2]);
        unsafe { partition_free(ctx) };

        let ctx = unsafe { partition_csv_clustered(csv.as_ptr(), 2, ptrs.as_ptr(), 1, 3.0, 1) };
        assert!(ctx.is_null());
        assert!(last_error().contains("min_samples"));
    }

    #[test]
    fn ffi_errors() {
        let ctx = unsafe { partition_csv(ptr::null(), 2, ptr::null(), 0) };
        assert!(ctx.is_null());
        assert_eq!(last_error(), "null pointer");

        let ctx = unsafe { run_csv(CSV, 2, &["nope"]) };
        assert!(ctx.is_null());
        assert!(last_error().contains("nope"));

        let ctx = unsafe { run_csv(CSV, 0, &["price"]) };
        assert!(ctx.is_null());
        assert!(last_error().contains("numgroups"));

        let ctx = unsafe { run_csv(CSV, 2, &[]) };
        assert!(ctx.is_null());

        let ctx = unsafe { run_csv("price,city\n", 2, &["price"]) };
        assert!(ctx.is_null());
        assert!(last_error().contains("empty dataset"));

        let ctx = unsafe { run_csv("a,b\n1\n", 1, &["a"]) };
        assert!(ctx.is_null());
        assert!(last_error().starts_with("CSV parse error"));

        assert_eq!(unsafe { partition_is_feasible(ptr::null()) }, PARTITION_ERR_NULL_PTR);
        assert_eq!(unsafe { partition_row_count(ptr::null()) }, -1);
        assert!(unsafe { partition_report_json(ptr::null()) }.is_null());
        unsafe {
            partition_free(ptr::null_mut());
            partition_string_free(ptr::null_mut());
        }
    }

    #[test]
    fn ffi_buffer_length_mismatch() {
        let ctx = unsafe { run_csv(CSV, 2, &["price"]) };
        let mut sizes = [0u64; 3];
        let rc = unsafe { partition_group_sizes(ctx, sizes.as_mut_ptr(), 3) };
        assert_eq!(rc, PARTITION_ERR_INVALID_INPUT);
        let rc = unsafe { partition_assignments(ctx, ptr::null_mut(), 4) };
        assert_eq!(rc, PARTITION_ERR_NULL_PTR);
        unsafe { partition_free(ctx) };
    }
}
