//! C FFI layer for cross-language interoperability.

use crate::options::Options;
use crate::render::{HtmlConfig, MathBackend};
use libc::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::path::PathBuf;
use std::ptr;

/// Configuration for rendering.
#[repr(C)]
pub struct LatexishConfig {
    /// Math backend: 0 = MathJax, 1 = KaTeX
    pub math_backend: c_int,
    /// Whether to generate standalone HTML (with DOCTYPE, head, etc.)
    pub standalone: c_int,
    /// Base path for resolving a relative bibliography path (null for current directory)
    pub base_path: *const c_char,
}

impl Default for LatexishConfig {
    fn default() -> Self {
        Self {
            math_backend: 0,
            standalone: 0,
            base_path: ptr::null(),
        }
    }
}

/// Result type for FFI operations.
#[repr(C)]
pub struct LatexishResult {
    /// Pointer to result string (caller must free with latexish_free_string)
    pub data: *mut c_char,
    /// Error message if data is null (caller must free with latexish_free_string)
    pub error: *mut c_char,
    /// Number of warnings raised while parsing
    pub warnings: c_int,
}

impl LatexishResult {
    fn ok(data: String, warnings: usize) -> Self {
        Self {
            data: into_c_string(data),
            error: ptr::null_mut(),
            warnings: c_int::try_from(warnings).unwrap_or(c_int::MAX),
        }
    }

    fn err(error: String) -> Self {
        Self {
            data: ptr::null_mut(),
            error: into_c_string(error),
            warnings: 0,
        }
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

unsafe fn optional_str<'a>(s: *const c_char) -> Result<Option<&'a str>, String> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s)
        .to_str()
        .map(Some)
        .map_err(|_| "Invalid UTF-8 input".to_string())
}

/// Parse and render a document to HTML in one step.
///
/// `options` is a TOML string of parser options (null for the defaults);
/// `config` may be null.
///
/// # Safety
///
/// - `input` must be a valid null-terminated UTF-8 string.
/// - `options` must be null or a valid null-terminated UTF-8 string.
/// - `config` must be null or a valid pointer to a `LatexishConfig`.
/// - The strings of the returned result must be freed with `latexish_free_result`.
#[no_mangle]
pub unsafe extern "C" fn latexish_render_html(
    input: *const c_char,
    options: *const c_char,
    config: *const LatexishConfig,
) -> LatexishResult {
    let input = match optional_str(input) {
        Ok(Some(s)) => s,
        Ok(None) => return LatexishResult::err("Null input pointer".to_string()),
        Err(e) => return LatexishResult::err(e),
    };
    let options_toml = match optional_str(options) {
        Ok(s) => s,
        Err(e) => return LatexishResult::err(e),
    };

    let default_config = LatexishConfig::default();
    let cfg = if config.is_null() {
        &default_config
    } else {
        &*config
    };
    let base_path = match optional_str(cfg.base_path) {
        Ok(path) => path.map(PathBuf::from),
        Err(e) => return LatexishResult::err(e),
    };

    let mut parser_options = Options {
        base_path,
        ..Options::default()
    };
    if let Some(toml) = options_toml {
        if let Err(e) = parser_options.merge_toml_str(toml) {
            return LatexishResult::err(e.to_string());
        }
    }

    let html_config = HtmlConfig {
        math_backend: match cfg.math_backend {
            1 => MathBackend::KaTeX,
            _ => MathBackend::MathJax,
        },
        standalone: cfg.standalone != 0,
        ..Default::default()
    };

    match crate::parse(input, &parser_options) {
        Ok(doc) => {
            let html = crate::render_document(&doc, &parser_options, &html_config);
            LatexishResult::ok(html, doc.warnings.len())
        }
        Err(e) => LatexishResult::err(e.to_string()),
    }
}

/// Free a string returned by latexish functions.
///
/// # Safety
///
/// - `s` must be a pointer returned by a latexish function, or null.
#[no_mangle]
pub unsafe extern "C" fn latexish_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Free a result struct.
///
/// # Safety
///
/// - `result` must be a valid LatexishResult.
#[no_mangle]
pub unsafe extern "C" fn latexish_free_result(result: LatexishResult) {
    latexish_free_string(result.data);
    latexish_free_string(result.error);
}

/// Get the library version.
///
/// The returned string is static and must not be freed.
#[no_mangle]
pub extern "C" fn latexish_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// Generate C header content for documentation
/// ```c
/// // markdown_latexish.h
/// #ifndef MARKDOWN_LATEXISH_H
/// #define MARKDOWN_LATEXISH_H
///
/// typedef struct {
///     int math_backend;  // 0 = MathJax, 1 = KaTeX
///     int standalone;    // 0 = fragment, 1 = full HTML document
///     const char* base_path;
/// } LatexishConfig;
///
/// typedef struct {
///     char* data;
///     char* error;
///     int warnings;
/// } LatexishResult;
///
/// LatexishResult latexish_render_html(const char* input, const char* options, const LatexishConfig* config);
/// void latexish_free_string(char* s);
/// void latexish_free_result(LatexishResult result);
/// const char* latexish_version(void);
///
/// #endif
/// ```
const _: () = ();

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        latexish_free_string(ptr);
        Some(s)
    }

    #[test]
    fn test_render_through_ffi() {
        let input = CString::new("## Intro {#intro}\n\nSee [cref: intro].").unwrap();
        let result = unsafe { latexish_render_html(input.as_ptr(), ptr::null(), ptr::null()) };
        assert_eq!(result.warnings, 0);
        let html = unsafe { take(result.data) }.unwrap();
        assert!(result.error.is_null());
        assert_eq!(
            html,
            "<h2 id=\"intro\">1 Intro</h2>\n\n<p>See section&nbsp;<a href=\"#intro\" title=\"Section 1\">1</a>.</p>\n"
        );
    }

    #[test]
    fn test_options_and_warnings() {
        let input = CString::new("Théorème\n\n\\Théorème\n\n[cref: nowhere]").unwrap();
        let options = CString::new("language = \"french\"").unwrap();
        let result = unsafe { latexish_render_html(input.as_ptr(), options.as_ptr(), ptr::null()) };
        assert_eq!(result.warnings, 1);
        let html = unsafe { take(result.data) }.unwrap();
        assert!(html.contains("<strong>Théorème 1</strong>"));
        assert!(html.contains("¿nowhere?"));
    }

    #[test]
    fn test_errors_reported() {
        let input = CString::new("Text").unwrap();
        let options = CString::new("bibliography_style = \"mla\"").unwrap();
        let result = unsafe { latexish_render_html(input.as_ptr(), options.as_ptr(), ptr::null()) };
        assert!(result.data.is_null());
        let error = unsafe { take(result.error) }.unwrap();
        assert!(error.contains("mla"));

        let result = unsafe { latexish_render_html(ptr::null(), ptr::null(), ptr::null()) };
        assert_eq!(unsafe { take(result.error) }.as_deref(), Some("Null input pointer"));
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(latexish_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
