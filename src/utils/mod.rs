//! Shared utility functions.
//!
//! Header parsing and file name derivation used by the prober and the
//! download manager.

pub mod headers;

pub use headers::{
    extension_for_mime, filename_from_disposition, filename_from_url, header_content_length,
    is_chunked, parse_content_range,
};
