//! Tests for utils module functionality.

use bookfetch::utils::{
    extension_for_mime, filename_from_disposition, filename_from_url, parse_content_range,
};

use reqwest::Url;

#[test]
fn test_parse_content_range() {
    let cases = [
        ("bytes 0-0/2048", Some((0, 0, 2048))),
        ("bytes 100-199/1000", Some((100, 199, 1000))),
        ("bytes 0-0/*", None),
        ("bytes 10-5/100", None),
        ("bytes 0-100/100", None),
        ("items 0-1/2", None),
        ("", None),
    ];
    for (header, expected) in cases {
        assert_eq!(parse_content_range(header), expected, "{header}");
    }
}

#[test]
fn test_disposition_names_are_sanitised() {
    assert_eq!(
        filename_from_disposition("inline; filename=plate-04.png"),
        Some("plate-04.png".to_string())
    );
    assert_eq!(filename_from_disposition("attachment"), None);
    assert_eq!(filename_from_disposition("attachment; filename=\"a/b.jpg\""), None);
    assert_eq!(filename_from_disposition("attachment; filename=\"..\\b.jpg\""), None);
    assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
}

#[test]
fn test_filename_from_url() {
    let url = Url::parse("https://example.com/iiif/0001/default.jpg").unwrap();
    assert_eq!(filename_from_url(&url), Some("default.jpg".to_string()));
    let url = Url::parse("https://example.com/").unwrap();
    assert_eq!(filename_from_url(&url), None);
}

#[test]
fn test_filename_from_url_keeps_plus_and_ampersand() {
    let url = Url::parse("https://example.com/scans/a&b+c.jpg").unwrap();
    assert_eq!(filename_from_url(&url), Some("a&b+c.jpg".to_string()));
    let url = Url::parse("https://example.com/scans/vol%201%2B2.pdf").unwrap();
    assert_eq!(filename_from_url(&url), Some("vol 1+2.pdf".to_string()));
    let url = Url::parse("https://example.com/scans/%2E%2E").unwrap();
    assert_eq!(filename_from_url(&url), None);
}

#[test]
fn test_extension_for_mime() {
    assert_eq!(extension_for_mime("image/jpeg"), Some(".jpg"));
    assert_eq!(extension_for_mime("application/pdf; charset=binary"), Some(".pdf"));
    assert_eq!(extension_for_mime("application/x-unknown"), None);
}
