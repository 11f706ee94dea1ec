// Plain-text rendering of listing and search results.
//
// Folder view layout:
//                            PRE photos/2023/
//   2024-01-01 12:00:00        128 photos/readme.txt text/plain
//                           NEXT <continuation token>

use std::io::{self, Write};

use s3browse_rs::{ListingPage, SearchPage, StorageObject};

const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LABEL_WIDTH: usize = 30;
const UNKNOWN_CONTENT_TYPE: &str = "-";

pub fn write_listing_page<W: Write>(out: &mut W, page: &ListingPage) -> io::Result<()> {
    for prefix in &page.prefixes {
        writeln!(out, "{:>LABEL_WIDTH$} {prefix}", "PRE")?;
    }
    write_objects(out, &page.objects)?;
    write_continuation(out, page.truncated, page.next_continuation_token.as_deref())
}

pub fn write_search_page<W: Write>(out: &mut W, page: &SearchPage) -> io::Result<()> {
    write_objects(out, &page.objects)?;
    write_continuation(out, page.truncated, page.next_continuation_token.as_deref())
}

pub fn write_signed_url<W: Write>(out: &mut W, url: &str) -> io::Result<()> {
    writeln!(out, "{url}")
}

fn write_objects<W: Write>(out: &mut W, objects: &[StorageObject]) -> io::Result<()> {
    for object in objects {
        writeln!(
            out,
            "{} {:>10} {} {}",
            object.last_modified.format(LAST_MODIFIED_FORMAT),
            object.size,
            object.key,
            object
                .content_type
                .as_deref()
                .unwrap_or(UNKNOWN_CONTENT_TYPE)
        )?;
    }
    Ok(())
}

fn write_continuation<W: Write>(
    out: &mut W,
    truncated: bool,
    next_continuation_token: Option<&str>,
) -> io::Result<()> {
    match next_continuation_token {
        Some(token) if truncated => writeln!(out, "{:>LABEL_WIDTH$} {token}", "NEXT"),
        _ => Ok(()),
    }
}
