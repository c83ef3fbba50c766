use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::Path;

// Characters escaped when a file name is placed in an href. 🌐
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// Percent-encodes one path segment for use in a relative link.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

// Splits a request target into its path and raw query string. The fragment is dropped.
pub fn split_target(target: &str) -> (&str, &str) {
    let target = target.split('#').next().unwrap_or_default();
    target.split_once('?').unwrap_or((target, ""))
}

// True when the first `name` parameter in the query is `true` (case-insensitive).
// Later repeats of the same key are ignored. 🚩
pub fn query_flag(query: &str, name: &str) -> bool {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| decode_component(key) == name)
        .is_some_and(|(_, value)| decode_component(value).eq_ignore_ascii_case("true"))
}

fn decode_component(component: &str) -> String {
    percent_decode_str(&component.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

// Name used for a ZIP download of the resolved directory `dir`.
// The served root itself, or a directory without a usable name, becomes "folder".
pub fn archive_name(root: &Path, dir: &Path) -> String {
    if dir == root {
        return "folder".to_string();
    }
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().replace(['"', '\\'], "_"))
        .unwrap_or_default();
    if name.is_empty() {
        "folder".to_string()
    } else {
        name
    }
}
