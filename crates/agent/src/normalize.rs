//! Best-effort repair of path arguments before dispatch.
//!
//! Models writing Windows paths inside JSON strings often emit `\n`, `\t` and
//! friends unescaped, so `C:\new\temp` arrives as `C:` + newline + `ew` + tab
//! + `emp`. Others drop the separator after the drive letter (`C:Users`).
//! Both are fixed here. Nothing in this module can fail: a value that does not
//! look like a damaged path comes back untouched.

use serde_json::Value;

/// Argument keys that conventionally hold a filesystem path.
const PATH_KEYS: &[&str] = &[
    "path",
    "file_path",
    "filepath",
    "filename",
    "directory",
    "dir",
    "folder",
    "source",
    "destination",
    "target",
    "cwd",
    "image_path",
    "output_path",
];

/// Key holding an array of paths.
const PATH_LIST_KEY: &str = "paths";

/// Normalize every path-like value of a call's arguments.
pub fn normalize_arguments(arguments: Value) -> Value {
    let Value::Object(mut map) = arguments else {
        return arguments;
    };

    for (key, value) in map.iter_mut() {
        if PATH_KEYS.contains(&key.as_str()) {
            if let Value::String(s) = value {
                *s = normalize_path(s);
            }
        } else if key == PATH_LIST_KEY
            && let Value::Array(items) = value
        {
            for item in items.iter_mut() {
                if let Value::String(s) = item {
                    *s = normalize_path(s);
                }
            }
        }
    }

    Value::Object(map)
}

/// Repair one path string.
pub fn normalize_path(raw: &str) -> String {
    let repaired = repair_control_chars(raw);
    insert_drive_separator(repaired)
}

/// Turn control characters back into the backslash escapes they came from.
fn repair_control_chars(raw: &str) -> String {
    if !raw.chars().any(|c| c.is_ascii_control()) {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{0b}' => out.push_str("\\v"),
            other => out.push(other),
        }
    }
    out
}

/// `C:Users` becomes `C:\Users`, or `C:/Users` when the path uses `/`.
fn insert_drive_separator(path: String) -> String {
    let bytes = path.as_bytes();
    if bytes.len() <= 2
        || !bytes[0].is_ascii_alphabetic()
        || bytes[1] != b':'
        || bytes[2] == b'\\'
        || bytes[2] == b'/'
    {
        return path;
    }
    let separator = if path.contains('/') { '/' } else { '\\' };
    let mut fixed = String::with_capacity(path.len() + 1);
    fixed.push_str(&path[..2]);
    fixed.push(separator);
    fixed.push_str(&path[2..]);
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repairs_swallowed_escapes() {
        assert_eq!(normalize_path("C:\\Users\\bob\new\tfile.txt"), r"C:\Users\bob\new\tfile.txt");
        assert_eq!(normalize_path("E:\\ANA\\r\u{08}ackup"), r"E:\ANA\r\backup");
        assert_eq!(normalize_path("a\rb\u{0c}c\u{0b}d"), r"a\rb\fc\vd");
    }

    #[test]
    fn inserts_drive_separator() {
        assert_eq!(normalize_path("C:Users"), r"C:\Users");
        assert_eq!(normalize_path("C:Users/bob/doc.txt"), "C:/Users/bob/doc.txt");
        assert_eq!(normalize_path(r"C:\Users"), r"C:\Users");
        assert_eq!(normalize_path("D:/data"), "D:/data");
    }

    #[test]
    fn leaves_ordinary_values_alone() {
        assert_eq!(normalize_path("notes.txt"), "notes.txt");
        assert_eq!(normalize_path("/home/bob/notes.txt"), "/home/bob/notes.txt");
        assert_eq!(normalize_path("C:"), "C:");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn only_path_keys_are_touched() {
        let args = json!({
            "path": "C:Users",
            "content": "line1\nline2",
            "command": "echo\ta",
        });
        let out = normalize_arguments(args);
        assert_eq!(out["path"], r"C:\Users");
        assert_eq!(out["content"], "line1\nline2");
        assert_eq!(out["command"], "echo\ta");
    }

    #[test]
    fn path_arrays_are_normalized() {
        let out = normalize_arguments(json!({"paths": ["C:tmp", 3, "ok"]}));
        assert_eq!(out["paths"], json!([r"C:\tmp", 3, "ok"]));
    }

    #[test]
    fn non_string_and_non_object_pass_through() {
        assert_eq!(normalize_arguments(json!({"path": 7})), json!({"path": 7}));
        assert_eq!(normalize_arguments(json!("C:Users")), json!("C:Users"));
        assert_eq!(normalize_arguments(json!(null)), json!(null));
    }
}
