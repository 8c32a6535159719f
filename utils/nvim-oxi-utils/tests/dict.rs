use nvim_oxi::{Dictionary, Object};
use texsync_nvim_oxi_utils::{Error, dict};

#[test]
fn require_i64_missing_key() {
    let dict = Dictionary::new();
    let err = dict::require_i64(&dict, "buf");
    assert!(matches!(err, Err(Error::MissingKey { .. })));
}

#[test]
fn require_i64_invalid_value() {
    let mut dict = Dictionary::new();
    dict.insert("line", "not-a-number");
    let err = dict::require_i64(&dict, "line");
    assert!(matches!(err, Err(Error::InvalidValue { .. })));
}

#[test]
fn require_string_nonempty_rejects_empty() {
    let mut dict = Dictionary::new();
    dict.insert("source", "");
    let err = dict::require_string_nonempty(&dict, "source");
    assert!(matches!(err, Err(Error::EmptyValue { .. })));
}

#[test]
fn optional_string_treats_nil_as_absent() {
    let mut dict = Dictionary::new();
    dict.insert("trace", Object::nil());
    let value = dict::optional_string_nonempty(&dict, "trace");
    assert!(matches!(value, Ok(None)));
}

#[test]
fn optional_string_reads_value() {
    let mut dict = Dictionary::new();
    dict.insert("trace", "/tmp/doc.synctex");
    let value = dict::optional_string_nonempty(&dict, "trace");
    assert!(matches!(value, Ok(Some(ref path)) if path.as_str() == "/tmp/doc.synctex"));
}
