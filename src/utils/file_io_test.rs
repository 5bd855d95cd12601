use std::io::Write;

use tempfile::tempdir;

use super::file_io::open_file_for_append;

#[test]
fn test_open_file_for_append_creates_missing_parents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("1234").join("bacnode.log");

    let mut file = open_file_for_append(&path).unwrap();
    writeln!(file, "first").unwrap();
    drop(file);
    let mut file = open_file_for_append(&path).unwrap();
    writeln!(file, "second").unwrap();
    drop(file);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}
