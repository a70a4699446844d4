//! Test the string-list database over a chunk file.

use crate::database::Database;
use crate::e2e_tests::helpers::*;

fn lines(id: u32) -> Vec<String> {
    (0..id % 4).map(|n| format!("doc {id} line {n}")).collect()
}

#[test]
fn test_store_and_reload_documents() {
    let test = TestFile::new();

    let mut db = Database::create(&test.path, 8).expect("create");
    for id in 0..100 {
        db.put(&key(id), &lines(id)).expect("put");
    }
    db.close().expect("close");

    let mut db = Database::open(&test.path, 8).expect("open");
    assert_eq!(db.len(), 100);
    for id in [0, 1, 2, 3, 57, 99] {
        assert_eq!(db.get(&key(id)).expect("get"), lines(id));
    }
    assert_eq!(db.ids().expect("ids"), (0..100).map(key).collect::<Vec<_>>());
}

#[test]
fn test_uncommitted_documents_are_dropped() {
    let test = TestFile::new();

    let mut db = Database::create(&test.path, 8).expect("create");
    db.put("kept", &["a".to_string()]).expect("put");
    db.commit().expect("commit");
    db.put("dropped", &["b".to_string()]).expect("put");
    drop(db);

    let mut db = Database::open(&test.path, 8).expect("open");
    assert_eq!(db.ids().expect("ids"), vec!["kept".to_string()]);
}
