//! Integration test: every element insertion and removal emits a
//! `tally::array` event.

use tally_array::DynArray;
use tally_test_utils::capture_logs;

fn fresh() -> DynArray<i32> {
    DynArray::new().unwrap()
}

#[test]
fn push_and_emplace_back_log_each_element() {
    let mut arr = fresh();
    let ((), logs) = capture_logs(|| {
        arr.push(1).unwrap();
        arr.emplace_back(|| 2).unwrap();
    });
    assert_eq!(logs.matches("pushed element").count(), 2, "{logs}");
    assert!(logs.contains("tally::array"), "{logs}");
    assert!(logs.contains("DEBUG"), "{logs}");
}

#[test]
fn pop_and_truncate_log_removals() {
    let mut arr = fresh();
    arr.extend_from_slice(&[1, 2, 3, 4]).unwrap();
    let (popped, logs) = capture_logs(|| {
        let popped = arr.pop();
        arr.truncate(1);
        popped
    });
    assert_eq!(popped, Some(4));
    assert!(logs.contains("popped element"), "{logs}");
    assert!(logs.contains("truncated"), "{logs}");
    assert!(logs.contains("dropped=2"), "{logs}");
}

#[test]
fn truncate_that_drops_nothing_is_silent() {
    let mut arr = fresh();
    arr.push(1).unwrap();
    let ((), logs) = capture_logs(|| arr.truncate(5));
    assert!(!logs.contains("truncated"), "{logs}");
}

#[test]
fn insert_and_remove_log_positions() {
    let mut arr = fresh();
    arr.extend_from_slice(&[1, 2, 3]).unwrap();
    let ((), logs) = capture_logs(|| {
        arr.insert(0, 5).unwrap();
        arr.remove(1).unwrap();
    });
    assert!(logs.contains("inserted element"), "{logs}");
    assert!(logs.contains("removed element"), "{logs}");
    assert_eq!(arr, [5, 2, 3]);
}

#[test]
fn rejected_index_is_logged_as_error() {
    let mut arr = fresh();
    let (result, logs) = capture_logs(|| arr.remove(0));
    assert!(result.is_err());
    assert!(logs.contains("ERROR"), "{logs}");
    assert!(logs.contains("index out of range"), "{logs}");
}
