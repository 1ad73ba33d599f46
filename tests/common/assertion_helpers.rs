//! Custom assertion macros

/// Assert that a directory holds exactly the given `(path, content)` files
#[macro_export]
macro_rules! assert_tree_eq {
    ($dir:expr, $expected:expr) => {
        pretty_assertions::assert_eq!(
            $crate::common::test_helpers::FileSystemHelper::read_tree(&$dir),
            $crate::common::test_helpers::tree(&$expected),
            "Unexpected tree at {}",
            $dir.display()
        );
    };
}

/// Assert that two directories hold byte-identical files
#[macro_export]
macro_rules! assert_same_tree {
    ($left:expr, $right:expr) => {
        pretty_assertions::assert_eq!(
            $crate::common::test_helpers::FileSystemHelper::read_tree(&$left),
            $crate::common::test_helpers::FileSystemHelper::read_tree(&$right)
        );
    };
}

/// Assert that a result is a specific `StoreError` variant
#[macro_export]
macro_rules! assert_store_error {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            other => panic!(
                "Expected {}, got {:?}",
                stringify!($pattern),
                other.map(|_| ())
            ),
        }
    };
}
