use crate::common::error::StoreError;

/// クレート全体で使用するResult型のエイリアス
///
/// このエイリアスにより、ストア全体で一貫したエラーハンドリングが可能になる。
///
/// # Examples
///
/// ```
/// use assets_store::common::result::StoreResult;
/// use assets_store::common::error::StoreError;
///
/// fn example_function() -> StoreResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> StoreResult<()> {
///     Err(StoreError::internal_error("Something went wrong"))
/// }
/// ```
pub type StoreResult<T> = Result<T, StoreError>;

/// Resultのエラー変換ヘルパー
///
/// 標準のResult型をStoreResultに変換するためのヘルパー
pub trait ResultExt<T, E> {
    /// GitエラーとしてStoreResultに変換
    fn with_git_error(self, message: impl Into<String>) -> StoreResult<T>
    where
        E: Into<git2::Error>;

    /// ファイルシステムエラーとしてStoreResultに変換
    ///
    /// # Examples
    ///
    /// ```
    /// use assets_store::common::result::{StoreResult, ResultExt};
    /// use std::path::PathBuf;
    ///
    /// let result: Result<String, std::io::Error> = Err(std::io::Error::new(
    ///     std::io::ErrorKind::NotFound, "file not found"
    /// ));
    /// let store_result: StoreResult<String> =
    ///     result.with_filesystem_error("Failed to read", Some(PathBuf::from("assets.json")));
    /// assert!(store_result.is_err());
    /// ```
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> StoreResult<T>
    where
        E: Into<std::io::Error>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn with_git_error(self, message: impl Into<String>) -> StoreResult<T>
    where
        E: Into<git2::Error>,
    {
        self.map_err(|e| StoreError::git_error_with_source(message, e.into()))
    }

    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> StoreResult<T>
    where
        E: Into<std::io::Error>,
    {
        self.map_err(|e| StoreError::filesystem_error_with_source(message, path, e.into()))
    }
}
