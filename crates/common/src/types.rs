//! 通用类型定义

use ids_errors::{RepoResult, RepositoryError};
use serde::{Deserialize, Serialize};

/// 存储生成的自增标识
pub type EntityId = i32;

/// 未分配 / 写入失败的标识哨兵
pub const NEW_ID: EntityId = 0;

/// 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// 校验分页参数（页码与页大小均从 1 开始）
    pub fn validate(&self) -> RepoResult<()> {
        if self.page == 0 {
            return Err(RepositoryError::validation("page must be >= 1"));
        }
        if self.page_size == 0 {
            return Err(RepositoryError::validation("page_size must be >= 1"));
        }
        Ok(())
    }

    /// 在 64 位上计算，任何合法的 `u32` 页码与页大小都不会溢出
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    /// 校验后返回存储可接受的 (limit, offset)
    ///
    /// 偏移超出 `i64` 时视为校验错误，数据库的 LIMIT/OFFSET 均为 BIGINT。
    pub fn bounds(&self) -> RepoResult<(i64, i64)> {
        self.validate()?;
        let offset = i64::try_from(self.offset())
            .map_err(|_| RepositoryError::validation("page is out of range"))?;
        Ok((i64::from(self.limit()), offset))
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// 满足过滤条件的全部行数（与分页无关）
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
        }
    }

    pub fn total_pages(&self) -> u32 {
        ((self.total as f64) / (self.page_size as f64)).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_offset_of_large_pages_does_not_overflow() {
        let pagination = Pagination::new(100_000, 100_000);
        assert!(pagination.validate().is_ok());
        assert_eq!(pagination.offset(), 99_999 * 100_000);
        assert_eq!(pagination.bounds().unwrap(), (100_000, 9_999_900_000));

        let last = Pagination::new(u32::MAX, u32::MAX);
        assert_eq!(last.offset(), u64::from(u32::MAX - 1) * u64::from(u32::MAX));
        assert!(matches!(last.bounds(), Err(RepositoryError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(Pagination::new(0, 10).validate().is_err());
        assert!(Pagination::new(1, 0).validate().is_err());
        assert!(Pagination::new(1, 1).validate().is_ok());
    }

    #[test]
    fn test_paged_result_keeps_true_total() {
        let page = PagedResult::new(vec![21, 22, 23, 24, 25], 25, &Pagination::new(3, 10));
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 3);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.total_pages(), 3);
    }
}
