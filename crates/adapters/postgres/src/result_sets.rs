//! 多结果集读取
//!
//! 一次往返发送多条 SELECT，按语句完成标记把返回的行切分成有序结果集，
//! 再按读取计划逐个解码到聚合的各个子集合上。

use crate::error_mapper::map_sqlx_error;
use futures::TryStreamExt;
use ids_errors::{RepoResult, RepositoryError};
use sqlx::Either;
use sqlx::postgres::{PgConnection, PgRow};
use std::collections::VecDeque;
use tracing::debug;

/// 按语句顺序排列的结果集
#[derive(Debug)]
pub struct ResultSets<R = PgRow> {
    sets: VecDeque<Vec<R>>,
    current: Vec<R>,
}

impl<R> Default for ResultSets<R> {
    fn default() -> Self {
        Self {
            sets: VecDeque::new(),
            current: Vec::new(),
        }
    }
}

impl<R> ResultSets<R> {
    /// 从驱动返回的流元素构造：`Left` 表示一条语句完成，`Right` 为数据行
    pub fn from_items<Q, I>(items: I) -> Self
    where
        I: IntoIterator<Item = Either<Q, R>>,
    {
        let mut sets = Self::default();
        for item in items {
            sets.push(item);
        }
        sets.finish()
    }

    fn push<Q>(&mut self, item: Either<Q, R>) {
        match item {
            Either::Left(_) => self.sets.push_back(std::mem::take(&mut self.current)),
            Either::Right(row) => self.current.push(row),
        }
    }

    fn finish(mut self) -> Self {
        if !self.current.is_empty() {
            self.sets.push_back(std::mem::take(&mut self.current));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// 取出下一个结果集
    pub fn next_set(&mut self) -> Option<Vec<R>> {
        self.sets.pop_front()
    }
}

impl ResultSets<PgRow> {
    /// 执行多语句 SQL 并收集全部结果集
    pub async fn fetch(conn: &mut PgConnection, sql: &str) -> RepoResult<Self> {
        let mut sets = Self::default();
        let mut stream = sqlx::raw_sql(sql).fetch_many(&mut *conn);
        while let Some(item) = stream.try_next().await.map_err(map_sqlx_error)? {
            sets.push(item);
        }
        drop(stream);
        Ok(sets.finish())
    }
}

/// 根记录解码器
pub type RootDecoder<A, R> = fn(&R) -> Result<A, sqlx::Error>;

/// 子集合解码器：把一个结果集写入聚合的对应集合
pub type ChildDecoder<A, R> = fn(&mut A, &[R]) -> Result<(), sqlx::Error>;

struct ChildRead<A, R> {
    collection: &'static str,
    sql: String,
    assign: ChildDecoder<A, R>,
}

/// 聚合读取计划
///
/// 第一条语句读取根记录，其后每条语句对应一个子集合。
/// 结果集与集合一一配对，顺序由计划显式给出。
pub struct ReadPlan<A, R = PgRow> {
    root_sql: String,
    root: RootDecoder<A, R>,
    children: Vec<ChildRead<A, R>>,
}

impl<A, R> ReadPlan<A, R> {
    pub fn new(root_sql: impl Into<String>, root: RootDecoder<A, R>) -> Self {
        Self {
            root_sql: root_sql.into(),
            root,
            children: Vec::new(),
        }
    }

    /// 追加一个子集合读取
    pub fn child(
        mut self,
        collection: &'static str,
        sql: impl Into<String>,
        assign: ChildDecoder<A, R>,
    ) -> Self {
        self.children.push(ChildRead {
            collection,
            sql: sql.into(),
            assign,
        });
        self
    }

    /// 子集合名称，按读取顺序
    pub fn collections(&self) -> Vec<&'static str> {
        self.children.iter().map(|c| c.collection).collect()
    }

    /// 期望的结果集数量
    pub fn expected_sets(&self) -> usize {
        self.children.len() + 1
    }

    /// 拼接为一个多语句批次
    pub fn to_sql(&self) -> String {
        std::iter::once(self.root_sql.as_str())
            .chain(self.children.iter().map(|c| c.sql.as_str()))
            .map(|s| format!("{};", s.trim().trim_end_matches(';')))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 按计划顺序解码结果集；根结果集为空时返回 `None`
    pub fn decode(&self, mut sets: ResultSets<R>) -> RepoResult<Option<A>> {
        if sets.len() != self.expected_sets() {
            return Err(RepositoryError::internal(format!(
                "Result set count mismatch: expected {}, got {}",
                self.expected_sets(),
                sets.len()
            )));
        }

        let root_rows = sets.next_set().unwrap_or_default();
        let Some(first) = root_rows.first() else {
            return Ok(None);
        };
        let mut aggregate = (self.root)(first).map_err(map_sqlx_error)?;

        for child in &self.children {
            let rows = sets.next_set().unwrap_or_default();
            debug!(collection = child.collection, rows = rows.len(), "Decoding result set");
            (child.assign)(&mut aggregate, &rows).map_err(map_sqlx_error)?;
        }

        Ok(Some(aggregate))
    }
}

impl<A> ReadPlan<A, PgRow> {
    /// 一次往返读取整个聚合
    pub async fn fetch_optional(&self, conn: &mut PgConnection) -> RepoResult<Option<A>> {
        let sql = self.to_sql();
        let sets = ResultSets::fetch(conn, &sql).await?;
        self.decode(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Row = (&'static str, i32);

    #[derive(Debug, Default, PartialEq)]
    struct Parent {
        name: String,
        grants: Vec<i32>,
        scopes: Vec<i32>,
    }

    fn parent(row: &Row) -> Result<Parent, sqlx::Error> {
        Ok(Parent {
            name: row.0.to_string(),
            ..Default::default()
        })
    }

    fn grants(parent: &mut Parent, rows: &[Row]) -> Result<(), sqlx::Error> {
        parent.grants = rows.iter().map(|r| r.1).collect();
        Ok(())
    }

    fn scopes(parent: &mut Parent, rows: &[Row]) -> Result<(), sqlx::Error> {
        parent.scopes = rows.iter().map(|r| r.1).collect();
        Ok(())
    }

    fn plan() -> ReadPlan<Parent, Row> {
        ReadPlan::new("SELECT * FROM parents WHERE id = 1", parent)
            .child("grants", "SELECT * FROM grants WHERE parent_id = 1;", grants)
            .child("scopes", "SELECT * FROM scopes WHERE parent_id = 1", scopes)
    }

    #[test]
    fn test_split_on_statement_completion() {
        let items: Vec<Either<u64, Row>> = vec![
            Either::Right(("a", 1)),
            Either::Left(1),
            Either::Left(0),
            Either::Right(("b", 2)),
            Either::Right(("c", 3)),
            Either::Left(2),
        ];
        let mut sets = ResultSets::from_items(items);

        assert_eq!(sets.len(), 3);
        assert_eq!(sets.next_set().unwrap().len(), 1);
        assert!(sets.next_set().unwrap().is_empty());
        assert_eq!(sets.next_set().unwrap().len(), 2);
        assert!(sets.next_set().is_none());
    }

    #[test]
    fn test_plan_sql_and_collections() {
        let plan = plan();
        assert_eq!(plan.collections(), vec!["grants", "scopes"]);
        assert_eq!(plan.expected_sets(), 3);
        assert_eq!(plan.to_sql().matches(';').count(), 3);
    }

    #[test]
    fn test_decode_assigns_in_plan_order() {
        let items: Vec<Either<u64, Row>> = vec![
            Either::Right(("root", 7)),
            Either::Left(1),
            Either::Right(("g", 10)),
            Either::Right(("g", 11)),
            Either::Left(2),
            Either::Right(("s", 20)),
            Either::Left(1),
        ];
        let decoded = plan().decode(ResultSets::from_items(items)).unwrap().unwrap();

        assert_eq!(decoded.name, "root");
        assert_eq!(decoded.grants, vec![10, 11]);
        assert_eq!(decoded.scopes, vec![20]);
    }

    #[test]
    fn test_decode_missing_root() {
        let items: Vec<Either<u64, Row>> = vec![Either::Left(0), Either::Left(0), Either::Left(0)];
        assert!(plan().decode(ResultSets::from_items(items)).unwrap().is_none());
    }

    #[test]
    fn test_decode_count_mismatch() {
        let items: Vec<Either<u64, Row>> = vec![Either::Right(("root", 1)), Either::Left(1)];
        let result = plan().decode(ResultSets::from_items(items));
        assert!(matches!(result, Err(RepositoryError::Internal(_))));
    }
}
