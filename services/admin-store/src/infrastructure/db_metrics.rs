//! 仓储监控

use metrics::{counter, histogram};
use std::time::Instant;

/// 聚合写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    RolledBack,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Committed => "committed",
            WriteOutcome::RolledBack => "rolled_back",
        }
    }
}

/// 记录一次聚合写入
pub fn record_write(aggregate: &'static str, outcome: WriteOutcome) {
    counter!(
        "aggregate_writes_total",
        "aggregate" => aggregate,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// 用于计时的守卫结构
pub struct QueryTimer {
    start: Instant,
    table: &'static str,
    operation: &'static str,
}

impl QueryTimer {
    pub fn new(table: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            table,
            operation,
        }
    }

    pub fn finish(self) {
        let duration_ms = self.start.elapsed().as_millis();
        histogram!(
            "db_query_duration_ms",
            "table" => self.table,
            "operation" => self.operation
        )
        .record(duration_ms as f64);

        // 慢查询日志 (阈值: 100ms)
        if duration_ms > 100 {
            tracing::warn!(
                table = self.table,
                operation = self.operation,
                duration_ms = %duration_ms,
                "Slow query detected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(WriteOutcome::Committed.as_str(), "committed");
        assert_eq!(WriteOutcome::RolledBack.as_str(), "rolled_back");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_write("client", WriteOutcome::Committed);
        QueryTimer::new("clients", "select").finish();
    }
}
