//! 通用工具函数

/// 构造 `ILIKE ... ESCAPE '\'` 使用的子串匹配模式，忽略两端空白
pub fn contains_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// 不区分大小写的子串匹配；空过滤条件匹配所有值
pub fn matches_filter(value: &str, filter: &str) -> bool {
    let filter = filter.trim();
    filter.is_empty() || value.to_lowercase().contains(&filter.to_lowercase())
}
