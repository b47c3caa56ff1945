//! Identifier heuristics — deriving human-meaningful entity and
//! relation names from table names and call-site frames.

use ormlens_core::trace::CallFrame;

/// Table-name prefixes commonly used by naming conventions, stripped
/// before deriving an entity name.
const TABLE_PREFIXES: &[&str] = &["tbl_", "tb_", "t_"];

/// Derive a type-name-cased entity name from a table name:
/// `tbl_user_orders` becomes `UserOrders`.
pub fn entity_name_from_table(table: &str) -> String {
    let lowered = table.to_ascii_lowercase();
    let mut base = lowered.as_str();
    for prefix in TABLE_PREFIXES {
        if let Some(stripped) = base.strip_prefix(prefix) {
            if !stripped.is_empty() {
                base = stripped;
            }
            break;
        }
    }
    base.split('_')
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect()
}

/// Scan call-site frames for a getter-like function (`getOrders`,
/// `getOwner`) and derive a relation field name from it
/// (`orders`, `owner`).
pub fn relation_from_call_site(frames: &[CallFrame]) -> Option<String> {
    frames.iter().find_map(|frame| getter_relation(&frame.function))
}

fn getter_relation(function: &str) -> Option<String> {
    let rest = function.strip_prefix("get")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(format!("{}{}", first.to_ascii_lowercase(), chars.as_str()))
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_strip_prefixes_and_case_segments() {
        assert_eq!(entity_name_from_table("users"), "Users");
        assert_eq!(entity_name_from_table("tbl_user_orders"), "UserOrders");
        assert_eq!(entity_name_from_table("t_invoice"), "Invoice");
        assert_eq!(entity_name_from_table("ORDER_ITEMS"), "OrderItems");
        // A prefix that would strip everything is kept.
        assert_eq!(entity_name_from_table("t_"), "T");
    }

    #[test]
    fn getter_frames_yield_relation_names() {
        let frames = vec![
            CallFrame::new("app.rs", 10, "render"),
            CallFrame::new("user.rs", 42, "getOrders"),
            CallFrame::new("user.rs", 50, "getOwner"),
        ];
        assert_eq!(relation_from_call_site(&frames).as_deref(), Some("orders"));
    }

    #[test]
    fn non_getter_frames_yield_nothing() {
        let frames = vec![
            CallFrame::new("app.rs", 10, "get"),
            CallFrame::new("app.rs", 11, "getter"),
            CallFrame::new("app.rs", 12, "fetch_orders"),
        ];
        assert_eq!(relation_from_call_site(&frames), None);
    }
}
