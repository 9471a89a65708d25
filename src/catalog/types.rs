//! Firebird field type codes to portable SQL type names

/// `RDB$FIELD_TYPE` codes as stored in the Firebird catalog.
pub mod code {
    pub const SHORT: i32 = 7;
    pub const LONG: i32 = 8;
    pub const FLOAT: i32 = 10;
    pub const DATE: i32 = 12;
    pub const TIME: i32 = 13;
    pub const TEXT: i32 = 14;
    pub const INT64: i32 = 16;
    pub const BOOLEAN: i32 = 23;
    pub const DOUBLE: i32 = 27;
    pub const TIMESTAMP: i32 = 35;
    pub const VARYING: i32 = 37;
    pub const BLOB: i32 = 261;
}

/// Returned for codes with no portable mapping.
pub const UNKNOWN: &str = "UNKNOWN";

/// Map a catalog type triple onto a portable type name.
///
/// Never fails: unrecognised codes map to [`UNKNOWN`] so enumerating a
/// catalog does not abort on an exotic column.
pub fn map_type(type_code: i32, sub_type: Option<i32>, length: Option<i32>) -> String {
    let len = length.unwrap_or(0);
    match type_code {
        code::SHORT if sub_type == Some(1) => "SMALLINT".to_string(),
        code::SHORT => "INTEGER".to_string(),
        code::LONG if sub_type == Some(1) => "INTEGER".to_string(),
        code::LONG => "BIGINT".to_string(),
        code::INT64 => "BIGINT".to_string(),
        code::FLOAT => "FLOAT".to_string(),
        code::DOUBLE => "DOUBLE PRECISION".to_string(),
        code::DATE => "DATE".to_string(),
        code::TIME => "TIME".to_string(),
        code::TIMESTAMP => "TIMESTAMP".to_string(),
        code::VARYING => format!("VARCHAR({})", len),
        code::TEXT => format!("CHAR({})", len),
        code::BLOB => "BLOB".to_string(),
        code::BOOLEAN => "BOOLEAN".to_string(),
        _ => UNKNOWN.to_string(),
    }
}
