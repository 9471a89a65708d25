//! Fixed catalog statements against the Firebird `RDB$` system tables
//!
//! Every statement takes the relation name as a bound parameter; none of them
//! interpolate caller input.

/// Aliased result columns the reader projects rows by.
pub mod column {
    pub const TABLE_NAME: &str = "TABLE_NAME";
    pub const COUNT: &str = "CNT";
    pub const FIELD_POSITION: &str = "FIELD_POSITION";
    pub const REFERENCED_TABLE: &str = "REFERENCED_TABLE";
    pub const REFERENCED_FIELD: &str = "REFERENCED_FIELD";
    pub const REFERENCED_POSITION: &str = "REFERENCED_POSITION";
}

/// User-defined ordinary tables (no system relations, no views), by name.
pub const LIST_TABLES: &str = "\
SELECT RDB$RELATION_NAME AS TABLE_NAME
FROM RDB$RELATIONS
WHERE RDB$SYSTEM_FLAG = 0
AND RDB$RELATION_TYPE = 0
ORDER BY RDB$RELATION_NAME";

/// Existence check for one user table. Params: relation name.
pub const TABLE_EXISTS: &str = "\
SELECT COUNT(*) AS CNT
FROM RDB$RELATIONS
WHERE RDB$RELATION_NAME = ?
AND RDB$SYSTEM_FLAG = 0
AND RDB$RELATION_TYPE = 0";

/// Column metadata joined with field definitions. Params: relation name.
pub const COLUMNS: &str = "\
SELECT
  RF.RDB$FIELD_NAME,
  F.RDB$FIELD_TYPE,
  F.RDB$FIELD_SUB_TYPE,
  F.RDB$FIELD_LENGTH,
  RF.RDB$NULL_FLAG,
  RF.RDB$DEFAULT_SOURCE,
  RF.RDB$FIELD_POSITION
FROM RDB$RELATION_FIELDS RF
JOIN RDB$FIELDS F ON RF.RDB$FIELD_SOURCE = F.RDB$FIELD_NAME
WHERE RF.RDB$RELATION_NAME = ?
ORDER BY RF.RDB$FIELD_POSITION";

/// Column names only, in position order. Params: relation name.
pub const COLUMN_NAMES: &str = "\
SELECT RF.RDB$FIELD_NAME
FROM RDB$RELATION_FIELDS RF
WHERE RF.RDB$RELATION_NAME = ?
ORDER BY RF.RDB$FIELD_POSITION";

/// Primary-key segments. Params: relation name, relation name.
pub const PRIMARY_KEYS: &str = "\
SELECT S.RDB$FIELD_NAME
FROM RDB$INDEX_SEGMENTS S
JOIN RDB$INDICES I ON S.RDB$INDEX_NAME = I.RDB$INDEX_NAME
WHERE I.RDB$RELATION_NAME = ?
AND I.RDB$UNIQUE_FLAG = 1
AND I.RDB$INDEX_NAME IN (
  SELECT RDB$INDEX_NAME
  FROM RDB$RELATION_CONSTRAINTS
  WHERE RDB$RELATION_NAME = ?
  AND RDB$CONSTRAINT_TYPE = 'PRIMARY KEY'
)
ORDER BY S.RDB$FIELD_POSITION";

/// Foreign-key segments of the owning and the referenced index.
///
/// Returns the cross product of segments per constraint together with both
/// segment positions; pairing by position happens in the reader so that
/// constraints with mismatched position sets can be rejected as a whole.
/// Params: relation name.
pub const FOREIGN_KEYS: &str = "\
SELECT
  RC.RDB$CONSTRAINT_NAME,
  ISEG.RDB$FIELD_NAME,
  ISEG.RDB$FIELD_POSITION AS FIELD_POSITION,
  RC2.RDB$RELATION_NAME AS REFERENCED_TABLE,
  ISEG2.RDB$FIELD_NAME AS REFERENCED_FIELD,
  ISEG2.RDB$FIELD_POSITION AS REFERENCED_POSITION
FROM RDB$RELATION_CONSTRAINTS RC
JOIN RDB$INDEX_SEGMENTS ISEG ON RC.RDB$INDEX_NAME = ISEG.RDB$INDEX_NAME
JOIN RDB$REF_CONSTRAINTS REFC ON RC.RDB$CONSTRAINT_NAME = REFC.RDB$CONSTRAINT_NAME
JOIN RDB$RELATION_CONSTRAINTS RC2 ON REFC.RDB$CONST_NAME_UQ = RC2.RDB$CONSTRAINT_NAME
JOIN RDB$INDEX_SEGMENTS ISEG2 ON RC2.RDB$INDEX_NAME = ISEG2.RDB$INDEX_NAME
WHERE RC.RDB$RELATION_NAME = ?
AND RC.RDB$CONSTRAINT_TYPE = 'FOREIGN KEY'
ORDER BY RC.RDB$CONSTRAINT_NAME, ISEG.RDB$FIELD_POSITION, ISEG2.RDB$FIELD_POSITION";

/// Indexes not backing any constraint. Params: relation name, relation name.
pub const INDEXES: &str = "\
SELECT
  I.RDB$INDEX_NAME,
  I.RDB$UNIQUE_FLAG,
  S.RDB$FIELD_NAME
FROM RDB$INDICES I
JOIN RDB$INDEX_SEGMENTS S ON I.RDB$INDEX_NAME = S.RDB$INDEX_NAME
WHERE I.RDB$RELATION_NAME = ?
AND I.RDB$INDEX_NAME NOT IN (
  SELECT RDB$INDEX_NAME
  FROM RDB$RELATION_CONSTRAINTS
  WHERE RDB$RELATION_NAME = ?
  AND RDB$INDEX_NAME IS NOT NULL
)
ORDER BY I.RDB$INDEX_NAME, S.RDB$FIELD_POSITION";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_statements_are_read_only() {
        for sql in [
            LIST_TABLES,
            TABLE_EXISTS,
            COLUMNS,
            COLUMN_NAMES,
            PRIMARY_KEYS,
            FOREIGN_KEYS,
            INDEXES,
        ] {
            assert!(sql.starts_with("SELECT"), "{}", sql);
            assert!(!sql.contains(';'));
        }
    }

    fn flat(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_relation_filters() {
        for sql in [LIST_TABLES, TABLE_EXISTS] {
            let sql = flat(sql);
            assert!(sql.contains("RDB$SYSTEM_FLAG = 0"), "{}", sql);
            assert!(sql.contains("RDB$RELATION_TYPE = 0"), "{}", sql);
        }
        assert!(flat(LIST_TABLES).contains(&format!("AS {}", column::TABLE_NAME)));
        assert!(flat(TABLE_EXISTS).contains(&format!("AS {}", column::COUNT)));
        assert!(flat(PRIMARY_KEYS).contains("RDB$CONSTRAINT_TYPE = 'PRIMARY KEY'"));
    }

    #[test]
    fn test_foreign_keys_expose_both_segment_positions() {
        let sql = flat(FOREIGN_KEYS);
        for alias in [
            column::FIELD_POSITION,
            column::REFERENCED_TABLE,
            column::REFERENCED_FIELD,
            column::REFERENCED_POSITION,
        ] {
            assert!(sql.contains(&format!("AS {}", alias)), "missing alias {}", alias);
        }
        assert!(sql.contains("ISEG.RDB$FIELD_POSITION AS FIELD_POSITION"));
        assert!(sql.contains("ISEG2.RDB$FIELD_POSITION AS REFERENCED_POSITION"));
        assert!(sql.contains("REFC.RDB$CONST_NAME_UQ = RC2.RDB$CONSTRAINT_NAME"));
        assert!(sql.contains("RC.RDB$CONSTRAINT_TYPE = 'FOREIGN KEY'"));
    }

    #[test]
    fn test_indexes_exclude_constraint_backed() {
        let sql = flat(INDEXES);
        assert!(sql.contains(
            "I.RDB$INDEX_NAME NOT IN ( SELECT RDB$INDEX_NAME FROM RDB$RELATION_CONSTRAINTS"
        ));
        // a NULL in the subquery would make NOT IN match nothing
        assert!(sql.contains("AND RDB$INDEX_NAME IS NOT NULL )"));
    }

    #[test]
    fn test_placeholder_counts() {
        let count = |s: &str| s.matches('?').count();
        assert_eq!(count(LIST_TABLES), 0);
        assert_eq!(count(TABLE_EXISTS), 1);
        assert_eq!(count(COLUMNS), 1);
        assert_eq!(count(PRIMARY_KEYS), 2);
        assert_eq!(count(FOREIGN_KEYS), 1);
        assert_eq!(count(INDEXES), 2);
    }
}
