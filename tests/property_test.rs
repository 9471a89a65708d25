//! Property-based tests for the charset and query layers
//!
//! Uses proptest to generate random inputs and verify invariants hold
//! across a wide range of scenarios that unit tests might miss.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;

use fbscope::catalog::map_type;
use fbscope::charset::{CharsetConfig, CharsetNormalizer};
use fbscope::error::ErrorCategory;
use fbscope::query::filter::{free_text_pattern, has_wildcard};
use fbscope::query::pagination::total_pages;
use fbscope::query::{
    encode_hex_literal, ensure_select, FieldKind, FilterSet, PageRequest, QueryBuilder, SearchField,
    SearchFields, TextBinding,
};
use fbscope::testing::verified_table;
use fbscope::value::{RawValue, Row};

/// Strategy to generate timestamps between year 1 and roughly year 8000
fn arbitrary_timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (1i32..2_900_000, 0u32..86_400, prop::bool::ANY).prop_map(|(days, secs, midnight)| {
        let date = NaiveDate::from_num_days_from_ce_opt(days).unwrap();
        let secs = if midnight { 0 } else { secs };
        date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap())
    })
}

/// Strategy to generate leaf values as the engine would return them
fn arbitrary_leaf() -> impl Strategy<Value = RawValue> {
    prop_oneof![
        Just(RawValue::Null),
        any::<bool>().prop_map(RawValue::Bool),
        any::<i64>().prop_map(RawValue::Integer),
        (-1.0e12f64..1.0e12).prop_map(RawValue::Float),
        ".{0,24}".prop_map(RawValue::Text),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(RawValue::Bytes),
        arbitrary_timestamp().prop_map(RawValue::Timestamp),
    ]
}

/// Strategy to generate nested values (lists and maps of leaves)
fn arbitrary_value() -> impl Strategy<Value = RawValue> {
    arbitrary_leaf().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(RawValue::List),
            prop::collection::vec(inner, 0..6).prop_map(|values| {
                RawValue::Map(
                    values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (format!("C{}", i), v))
                        .collect::<Row>(),
                )
            }),
        ]
    })
}

fn free_text_builder(binding: TextBinding) -> QueryBuilder {
    let fields = SearchFields::new(vec![SearchField::new("q", "PNAME", FieldKind::FreeText)]).unwrap();
    QueryBuilder::new(fields, binding, encoding_rs::EUC_KR)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: normalizing twice equals normalizing once
    #[test]
    fn normalize_is_idempotent(value in arbitrary_value()) {
        let normalizer = CharsetNormalizer::new(CharsetConfig::default());
        let once = normalizer.normalize(value);
        let twice = normalizer.normalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// Property: normalized values never carry bytes or temporal variants
    #[test]
    fn normalize_leaves_only_display_values(value in arbitrary_value()) {
        fn check(value: &RawValue) -> bool {
            match value {
                RawValue::Bytes(_)
                | RawValue::Timestamp(_)
                | RawValue::Date(_)
                | RawValue::Time(_) => false,
                RawValue::List(items) => items.iter().all(check),
                RawValue::Map(row) => row.iter().all(|(_, v)| check(v)),
                _ => true,
            }
        }
        let normalizer = CharsetNormalizer::new(CharsetConfig::default());
        prop_assert!(check(&normalizer.normalize(value)));
    }

    /// Property: decoded text never keeps trailing padding
    #[test]
    fn decoded_bytes_are_right_trimmed(text in "[a-zA-Z0-9가-힣]{0,10}", pad in 0usize..20) {
        let normalizer = CharsetNormalizer::new(CharsetConfig::default());
        let mut bytes = encoding_rs::EUC_KR.encode(&text).0.into_owned();
        bytes.extend(std::iter::repeat(b' ').take(pad));
        match normalizer.normalize(RawValue::Bytes(bytes)) {
            RawValue::Text(s) => prop_assert!(!s.ends_with(' ')),
            other => prop_assert!(false, "expected text, got {:?}", other),
        }
    }

    /// Property: timestamps render as a date exactly when the time is midnight
    #[test]
    fn temporal_rendering_length(ts in arbitrary_timestamp()) {
        let normalizer = CharsetNormalizer::default();
        let RawValue::Text(s) = normalizer.normalize(RawValue::Timestamp(ts)) else {
            panic!("timestamp did not render as text");
        };
        let midnight = ts.time() == NaiveTime::MIN;
        prop_assert_eq!(s.len(), if midnight { 10 } else { 19 });
        prop_assert!(s.starts_with(&ts.date().format("%Y-%m-%d").to_string()));
    }

    /// Property: offset and page count arithmetic
    #[test]
    fn pagination_arithmetic(page in 1u64..100_000, limit in 1u64..10_000, total in 0u64..10_000_000) {
        let request = PageRequest::new(page, limit);
        prop_assert_eq!(request.offset(), (page - 1) * limit);

        let pages = total_pages(total, limit);
        prop_assert!(pages * limit >= total);
        if total > 0 {
            prop_assert!((pages - 1) * limit < total);
        } else {
            prop_assert_eq!(pages, 0);
        }
    }

    /// Property: paging values parse only as positive integers within the maximum
    #[test]
    fn page_parse_accepts_only_positive(raw in any::<i64>(), max in 1u64..5_000) {
        let text = raw.to_string();
        let parsed = PageRequest::parse(Some("1"), Some(&text), 10, max);
        let valid = raw > 0 && (raw as u64) <= max;
        prop_assert_eq!(parsed.is_ok(), valid);
        if let Err(e) = parsed {
            prop_assert_eq!(e.category(), ErrorCategory::InvalidRequest);
        }
    }

    /// Property: free-text patterns never keep `*` and wrap values without markers
    #[test]
    fn wildcard_compilation(value in "[a-zA-Z0-9*% ]{0,16}") {
        let pattern = free_text_pattern(&value);
        prop_assert!(!pattern.contains('*'));
        if !has_wildcard(&value) {
            prop_assert_eq!(pattern, format!("%{}%", value));
        } else {
            prop_assert_eq!(pattern, value.replace('*', "%"));
        }
    }

    /// Property: hex literals contain nothing but hex digits between the quotes
    #[test]
    fn hex_literal_is_hex_only(text in ".{0,24}") {
        match encode_hex_literal(&text, encoding_rs::EUC_KR) {
            Ok(literal) => {
                prop_assert!(literal.starts_with("X'"));
                prop_assert!(literal.ends_with('\''));
                let body = &literal[2..literal.len() - 1];
                prop_assert_eq!(body.len() % 2, 0);
                prop_assert!(body.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
            }
            Err(e) => prop_assert_eq!(e.category(), ErrorCategory::InvalidRequest),
        }
    }

    /// Property: an embedded non-ASCII search value never reaches statement text
    #[test]
    fn embedded_search_statements_are_ascii(value in "[가-힣]{1,6}[a-z%]{0,3}") {
        let builder = free_text_builder(TextBinding::Auto);
        let field = builder.fields().iter().next().cloned().unwrap();
        let filters = FilterSet::default().with(field, value);
        let table = verified_table("PATIENT");

        match builder.build_search(&table, &filters, PageRequest::default()) {
            Ok(plan) => {
                prop_assert!(plan.data.sql.is_ascii());
                prop_assert!(plan.count.sql.is_ascii());
                prop_assert!(plan.data.params.is_empty());
                prop_assert_eq!(plan.embedded_literals, 1);
            }
            Err(e) => prop_assert_eq!(e.category(), ErrorCategory::InvalidRequest),
        }
    }

    /// Property: only single SELECT statements pass the guard
    #[test]
    fn guard_rejects_non_select(
        keyword in "(INSERT|UPDATE|DELETE|DROP|ALTER|EXECUTE|MERGE|GRANT)",
        rest in "[A-Z0-9_ ]{0,20}",
    ) {
        let statement = format!("{} {}", keyword, rest);
        prop_assert!(ensure_select(&statement).is_err());
        let stacked = format!("SELECT 1 FROM RDB$DATABASE; {}", statement);
        prop_assert!(ensure_select(&stacked).is_err());
    }

    /// Property: accepted SELECT statements come back trimmed and unchanged
    #[test]
    fn guard_accepts_select(body in "[A-Z0-9_, ]{1,30}", pad in " {0,4}") {
        let statement = format!("{}SELECT {}{}", pad, body, pad);
        let accepted = ensure_select(&statement).unwrap();
        prop_assert_eq!(accepted, statement.trim());
    }

    /// Property: the type mapper never panics and unknown codes map to UNKNOWN
    #[test]
    fn map_type_total(code in any::<i32>(), sub in prop::option::of(any::<i32>()), len in prop::option::of(0i32..32_767)) {
        let name = map_type(code, sub, len);
        let known = [7, 8, 10, 12, 13, 14, 16, 23, 27, 35, 37, 261];
        prop_assert_eq!(name == "UNKNOWN", !known.contains(&code));
    }
}
