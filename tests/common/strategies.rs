use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating worker names
pub fn worker_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,31}"
}

/// Strategy for generating message types, including multi-word ones
pub fn msg_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("need".to_string()),
        Just("the end".to_string()),
        Just("crash".to_string()),
        "(success|failure)( [a-z0-9+]{1,10}){0,2}",
        "log\\.(debug|info|warning|error|critical)",
    ]
}

/// Strategy for generating payloads from the supported payload algebra
///
/// Floats are finite, since JSON has no NaN or infinity. Strings stay
/// within printable characters so they are also valid YAML scalars for the
/// checklist file.
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        "[ -~é°µ]{0,40}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[ -~]{0,12}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for generating checklist stage names
pub fn stage_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("weather".to_string()),
        Just("rivers".to_string()),
        Just("Neah Bay ssh".to_string()),
        Just("NEMO run".to_string()),
        "[a-zA-Z][a-zA-Z0-9 ]{0,20}",
    ]
}

/// Strategy for generating the enabled run types
pub fn run_types_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(vec!["nowcast", "forecast", "forecast2"], 0..=3)
}
