//! Building messages from test results and environment metadata.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::perf::{PerfDetail, PerfMessage};
use super::{Message, SubTestMessage};
use crate::environment::Node;
use crate::notifier::Notifier;
use crate::result::{TestResult, TestStatus};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("test result {result_id} has no environment")]
    MissingEnvironment { result_id: String },

    #[error("required field {field} is empty")]
    MissingRequiredField { field: &'static str },

    #[error("field {field} cannot take value {value}: {source}")]
    InvalidField {
        field: String,
        value: Value,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

pub type MessageResult<T> = std::result::Result<T, MessageError>;

/// Which fields of a message `apply_fields` may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Only fields that already hold a string. Used for environment metadata,
    /// which is a flat string map and must not clobber numeric fields.
    StringsOnly,
    /// Any existing field; a value of the wrong type is an error.
    Any,
}

/// Set every key of `fields` that names an existing top-level field of `message`.
///
/// Unknown keys are ignored and the `type` tag can never be overridden.
pub fn apply_fields<M>(message: M, fields: &BTreeMap<String, Value>, policy: FieldPolicy) -> MessageResult<M>
where
    M: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(&message)?;
    let Some(object) = value.as_object_mut() else {
        return Ok(message);
    };
    let mut changed = false;
    for (key, new_value) in fields {
        if key == "type" {
            continue;
        }
        let Some(slot) = object.get_mut(key) else {
            continue;
        };
        if policy == FieldPolicy::StringsOnly && !slot.is_string() {
            continue;
        }
        *slot = new_value.clone();
        changed = true;
    }
    if !changed {
        return Ok(message);
    }
    serde_json::from_value(value).map_err(|source| {
        let (field, value) = first_mismatch(&message, fields);
        MessageError::InvalidField {
            field,
            value,
            source,
        }
    })
}

/// Find the override that broke deserialization, for error reporting.
fn first_mismatch<M>(message: &M, fields: &BTreeMap<String, Value>) -> (String, Value)
where
    M: Serialize + DeserializeOwned,
{
    for (key, value) in fields {
        let Ok(mut original) = serde_json::to_value(message) else {
            break;
        };
        if let Some(slot) = original.as_object_mut().and_then(|o| o.get_mut(key)) {
            *slot = value.clone();
            if serde_json::from_value::<M>(original).is_err() {
                return (key.clone(), value.clone());
            }
        }
    }
    (String::new(), Value::Null)
}

fn string_fields(map: &BTreeMap<String, String>) -> BTreeMap<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Build a perf message for `node` under `result`.
///
/// Precedence, lowest first: environment metadata, facts the platform
/// recorded on `node` (unprefixed, so `kernel_version` or `vmsize` land on
/// the matching fields), identity fields taken from the result
/// (`test_case_name`, `data_path`, `test_result_id`), then `overrides`.
pub fn create_perf_message(
    detail: PerfDetail,
    node: &Node,
    result: &TestResult,
    test_case_name: &str,
    overrides: &BTreeMap<String, Value>,
) -> MessageResult<PerfMessage> {
    let environment = result
        .environment()
        .ok_or_else(|| MessageError::MissingEnvironment {
            result_id: result.id.clone(),
        })?;

    let mut facts = environment.clone();
    facts.extend(node.information.clone());
    let mut message = apply_fields(
        PerfMessage::new(detail),
        &string_fields(&facts),
        FieldPolicy::StringsOnly,
    )?;
    message.test_case_name = test_case_name.to_string();
    message.data_path = node
        .capability
        .current_data_path()
        .map(|dp| dp.as_str().to_string())
        .unwrap_or_default();
    message.test_result_id = result.id.clone();
    message.elapsed = result.elapsed();

    apply_fields(message, overrides, FieldPolicy::Any)
}

/// Build a perf message and notify it once.
pub fn send_perf_message(
    notifier: &dyn Notifier,
    detail: PerfDetail,
    node: &Node,
    result: &TestResult,
    test_case_name: &str,
    overrides: &BTreeMap<String, Value>,
) -> MessageResult<PerfMessage> {
    let message = create_perf_message(detail, node, result, test_case_name, overrides)?;
    notifier.notify(&Message::Performance(message.clone()));
    Ok(message)
}

/// Report a sub-result of `result` and notify it once.
///
/// Environment metadata is applied when present. `parent_test` always names
/// the owning result, even if `overrides` sets it.
pub fn send_sub_test_result_message(
    notifier: &dyn Notifier,
    result: &TestResult,
    test_case_name: &str,
    status: TestStatus,
    test_message: &str,
    overrides: &BTreeMap<String, Value>,
) -> MessageResult<SubTestMessage> {
    if result.name.is_empty() {
        return Err(MessageError::MissingRequiredField {
            field: "parent_test",
        });
    }

    let mut message = SubTestMessage::new(result.id.clone(), test_case_name, status);
    if let Some(environment) = result.environment() {
        message = apply_fields(message, &string_fields(environment), FieldPolicy::StringsOnly)?;
    }
    message.id = result.id.clone();
    message.name = test_case_name.to_string();
    message.status = status;
    message.message = test_message.to_string();
    message.elapsed = result.elapsed();

    let mut message = apply_fields(message, overrides, FieldPolicy::Any)?;
    message.parent_test = result.name.clone();

    notifier.notify(&Message::SubTestResult(message.clone()));
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::perf::NetworkTcpPerformance;
    use crate::messages::KernelBuildMessage;

    #[test]
    fn test_apply_fields_ignores_unknown_and_type() {
        let msg = KernelBuildMessage::default();
        let fields = BTreeMap::from([
            ("new_kernel_version".to_string(), Value::from("6.8.0")),
            ("no_such_field".to_string(), Value::from("x")),
            ("type".to_string(), Value::from("Performance")),
        ]);
        let msg = apply_fields(msg, &fields, FieldPolicy::Any).unwrap();
        assert_eq!(msg.new_kernel_version, "6.8.0");
    }

    #[test]
    fn test_strings_only_skips_non_string_fields() {
        let msg = KernelBuildMessage::default();
        let fields = BTreeMap::from([
            ("is_success".to_string(), Value::from("yes")),
            ("error_message".to_string(), Value::from("boom")),
        ]);
        let msg = apply_fields(msg, &fields, FieldPolicy::StringsOnly).unwrap();
        assert!(!msg.is_success);
        assert_eq!(msg.error_message, "boom");
    }

    #[test]
    fn test_perf_message_takes_node_facts_over_environment() {
        let mut result = TestResult::new("perf_tcp");
        result.set_environment(BTreeMap::from([
            ("platform".to_string(), "baremetal".to_string()),
            ("kernel_version".to_string(), "5.15.0".to_string()),
            ("node_0.kernel_version".to_string(), "6.8.0".to_string()),
        ]));
        let mut node = Node::new(0, crate::schema::NodeSpace::default());
        node.information
            .insert("kernel_version".to_string(), "6.8.0".to_string());
        node.information
            .insert("vmsize".to_string(), "Standard_D8s_v5".to_string());

        let msg = create_perf_message(
            PerfDetail::NetworkTcp(NetworkTcpPerformance::default()),
            &node,
            &result,
            "perf_tcp",
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(msg.platform, "baremetal");
        assert_eq!(msg.kernel_version, "6.8.0");
        assert_eq!(msg.vmsize, "Standard_D8s_v5");
    }

    #[test]
    fn test_wrong_type_reports_field() {
        let msg = PerfMessage::new(PerfDetail::NetworkTcp(NetworkTcpPerformance::default()));
        let fields = BTreeMap::from([("connections_num".to_string(), Value::from("many"))]);
        let err = apply_fields(msg, &fields, FieldPolicy::Any).unwrap_err();
        match err {
            MessageError::InvalidField { field, .. } => assert_eq!(field, "connections_num"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
