//! Tests for the classification rule engine

use super::*;
use regex::Regex;
use test_case::test_case;

fn gitlab_result_rule() -> ResultRule {
    ResultRule {
        failed: vec!["UNDEPLOYED".into(), "failed".into()],
        success: vec!["COMPLETED".into(), "success".into()],
        abort: vec!["created".into(), "canceled".into()],
        manual: vec!["running".into(), "blocked".into()],
        default: None,
    }
}

fn gitlab_status_rule() -> StatusRule {
    StatusRule {
        done: vec![
            "COMPLETED".into(),
            "UNDEPLOYED".into(),
            "failed".into(),
            "success".into(),
            "canceled".into(),
        ],
        in_progress: vec!["running".into()],
        not_started: vec!["created".into()],
        manual: vec!["blocked".into()],
        default: None,
    }
}

// ============================================================================
// Result Rule Tests
// ============================================================================

#[test_case("failed", CicdResult::Failure ; "failed")]
#[test_case("UNDEPLOYED", CicdResult::Failure ; "undeployed")]
#[test_case("success", CicdResult::Success ; "success")]
#[test_case("COMPLETED", CicdResult::Success ; "completed")]
#[test_case("canceled", CicdResult::Abort ; "canceled")]
#[test_case("created", CicdResult::Abort ; "created")]
#[test_case("running", CicdResult::Manual ; "running")]
#[test_case("blocked", CicdResult::Manual ; "blocked")]
fn test_result_categories(native: &str, expected: CicdResult) {
    assert_eq!(get_result(&gitlab_result_rule(), native), expected);
}

#[test]
fn test_result_unknown_passes_through() {
    let result = get_result(&gitlab_result_rule(), "unknown_status");
    assert_eq!(result, CicdResult::Other("unknown_status".to_string()));
    assert_eq!(result, "unknown_status");
    assert!(!result.is_canonical());
}

#[test]
fn test_result_membership_is_case_sensitive() {
    assert_eq!(get_result(&gitlab_result_rule(), "FAILED"), "FAILED");
    assert_eq!(get_result(&gitlab_result_rule(), "Success"), "Success");
}

#[test]
fn test_unlisted_canonical_spelling_stays_native() {
    let result = get_result(&gitlab_result_rule(), "SUCCESS");
    assert_eq!(result, CicdResult::Other("SUCCESS".to_string()));
    assert!(!result.is_canonical());

    let status = get_status(&gitlab_status_rule(), "DONE");
    assert_eq!(status, CicdStatus::Other("DONE".to_string()));
    assert!(!status.is_canonical());
}

#[test]
fn test_configured_default_maps_to_canonical() {
    let mut rule = gitlab_result_rule();
    rule.default = Some("ABORT".to_string());
    assert_eq!(get_result(&rule, "weird"), CicdResult::Abort);
}

#[test]
fn test_result_explicit_default() {
    let mut rule = gitlab_result_rule();
    rule.default = Some(String::new());
    assert_eq!(get_result(&rule, "weird"), "");
}

// ============================================================================
// Status Rule Tests
// ============================================================================

#[test_case("canceled", CicdStatus::Done ; "canceled is done")]
#[test_case("running", CicdStatus::InProgress ; "running")]
#[test_case("created", CicdStatus::NotStarted ; "created")]
#[test_case("blocked", CicdStatus::Manual ; "blocked")]
fn test_status_categories(native: &str, expected: CicdStatus) {
    assert_eq!(get_status(&gitlab_status_rule(), native), expected);
}

#[test]
fn test_same_value_differs_between_rules() {
    assert_eq!(get_result(&gitlab_result_rule(), "canceled"), CicdResult::Abort);
    assert_eq!(get_status(&gitlab_status_rule(), "canceled"), CicdStatus::Done);

    let status = StatusRule {
        in_progress: vec!["running".into()],
        ..StatusRule::default()
    };
    assert_eq!(get_status(&status, "canceled"), "canceled");
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn test_first_declared_category_wins() {
    let rule = ResultRule {
        failed: vec!["flaky".into()],
        success: vec!["flaky".into()],
        ..ResultRule::default()
    };
    assert_eq!(get_result(&rule, "flaky"), CicdResult::Failure);

    let rule = ResultRule {
        success: vec!["flaky".into()],
        abort: vec!["flaky".into()],
        ..ResultRule::default()
    };
    assert_eq!(get_result(&rule, "flaky"), CicdResult::Success);
}

#[test]
fn test_generic_rule_declaration_order() {
    let rule = ClassificationRule::new("other")
        .category("first", ["x"])
        .category("second", ["x", "y"]);

    assert_eq!(rule.classify("x"), "first");
    assert_eq!(rule.classify("y"), "second");
    assert_eq!(rule.classify("z"), "other");
    assert_eq!(rule.categories().len(), 2);
    assert_eq!(*rule.default_value(), "other");
}

#[test]
fn test_pattern_category() {
    let rule = ClassificationRule::new(CicdResult::Other("?".into()))
        .category(CicdResult::Success, ["ok"])
        .pattern_category(CicdResult::Failure, Regex::new(r"(?i)^fail").unwrap());

    assert_eq!(rule.classify("ok"), CicdResult::Success);
    assert_eq!(rule.classify("FAILED_HARD"), CicdResult::Failure);
    assert_eq!(rule.classify("fail"), CicdResult::Failure);
    assert_eq!(rule.classify("pass"), CicdResult::Other("?".into()));
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_rule_from_yaml() {
    let yaml = r"
failed: [UNDEPLOYED, failed]
success: [COMPLETED, success]
";
    let rule: ResultRule = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(rule.failed, vec!["UNDEPLOYED", "failed"]);
    assert!(rule.abort.is_empty());
    assert!(rule.default.is_none());
    assert_eq!(get_result(&rule, "COMPLETED"), CicdResult::Success);
}

#[test]
fn test_canonical_values_serialize_as_strings() {
    assert_eq!(
        serde_json::to_string(&CicdStatus::InProgress).unwrap(),
        "\"IN_PROGRESS\""
    );
    assert_eq!(
        serde_json::to_string(&CicdResult::Other("weird".into())).unwrap(),
        "\"weird\""
    );

    let parsed: CicdResult = serde_json::from_str("\"ABORT\"").unwrap();
    assert_eq!(parsed, CicdResult::Abort);
    let parsed: CicdStatus = serde_json::from_str("\"paused\"").unwrap();
    assert_eq!(parsed, CicdStatus::Other("paused".into()));
}
