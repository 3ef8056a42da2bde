// Input validation - nothing touches the network until this passes
use chrono::NaiveDate;

use crate::models::SearchRequest;

/// Default ceiling on identities per request. Each identity costs one
/// events fetch, so this bounds the request count per submit.
pub const MAX_IDENTITIES: usize = 15;

/// GitHub account names max out at 39 characters
pub const MAX_IDENTITY_LEN: usize = 39;

/// Check one account name against the remote grammar: alphanumeric and
/// single hyphens, no leading/trailing/consecutive hyphens, at most 39
/// characters.
pub fn is_valid_identity(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENTITY_LEN {
        return false;
    }
    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return false;
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Split a comma-separated identity list: trim each entry, drop empties,
/// deduplicate while preserving first-seen order.
pub fn parse_identities(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if !out.iter().any(|seen| seen == entry) {
            out.push(entry.to_string());
        }
    }
    out
}

/// Validate raw submit input into a `SearchRequest`.
///
/// All-or-nothing: any problem blocks the request, and every problem is
/// reported. Errors come back in input order - bad identities first, then
/// the count ceiling, then date problems.
pub fn validate_request(
    raw_identities: &str,
    start: &str,
    end: &str,
    token: Option<String>,
    max_identities: usize,
) -> Result<SearchRequest, Vec<String>> {
    let mut errors = Vec::new();

    let identities = parse_identities(raw_identities);

    if identities.is_empty() {
        errors.push("no usernames given".to_string());
    }

    for name in &identities {
        if !is_valid_identity(name) {
            errors.push(format!("invalid username: '{name}'"));
        }
    }

    if identities.len() > max_identities {
        errors.push(format!(
            "too many usernames: {} given, maximum is {}",
            identities.len(),
            max_identities
        ));
    }

    let parsed_start = parse_date(start, &mut errors);
    let parsed_end = parse_date(end, &mut errors);

    if let (Some(s), Some(e)) = (parsed_start, parsed_end) {
        if s >= e {
            errors.push("start date must be before end date".to_string());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Both dates parsed or we'd have errors above
    Ok(SearchRequest {
        identities,
        start: parsed_start.expect("start date validated"),
        end: parsed_end.expect("end date validated"),
        token,
    })
}

fn parse_date(s: &str, errors: &mut Vec<String>) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push(format!("invalid date '{s}': expected YYYY-MM-DD"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(ids: &str, start: &str, end: &str) -> Result<SearchRequest, Vec<String>> {
        validate_request(ids, start, end, None, MAX_IDENTITIES)
    }

    #[test]
    fn test_valid_request_preserves_normalized_identity_order() {
        let request = validate(" user1, user2 ,user1,user3", "2024-01-01", "2024-01-31").unwrap();
        assert_eq!(request.identities, vec!["user1", "user2", "user3"]);
        assert_eq!(request.start.to_string(), "2024-01-01");
        assert_eq!(request.end.to_string(), "2024-01-31");
    }

    #[test]
    fn test_identity_grammar() {
        assert!(is_valid_identity("user1"));
        assert!(is_valid_identity("a"));
        assert!(is_valid_identity("two-part-name"));
        assert!(is_valid_identity(&"a".repeat(39)));

        assert!(!is_valid_identity(""));
        assert!(!is_valid_identity(&"a".repeat(40)));
        assert!(!is_valid_identity("-leading"));
        assert!(!is_valid_identity("trailing-"));
        assert!(!is_valid_identity("double--hyphen"));
        assert!(!is_valid_identity("under_score"));
        assert!(!is_valid_identity("spa ce"));
    }

    #[test]
    fn test_invalid_identities_reported_by_name() {
        let errors = validate("good, -bad, also_bad", "2024-01-01", "2024-01-31").unwrap_err();
        assert_eq!(
            errors,
            vec![
                "invalid username: '-bad'",
                "invalid username: 'also_bad'",
            ]
        );
    }

    #[test]
    fn test_ceiling_error_names_the_ceiling() {
        let many: Vec<String> = (0..16).map(|i| format!("user{i}")).collect();
        let errors = validate(&many.join(","), "2024-01-01", "2024-01-31").unwrap_err();
        assert_eq!(errors, vec!["too many usernames: 16 given, maximum is 15"]);
    }

    #[test]
    fn test_duplicates_do_not_count_toward_ceiling() {
        let raw = vec!["user1"; 20].join(",");
        assert!(validate(&raw, "2024-01-01", "2024-01-31").is_ok());
    }

    #[test]
    fn test_date_format_and_order_errors_are_distinguishable() {
        let format_errors = validate("user1", "2024/01/01", "2024-01-31").unwrap_err();
        assert_eq!(
            format_errors,
            vec!["invalid date '2024/01/01': expected YYYY-MM-DD"]
        );

        let order_errors = validate("user1", "2024-01-31", "2024-01-01").unwrap_err();
        assert_eq!(order_errors, vec!["start date must be before end date"]);
    }

    #[test]
    fn test_nonexistent_date_is_a_format_error() {
        let errors = validate("user1", "2024-02-30", "2024-03-01").unwrap_err();
        assert_eq!(
            errors,
            vec!["invalid date '2024-02-30': expected YYYY-MM-DD"]
        );
    }

    #[test]
    fn test_equal_dates_are_rejected() {
        let errors = validate("user1", "2024-01-01", "2024-01-01").unwrap_err();
        assert_eq!(errors, vec!["start date must be before end date"]);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let errors = validate("", "2024-01-01", "2024-01-31").unwrap_err();
        assert_eq!(errors, vec!["no usernames given"]);
    }

    #[test]
    fn test_all_errors_reported_together() {
        let errors = validate("_bad", "nope", "2024-01-01").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("invalid username"));
        assert!(errors[1].contains("invalid date"));
    }
}
