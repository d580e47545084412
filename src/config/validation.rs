use regex::Regex;

/// Expand `${VAR_NAME}` references using `lookup`; unknown names are left in place.
pub fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(value, |caps: &regex::Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Parse the loose boolean spellings accepted in environment variables.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_and_keeps_unknown_variables() {
        let lookup = |name: &str| (name == "HASS_TOKEN").then(|| "abc".to_string());
        assert_eq!(expand_with("Bearer ${HASS_TOKEN}", lookup), "Bearer abc");
        assert_eq!(expand_with("${MISSING}/api", lookup), "${MISSING}/api");
    }

    #[test]
    fn parses_bool_spellings() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
