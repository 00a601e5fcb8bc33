//! Spreadsheet locator parsing

use super::error::ConnectError;

const URL_MARKER: &str = "/spreadsheets/d/";

/// Extract the spreadsheet ID from a browser URL
/// (`https://docs.google.com/spreadsheets/d/<ID>/edit#gid=0`) or a bare ID
pub fn spreadsheet_id(locator: &str) -> Result<String, ConnectError> {
    let locator = locator.trim();

    let candidate = match locator.find(URL_MARKER) {
        Some(start) => {
            let rest = &locator[start + URL_MARKER.len()..];
            rest.split(['/', '?', '#']).next().unwrap_or_default()
        }
        None => locator,
    };

    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(candidate.to_string())
    } else {
        Err(ConnectError::Locator(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_edit_url() {
        let url = "https://docs.google.com/spreadsheets/d/1EU2_T8CFF8XK5b4-jsyn/edit?gid=0#gid=0";
        assert_eq!(spreadsheet_id(url).unwrap(), "1EU2_T8CFF8XK5b4-jsyn");
    }

    #[test]
    fn test_bare_id_passes_through() {
        assert_eq!(spreadsheet_id("  abc_DEF-123 ").unwrap(), "abc_DEF-123");
    }

    #[test]
    fn test_invalid_locators() {
        assert!(matches!(spreadsheet_id(""), Err(ConnectError::Locator(_))));
        assert!(matches!(
            spreadsheet_id("https://docs.google.com/spreadsheets/d/"),
            Err(ConnectError::Locator(_))
        ));
        assert!(matches!(
            spreadsheet_id("https://example.com/some sheet"),
            Err(ConnectError::Locator(_))
        ));
    }
}
