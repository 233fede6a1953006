//! # Jurisdiction Names ([`jurisdiction`](crate::jurisdiction)) - ISO 3166 code resolution.
//!
//! GLEIF reports an entity's legal jurisdiction as an ISO 3166-1 alpha-2 country code,
//! optionally extended with an ISO 3166-2 subdivision (e.g. `US-NY`). BODS statements
//! carry a human-readable name next to the code; this module resolves one from the
//! registry tables, falling back to the raw code when the registry has no entry.

use rust_iso3166::iso3166_2;

/// Resolves a jurisdiction code to a display name.
///
/// Plain alpha-2 codes resolve to the country name. Codes containing `-` resolve to
/// `"{subdivision name}, {country name}"`. Unknown codes are returned verbatim, so a
/// statement can always be emitted.
#[must_use]
pub fn jurisdiction_name(code: &str) -> String {
    if let Some((country_part, _)) = code.split_once('-') {
        let subdivision = iso3166_2::from_code(code);
        let country = rust_iso3166::from_alpha2(country_part);
        if let (Some(subdivision), Some(country)) = (subdivision, country) {
            return format!("{}, {}", subdivision.name, country.name);
        }
        return code.to_owned();
    }
    match rust_iso3166::from_alpha2(code) {
        Some(country) => country.name.to_owned(),
        None => code.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_resolves() {
        assert_eq!(jurisdiction_name("GB"), "United Kingdom of Great Britain and Northern Ireland");
        assert_eq!(jurisdiction_name("DE"), "Germany");
    }

    #[test]
    fn test_subdivision_code_resolves() {
        let name = jurisdiction_name("US-NY");
        assert!(name.starts_with("New York"), "unexpected name: {name}");
        assert!(name.ends_with("United States of America"), "unexpected name: {name}");
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert_eq!(jurisdiction_name("XX"), "XX");
        assert_eq!(jurisdiction_name("XX-99"), "XX-99");
    }
}
