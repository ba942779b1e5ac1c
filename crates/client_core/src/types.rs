//! Wire shape of the remote countries dataset and its normalization.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use shared::domain::{Country, CountryId, MISSING_CAPITAL, UNKNOWN_COUNTRY_NAME};

/// Sparse field set requested from the endpoint.
pub const REQUESTED_FIELDS: &str = "name,capital,population,flags";

/// A field with an unexpected JSON type decodes as absent instead of failing
/// the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteCountryName {
    #[serde(default, deserialize_with = "lenient")]
    pub common: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteFlags {
    #[serde(default, deserialize_with = "lenient")]
    pub png: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub svg: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteCountryRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<RemoteCountryName>,
    #[serde(default, deserialize_with = "lenient")]
    pub capital: Option<Vec<Value>>,
    #[serde(default)]
    pub population: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<RemoteFlags>,
}

impl RemoteCountryRecord {
    /// Decodes one array element. Anything that is not an object becomes an
    /// empty record and is repaired by the normalization defaults.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    fn common_name(&self) -> Option<&str> {
        self.name
            .as_ref()
            .and_then(|name| name.common.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    fn flag_url(&self) -> Option<&str> {
        let flags = self.flags.as_ref()?;
        flags.png.as_deref().or(flags.svg.as_deref())
    }

    fn first_capital(&self) -> Option<&str> {
        self.capital
            .as_ref()?
            .first()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|capital| !capital.is_empty())
    }

    fn population(&self) -> u64 {
        match &self.population {
            Some(Value::Number(number)) => number.as_u64().unwrap_or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.is_finite() && *value > 0.0)
                    .map(|value| value as u64)
                    .unwrap_or(0)
            }),
            _ => 0,
        }
    }

    pub fn into_country(self) -> Country {
        let flag_url = self.flag_url().unwrap_or_default().to_string();
        let id = CountryId(format!(
            "{}-{}",
            self.common_name().unwrap_or("unknown"),
            flag_url
        ));
        let name = self
            .common_name()
            .unwrap_or(UNKNOWN_COUNTRY_NAME)
            .to_string();
        let flag_alt = self
            .flags
            .as_ref()
            .and_then(|flags| flags.alt.clone())
            .unwrap_or_else(|| format!("Flag of {name}"));

        Country {
            id,
            capital: self.first_capital().unwrap_or(MISSING_CAPITAL).to_string(),
            population: self.population(),
            flag_url,
            flag_alt,
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize(value: Value) -> Country {
        RemoteCountryRecord::from_value(value).into_country()
    }

    #[test]
    fn maps_complete_record() {
        let country = normalize(json!({
            "name": { "common": "Israel", "official": "State of Israel" },
            "capital": ["Jerusalem"],
            "population": 9216900,
            "flags": { "png": "https://flags/il.png", "svg": "https://flags/il.svg", "alt": "Blue star" }
        }));

        assert_eq!(country.id, CountryId("Israel-https://flags/il.png".into()));
        assert_eq!(country.name, "Israel");
        assert_eq!(country.capital, "Jerusalem");
        assert_eq!(country.population, 9_216_900);
        assert_eq!(country.flag_url, "https://flags/il.png");
        assert_eq!(country.flag_alt, "Blue star");
    }

    #[test]
    fn fills_defaults_for_missing_fields() {
        let country = normalize(json!({}));

        assert_eq!(country.id, CountryId("unknown-".into()));
        assert_eq!(country.name, "Unknown");
        assert_eq!(country.capital, MISSING_CAPITAL);
        assert_eq!(country.population, 0);
        assert_eq!(country.flag_url, "");
        assert_eq!(country.flag_alt, "Flag of Unknown");
    }

    #[test]
    fn falls_back_to_svg_flag_and_generated_alt() {
        let country = normalize(json!({
            "name": { "common": "Nepal" },
            "capital": [],
            "flags": { "svg": "https://flags/np.svg" }
        }));

        assert_eq!(country.flag_url, "https://flags/np.svg");
        assert_eq!(country.id, CountryId("Nepal-https://flags/np.svg".into()));
        assert_eq!(country.flag_alt, "Flag of Nepal");
        assert_eq!(country.capital, MISSING_CAPITAL);
    }

    #[test]
    fn repairs_fields_with_wrong_types() {
        let country = normalize(json!({
            "name": "Chad",
            "capital": "N'Djamena",
            "population": "lots",
            "flags": true
        }));

        assert_eq!(country.name, "Unknown");
        assert_eq!(country.capital, MISSING_CAPITAL);
        assert_eq!(country.population, 0);
        assert_eq!(country.flag_url, "");
    }

    #[test]
    fn population_rejects_negative_and_truncates_fractions() {
        assert_eq!(normalize(json!({ "population": -5 })).population, 0);
        assert_eq!(normalize(json!({ "population": 12.9 })).population, 12);
    }

    #[test]
    fn non_object_element_becomes_unknown_country() {
        let country = normalize(json!(42));
        assert_eq!(country.name, "Unknown");
    }
}
