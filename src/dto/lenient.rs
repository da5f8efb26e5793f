use serde::{Deserialize, Deserializer};

/* The overlay pages have historically written counters as either JSON numbers
 * or numeric strings ("60"), so both shapes are accepted on read. */
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
    Missing(()),
}

pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + Default,
{
    let raw = match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n,
        NumberOrText::Text(text) => match text.trim() {
            "" => return Ok(T::default()),
            trimmed => trimmed
                .parse::<u64>()
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got \"{text}\"")))?,
        },
        NumberOrText::Missing(()) => return Ok(T::default()),
    };

    T::try_from(raw).map_err(|_| serde::de::Error::custom(format!("number {raw} is out of range")))
}

/// Accepts a string or a bare number and keeps it as text (team scores).
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(text) => text,
        NumberOrText::Missing(()) => String::new(),
    })
}
