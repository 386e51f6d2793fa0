//! Remote text sources for the fetch-and-speak actions.

use rand::seq::SliceRandom;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config;
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct InsultResponse {
    insult: String,
}

#[derive(Deserialize)]
struct FactResponse {
    text: String,
}

#[derive(Deserialize)]
struct JokeResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    category: String,
    #[serde(default)]
    joke: String,
}

/// One entry of the slur database.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Slur {
    pub slur: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub desc: String,
}

impl Slur {
    /// The sentence shown in chat and used as the cache key.
    pub fn describe(&self) -> String {
        format!(
            "Heres a slur: {}. group: {}. description: {}",
            self.slur, self.group, self.desc
        )
    }
}

/// Render a joke with its category intro on a single line.
pub fn format_joke(category: &str, joke: &str) -> String {
    let intro = if category == "Misc" {
        "Heres a miscellaneous joke:".to_string()
    } else {
        format!("Heres a \"{}\" joke:", category)
    };
    format!("{} {}", intro, joke.replace('\n', " "))
}

pub struct TextSources {
    client: Client,
    config: config::Sources,
}

impl TextSources {
    pub fn new(client: Client, config: config::Sources) -> Self {
        Self { client, config }
    }

    /// Text channel in which the slur action refuses to run.
    pub fn restricted_channel(&self) -> &str {
        &self.config.slur_restricted_channel
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, source: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Api(format!("{} API returned status {}", source, status)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Api(format!("{} API returned an unexpected response: {}", source, e)))
    }

    pub async fn insult(&self) -> Result<String> {
        let response: InsultResponse = self.get_json(&self.config.insult_url, "insult").await?;
        Ok(response.insult)
    }

    pub async fn fact(&self) -> Result<String> {
        let response: FactResponse = self.get_json(&self.config.fact_url, "fact").await?;
        Ok(response.text)
    }

    pub async fn joke(&self) -> Result<String> {
        let response: JokeResponse = self.get_json(&self.config.joke_url, "joke").await?;
        if response.error || response.joke.is_empty() {
            return Err(Error::Api("joke API returned no joke".to_string()));
        }
        Ok(format_joke(&response.category, &response.joke))
    }

    pub async fn random_slur(&self) -> Result<Slur> {
        let slurs: Vec<Slur> = self.get_json(&self.config.slur_url, "slur").await?;
        slurs
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| Error::Api("slur database is empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joke_intro() {
        assert_eq!(
            format_joke("Misc", "line one\nline two"),
            "Heres a miscellaneous joke: line one line two"
        );
        assert_eq!(
            format_joke("Dark", "punchline"),
            "Heres a \"Dark\" joke: punchline"
        );
    }

    #[test]
    fn test_response_shapes() {
        let insult: InsultResponse =
            serde_json::from_str(r#"{"number":"1","insult":"you smell","language":"en"}"#).unwrap();
        assert_eq!(insult.insult, "you smell");

        let joke: JokeResponse =
            serde_json::from_str(r#"{"error":false,"category":"Misc","type":"single","joke":"ha"}"#)
                .unwrap();
        assert_eq!(format_joke(&joke.category, &joke.joke), "Heres a miscellaneous joke: ha");

        let slurs: Vec<Slur> =
            serde_json::from_str(r#"[{"slur":"x","group":"g","desc":"d"}]"#).unwrap();
        assert_eq!(slurs[0].describe(), "Heres a slur: x. group: g. description: d");
    }
}
