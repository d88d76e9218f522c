use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::consts::{CANDIDATE_COUNT, CHILD_MODE, USER_AGENT};
use crate::region::Region;

use super::{Answer, Engine, Guess, SessionState};

/// Engine backed by the public Akinator web backend.
pub struct AkinatorEngine {
    region: Region,
    client: reqwest::Client,
    base_url: String,
    session: Option<Credentials>,
    state: SessionState,
    proposition: Option<Guess>,
}

/// Per-game tokens handed out by `/game` and echoed on every answer.
#[derive(Debug, Clone, PartialEq)]
struct Credentials {
    session: String,
    signature: String,
}

/// What the `/game` page gives us.
#[derive(Debug, PartialEq)]
struct GamePage {
    question: String,
    credentials: Credentials,
}

/// A decoded `/answer` reply.
#[derive(Debug, PartialEq)]
enum Reply {
    Question {
        question: String,
        step: Option<u32>,
        progress: Option<f64>,
    },
    Proposition(Guess),
}

impl AkinatorEngine {
    pub fn new(region: Region) -> Result<Self> {
        let base_url = region.base_url();
        Self::with_base_url(region, base_url)
    }

    /// Point the engine at a different backend host (mirrors, local fakes).
    pub fn with_base_url(region: Region, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            region,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
            state: SessionState::default(),
            proposition: None,
        })
    }

    fn form_base(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sid", self.region.theme().to_string()),
            ("cm", CHILD_MODE.to_string()),
        ]
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("POST {}", url);

        let resp = self.client.post(&url).form(form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Akinator backend error ({}): {}", status, text);
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Engine for AkinatorEngine {
    async fn start(&mut self) -> Result<()> {
        let form = self.form_base();
        let page = self.post("game", &form).await?;
        let game = parse_game_page(&page)?;

        log::info!("session started in region {}", self.region);

        self.session = Some(game.credentials);
        self.proposition = None;
        self.state = SessionState {
            question: game.question,
            answers: answer_labels(self.region.language()),
            progress: 0.0,
            step: 0,
        };
        Ok(())
    }

    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn advance(&mut self, answer: &str) -> Result<()> {
        let answer: Answer = answer.parse()?;
        let credentials = self
            .session
            .clone()
            .ok_or_else(|| anyhow!("session not started"))?;

        let mut form = self.form_base();
        form.extend([
            ("step", self.state.step.to_string()),
            ("progression", self.state.progress.to_string()),
            ("answer", answer.index().to_string()),
            ("step_last_proposition", String::new()),
            ("session", credentials.session),
            ("signature", credentials.signature),
        ]);

        let body = self.post("answer", &form).await?;

        match parse_answer_reply(&body)? {
            Reply::Question {
                question,
                step,
                progress,
            } => {
                // a reply without counters still counts as a step
                self.state.step = step.unwrap_or(self.state.step + 1);
                self.state.progress = progress.unwrap_or(self.state.progress);
                self.state.question = question;
                log::debug!(
                    "step {} progress {:.2}",
                    self.state.step,
                    self.state.progress
                );
            }
            Reply::Proposition(guess) => {
                log::info!("backend proposed '{}'", guess.name);
                self.proposition = Some(guess);
                self.state.step += 1;
                self.state.progress = 100.0;
            }
        }
        Ok(())
    }

    async fn conclude(&mut self) -> Result<Vec<Guess>> {
        if let Some(guess) = self.proposition.take() {
            return Ok(vec![guess]);
        }

        // Stopped on our own limits before the backend proposed: ask for its
        // current best candidates.
        let credentials = self
            .session
            .clone()
            .ok_or_else(|| anyhow!("session not started"))?;

        let mut form = self.form_base();
        form.extend([
            ("step", self.state.step.to_string()),
            ("size", CANDIDATE_COUNT.to_string()),
            ("session", credentials.session),
            ("signature", credentials.signature),
        ]);

        let body = self.post("list", &form).await?;
        let guesses = parse_candidates(&body)?;
        log::info!(
            "concluded at step {} with '{}'",
            self.state.step,
            guesses[0].name
        );
        Ok(guesses)
    }
}

static QUESTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"id="question-label"[^>]*>\s*([^<]+?)\s*<"#,
        r#"class="question-text"[^>]*>\s*([^<]+?)\s*<"#,
    ])
});

static SESSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"name="session"[^>]*value="([^"]+)""#,
        r#"#session'\)\.val\('([^']+)'\)"#,
    ])
});

static SIGNATURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"name="signature"[^>]*value="([^"]+)""#,
        r#"#signature'\)\.val\('([^']+)'\)"#,
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("page pattern must compile"))
        .collect()
}

/// Pull the first question and the session tokens out of the `/game` page.
fn parse_game_page(html: &str) -> Result<GamePage> {
    let question = capture_first(html, &QUESTION_PATTERNS)
        .ok_or_else(|| anyhow!("game page has no question"))?;

    let session = capture_first(html, &SESSION_PATTERNS)
        .ok_or_else(|| anyhow!("game page has no session token"))?;

    let signature = capture_first(html, &SIGNATURE_PATTERNS)
        .ok_or_else(|| anyhow!("game page has no signature token"))?;

    Ok(GamePage {
        question: decode_entities(&question),
        credentials: Credentials { session, signature },
    })
}

fn capture_first(haystack: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(haystack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[derive(Deserialize)]
struct AnswerResponse {
    completion: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    step: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    progression: Option<f64>,
    #[serde(default)]
    id_proposition: Option<String>,
    #[serde(default)]
    name_proposition: Option<String>,
    #[serde(default)]
    description_proposition: Option<String>,
    #[serde(default)]
    photo: Option<String>,
}

/// The backend sends numbers as strings; accept either.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn parse_answer_reply(body: &str) -> Result<Reply> {
    let resp: AnswerResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("failed to parse answer reply: {}\nraw: {}", e, body))?;

    if resp.completion != "OK" {
        bail!("Akinator backend refused the answer: {}", resp.completion);
    }

    if let Some(name) = resp.name_proposition {
        return Ok(Reply::Proposition(Guess {
            id: resp.id_proposition,
            name,
            description: resp.description_proposition,
            photo: resp.photo,
        }));
    }

    let question = resp
        .question
        .ok_or_else(|| anyhow!("answer reply has neither a question nor a proposition"))?;

    Ok(Reply::Question {
        question: decode_entities(&question),
        step: resp.step.map(|s| s as u32),
        progress: resp.progression,
    })
}

#[derive(Deserialize)]
struct ListResponse {
    completion: String,
    #[serde(default)]
    parameters: Option<ListParameters>,
    #[serde(default)]
    id_proposition: Option<String>,
    #[serde(default)]
    name_proposition: Option<String>,
    #[serde(default)]
    description_proposition: Option<String>,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Deserialize)]
struct ListParameters {
    #[serde(default)]
    elements: Vec<ListElement>,
}

#[derive(Deserialize)]
struct ListElement {
    element: Candidate,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    absolute_picture_path: Option<String>,
}

/// Decode a `/list` reply: either a single proposition or a ranked element list.
fn parse_candidates(body: &str) -> Result<Vec<Guess>> {
    let resp: ListResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("failed to parse candidate list: {}\nraw: {}", e, body))?;

    if resp.completion != "OK" {
        bail!("Akinator backend refused to conclude: {}", resp.completion);
    }

    if let Some(name) = resp.name_proposition {
        return Ok(vec![Guess {
            id: resp.id_proposition,
            name,
            description: resp.description_proposition,
            photo: resp.photo,
        }]);
    }

    let guesses: Vec<Guess> = resp
        .parameters
        .map(|p| p.elements)
        .unwrap_or_default()
        .into_iter()
        .map(|e| Guess {
            id: e.element.id,
            name: e.element.name,
            description: e.element.description,
            photo: e.element.absolute_picture_path,
        })
        .collect();

    if guesses.is_empty() {
        bail!("backend returned no candidates");
    }
    Ok(guesses)
}

/// Answer labels in the region's language, English otherwise.
fn answer_labels(language: &str) -> Vec<String> {
    let labels: [&str; 5] = match language {
        "de" => ["Ja", "Nein", "Weiß nicht", "Wahrscheinlich", "Wahrscheinlich nicht"],
        "fr" => ["Oui", "Non", "Je ne sais pas", "Probablement", "Probablement pas"],
        "es" => ["Sí", "No", "No lo sé", "Probablemente", "Probablemente no"],
        "it" => ["Sì", "No", "Non so", "Probabilmente sì", "Probabilmente no"],
        _ => return Answer::ALL.iter().map(|a| a.to_string()).collect(),
    };
    labels.iter().map(|l| l.to_string()).collect()
}
