use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Question put to the answer-detection capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPrompt {
    /// Did the contact pick up?
    ContactAnswered { name: String, phone: String },
    /// Dial the fallback emergency number?
    DialFallback { number: String },
}

impl AnswerPrompt {
    pub fn question(&self) -> String {
        match self {
            AnswerPrompt::ContactAnswered { name, .. } => format!("Did {} answer the call?", name),
            AnswerPrompt::DialFallback { number } => format!("Call {} automatically?", number),
        }
    }
}

/// Decides whether a call was answered (or a dial confirmed)
///
/// `false` covers both an explicit "no" and a dismissed prompt.
#[async_trait]
pub trait AnswerDetector: Send + Sync {
    async fn confirm(&self, prompt: &AnswerPrompt) -> bool;
}

/// Answers taken from a fixed script, in order
///
/// Once the script runs out every prompt is treated as dismissed.
#[derive(Default)]
pub struct ScriptedAnswers {
    script: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<AnswerPrompt>>,
}

impl ScriptedAnswers {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far
    pub fn asked(&self) -> Vec<AnswerPrompt> {
        self.asked.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AnswerDetector for ScriptedAnswers {
    async fn confirm(&self, prompt: &AnswerPrompt) -> bool {
        self.asked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        let answer = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(false);

        debug!("{} -> {}", prompt.question(), answer);
        answer
    }
}

/// Asks on the controlling terminal
///
/// Lines are read on a dedicated thread and handed over a channel, so a
/// question abandoned by a cancelled session never holds up runtime shutdown.
pub struct TerminalPrompt {
    lines: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl TerminalPrompt {
    pub fn stdin() -> Self {
        Self::from_reader(io::stdin())
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            for line in BufReader::new(reader).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read answer: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            lines: tokio::sync::Mutex::new(rx),
        }
    }

    /// Ask a yes/no question; anything but `y`/`yes` counts as no
    pub async fn ask(&self, question: &str) -> bool {
        let mut stdout = io::stdout();
        if let Err(e) = write!(stdout, "{} [y/N] ", question).and_then(|_| stdout.flush()) {
            warn!("Failed to show question: {}", e);
        }

        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(line) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            None => {
                debug!("Input closed; treating \"{}\" as no", question);
                false
            }
        }
    }
}

#[async_trait]
impl AnswerDetector for TerminalPrompt {
    async fn confirm(&self, prompt: &AnswerPrompt) -> bool {
        self.ask(&prompt.question()).await
    }
}

struct Pending {
    prompt: AnswerPrompt,
    reply: oneshot::Sender<bool>,
}

/// Answers delivered from outside, e.g. through the HTTP API
///
/// Only one prompt is outstanding at a time; a newer prompt dismisses the
/// older one.
#[derive(Default)]
pub struct ChannelAnswers {
    pending: Mutex<Option<Pending>>,
}

impl ChannelAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt waiting for an answer, if any
    ///
    /// Prompts whose asker has gone away (e.g. a cancelled session) are not
    /// reported.
    pub fn pending(&self) -> Option<AnswerPrompt> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|p| !p.reply.is_closed())
            .map(|p| p.prompt.clone())
    }

    /// Answer the outstanding prompt; returns false when nothing was waiting
    pub fn resolve(&self, answer: bool) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
        match pending {
            Some(p) => p.reply.send(answer).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl AnswerDetector for ChannelAnswers {
    async fn confirm(&self, prompt: &AnswerPrompt) -> bool {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            *pending = Some(Pending {
                prompt: prompt.clone(),
                reply: tx,
            });
        }

        rx.await.unwrap_or(false)
    }
}
