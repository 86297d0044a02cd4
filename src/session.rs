//! Per-connection command loop.
//!
//! Each client session reads one command per line and dispatches it
//! against the shared question store. Multi-step commands (`add`, `edit`,
//! `test`, `play`) issue their own sub-prompts over the same channel; a
//! session is strictly sequential and never reads concurrently.
//!
//! Every command path ends with a fresh prompt, success or failure. The
//! two exceptions are `quit` and channel closure, which end the session.

use crate::channel::{ChannelError, PromptChannel};
use crate::command::{Command, ParseError};
use crate::play::{answers_match, PlaySession};
use crate::store::{QuizStore, StoreError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::debug;

/// Greeting shown once per connection, before the first prompt
const BANNER: &[&str] = &[
    "=======================================",
    "       quizd - trivia over TCP",
    "=======================================",
];

/// Static command summary for `help`
const HELP: &[&str] = &[
    "Commands:",
    "  h|help      - Show this help.",
    "  list        - List the existing quizzes.",
    "  show <id>   - Show the question and the answer of the given quiz.",
    "  add         - Add a new quiz interactively.",
    "  delete <id> - Delete the given quiz.",
    "  edit <id>   - Edit the given quiz.",
    "  test <id>   - Answer the given quiz once.",
    "  p|play      - Answer all quizzes in random order.",
    "  credits     - Show the authors.",
    "  q|quit      - End the session.",
];

/// Static author text for `credits`
const CREDITS: &[&str] = &["quizd", "Written by the quizd authors."];

/// Errors a command handler can report. All but `Channel` are rendered as
/// user-visible lines and the session continues.
#[derive(Debug)]
pub enum CommandError {
    /// The command requires an `<id>` argument and none was given
    MissingArgument,
    /// The `<id>` argument is not a number
    InvalidArgument(String),
    /// No quiz exists with the given id
    NotFound(u32),
    /// The store rejected the submitted fields
    Invalid(Vec<String>),
    /// Transport failure; fatal for the session
    Channel(ChannelError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::MissingArgument => write!(f, "Missing <id> argument"),
            CommandError::InvalidArgument(arg) => {
                write!(f, "The <id> argument '{}' is not a number", arg)
            }
            CommandError::NotFound(id) => write!(f, "There is no quiz with id={}", id),
            CommandError::Invalid(messages) => {
                write!(f, "Invalid quiz: {}", messages.join(", "))
            }
            CommandError::Channel(e) => write!(f, "Channel error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ChannelError> for CommandError {
    fn from(e: ChannelError) -> Self {
        CommandError::Channel(e)
    }
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => CommandError::NotFound(id),
            StoreError::Invalid(messages) => CommandError::Invalid(messages),
        }
    }
}

/// Whether the command loop keeps going after a command
enum Flow {
    Continue,
    Quit,
}

/// One client's command-loop instance
pub struct Session {
    store: Arc<QuizStore>,
    channel: Box<dyn PromptChannel>,
    rng: SmallRng,
}

impl Session {
    pub fn new(store: Arc<QuizStore>, channel: Box<dyn PromptChannel>) -> Self {
        let mut seed_rng = rand::rng();
        Self::with_rng(store, channel, SmallRng::from_rng(&mut seed_rng))
    }

    /// Create a session with a fixed RNG, for reproducible play order
    pub fn with_rng(
        store: Arc<QuizStore>,
        channel: Box<dyn PromptChannel>,
        rng: SmallRng,
    ) -> Self {
        Self {
            store,
            channel,
            rng,
        }
    }

    /// Run the command loop until quit or disconnect
    pub async fn run(&mut self) -> Result<(), ChannelError> {
        for line in BANNER {
            self.channel.write_line(line).await?;
        }

        loop {
            self.channel.prompt().await?;

            let line = match self.channel.read_line().await {
                Ok(line) => line,
                Err(ChannelError::Closed) => return Ok(()),
                Err(e) => return Err(e),
            };

            match Command::parse(&line) {
                Ok(command) => match self.dispatch(command).await? {
                    Flow::Continue => {}
                    Flow::Quit => return Ok(()),
                },
                Err(ParseError::UnknownCommand(token)) => {
                    self.channel
                        .write_line(&format!("Unknown command '{}'", token))
                        .await?;
                    self.channel
                        .write_line("Use 'help' to see the available commands")
                        .await?;
                }
            }
        }
    }

    /// Dispatch one parsed command. Handler errors are rendered to the
    /// client; only transport errors propagate.
    async fn dispatch(&mut self, command: Command) -> Result<Flow, ChannelError> {
        let result = match command {
            Command::Empty => Ok(()),
            Command::Help => self.help().await,
            Command::List => self.list().await,
            Command::Show { id } => self.show(id.as_deref()).await,
            Command::Add => self.add().await,
            Command::Delete { id } => self.delete(id.as_deref()).await,
            Command::Edit { id } => self.edit(id.as_deref()).await,
            Command::Test { id } => self.test(id.as_deref()).await,
            Command::Play => self.play().await,
            Command::Credits => self.credits().await,
            Command::Quit => {
                self.quit().await?;
                return Ok(Flow::Quit);
            }
        };

        match result {
            Ok(()) => Ok(Flow::Continue),
            Err(CommandError::Channel(e)) => Err(e),
            Err(e) => {
                self.report(e).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Render a handler error as user-visible lines
    async fn report(&mut self, error: CommandError) -> Result<(), ChannelError> {
        match error {
            CommandError::MissingArgument => {
                self.channel.write_line("Missing <id> argument.").await
            }
            CommandError::InvalidArgument(arg) => {
                self.channel
                    .write_line(&format!("The <id> argument '{}' is not a number.", arg))
                    .await
            }
            CommandError::NotFound(id) => {
                self.channel
                    .write_line(&format!("There is no quiz with id={}.", id))
                    .await
            }
            CommandError::Invalid(messages) => {
                self.channel.write_line("The quiz is invalid:").await?;
                for message in &messages {
                    self.channel.write_line(&format!(" - {}", message)).await?;
                }
                Ok(())
            }
            CommandError::Channel(e) => Err(e),
        }
    }

    /// Shared pre-condition for the id-taking commands: the argument must
    /// be present and numeric before the store is touched.
    fn validate_id(arg: Option<&str>) -> Result<u32, CommandError> {
        let arg = arg.ok_or(CommandError::MissingArgument)?;
        arg.parse::<u32>()
            .map_err(|_| CommandError::InvalidArgument(arg.to_string()))
    }

    async fn help(&mut self) -> Result<(), CommandError> {
        for line in HELP {
            self.channel.write_line(line).await?;
        }
        Ok(())
    }

    async fn list(&mut self) -> Result<(), CommandError> {
        for quiz in self.store.list() {
            self.channel
                .write_line(&format!(" [{}]: {}", quiz.id, quiz.question))
                .await?;
        }
        Ok(())
    }

    async fn show(&mut self, arg: Option<&str>) -> Result<(), CommandError> {
        let id = Self::validate_id(arg)?;
        let quiz = self.store.get(id).ok_or(CommandError::NotFound(id))?;
        self.channel
            .write_line(&format!("[{}]: {} => {}", quiz.id, quiz.question, quiz.answer))
            .await?;
        Ok(())
    }

    async fn add(&mut self) -> Result<(), CommandError> {
        let question = self.channel.ask(" Enter a question:").await?;
        let answer = self.channel.ask(" Enter the answer:").await?;
        let quiz = self.store.create(&question, &answer)?;
        self.channel
            .write_line(&format!(
                "Added [{}]: {} => {}",
                quiz.id, quiz.question, quiz.answer
            ))
            .await?;
        Ok(())
    }

    /// Deleting an id that is already gone is a silent success
    async fn delete(&mut self, arg: Option<&str>) -> Result<(), CommandError> {
        let id = Self::validate_id(arg)?;
        self.store.delete(id);
        Ok(())
    }

    async fn edit(&mut self, arg: Option<&str>) -> Result<(), CommandError> {
        let id = Self::validate_id(arg)?;
        let quiz = self.store.get(id).ok_or(CommandError::NotFound(id))?;

        let question = self
            .channel
            .ask_with_initial(" Enter the question:", &quiz.question)
            .await?;
        let answer = self
            .channel
            .ask_with_initial(" Enter the answer:", &quiz.answer)
            .await?;

        // The quiz may have been deleted by another session while we were
        // waiting for input; update surfaces that as NotFound.
        let updated = self.store.update(id, &question, &answer)?;
        self.channel
            .write_line(&format!(
                "Changed [{}] to: {} => {}",
                updated.id, updated.question, updated.answer
            ))
            .await?;
        Ok(())
    }

    async fn test(&mut self, arg: Option<&str>) -> Result<(), CommandError> {
        let id = Self::validate_id(arg)?;
        let quiz = self.store.get(id).ok_or(CommandError::NotFound(id))?;

        let reply = self
            .channel
            .ask(&format!("[{}]: {}", quiz.id, quiz.question))
            .await?;
        if answers_match(&reply, &quiz.answer) {
            self.channel.write_line("CORRECT").await?;
        } else {
            self.channel.write_line("INCORRECT").await?;
        }
        Ok(())
    }

    async fn play(&mut self) -> Result<(), CommandError> {
        let mut game = PlaySession::new(self.store.list());
        let outcome = game.run(&mut *self.channel, &mut self.rng).await?;
        debug!(?outcome, score = game.score(), "Play session finished");
        Ok(())
    }

    async fn credits(&mut self) -> Result<(), CommandError> {
        for line in CREDITS {
            self.channel.write_line(line).await?;
        }
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), ChannelError> {
        self.channel.write_line("Bye!").await?;
        self.channel.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::scripted::ScriptedChannel;
    use crate::channel::PROMPT;

    /// Run a whole scripted session against the given store and return
    /// everything it wrote.
    async fn run_session(store: &Arc<QuizStore>, replies: &[&str]) -> Vec<String> {
        let channel = ScriptedChannel::new(replies);
        let output = channel.output_handle();
        let mut session = Session::with_rng(
            Arc::clone(store),
            Box::new(channel),
            SmallRng::seed_from_u64(0),
        );
        session.run().await.unwrap();

        let lines = output.lock().unwrap().clone();
        lines
    }

    /// Output minus the banner and prompt markers
    fn responses(output: &[String]) -> Vec<String> {
        output
            .iter()
            .filter(|line| line.as_str() != PROMPT && !BANNER.contains(&line.as_str()))
            .cloned()
            .collect()
    }

    fn prompts(output: &[String]) -> usize {
        output.iter().filter(|line| line.as_str() == PROMPT).count()
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_session_open() {
        let store = QuizStore::new();
        let output = run_session(&store, &["frobnicate", "help"]).await;

        let responses = responses(&output);
        assert_eq!(responses[0], "Unknown command 'frobnicate'");
        assert_eq!(responses[1], "Use 'help' to see the available commands");
        // The next command still ran
        assert!(responses.contains(&"Commands:".to_string()));
        // One prompt per read attempt: two commands plus the final read
        assert_eq!(prompts(&output), 3);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_id() {
        let store = QuizStore::new();
        let output = run_session(&store, &["show", "show abc"]).await;

        let responses = responses(&output);
        assert_eq!(responses[0], "Missing <id> argument.");
        assert_eq!(responses[1], "The <id> argument 'abc' is not a number.");
        // Nothing was touched in the store
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_show_not_found() {
        let store = QuizStore::new();
        let output = run_session(&store, &["show 99"]).await;

        assert!(responses(&output).contains(&"There is no quiz with id=99.".to_string()));
    }

    #[tokio::test]
    async fn test_add_then_show_round_trips() {
        let store = QuizStore::new();
        let output = run_session(
            &store,
            &["add", "Capital of Spain", "Madrid", "show 1"],
        )
        .await;

        let responses = responses(&output);
        assert!(responses.contains(&"Added [1]: Capital of Spain => Madrid".to_string()));
        assert!(responses.contains(&"[1]: Capital of Spain => Madrid".to_string()));
    }

    #[tokio::test]
    async fn test_add_reports_each_invalid_field() {
        let store = QuizStore::new();
        let output = run_session(&store, &["add", "", "  "]).await;

        let responses = responses(&output);
        assert!(responses.contains(&"The quiz is invalid:".to_string()));
        assert!(responses.contains(&" - question must not be empty".to_string()));
        assert!(responses.contains(&" - answer must not be empty".to_string()));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_list_in_store_order() {
        let store = QuizStore::new();
        store.create("first", "a").unwrap();
        store.create("second", "b").unwrap();

        let output = run_session(&store, &["list"]).await;
        let responses = responses(&output);
        assert_eq!(responses, vec![" [1]: first", " [2]: second"]);
    }

    #[tokio::test]
    async fn test_list_empty_emits_nothing() {
        let store = QuizStore::new();
        let output = run_session(&store, &["list"]).await;
        assert!(responses(&output).is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_show_not_found() {
        let store = QuizStore::new();
        let quiz = store.create("q", "a").unwrap();

        let delete_cmd = format!("delete {}", quiz.id);
        let show_cmd = format!("show {}", quiz.id);
        let output = run_session(&store, &[delete_cmd.as_str(), show_cmd.as_str()]).await;

        let responses = responses(&output);
        assert_eq!(
            responses,
            vec![format!("There is no quiz with id={}.", quiz.id)]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_silent() {
        let store = QuizStore::new();
        let output = run_session(&store, &["delete 42"]).await;

        assert!(responses(&output).is_empty());
        // And the session carried on normally
        assert_eq!(prompts(&output), 2);
    }

    #[tokio::test]
    async fn test_edit_updates_fields() {
        let store = QuizStore::new();
        store.create("old question", "old answer").unwrap();

        let output = run_session(
            &store,
            &["edit 1", "Capital of France", "Paris", "show 1"],
        )
        .await;

        let responses = responses(&output);
        assert!(responses.contains(&"Changed [1] to: Capital of France => Paris".to_string()));
        assert!(responses.contains(&"[1]: Capital of France => Paris".to_string()));
    }

    #[tokio::test]
    async fn test_edit_not_found_before_prompting() {
        let store = QuizStore::new();
        let output = run_session(&store, &["edit 5"]).await;

        let responses = responses(&output);
        assert_eq!(responses, vec!["There is no quiz with id=5."]);
    }

    #[tokio::test]
    async fn test_test_command_verdicts() {
        let store = QuizStore::new();
        store.create("Capital of Spain", "Madrid").unwrap();

        let output = run_session(&store, &["test 1", "  MADRID  "]).await;
        assert!(responses(&output).contains(&"CORRECT".to_string()));

        let output = run_session(&store, &["test 1", "Barcelona"]).await;
        assert!(responses(&output).contains(&"INCORRECT".to_string()));
    }

    #[tokio::test]
    async fn test_play_runs_through_the_session() {
        let store = QuizStore::new();
        store.create("2 + 2", "4").unwrap();

        let output = run_session(&store, &["play", "4"]).await;
        let responses = responses(&output);
        assert!(responses.contains(&"CORRECT - 1 so far".to_string()));
        assert!(responses.contains(&"Game finished. Final score: 1".to_string()));
    }

    #[tokio::test]
    async fn test_quit_ends_without_reprompting() {
        let store = QuizStore::new();
        let output = run_session(&store, &["q", "list"]).await;

        assert_eq!(responses(&output).last().unwrap(), "Bye!");
        // Only the prompt that preceded the quit; the scripted "list" was
        // never read
        assert_eq!(prompts(&output), 1);
    }

    #[tokio::test]
    async fn test_empty_line_just_reprompts() {
        let store = QuizStore::new();
        let output = run_session(&store, &["", "  "]).await;

        assert!(responses(&output).is_empty());
        assert_eq!(prompts(&output), 3);
    }
}
