//! Randomized no-repeat quiz game.
//!
//! A play session snapshots the question store into a working pool and
//! asks questions drawn uniformly at random, without replacement, until
//! the pool is empty (Won) or an answer is wrong (Lost). One wrong answer
//! ends the game immediately with the score earned so far.

use crate::channel::{ChannelError, PromptChannel};
use crate::store::Quiz;
use rand::Rng;

/// Terminal state of a play session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every question in the pool was answered correctly
    Won,
    /// A question was answered incorrectly
    Lost,
}

/// Compare a given answer against the expected one: surrounding
/// whitespace and letter case are not significant.
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// One game of "ask me everything", owning the shrinking question pool
/// and the running score.
pub struct PlaySession {
    pool: Vec<Quiz>,
    score: u32,
}

impl PlaySession {
    /// Start a game over a snapshot of the question store
    pub fn new(pool: Vec<Quiz>) -> Self {
        Self { pool, score: 0 }
    }

    /// Correct answers given so far
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Questions not yet asked
    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    /// Run the game to a terminal state. Each round draws one question at
    /// random, removes it from the pool before asking (so no question is
    /// ever repeated and the game ends in at most `pool` rounds), and
    /// suspends for one reply.
    pub async fn run<R: Rng>(
        &mut self,
        channel: &mut dyn PromptChannel,
        rng: &mut R,
    ) -> Result<PlayOutcome, ChannelError> {
        while !self.pool.is_empty() {
            let idx = rng.random_range(0..self.pool.len());
            let quiz = self.pool.swap_remove(idx);

            let reply = channel.ask(&quiz.question).await?;
            if answers_match(&reply, &quiz.answer) {
                self.score += 1;
                channel
                    .write_line(&format!("CORRECT - {} so far", self.score))
                    .await?;
            } else {
                channel
                    .write_line(&format!(
                        "INCORRECT - Game over. Final score: {}",
                        self.score
                    ))
                    .await?;
                return Ok(PlayOutcome::Lost);
            }
        }

        channel
            .write_line(&format!("Game finished. Final score: {}", self.score))
            .await?;
        Ok(PlayOutcome::Won)
    }
}
