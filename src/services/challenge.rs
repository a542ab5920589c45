//! 挑战模式
//! 随机抽题、打乱选项、每题只记第一次作答，全部作答后给出得分

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use crate::errors::ApiError;
use crate::models::{Difficulty, Exercise};
use crate::services::answers::{shuffled_options, AnswerOption};
use crate::services::api::ApiClient;

/// 首轮难度
pub const FIRST_ROUND_DIFFICULTY: Difficulty = Difficulty::Easy;
/// 重新挑战时的难度
pub const RETRY_DIFFICULTY: Difficulty = Difficulty::Hard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChallengeAnswer {
    pub selected: usize,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct ChallengeQuestion {
    pub exercise: Exercise,
    pub options: Vec<AnswerOption>,
    pub answer: Option<ChallengeAnswer>,
}

impl ChallengeQuestion {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// 作答结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Correct,
    Incorrect,
    /// 该题已作答，不允许修改
    Locked,
    OutOfRange,
}

/// 得分汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeSummary {
    pub score: usize,
    pub total: usize,
    pub elapsed_secs: i64,
}

impl ChallengeSummary {
    pub fn message(&self) -> String {
        format!("Has acertado {} de {}.", self.score, self.total)
    }
}

/// 一轮挑战
#[derive(Debug, Clone)]
pub struct ChallengeRound {
    difficulty: Difficulty,
    questions: Vec<ChallengeQuestion>,
    score: usize,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    results_open: bool,
}

impl ChallengeRound {
    pub fn new<R: Rng + ?Sized>(
        exercises: Vec<Exercise>,
        difficulty: Difficulty,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Self {
        let questions = exercises
            .into_iter()
            .map(|exercise| {
                let options = shuffled_options(&exercise, rng);
                ChallengeQuestion {
                    exercise,
                    options,
                    answer: None,
                }
            })
            .collect();

        Self {
            difficulty,
            questions,
            score: 0,
            started_at: now,
            finished_at: None,
            results_open: false,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn questions(&self) -> &[ChallengeQuestion] {
        &self.questions
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered()).count()
    }

    /// 空轮次不算完成
    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.questions.iter().all(|q| q.is_answered())
    }

    /// 全部作答后显示所有解析
    pub fn hints_visible(&self) -> bool {
        self.is_complete()
    }

    pub fn results_open(&self) -> bool {
        self.results_open
    }

    pub fn close_results(&mut self) {
        self.results_open = false;
    }

    /// "Ver Resultados"：仅在完成后可重新打开
    pub fn open_results(&mut self) -> bool {
        if self.is_complete() {
            self.results_open = true;
        }
        self.results_open
    }

    pub fn select(&mut self, question: usize, option: usize, now: DateTime<Utc>) -> ChallengeOutcome {
        let Some(q) = self.questions.get_mut(question) else {
            return ChallengeOutcome::OutOfRange;
        };
        if q.answer.is_some() {
            return ChallengeOutcome::Locked;
        }
        let Some(chosen) = q.options.get(option) else {
            return ChallengeOutcome::OutOfRange;
        };

        let is_correct = chosen.is_correct;
        q.answer = Some(ChallengeAnswer {
            selected: option,
            is_correct,
        });
        if is_correct {
            self.score += 1;
        }

        if self.is_complete() {
            self.finished_at = Some(now);
            self.results_open = true;
        }

        if is_correct {
            ChallengeOutcome::Correct
        } else {
            ChallengeOutcome::Incorrect
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.finished_at.unwrap_or(now) - self.started_at
    }

    pub fn summary(&self) -> Option<ChallengeSummary> {
        let finished_at = self.finished_at?;
        Some(ChallengeSummary {
            score: self.score,
            total: self.total(),
            elapsed_secs: (finished_at - self.started_at).num_seconds(),
        })
    }
}

/// 挑战模式，负责抽题与重来
pub struct ChallengeMode {
    api: ApiClient,
    count: u32,
    round: ChallengeRound,
}

impl ChallengeMode {
    pub async fn start<R: Rng + ?Sized>(api: ApiClient, count: u32, rng: &mut R) -> Result<Self, ApiError> {
        let round = Self::fetch_round(&api, FIRST_ROUND_DIFFICULTY, count, rng).await?;
        Ok(Self { api, count, round })
    }

    /// 换一批新题重来，旧的作答、得分与计时全部清空
    pub async fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ApiError> {
        self.round = Self::fetch_round(&self.api, RETRY_DIFFICULTY, self.count, rng).await?;
        Ok(())
    }

    pub fn round(&self) -> &ChallengeRound {
        &self.round
    }

    pub fn round_mut(&mut self) -> &mut ChallengeRound {
        &mut self.round
    }

    async fn fetch_round<R: Rng + ?Sized>(
        api: &ApiClient,
        difficulty: Difficulty,
        count: u32,
        rng: &mut R,
    ) -> Result<ChallengeRound, ApiError> {
        let exercises = api.random_exercises(difficulty, count).await.map_err(|e| {
            log::error!("Error fetching exercises: {}", e);
            e
        })?;
        log::info!(
            "Challenge round: {} {} exercises",
            exercises.len(),
            difficulty.as_query()
        );
        Ok(ChallengeRound::new(exercises, difficulty, rng, Utc::now()))
    }
}
