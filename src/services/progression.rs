//! 练习进度与导航
//! 由分类下的有序练习列表和用户已完成 id 列表决定哪道题可选、下一道题是哪道

use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

use crate::errors::ApiError;
use crate::models::{Category, CategoryProgress, Difficulty, Exercise, ExerciseCount};
use crate::services::answers::{shuffled_options, AnswerOption};
use crate::services::api::ApiClient;

/// 进度条最小宽度（百分比）
pub const MIN_BAR_WIDTH: f64 = 10.0;

/// 导航栏按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavButton {
    pub exercise_id: String,
    pub number: i64,
    pub enabled: bool,
    pub completed: bool,
    pub current: bool,
}

/// 分类内导航
#[derive(Debug, Clone)]
pub struct ExerciseNavigator {
    exercises: Vec<Exercise>,
    completed: HashSet<String>,
}

impl ExerciseNavigator {
    /// 练习按 (难度, order) 稳定排序，困难题排在简单题之后
    pub fn new<I, S>(mut exercises: Vec<Exercise>, completed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        exercises.sort_by_key(|e| (u8::from(e.level), e.order));
        Self {
            exercises,
            completed: completed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn total(&self) -> usize {
        self.exercises.len()
    }

    /// 只统计属于本分类列表的已完成题
    pub fn completed_count(&self) -> usize {
        self.exercises
            .iter()
            .filter(|e| self.completed.contains(&e.id))
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.next_exercise().is_none()
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// 列表中第一道未完成的题
    pub fn next_exercise(&self) -> Option<&Exercise> {
        self.exercises
            .iter()
            .find(|e| !self.completed.contains(&e.id))
    }

    pub fn next_exercise_id(&self) -> Option<&str> {
        self.next_exercise().map(|e| e.id.as_str())
    }

    /// 已完成或恰好是下一道题
    pub fn is_selectable(&self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.is_completed(id) || self.next_exercise_id() == Some(id)
    }

    /// 记录完成，返回是否为新完成
    pub fn mark_completed(&mut self, id: &str) -> bool {
        self.completed.insert(id.to_string())
    }

    /// 简单题按 order 编号，困难题接在简单题之后
    pub fn display_number(&self, exercise: &Exercise) -> i64 {
        match exercise.level {
            Difficulty::Easy => exercise.order,
            Difficulty::Hard => exercise.order + self.easy_count() as i64,
        }
    }

    fn easy_count(&self) -> usize {
        self.exercises
            .iter()
            .filter(|e| e.level == Difficulty::Easy)
            .count()
    }

    pub fn buttons(&self, current: Option<&str>) -> Vec<NavButton> {
        let next = self.next_exercise_id();
        self.exercises
            .iter()
            .map(|e| {
                let completed = self.completed.contains(&e.id);
                NavButton {
                    exercise_id: e.id.clone(),
                    number: self.display_number(e),
                    enabled: completed || next == Some(e.id.as_str()),
                    completed,
                    current: current == Some(e.id.as_str()),
                }
            })
            .collect()
    }

    /// 当前题的前一道和后一道（后一道必须可选）
    pub fn neighbors(&self, current: &str) -> (Option<&Exercise>, Option<&Exercise>) {
        let Some(index) = self.exercises.iter().position(|e| e.id == current) else {
            return (None, None);
        };
        let previous = index.checked_sub(1).and_then(|i| self.exercises.get(i));
        let following = self
            .exercises
            .get(index + 1)
            .filter(|e| self.is_selectable(&e.id));
        (previous, following)
    }
}

/// 选择答案的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Correct,
    Incorrect,
    /// 选项已禁用、越界或题目已解出
    Ignored,
}

/// 练习详情页的一次作答
#[derive(Debug, Clone)]
pub struct ExerciseAttempt {
    exercise_id: String,
    category_id: String,
    options: Vec<AnswerOption>,
    disabled: Vec<bool>,
    solved: bool,
}

impl ExerciseAttempt {
    pub fn new<R: Rng + ?Sized>(exercise: &Exercise, rng: &mut R) -> Self {
        Self::with_options(exercise, shuffled_options(exercise, rng))
    }

    pub fn with_options(exercise: &Exercise, options: Vec<AnswerOption>) -> Self {
        let disabled = vec![false; options.len()];
        Self {
            exercise_id: exercise.id.clone(),
            category_id: exercise.category.id().to_string(),
            options,
            disabled,
            solved: false,
        }
    }

    pub fn exercise_id(&self) -> &str {
        &self.exercise_id
    }

    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    pub fn is_disabled(&self, index: usize) -> bool {
        self.solved || self.disabled.get(index).copied().unwrap_or(true)
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// 错误选项只禁用自身，题目保持可答；正确选项解出题目
    pub fn select(&mut self, index: usize) -> AttemptOutcome {
        if self.is_disabled(index) {
            return AttemptOutcome::Ignored;
        }

        if self.options[index].is_correct {
            self.solved = true;
            AttemptOutcome::Correct
        } else {
            self.disabled[index] = true;
            AttemptOutcome::Incorrect
        }
    }
}

/// 某分类的练习会话，连接导航状态和远程进度
pub struct PracticeSession {
    api: ApiClient,
    category_id: String,
    navigator: ExerciseNavigator,
}

impl PracticeSession {
    /// 每次进入都重新拉取练习和进度
    pub async fn load(api: ApiClient, category_id: &str) -> Result<Self, ApiError> {
        let exercises = api.list_exercises_by_category(category_id).await?;
        let progress = api.user_progress().await?;
        let completed = completed_for(&progress, category_id);

        log::debug!(
            "Category {}: {} exercises, {} completed",
            category_id,
            exercises.len(),
            completed.len()
        );

        Ok(Self {
            api,
            category_id: category_id.to_string(),
            navigator: ExerciseNavigator::new(exercises, completed),
        })
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn navigator(&self) -> &ExerciseNavigator {
        &self.navigator
    }

    /// 不可选的题返回 None
    pub fn open<R: Rng + ?Sized>(&self, exercise_id: &str, rng: &mut R) -> Option<ExerciseAttempt> {
        if !self.navigator.is_selectable(exercise_id) {
            return None;
        }
        self.navigator
            .get(exercise_id)
            .map(|exercise| ExerciseAttempt::new(exercise, rng))
    }

    /// 选中正确答案时上报完成并推进下一题指针
    /// 上报失败时题目恢复为未解出，可以重新作答
    pub async fn answer(
        &mut self,
        attempt: &mut ExerciseAttempt,
        index: usize,
    ) -> Result<AttemptOutcome, ApiError> {
        let outcome = attempt.select(index);

        if outcome == AttemptOutcome::Correct && !self.navigator.is_completed(&attempt.exercise_id) {
            if let Err(e) = self
                .api
                .complete_exercise(&attempt.exercise_id, &attempt.category_id)
                .await
            {
                log::error!("Error completing exercise {}: {}", attempt.exercise_id, e);
                attempt.solved = false;
                return Err(e);
            }
            self.navigator.mark_completed(&attempt.exercise_id);
        }

        Ok(outcome)
    }
}

/// 取出某分类的已完成 id
pub fn completed_for(progress: &[CategoryProgress], category_id: &str) -> Vec<String> {
    progress
        .iter()
        .filter(|p| p.category == category_id)
        .flat_map(|p| p.completed.iter().cloned())
        .collect()
}

/// 已开始分类的进度概览
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgressView {
    pub category_id: String,
    pub name: String,
    pub completed: usize,
    pub total: u32,
    pub percent: f64,
    pub bar_width: f64,
}

pub fn progress_overview(
    progress: &[CategoryProgress],
    totals: &[ExerciseCount],
    categories: &[Category],
) -> Vec<CategoryProgressView> {
    progress
        .iter()
        .map(|p| {
            let total = totals
                .iter()
                .find(|t| t.category_id == p.category)
                .map(|t| t.count)
                .unwrap_or(0);
            let completed = p.completed.len();
            let percent = if total > 0 {
                completed as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            let name = categories
                .iter()
                .find(|c| c.id == p.category)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Categoría no encontrada".to_string());

            CategoryProgressView {
                category_id: p.category.clone(),
                name,
                completed,
                total,
                percent,
                bar_width: percent.max(MIN_BAR_WIDTH),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryType;
    use crate::services::answers::tests::exercise;
    use crate::services::test_support::{client_for, spawn_server};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn abc() -> Vec<Exercise> {
        vec![
            exercise("a", 1, Difficulty::Easy),
            exercise("b", 2, Difficulty::Easy),
            exercise("c", 3, Difficulty::Easy),
        ]
    }

    #[test]
    fn test_example_a_completed() {
        let nav = ExerciseNavigator::new(abc(), ["a"]);

        assert_eq!(nav.next_exercise_id(), Some("b"));
        assert!(nav.is_selectable("a"));
        assert!(nav.is_selectable("b"));
        assert!(!nav.is_selectable("c"));
    }

    #[test]
    fn test_exactly_one_uncompleted_enabled() {
        let cases: Vec<Vec<&str>> = vec![vec![], vec!["a"], vec!["b"], vec!["a", "c"], vec!["a", "b", "c"]];

        for completed in cases {
            let nav = ExerciseNavigator::new(abc(), completed.clone());
            let buttons = nav.buttons(None);
            let enabled_uncompleted: Vec<&NavButton> =
                buttons.iter().filter(|b| b.enabled && !b.completed).collect();

            if completed.len() == 3 {
                assert!(enabled_uncompleted.is_empty());
                assert!(nav.is_finished());
            } else {
                assert_eq!(enabled_uncompleted.len(), 1);
                assert_eq!(Some(enabled_uncompleted[0].exercise_id.as_str()), nav.next_exercise_id());
            }
            assert!(buttons.iter().filter(|b| b.completed).all(|b| b.enabled));
        }
    }

    #[test]
    fn test_gap_in_completed_set() {
        // b 已完成但 a 没有：下一题是 a，c 仍然禁用
        let nav = ExerciseNavigator::new(abc(), ["b"]);
        assert_eq!(nav.next_exercise_id(), Some("a"));
        assert!(nav.is_selectable("b"));
        assert!(!nav.is_selectable("c"));
    }

    #[test]
    fn test_unknown_ids_ignored() {
        let nav = ExerciseNavigator::new(abc(), ["zzz"]);
        assert_eq!(nav.completed_count(), 0);
        assert!(!nav.is_selectable("zzz"));
    }

    #[test]
    fn test_display_numbers_and_sorting() {
        let exercises = vec![
            exercise("h1", 1, Difficulty::Hard),
            exercise("e2", 2, Difficulty::Easy),
            exercise("e1", 1, Difficulty::Easy),
            exercise("h2", 2, Difficulty::Hard),
        ];
        let nav = ExerciseNavigator::new(exercises, Vec::<String>::new());

        let ids: Vec<&str> = nav.exercises().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "h1", "h2"]);
        let numbers: Vec<i64> = nav.buttons(None).iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_current_and_neighbors() {
        let nav = ExerciseNavigator::new(abc(), ["a"]);
        let buttons = nav.buttons(Some("b"));
        assert!(buttons[1].current);
        assert!(!buttons[0].current);

        let (prev, next) = nav.neighbors("b");
        assert_eq!(prev.map(|e| e.id.as_str()), Some("a"));
        assert!(next.is_none());

        let (prev, next) = nav.neighbors("a");
        assert!(prev.is_none());
        assert_eq!(next.map(|e| e.id.as_str()), Some("b"));
    }

    #[test]
    fn test_incorrect_disables_only_that_option() {
        let ex = exercise("a", 1, Difficulty::Easy);
        let mut rng = StdRng::seed_from_u64(3);
        let mut attempt = ExerciseAttempt::new(&ex, &mut rng);

        let wrong = attempt.options().iter().position(|o| !o.is_correct).unwrap();
        let right = attempt.options().iter().position(|o| o.is_correct).unwrap();

        assert_eq!(attempt.select(wrong), AttemptOutcome::Incorrect);
        assert!(attempt.is_disabled(wrong));
        assert!(!attempt.is_solved());
        assert_eq!(attempt.select(wrong), AttemptOutcome::Ignored);

        let others: Vec<usize> = (0..attempt.options().len()).filter(|i| *i != wrong).collect();
        assert!(others.iter().all(|i| !attempt.is_disabled(*i)));

        assert_eq!(attempt.select(right), AttemptOutcome::Correct);
        assert!(attempt.is_solved());
        assert_eq!(attempt.select(right), AttemptOutcome::Ignored);
        assert_eq!(attempt.select(99), AttemptOutcome::Ignored);
    }

    #[test]
    fn test_progress_overview() {
        let progress = vec![
            CategoryProgress {
                id: None,
                category: "c1".into(),
                completed: vec!["a".into(), "b".into()],
            },
            CategoryProgress {
                id: None,
                category: "c2".into(),
                completed: vec![],
            },
            CategoryProgress {
                id: None,
                category: "gone".into(),
                completed: vec!["x".into()],
            },
        ];
        let totals = vec![
            ExerciseCount { category_id: "c1".into(), count: 4 },
            ExerciseCount { category_id: "c2".into(), count: 20 },
        ];
        let categories = vec![
            Category { id: "c1".into(), name: "Listas".into(), category_type: CategoryType::DataStructure },
            Category { id: "c2".into(), name: "Ordenación".into(), category_type: CategoryType::Algorithm },
        ];

        let views = progress_overview(&progress, &totals, &categories);
        assert_eq!(views[0].name, "Listas");
        assert_eq!(views[0].percent, 50.0);
        assert_eq!(views[0].bar_width, 50.0);
        assert_eq!(views[1].bar_width, MIN_BAR_WIDTH);
        assert_eq!(views[2].name, "Categoría no encontrada");
        assert_eq!(views[2].total, 0);
        assert_eq!(views[2].percent, 0.0);
    }

    #[tokio::test]
    async fn test_practice_session_correct_answer_reports_completion() {
        let reported: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();

        let app = Router::new()
            .route(
                "/exercises",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("categoryId").map(String::as_str), Some("c1"));
                    let list: Vec<Exercise> = vec![
                        exercise("a", 1, Difficulty::Easy),
                        exercise("b", 2, Difficulty::Easy),
                        exercise("c", 3, Difficulty::Easy),
                    ];
                    Json(serde_json::to_value(list).unwrap())
                }),
            )
            .route(
                "/users/progress",
                get(|| async {
                    Json(json!([
                        {"_id": "p1", "category": "c1", "completed": ["a"]},
                        {"_id": "p2", "category": "c9", "completed": ["zz"]}
                    ]))
                }),
            )
            .route(
                "/users/complete-exercise",
                post(move |Json(body): Json<Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push(body);
                        Json(json!({}))
                    }
                }),
            );
        let api = client_for(&spawn_server(app).await);

        let mut session = PracticeSession::load(api, "c1").await.unwrap();
        assert_eq!(session.navigator().next_exercise_id(), Some("b"));

        let mut rng = StdRng::seed_from_u64(11);
        assert!(session.open("c", &mut rng).is_none());
        let mut attempt = session.open("b", &mut rng).unwrap();

        let wrong = attempt.options().iter().position(|o| !o.is_correct).unwrap();
        assert_eq!(session.answer(&mut attempt, wrong).await.unwrap(), AttemptOutcome::Incorrect);
        assert!(reported.lock().unwrap().is_empty());

        let right = attempt.options().iter().position(|o| o.is_correct).unwrap();
        assert_eq!(session.answer(&mut attempt, right).await.unwrap(), AttemptOutcome::Correct);

        let bodies = reported.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["exerciseId"], "b");
        assert_eq!(bodies[0]["categoryId"], "c1");
        assert_eq!(session.navigator().next_exercise_id(), Some("c"));
        assert!(session.navigator().is_selectable("c"));

        // 重做已完成的题不再上报
        let mut again = session.open("a", &mut rng).unwrap();
        let right = again.options().iter().position(|o| o.is_correct).unwrap();
        session.answer(&mut again, right).await.unwrap();
        assert_eq!(reported.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_completion_report_can_be_retried() {
        let calls: Arc<Mutex<usize>> = Arc::default();
        let counter = calls.clone();

        let app = Router::new()
            .route(
                "/exercises",
                get(|| async {
                    let list = vec![exercise("a", 1, Difficulty::Easy)];
                    Json(serde_json::to_value(list).unwrap())
                }),
            )
            .route("/users/progress", get(|| async { Json(json!([])) }))
            .route(
                "/users/complete-exercise",
                post(move || {
                    let counter = counter.clone();
                    async move {
                        let mut calls = counter.lock().unwrap();
                        *calls += 1;
                        if *calls == 1 {
                            StatusCode::INTERNAL_SERVER_ERROR
                        } else {
                            StatusCode::OK
                        }
                    }
                }),
            );
        let api = client_for(&spawn_server(app).await);

        let mut session = PracticeSession::load(api, "c1").await.unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut attempt = session.open("a", &mut rng).unwrap();
        let right = attempt.options().iter().position(|o| o.is_correct).unwrap();

        assert!(session.answer(&mut attempt, right).await.is_err());
        assert!(!attempt.is_solved());
        assert!(!session.navigator().is_completed("a"));
        assert_eq!(session.navigator().next_exercise_id(), Some("a"));

        assert_eq!(session.answer(&mut attempt, right).await.unwrap(), AttemptOutcome::Correct);
        assert!(attempt.is_solved());
        assert!(session.navigator().is_completed("a"));
        assert!(session.navigator().is_finished());
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
