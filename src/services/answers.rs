// 选项构建与洗牌
// 练习详情页与挑战模式共用

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::Exercise;

/// 单个可选答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

/// 正确答案在前，错误答案按原顺序跟随
/// 空白答案由表单校验过滤，这里保留服务端给出的全部答案
pub fn build_options(exercise: &Exercise) -> Vec<AnswerOption> {
    let mut options = Vec::with_capacity(exercise.answers.incorrect.len() + 1);
    options.push(AnswerOption {
        text: exercise.answers.correct.clone(),
        is_correct: true,
    });
    options.extend(
        exercise
            .answers
            .incorrect
            .iter()
            .map(|text| AnswerOption {
                text: text.clone(),
                is_correct: false,
            }),
    );
    options
}

/// 原地洗牌（rand 的 Fisher-Yates 实现）
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// 构建并洗牌
pub fn shuffled_options<R: Rng + ?Sized>(exercise: &Exercise, rng: &mut R) -> Vec<AnswerOption> {
    let mut options = build_options(exercise);
    shuffle(&mut options, rng);
    options
}
